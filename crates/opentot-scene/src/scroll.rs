//! Horizontal scroll between two adjacent rooms
//!
//! The visible frame starts as room A. Each step shifts it 4 columns toward
//! the scroll direction and splices 4 fresh columns in from the fully
//! composited room B. While the walker still has distance to cover it walks
//! 2 px per step and is re-stamped; the clean pixels it covered are carried
//! along and put back before the next stamp, so it never leaves a trail.

use crate::bitmap::{AnimationBank, Bitmap, Point, Rect};
use crate::compositor::scene_rect;
use crate::path::Facing;
use crate::{CHARACTER_CORRECTION_X, SCENE_WIDTH, WALK_FRAME_COUNT};

/// Columns revealed per step
pub const SCROLL_STEP: i32 = 4;
/// Pixels the walker moves per step while it still walks
const WALKER_STEP: i32 = 2;
/// Slack added to the walker's distance budget
const WALKER_SLACK: i32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    /// Camera pans right: B enters from the right, the walker heads left
    Right,
    /// Camera pans left: B enters from the left, the walker heads right
    Left,
}

impl ScrollDirection {
    pub fn walk_facing(self) -> Facing {
        match self {
            ScrollDirection::Right => Facing::Right,
            ScrollDirection::Left => Facing::Left,
        }
    }

    /// Walker displacement per step (toward the room it came from)
    fn walker_step(self) -> i32 {
        match self {
            ScrollDirection::Right => -WALKER_STEP,
            ScrollDirection::Left => WALKER_STEP,
        }
    }

    /// How far the frame content moves per step
    fn shift(self) -> i32 {
        match self {
            ScrollDirection::Right => -SCROLL_STEP,
            ScrollDirection::Left => SCROLL_STEP,
        }
    }
}

/// Clean scene pixels under the stamped walker
#[derive(Debug, Clone)]
struct Under {
    origin: Point,
    pixels: Bitmap,
}

impl Under {
    fn capture(frame: &Bitmap, rect: Rect) -> Option<Self> {
        let rect = rect.intersection(&scene_rect());
        if rect.is_empty() {
            return None;
        }
        Some(Self {
            origin: Point::new(rect.x, rect.y),
            pixels: frame.crop(rect),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ScrollWalker {
    pub position: Point,
    /// Distance left to walk; once spent the walker only rides along
    pub budget: i32,
    pub frame: usize,
    under: Option<Under>,
}

pub struct ScrollTransition {
    direction: ScrollDirection,
    visible: Bitmap,
    destination: Bitmap,
    /// Next column boundary of B to reveal
    column: i32,
    steps_total: usize,
    steps_done: usize,
    walker: ScrollWalker,
}

impl ScrollTransition {
    /// `visible` is room A as shown, `clean_a` the same frame without actors,
    /// `destination` room B composited without actors. `pivot` is the column
    /// of B that ends up at the screen edge the scroll came from.
    pub fn new(
        direction: ScrollDirection,
        visible: Bitmap,
        clean_a: &Bitmap,
        destination: Bitmap,
        pivot: i32,
        player: Point,
        frame_size: (usize, usize),
    ) -> Self {
        let width = SCENE_WIDTH as i32;
        let pivot = pivot.clamp(0, width);
        let (column, steps, budget) = match direction {
            ScrollDirection::Right => (
                pivot,
                (width - pivot) / SCROLL_STEP,
                WALKER_SLACK + (width - (player.x + CHARACTER_CORRECTION_X * 2)),
            ),
            ScrollDirection::Left => (width - pivot, (width - pivot) / SCROLL_STEP, WALKER_SLACK + player.x),
        };
        let under_rect = Rect::new(player.x, player.y, frame_size.0 as i32, frame_size.1 as i32);
        tracing::debug!(?direction, pivot, steps, budget, "scroll prepared");
        Self {
            direction,
            visible,
            destination,
            column,
            steps_total: steps.max(0) as usize,
            steps_done: 0,
            walker: ScrollWalker {
                position: player,
                budget,
                frame: 0,
                under: Under::capture(clean_a, under_rect),
            },
        }
    }

    pub fn is_done(&self) -> bool {
        self.steps_done >= self.steps_total
    }

    pub fn steps_total(&self) -> usize {
        self.steps_total
    }

    pub fn visible(&self) -> &Bitmap {
        &self.visible
    }

    pub fn walker(&self) -> &ScrollWalker {
        &self.walker
    }

    /// (visible frame, clean destination, walker)
    pub fn into_parts(self) -> (Bitmap, Bitmap, ScrollWalker) {
        (self.visible, self.destination, self.walker)
    }

    /// Advance one step. Returns false once every step has run.
    pub fn step(&mut self, bank: &AnimationBank) -> bool {
        if self.is_done() {
            return false;
        }
        let height = self.visible.height() as i32;
        let shift = self.direction.shift();
        self.visible.shift_columns(shift);

        let (src_x, dst_x) = match self.direction {
            ScrollDirection::Right => {
                self.column += SCROLL_STEP;
                (self.column - SCROLL_STEP, SCENE_WIDTH as i32 - SCROLL_STEP)
            }
            ScrollDirection::Left => {
                self.column -= SCROLL_STEP;
                (self.column, 0)
            }
        };
        self.visible.copy_from(
            &self.destination,
            Rect::new(src_x, 0, SCROLL_STEP, height),
            Point::new(dst_x, 0),
        );

        let walker = &mut self.walker;
        if walker.budget > 0 {
            walker.budget -= WALKER_STEP;
            walker.frame = if walker.budget > 0 && walker.frame < WALK_FRAME_COUNT - 1 {
                walker.frame + 1
            } else {
                0
            };
            walker.position.x += self.direction.walker_step();

            // the last stamp rode along with the shift; paint over it
            if let Some(under) = walker.under.take() {
                let at = under.origin.offset(shift, 0);
                self.visible.copy_from(&under.pixels, under.pixels.bounds(), at);
            }
            if let Some(frame) = bank.frame(self.direction.walk_facing().index(), walker.frame) {
                walker.under = Under::capture(&self.visible, frame.rect_at(walker.position));
                self.visible.blit_masked(frame, walker.position);
            }
        } else {
            walker.position.x += shift;
        }

        self.steps_done += 1;
        true
    }

    /// Run every remaining step without presenting
    pub fn finish(&mut self, bank: &AnimationBank) {
        while self.step(bank) {}
    }
}
