//! Dirty-rectangle sprite compositor
//!
//! Each tick only the patch around the moving actors is rebuilt:
//!   1. copy the clean background into the patch
//!   2. for each depth 0..15: the overlay at that depth, then the secondary
//!      actor if it stands at that depth, then the player
//!   3. copy the patch onto the visible screen and record it as dirty
//!
//! Every draw goes through the masked blit, so colour 0 never overwrites
//! what is below it.

use crate::bitmap::{Bitmap, Point, Rect};
use crate::{DEPTH_LEVELS, SCENE_HEIGHT, SCENE_WIDTH};

/// Margin kept around an actor sprite when building its patch
pub const PATCH_MARGIN: i32 = 3;

/// An overlay bitmap at its scene position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedBitmap {
    pub bitmap: Bitmap,
    pub position: Point,
}

impl PlacedBitmap {
    pub fn rect(&self) -> Rect {
        self.bitmap.rect_at(self.position)
    }
}

/// One actor frame to draw this tick
#[derive(Debug, Clone, Copy)]
pub struct ActorSprite<'a> {
    pub frame: &'a Bitmap,
    pub position: Point,
    pub depth: u8,
}

impl ActorSprite<'_> {
    pub fn rect(&self) -> Rect {
        self.frame.rect_at(self.position)
    }

    /// Sprite bounds grown by the patch margin, clipped to the action area
    pub fn patch_rect(&self) -> Rect {
        self.rect().inflate(PATCH_MARGIN).intersection(&scene_rect())
    }
}

/// A rectangle of scene pixels under construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub rect: Rect,
    pub pixels: Bitmap,
}

impl Patch {
    /// Masked blit of a scene-positioned image, clipped to the patch
    pub fn assemble_image(&mut self, image: &Bitmap, at: Point) {
        let local = Point::new(at.x - self.rect.x, at.y - self.rect.y);
        self.pixels.blit_masked(image, local);
    }
}

pub fn scene_rect() -> Rect {
    Rect::new(0, 0, SCENE_WIDTH as i32, SCENE_HEIGHT as i32)
}

/// Full-frame composite of a background, its overlays and optional actors
pub fn compose_scene(
    background: &Bitmap,
    layers: &[Option<PlacedBitmap>],
    actors: &[ActorSprite<'_>],
) -> Bitmap {
    let mut frame = background.clone();
    for depth in 0..DEPTH_LEVELS {
        if let Some(Some(layer)) = layers.get(depth) {
            frame.blit_masked(&layer.bitmap, layer.position);
        }
        for actor in actors.iter().filter(|a| a.depth as usize == depth) {
            frame.blit_masked(actor.frame, actor.position);
        }
    }
    frame
}

pub struct SpriteCompositor {
    background: Bitmap,
    screen: Bitmap,
    layers: Vec<Option<PlacedBitmap>>,
    dirty: Vec<Rect>,
}

impl Default for SpriteCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl SpriteCompositor {
    pub fn new() -> Self {
        Self {
            background: Bitmap::new(SCENE_WIDTH, SCENE_HEIGHT),
            screen: Bitmap::new(SCENE_WIDTH, SCENE_HEIGHT),
            layers: vec![None; DEPTH_LEVELS],
            dirty: Vec::new(),
        }
    }

    // ─── Scene content ───────────────────────────────────────────────────

    /// Install a room background, cropped or padded to the action area
    pub fn set_background(&mut self, background: &Bitmap) {
        let mut clean = Bitmap::new(SCENE_WIDTH, SCENE_HEIGHT);
        clean.copy_from(background, background.bounds(), Point::new(0, 0));
        self.background = clean;
    }

    pub fn background(&self) -> &Bitmap {
        &self.background
    }

    pub fn screen(&self) -> &Bitmap {
        &self.screen
    }

    /// Replace the visible frame wholesale (scroll transitions)
    pub fn set_screen(&mut self, frame: Bitmap) {
        self.screen = frame;
        self.dirty.push(scene_rect());
    }

    pub(crate) fn screen_mut(&mut self) -> &mut Bitmap {
        &mut self.screen
    }

    /// Place an overlay in a 0-based depth slot; out-of-range slots are ignored
    pub fn set_layer(&mut self, slot: usize, bitmap: Bitmap, position: Point) {
        match self.layers.get_mut(slot) {
            Some(layer) => *layer = Some(PlacedBitmap { bitmap, position }),
            None => tracing::warn!("Overlay depth slot {} out of range", slot),
        }
    }

    pub fn clear_layer(&mut self, slot: usize) {
        if let Some(layer) = self.layers.get_mut(slot) {
            *layer = None;
        }
    }

    pub fn clear_layers(&mut self) {
        self.layers.iter_mut().for_each(|l| *l = None);
    }

    pub fn layer(&self, slot: usize) -> Option<&PlacedBitmap> {
        self.layers.get(slot).and_then(Option::as_ref)
    }

    pub fn layers(&self) -> &[Option<PlacedBitmap>] {
        &self.layers
    }

    // ─── Patch building ──────────────────────────────────────────────────

    /// Clean background pixels under `rect`
    pub fn assemble_background(&self, rect: Rect) -> Patch {
        let rect = rect.intersection(&scene_rect());
        let rect = if rect.is_empty() { Rect::new(rect.x, rect.y, 0, 0) } else { rect };
        Patch {
            rect,
            pixels: self.background.crop(rect),
        }
    }

    /// Draw the overlay at `depth` into the patch if it overlaps
    pub fn overlay_layers(&self, patch: &mut Patch, depth: usize) {
        if let Some(layer) = self.layer(depth) {
            if layer.rect().intersects(&patch.rect) {
                patch.assemble_image(&layer.bitmap, layer.position);
            }
        }
    }

    /// Background, overlays and actors under `rect`, in depth order
    pub fn compose_patch(&self, rect: Rect, actors: &[ActorSprite<'_>]) -> Patch {
        let mut patch = self.assemble_background(rect);
        for depth in 0..DEPTH_LEVELS {
            self.overlay_layers(&mut patch, depth);
            for actor in actors.iter().filter(|a| a.depth as usize == depth) {
                patch.assemble_image(actor.frame, actor.position);
            }
        }
        patch
    }

    /// Copy a finished patch to the screen
    pub fn put_patch(&mut self, patch: &Patch) {
        if patch.rect.is_empty() {
            return;
        }
        self.screen
            .copy_from(&patch.pixels, patch.pixels.bounds(), Point::new(patch.rect.x, patch.rect.y));
        self.dirty.push(patch.rect);
    }

    // ─── Per-tick drawing ────────────────────────────────────────────────

    pub fn draw_main_character(&mut self, player: ActorSprite<'_>) {
        let patch = self.compose_patch(player.patch_rect(), &[player]);
        self.put_patch(&patch);
    }

    /// Redraw the actors. When their patches overlap both go into one union
    /// patch; otherwise each gets its own, and the player only when
    /// `draw_player` is set.
    pub fn sprites(
        &mut self,
        player: ActorSprite<'_>,
        secondary: Option<ActorSprite<'_>>,
        draw_player: bool,
    ) {
        let Some(secondary) = secondary else {
            if draw_player {
                self.draw_main_character(player);
            }
            return;
        };

        let player_rect = player.patch_rect();
        let secondary_rect = secondary.patch_rect();
        if player_rect.intersects(&secondary_rect) {
            let patch = self.compose_patch(player_rect.union(&secondary_rect), &[secondary, player]);
            self.put_patch(&patch);
        } else {
            if draw_player {
                self.draw_main_character(player);
            }
            let patch = self.compose_patch(secondary_rect, &[secondary]);
            self.put_patch(&patch);
        }
    }

    /// Rebuild the whole visible frame. With `scroll` set the actors are
    /// left out (they are stamped separately while scrolling).
    pub fn assemble_screen(&mut self, actors: &[ActorSprite<'_>], scroll: bool) {
        let actors: &[ActorSprite<'_>] = if scroll { &[] } else { actors };
        self.screen = compose_scene(&self.background, &self.layers, actors);
        self.dirty.clear();
        self.dirty.push(scene_rect());
    }

    /// Dirty rectangles since the last call
    pub fn take_dirty(&mut self) -> Vec<Rect> {
        std::mem::take(&mut self.dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compositor_with_layer() -> SpriteCompositor {
        let mut c = SpriteCompositor::new();
        c.set_background(&Bitmap::filled(SCENE_WIDTH, SCENE_HEIGHT, 1));
        // overlay at depth slot 4 covering x 100..110
        c.set_layer(4, Bitmap::filled(10, 10, 5), Point::new(100, 50));
        c.assemble_screen(&[], false);
        c
    }

    #[test]
    fn player_in_front_of_lower_layers() {
        let mut c = compositor_with_layer();
        let frame = Bitmap::filled(4, 4, 9);
        let player = ActorSprite { frame: &frame, position: Point::new(102, 52), depth: 6 };
        c.draw_main_character(player);
        assert_eq!(c.screen().get(103, 53), Some(9));
        assert_eq!(c.screen().get(108, 58), Some(5));
        assert_eq!(c.screen().get(90, 40), Some(1));
    }

    #[test]
    fn player_behind_higher_layers() {
        let mut c = compositor_with_layer();
        let frame = Bitmap::filled(4, 4, 9);
        let player = ActorSprite { frame: &frame, position: Point::new(102, 52), depth: 2 };
        c.draw_main_character(player);
        assert_eq!(c.screen().get(103, 53), Some(5));
    }

    #[test]
    fn secondary_draws_before_player_at_same_depth() {
        let mut c = compositor_with_layer();
        let p = Bitmap::filled(4, 4, 9);
        let s = Bitmap::filled(4, 4, 7);
        let player = ActorSprite { frame: &p, position: Point::new(20, 20), depth: 3 };
        let secondary = ActorSprite { frame: &s, position: Point::new(22, 22), depth: 3 };
        c.take_dirty();
        c.sprites(player, Some(secondary), true);
        assert_eq!(c.screen().get(22, 22), Some(9));
        assert_eq!(c.screen().get(25, 25), Some(7));
        // overlapping actors share one patch
        assert_eq!(c.take_dirty(), vec![Rect::new(17, 17, 12, 12)]);
    }

    #[test]
    fn distant_actors_get_separate_patches() {
        let mut c = compositor_with_layer();
        let p = Bitmap::filled(4, 4, 9);
        let s = Bitmap::filled(4, 4, 7);
        let player = ActorSprite { frame: &p, position: Point::new(10, 10), depth: 3 };
        let secondary = ActorSprite { frame: &s, position: Point::new(200, 100), depth: 3 };
        c.take_dirty();
        c.sprites(player, Some(secondary), false);
        // player patch skipped when not requested
        assert_eq!(c.take_dirty(), vec![Rect::new(197, 97, 10, 10)]);
        assert_eq!(c.screen().get(11, 11), Some(1));
    }

    #[test]
    fn patches_clip_to_the_action_area() {
        let mut c = compositor_with_layer();
        let frame = Bitmap::filled(10, 10, 9);
        let player = ActorSprite { frame: &frame, position: Point::new(315, 135), depth: 9 };
        c.take_dirty();
        c.draw_main_character(player);
        assert_eq!(c.take_dirty(), vec![Rect::new(312, 132, 8, 8)]);
        assert_eq!(c.screen().get(319, 139), Some(9));
    }

    #[test]
    fn moving_actor_leaves_no_ghost() {
        let mut c = compositor_with_layer();
        let frame = Bitmap::filled(4, 4, 9);
        c.draw_main_character(ActorSprite { frame: &frame, position: Point::new(40, 40), depth: 5 });
        c.draw_main_character(ActorSprite { frame: &frame, position: Point::new(42, 40), depth: 5 });
        assert_eq!(c.screen().get(40, 40), Some(1));
        assert_eq!(c.screen().get(45, 43), Some(9));
    }

    #[test]
    fn scroll_assembly_skips_actors() {
        let mut c = compositor_with_layer();
        let frame = Bitmap::filled(4, 4, 9);
        let actor = ActorSprite { frame: &frame, position: Point::new(0, 0), depth: 0 };
        c.assemble_screen(&[actor], true);
        assert_eq!(c.screen().get(0, 0), Some(1));
        c.assemble_screen(&[actor], false);
        assert_eq!(c.screen().get(0, 0), Some(9));
    }
}
