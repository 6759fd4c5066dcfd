//! The room's one independently animated actor
//!
//! Architecture:
//!   - the trajectory lives in the room record; on disk it stores the
//!     actor's feet, in memory (after `Set`) its sprite origin
//!   - `Footprint` carves the actor's shape out of the walk and mouse grids
//!     and puts the original cells back when it moves on
//!   - every grid write is a strict save → stamp → restore sequence, so the
//!     room can be written back clean at any time through `detach`

use serde::{Deserialize, Serialize};

use crate::bitmap::{AnimationBank, Bitmap, Point};
use crate::compositor::ActorSprite;
use crate::depth::secondary_depth;
use crate::room::profile::SecondaryDepth;
use crate::room::{GridPatch, RoomRecord, GRID_PATCH_SIZE};
use crate::{CELL_HEIGHT, CELL_WIDTH};

type Cells = [[u8; GRID_PATCH_SIZE]; GRID_PATCH_SIZE];

// ============================================================================
// Footprint
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footprint {
    /// Top-left grid cell currently covered
    cell: (usize, usize),
    cols: usize,
    rows: usize,
    walk_mask: Cells,
    mouse_mask: Cells,
    saved_walk: Cells,
    saved_mouse: Cells,
}

impl Footprint {
    /// Footprint shaped by `patch`, initially over the patch's own
    /// rectangle shifted one cell down-right. Captures the cells it covers.
    pub fn new(patch: &GridPatch, room: &RoomRecord) -> Self {
        let mut footprint = Self {
            cell: (patch.x1 as usize + 1, patch.y1 as usize + 1),
            cols: patch.cols(),
            rows: patch.rows(),
            walk_mask: patch.walk,
            mouse_mask: patch.mouse,
            saved_walk: [[0; GRID_PATCH_SIZE]; GRID_PATCH_SIZE],
            saved_mouse: [[0; GRID_PATCH_SIZE]; GRID_PATCH_SIZE],
        };
        footprint.save(room);
        footprint
    }

    pub fn cell(&self) -> (usize, usize) {
        self.cell
    }

    fn save(&mut self, room: &RoomRecord) {
        let (cx, cy) = self.cell;
        for i in 0..self.cols {
            for j in 0..self.rows {
                self.saved_walk[i][j] = room.walk.get(cx + i, cy + j);
                self.saved_mouse[i][j] = room.mouse.get(cx + i, cy + j);
            }
        }
    }

    /// Write non-zero mask cells into the grids
    pub fn stamp(&self, room: &mut RoomRecord) {
        let (cx, cy) = self.cell;
        for i in 0..self.cols {
            for j in 0..self.rows {
                if self.walk_mask[i][j] > 0 {
                    room.walk.set(cx + i, cy + j, self.walk_mask[i][j]);
                }
                if self.mouse_mask[i][j] > 0 {
                    room.mouse.set(cx + i, cy + j, self.mouse_mask[i][j]);
                }
            }
        }
    }

    /// Put the captured cells back
    pub fn restore(&self, room: &mut RoomRecord) {
        let (cx, cy) = self.cell;
        for i in 0..self.cols {
            for j in 0..self.rows {
                room.walk.set(cx + i, cy + j, self.saved_walk[i][j]);
                room.mouse.set(cx + i, cy + j, self.saved_mouse[i][j]);
            }
        }
    }

    /// Restore at the old cell, capture and stamp at the new one
    pub fn move_to(&mut self, room: &mut RoomRecord, cell: (usize, usize)) {
        if cell == self.cell {
            return;
        }
        self.restore(room);
        self.cell = cell;
        self.save(room);
        self.stamp(room);
    }
}

// ============================================================================
// Trajectory offsets
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryOp {
    /// Feet to sprite origin
    Set,
    /// Sprite origin back to feet
    Restore,
}

/// Shift every walked trajectory point by half the sprite width and its
/// full height. No-op for rooms without an active, offset-bearing actor.
pub fn apply_trajectory_offsets(room: &mut RoomRecord, width: usize, height: usize, op: TrajectoryOp) {
    if !room.secondary.enabled || !room.secondary.has_offsets() {
        return;
    }
    let dx = (width >> 1) as i32;
    let dy = height as i32;
    let (dx, dy) = match op {
        TrajectoryOp::Set => (-dx, -dy),
        TrajectoryOp::Restore => (dx, dy),
    };
    let len = room.secondary.walk_len();
    for p in room.secondary.trajectory.iter_mut().take(len) {
        *p = p.offset(dx, dy);
    }
}

// ============================================================================
// SecondaryActor
// ============================================================================

/// Saved-game view of the actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryState {
    pub position: Point,
    pub dir: u16,
    pub depth: u8,
    pub frame: usize,
    pub trajectory_index: usize,
    pub cell: (usize, usize),
}

#[derive(Debug, Clone)]
pub struct SecondaryActor {
    bank: AnimationBank,
    pub position: Point,
    pub dir: u16,
    pub depth: u8,
    pub frame: usize,
    /// 1-based; the actor stands at `trajectory[index - 1]`
    pub trajectory_index: usize,
    depth_rule: SecondaryDepth,
    width: usize,
    height: usize,
    footprint: Footprint,
}

impl SecondaryActor {
    /// Bind an animation to the room: convert its trajectory to sprite
    /// origins and capture the footprint's cells. Grids are not stamped yet.
    pub fn attach(
        room: &mut RoomRecord,
        bank: AnimationBank,
        footprint_patch: &GridPatch,
        depth_rule: SecondaryDepth,
    ) -> Self {
        let (width, height) = bank
            .frame(0, 1)
            .map_or((0, 0), |f| (f.width(), f.height()));
        apply_trajectory_offsets(room, width, height, TrajectoryOp::Set);
        let footprint = Footprint::new(footprint_patch, room);
        tracing::debug!(
            room = room.code,
            name = %room.secondary.name,
            width,
            height,
            "secondary animation attached"
        );
        Self {
            bank,
            position: Point::default(),
            dir: 0,
            depth: 0,
            frame: 0,
            trajectory_index: 1,
            depth_rule,
            width,
            height,
            footprint,
        }
    }

    /// Stand on the first trajectory point and stamp the footprint
    pub fn place_at_start(&mut self, room: &mut RoomRecord, entry_depth: Option<u8>) {
        self.trajectory_index = 1;
        self.position = room.secondary.trajectory.first().copied().unwrap_or_default();
        self.dir = room.secondary.directions.first().copied().unwrap_or(0);
        match entry_depth {
            Some(depth) => self.depth = depth,
            None => self.update_depth(),
        }
        self.footprint.stamp(room);
    }

    /// Undo the in-memory changes to the room before it is written back
    pub fn detach(&self, room: &mut RoomRecord, fix_grids: bool) {
        apply_trajectory_offsets(room, self.width, self.height, TrajectoryOp::Restore);
        if fix_grids {
            self.footprint.restore(room);
        }
    }

    /// Redo what `detach` undid, after the room was reloaded
    pub fn reattach(&self, room: &mut RoomRecord, fix_grids: bool) {
        apply_trajectory_offsets(room, self.width, self.height, TrajectoryOp::Set);
        if fix_grids {
            self.footprint.stamp(room);
        }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    pub fn set_depth_rule(&mut self, rule: SecondaryDepth) {
        self.depth_rule = rule;
    }

    // ─── Per-tick steps ──────────────────────────────────────────────────

    /// Next trajectory point; the walk loops back to the first point
    pub fn step_along(&mut self, room: &RoomRecord) {
        let len = room.secondary.walk_len();
        if self.trajectory_index >= len {
            self.trajectory_index = 1;
        } else {
            self.trajectory_index += 1;
        }
        let i = self.trajectory_index - 1;
        if let Some(&p) = room.secondary.trajectory.get(i) {
            self.position = p;
        }
        self.dir = room.secondary.directions.get(i).copied().unwrap_or(self.dir);
    }

    pub fn cycle_frame(&mut self) {
        let count = self.bank.frame_count();
        if count == 0 || self.frame + 1 >= count {
            self.frame = 0;
        } else {
            self.frame += 1;
        }
    }

    pub fn update_depth(&mut self) {
        self.depth = match self.depth_rule {
            SecondaryDepth::Fixed(depth) => depth,
            SecondaryDepth::Banded => secondary_depth(self.position.y, self.height as i32),
        };
    }

    /// Move the footprint to the grid cell under the current trajectory point
    pub fn update_movement_grids(&mut self, room: &mut RoomRecord) {
        if room.secondary.walk_len() <= 1 {
            return;
        }
        let Some(&p) = room.secondary.trajectory.get(self.trajectory_index.saturating_sub(1)) else {
            return;
        };
        let cell = (
            (p.x.max(0) / CELL_WIDTH) as usize + 1,
            (p.y.max(0) / CELL_HEIGHT) as usize + 1,
        );
        self.footprint.move_to(room, cell);
    }

    /// One secondary tick while the player is free to move
    pub fn tick(&mut self, room: &mut RoomRecord) {
        self.step_along(room);
        self.cycle_frame();
        self.update_depth();
        self.update_movement_grids(room);
    }

    pub fn current_frame(&self) -> Option<&Bitmap> {
        self.bank.frame(self.dir as usize, self.frame)
    }

    pub fn sprite(&self) -> Option<ActorSprite<'_>> {
        Some(ActorSprite {
            frame: self.current_frame()?,
            position: self.position,
            depth: self.depth,
        })
    }

    // ─── Save games ──────────────────────────────────────────────────────

    pub fn snapshot(&self) -> SecondaryState {
        SecondaryState {
            position: self.position,
            dir: self.dir,
            depth: self.depth,
            frame: self.frame,
            trajectory_index: self.trajectory_index,
            cell: self.footprint.cell,
        }
    }

    /// Resume from a saved state; the footprint moves to the saved cell
    pub fn restore(&mut self, room: &mut RoomRecord, state: &SecondaryState) {
        self.position = state.position;
        self.dir = state.dir;
        self.depth = state.depth;
        self.frame = state.frame;
        self.trajectory_index = state.trajectory_index.max(1);
        self.footprint.move_to(room, state.cell);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_room;

    fn bank() -> AnimationBank {
        AnimationBank::single(vec![
            Bitmap::filled(10, 20, 4),
            Bitmap::filled(10, 20, 5),
            Bitmap::filled(10, 20, 6),
        ])
    }

    fn footprint_patch() -> GridPatch {
        let mut patch = GridPatch { x1: 4, y1: 6, x2: 5, y2: 7, ..Default::default() };
        patch.walk[0][0] = 9;
        patch.walk[1][1] = 9;
        patch.mouse[0][0] = 3;
        patch
    }

    fn room_with_walker() -> RoomRecord {
        let mut room = sample_room(7);
        room.secondary.enabled = true;
        room.secondary.name = "GUARDIA1".into();
        room.secondary.length = 3;
        for (i, p) in [(100, 60), (120, 60), (140, 80)].iter().enumerate() {
            room.secondary.trajectory[i] = Point::new(p.0, p.1);
            room.secondary.directions[i] = i as u16;
        }
        for col in 0..40 {
            for row in 0..28 {
                room.walk.set(col, row, 1);
            }
        }
        room
    }

    #[test]
    fn set_and_restore_offsets_cancel_out() {
        let mut room = room_with_walker();
        let before = room.clone();
        apply_trajectory_offsets(&mut room, 10, 20, TrajectoryOp::Set);
        assert_eq!(room.secondary.trajectory[0], Point::new(95, 40));
        // points past the walked length are untouched
        assert_eq!(room.secondary.trajectory[3], Point::default());
        apply_trajectory_offsets(&mut room, 10, 20, TrajectoryOp::Restore);
        assert_eq!(room, before);
    }

    #[test]
    fn placeholder_name_disables_offsets() {
        let mut room = room_with_walker();
        room.secondary.name = crate::room::NO_ANIMATION_NAME.into();
        let before = room.clone();
        apply_trajectory_offsets(&mut room, 10, 20, TrajectoryOp::Set);
        assert_eq!(room, before);
    }

    #[test]
    fn trajectory_index_wraps_to_first_point() {
        let mut room = room_with_walker();
        let mut actor = SecondaryActor::attach(&mut room, bank(), &footprint_patch(), SecondaryDepth::Banded);
        actor.place_at_start(&mut room, None);
        assert_eq!(actor.position, Point::new(95, 40));
        let mut seen = Vec::new();
        for _ in 0..4 {
            actor.tick(&mut room);
            seen.push(actor.trajectory_index);
        }
        assert_eq!(seen, vec![2, 3, 1, 2]);
        assert_eq!(actor.position, Point::new(115, 40));
        assert_eq!(actor.dir, 1);
    }

    #[test]
    fn frames_cycle_through_the_bank() {
        let mut room = room_with_walker();
        let mut actor = SecondaryActor::attach(&mut room, bank(), &footprint_patch(), SecondaryDepth::Fixed(14));
        let frames: Vec<usize> = (0..4)
            .map(|_| {
                actor.cycle_frame();
                actor.frame
            })
            .collect();
        assert_eq!(frames, vec![1, 2, 0, 1]);
        actor.update_depth();
        assert_eq!(actor.depth, 14);
    }

    #[test]
    fn footprint_moves_without_leaving_marks() {
        let mut room = room_with_walker();
        let clean = room.clone();
        let mut actor = SecondaryActor::attach(&mut room, bank(), &footprint_patch(), SecondaryDepth::Banded);
        actor.place_at_start(&mut room, Some(0));
        assert_eq!(actor.footprint().cell(), (5, 7));
        assert_eq!(room.walk.get(5, 7), 9);
        assert_eq!(room.mouse.get(5, 7), 3);

        for _ in 0..3 {
            actor.tick(&mut room);
        }
        // back on the first point: feet (100, 60) → origin (95, 40) → cell (12, 9)
        assert_eq!(actor.footprint().cell(), (12, 9));
        assert_eq!(room.walk.get(5, 7), 1);
        assert_eq!(room.walk.get(13, 10), 9);

        actor.detach(&mut room, true);
        assert_eq!(room, clean);
    }

    #[test]
    fn snapshot_restore_moves_footprint() {
        let mut room = room_with_walker();
        let mut actor = SecondaryActor::attach(&mut room, bank(), &footprint_patch(), SecondaryDepth::Banded);
        actor.place_at_start(&mut room, None);
        actor.tick(&mut room);
        let saved = actor.snapshot();

        let mut fresh_room = room_with_walker();
        let mut fresh = SecondaryActor::attach(&mut fresh_room, bank(), &footprint_patch(), SecondaryDepth::Banded);
        fresh.place_at_start(&mut fresh_room, None);
        fresh.restore(&mut fresh_room, &saved);
        assert_eq!(fresh.snapshot(), saved);
        assert_eq!(fresh_room.walk, room.walk);
    }

    #[test]
    fn depth_banded_from_feet() {
        let mut room = room_with_walker();
        let mut actor = SecondaryActor::attach(&mut room, bank(), &footprint_patch(), SecondaryDepth::Banded);
        actor.place_at_start(&mut room, None);
        // origin y 40 + height 20 - 1 = feet 59
        assert_eq!(actor.depth, 1);
        let sprite = actor.sprite().unwrap();
        assert_eq!(sprite.position, Point::new(95, 40));
    }
}
