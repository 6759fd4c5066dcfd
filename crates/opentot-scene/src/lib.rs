//! OpenTot scene engine
//!
//! Architecture:
//!   room/        - room records, binary codec, registry, per-room hooks
//!   compositor   - dirty-rectangle sprite compositing over depth layers
//!   path         - route table lookup + Bresenham trajectories
//!   motion       - tick-driven walk / talk state machine
//!   secondary    - the one animated non-player actor per room
//!   scroll       - horizontal two-room scroll transitions
//!   state, save  - save-game registers, puzzle state, save slots
//!   session      - `GameSession`, the context that owns all of the above

pub mod bitmap;
pub mod clock;
pub mod compositor;
pub mod depth;
pub mod error;
pub mod host;
pub mod inventory;
pub mod items;
pub mod motion;
pub mod path;
pub mod room;
pub mod save;
pub mod scroll;
pub mod secondary;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use bitmap::{AnimationBank, Bitmap, Point, Rect};
pub use error::{Result, SceneError};
pub use host::{Host, InputSnapshot, ResourceLoader, SoundCue};
pub use session::{GameSession, PickOutcome, ToggleOutcome};

/// Width of the action area in pixels
pub const SCENE_WIDTH: usize = 320;
/// Height of the action area in pixels (inventory/verb bar lives below)
pub const SCENE_HEIGHT: usize = 140;

/// Walk/mouse grid columns (8 px each)
pub const GRID_COLS: usize = 40;
/// Walk/mouse grid rows (5 px each)
pub const GRID_ROWS: usize = 28;
pub const CELL_WIDTH: i32 = 8;
pub const CELL_HEIGHT: i32 = 5;

/// Number of depth slots, drawn 0 (back) to 14 (front)
pub const DEPTH_LEVELS: usize = 15;
pub const LAYER_SLOTS: usize = 15;
pub const DOOR_SLOTS: usize = 5;
pub const OBJECT_INDEX_SLOTS: usize = 51;

/// Route table dimensions: near zones × far zones × points per polyline
pub const NEAR_ZONES: usize = 9;
pub const FAR_ZONES: usize = 30;
pub const ROUTE_TABLE_POINTS: usize = 5;
/// Marks an early end of a route table polyline
pub const ROUTE_TERMINATOR_Y: i32 = 9999;
/// Current position plus up to six waypoints
pub const MAIN_ROUTE_SLOTS: usize = 7;
/// Zones at or above this value are screen exits, not semantic zones
pub const FIRST_EXIT_ZONE: u8 = 10;

pub const TRAJECTORY_CAPACITY: usize = 300;
pub const SECONDARY_TRAJECTORY_CAPACITY: usize = 300;

/// Offset from the sprite origin to the character's feet
pub const CHARACTER_CORRECTION_X: i32 = 14;
pub const CHARACTER_CORRECTION_Y: i32 = 49;
/// Pointer hotspot offset applied to clicks
pub const CURSOR_HOTSPOT: i32 = 7;

/// Frames per walk-cycle direction
pub const WALK_FRAME_COUNT: usize = 16;

pub const INVENTORY_SLOTS: usize = 34;
