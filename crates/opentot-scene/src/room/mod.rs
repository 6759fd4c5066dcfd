//! Room records: everything one visitable location carries on disk
//!
//! A room is loaded from the registry on entry, mutated in place while the
//! player interacts with it (doors, picked objects, dropped objects) and
//! written back before the player leaves.

pub mod codec;
pub mod profile;
pub mod registry;

use serde::{Deserialize, Serialize};

use crate::bitmap::Point;
use crate::{
    CELL_HEIGHT, CELL_WIDTH, DOOR_SLOTS, FAR_ZONES, GRID_COLS, GRID_ROWS, LAYER_SLOTS, NEAR_ZONES,
    OBJECT_INDEX_SLOTS, ROUTE_TABLE_POINTS, ROUTE_TERMINATOR_Y, SECONDARY_TRAJECTORY_CAPACITY,
};

pub use codec::ROOM_RECORD_SIZE;
pub use profile::RoomProfile;
pub use registry::{RoomRegistry, RoomStore};

/// Secondary animation name meaning "no trajectory offsets apply"
pub const NO_ANIMATION_NAME: &str = "QQQQQQQQ";

/// Side length of an item's walk/mouse grid patch
pub const GRID_PATCH_SIZE: usize = 10;

// ============================================================================
// Grids
// ============================================================================

/// 40×28 byte grid, column-major like the on-disk layout
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    cells: Vec<u8>,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            cells: vec![0; GRID_COLS * GRID_ROWS],
        }
    }
}

impl std::fmt::Debug for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.cells.iter().filter(|&&c| c != 0).count();
        write!(f, "Grid({used} non-zero cells)")
    }
}

impl Grid {
    /// Build from raw column-major bytes; `None` on a size mismatch
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        (bytes.len() == GRID_COLS * GRID_ROWS).then(|| Self {
            cells: bytes.to_vec(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }

    /// Cell value; out-of-range cells read as 0
    pub fn get(&self, col: usize, row: usize) -> u8 {
        if col >= GRID_COLS || row >= GRID_ROWS {
            return 0;
        }
        self.cells[col * GRID_ROWS + row]
    }

    /// Writes outside the grid are dropped
    pub fn set(&mut self, col: usize, row: usize, value: u8) {
        if col < GRID_COLS && row < GRID_ROWS {
            self.cells[col * GRID_ROWS + row] = value;
        }
    }

    /// Grid cell containing a scene pixel
    pub fn cell_of(p: Point) -> (usize, usize) {
        let col = (p.x.max(0) / CELL_WIDTH) as usize;
        let row = (p.y.max(0) / CELL_HEIGHT) as usize;
        (col.min(GRID_COLS - 1), row.min(GRID_ROWS - 1))
    }

    pub fn at(&self, p: Point) -> u8 {
        let (col, row) = Self::cell_of(p);
        self.get(col, row)
    }
}

/// Rectangular override for the walk and mouse grids, carried by items
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridPatch {
    pub x1: u8,
    pub y1: u8,
    pub x2: u8,
    pub y2: u8,
    /// `[col offset][row offset]`
    pub walk: [[u8; GRID_PATCH_SIZE]; GRID_PATCH_SIZE],
    pub mouse: [[u8; GRID_PATCH_SIZE]; GRID_PATCH_SIZE],
}

impl GridPatch {
    pub fn cols(&self) -> usize {
        (self.x2.saturating_sub(self.x1) as usize + 1).min(GRID_PATCH_SIZE)
    }

    pub fn rows(&self) -> usize {
        (self.y2.saturating_sub(self.y1) as usize + 1).min(GRID_PATCH_SIZE)
    }

    pub fn is_empty(&self) -> bool {
        self.walk.iter().flatten().all(|&c| c == 0) && self.mouse.iter().flatten().all(|&c| c == 0)
    }
}

// ============================================================================
// Route table
// ============================================================================

/// Precomputed polylines from each near zone (1..=9) to each far zone (1..=30)
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    points: Vec<Point>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            points: vec![Point::new(0, ROUTE_TERMINATOR_Y); NEAR_ZONES * FAR_ZONES * ROUTE_TABLE_POINTS],
        }
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RouteTable")
    }
}

impl RouteTable {
    fn index(near: usize, far: usize, k: usize) -> Option<usize> {
        (near < NEAR_ZONES && far < FAR_ZONES && k < ROUTE_TABLE_POINTS)
            .then_some((near * FAR_ZONES + far) * ROUTE_TABLE_POINTS + k)
    }

    /// Point `k` of the polyline for 0-based `near`/`far` indices
    pub fn get(&self, near: usize, far: usize, k: usize) -> Option<Point> {
        Self::index(near, far, k).map(|i| self.points[i])
    }

    pub fn set(&mut self, near: usize, far: usize, k: usize, p: Point) {
        if let Some(i) = Self::index(near, far, k) {
            self.points[i] = p;
        }
    }

    /// All 5 points of one polyline, terminators included
    pub fn polyline(&self, near: usize, far: usize) -> Option<&[Point]> {
        let start = Self::index(near, far, 0)?;
        Some(&self.points[start..start + ROUTE_TABLE_POINTS])
    }

    pub(crate) fn points(&self) -> &[Point] {
        &self.points
    }

    pub(crate) fn from_points(points: Vec<Point>) -> Option<Self> {
        (points.len() == NEAR_ZONES * FAR_ZONES * ROUTE_TABLE_POINTS).then_some(Self { points })
    }
}

// ============================================================================
// Doors, layers, object index
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DoorState {
    #[default]
    Unused,
    Open,
    Closed,
    /// Any other byte, kept so records survive a write/read unchanged
    Other(u8),
}

impl From<u8> for DoorState {
    fn from(v: u8) -> Self {
        match v {
            0 => DoorState::Unused,
            1 => DoorState::Open,
            2 => DoorState::Closed,
            other => DoorState::Other(other),
        }
    }
}

impl From<DoorState> for u8 {
    fn from(s: DoorState) -> u8 {
        match s {
            DoorState::Unused => 0,
            DoorState::Open => 1,
            DoorState::Closed => 2,
            DoorState::Other(v) => v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Door {
    pub target_room: u16,
    /// Where the player appears in the target room
    pub exit: Point,
    pub state: DoorState,
    /// Zone the door occupies in this room
    pub zone: u8,
}

/// A static overlay bitmap placed in the room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScreenLayer {
    pub bitmap_ref: i32,
    pub bitmap_size: u16,
    pub position: Point,
    /// 1-based depth; 0 on an empty slot
    pub depth: u16,
}

impl ScreenLayer {
    pub fn is_empty(&self) -> bool {
        self.bitmap_size == 0
    }

    /// 0-based depth slot, if the layer is drawable
    pub fn depth_slot(&self) -> Option<usize> {
        if self.is_empty() || self.depth == 0 {
            return None;
        }
        Some(self.depth as usize - 1)
    }
}

/// Mouse-grid object index entry: mouse grid values index into this table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectIndexEntry {
    /// Item register code; 0 means "nothing here"
    pub file_index: u16,
    pub name: String,
}

/// Metadata of the room's one optional secondary actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryAnimMeta {
    pub enabled: bool,
    pub name: String,
    pub palette_anim: bool,
    pub palette_ref: u16,
    /// Fixed 300 slots; only `length` are walked
    pub trajectory: Vec<Point>,
    pub directions: Vec<u16>,
    pub length: u16,
}

impl Default for SecondaryAnimMeta {
    fn default() -> Self {
        Self {
            enabled: false,
            name: String::new(),
            palette_anim: false,
            palette_ref: 0,
            trajectory: vec![Point::default(); SECONDARY_TRAJECTORY_CAPACITY],
            directions: vec![0; SECONDARY_TRAJECTORY_CAPACITY],
            length: 0,
        }
    }
}

impl SecondaryAnimMeta {
    /// The last direction slot stores the item whose grid patch is the
    /// actor's footprint
    pub fn footprint_item(&self) -> u16 {
        self.directions.last().copied().unwrap_or(0)
    }

    /// Walked length, bounded by capacity
    pub fn walk_len(&self) -> usize {
        (self.length as usize).min(SECONDARY_TRAJECTORY_CAPACITY)
    }

    pub fn has_offsets(&self) -> bool {
        self.name != NO_ANIMATION_NAME
    }
}

// ============================================================================
// RoomRecord
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub code: u16,
    pub image_ref: u32,
    pub image_size: u16,
    pub walk: Grid,
    pub mouse: Grid,
    pub routes: RouteTable,
    pub doors: [Door; DOOR_SLOTS],
    pub layers: [ScreenLayer; LAYER_SLOTS],
    pub objects: Vec<ObjectIndexEntry>,
    pub secondary: SecondaryAnimMeta,
}

impl RoomRecord {
    /// Empty room with the given code
    pub fn new(code: u16) -> Self {
        Self {
            code,
            image_ref: 0,
            image_size: 0,
            walk: Grid::default(),
            mouse: Grid::default(),
            routes: RouteTable::default(),
            doors: [Door::default(); DOOR_SLOTS],
            layers: [ScreenLayer::default(); LAYER_SLOTS],
            objects: vec![ObjectIndexEntry::default(); OBJECT_INDEX_SLOTS],
            secondary: SecondaryAnimMeta::default(),
        }
    }

    /// Whether a door sits on `zone`. Any door counts, open or closed.
    pub fn is_barred_zone(&self, zone: u8) -> bool {
        zone != 0 && self.doors.iter().any(|d| d.zone == zone)
    }

    pub fn door_for_zone(&self, zone: u8) -> Option<&Door> {
        self.doors.iter().find(|d| d.zone == zone)
    }

    pub fn set_door_state(&mut self, slot: usize, state: DoorState) {
        if let Some(door) = self.doors.get_mut(slot) {
            tracing::debug!(room = self.code, slot, ?state, "door state changed");
            door.state = state;
        }
    }

    /// Walk-grid zone under the given scene pixel
    pub fn zone_at(&self, p: Point) -> u8 {
        self.walk.at(p)
    }

    /// Object index entry under the given scene pixel, if it names an item
    pub fn object_at(&self, p: Point) -> Option<&ObjectIndexEntry> {
        let idx = self.mouse.at(p) as usize;
        self.objects.get(idx).filter(|o| o.file_index != 0)
    }

    /// Overwrite grid cells x1..=x2 × y1..=y2 with the patch contents
    pub fn splice_grid_patch(&mut self, patch: &GridPatch) {
        for i in 0..patch.cols() {
            for j in 0..patch.rows() {
                let col = patch.x1 as usize + i;
                let row = patch.y1 as usize + j;
                self.walk.set(col, row, patch.walk[i][j]);
                self.mouse.set(col, row, patch.mouse[i][j]);
            }
        }
    }

    /// Empty the first layer slot drawn at the given 1-based depth.
    /// Returns the cleared slot index.
    pub fn clear_layer_with_depth(&mut self, depth: u16) -> Option<usize> {
        let slot = self
            .layers
            .iter()
            .position(|l| !l.is_empty() && l.depth == depth)?;
        self.layers[slot] = ScreenLayer::default();
        Some(slot)
    }

    /// Empty every layer showing `bitmap_ref`
    pub fn clear_layers_showing(&mut self, bitmap_ref: i32) -> usize {
        let mut cleared = 0;
        for layer in self.layers.iter_mut().filter(|l| l.bitmap_ref == bitmap_ref && !l.is_empty()) {
            *layer = ScreenLayer::default();
            cleared += 1;
        }
        cleared
    }

    /// Swap the bitmap of every layer showing `from`. Returns the slots touched.
    pub fn replace_layer_bitmap(&mut self, from: i32, to: i32, size: u16) -> Vec<usize> {
        let mut touched = Vec::new();
        for (slot, layer) in self.layers.iter_mut().enumerate() {
            if layer.bitmap_ref == from && !layer.is_empty() {
                layer.bitmap_ref = to;
                layer.bitmap_size = size;
                touched.push(slot);
            }
        }
        touched
    }

    pub fn free_layer_slot(&self) -> Option<usize> {
        self.layers.iter().position(ScreenLayer::is_empty)
    }
}
