//! Puzzle state and the room presentation derived from it
//!
//! A few puzzles change how rooms look (which statue sits in a niche, the TV,
//! the trap, the removed seal). Their state is stored here as plain enums;
//! `derive_presentation` maps it to the overrides a room needs and is run on
//! every room load and every restore, so a room can never disagree with the
//! state it was derived from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bitmap::Point;
use crate::host::SoundCue;
use crate::room::{RoomRecord, ScreenLayer};

/// Niche slot holding no statue
pub const NICHE_EMPTY: u16 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NicheState {
    pub slots: [u16; 3],
    /// Which slot is currently facing the room
    pub position: usize,
}

impl NicheState {
    pub fn current(&self) -> u16 {
        self.slots.get(self.position).copied().unwrap_or(NICHE_EMPTY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TvState {
    #[default]
    Off,
    On,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrapState {
    #[default]
    Unset,
    Set,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SealState {
    #[default]
    Intact,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PuzzleState {
    /// Room 20's niche, then room 24's
    pub niches: [NicheState; 2],
    pub tv: TvState,
    pub trap: TrapState,
    pub seal: SealState,
    pub books: [bool; 2],
}

/// Plot progress that does not change any room's look
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoryFlags {
    pub caves: [bool; 5],
    pub first_list: [u16; 5],
    pub second_list: [u16; 5],
    pub first_list_complete: bool,
    pub second_list_complete: bool,
    /// Named one-shot flags set by room scripts
    pub flags: BTreeMap<String, bool>,
}

impl StoryFlags {
    pub fn get(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn set(&mut self, name: impl Into<String>, value: bool) {
        self.flags.insert(name.into(), value);
    }
}

// ============================================================================
// Presentation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerOverride {
    pub slot: usize,
    /// `None` keeps the current bitmap
    pub bitmap_ref: Option<i32>,
    pub size: u16,
    pub position: Point,
    pub depth: u16,
}

/// Rectangle of mouse-grid cells set to one value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseFill {
    pub cols: (usize, usize),
    pub rows: (usize, usize),
    pub value: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecondaryOverride {
    #[default]
    Keep,
    Disable,
    /// Bring the actor in at a fixed sprite origin and depth
    Enable { start: Point, depth: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Presentation {
    /// (object index slot, object name table index)
    pub object_names: Vec<(usize, u16)>,
    pub layers: Vec<LayerOverride>,
    pub mouse: Vec<MouseFill>,
    pub secondary: SecondaryOverride,
    pub sound: Option<SoundCue>,
    pub tv_palette: bool,
}

impl Presentation {
    pub fn is_empty(&self) -> bool {
        *self == Presentation::default()
    }

    /// Write the grid and layer overrides into the room record
    pub fn apply_layout(&self, room: &mut RoomRecord) {
        for o in &self.layers {
            let Some(layer) = room.layers.get_mut(o.slot) else {
                continue;
            };
            if o.size == 0 {
                *layer = ScreenLayer::default();
                continue;
            }
            if let Some(bitmap_ref) = o.bitmap_ref {
                layer.bitmap_ref = bitmap_ref;
            }
            layer.bitmap_size = o.size;
            layer.position = o.position;
            layer.depth = o.depth;
        }
        for fill in &self.mouse {
            for col in fill.cols.0..=fill.cols.1 {
                for row in fill.rows.0..=fill.rows.1 {
                    room.mouse.set(col, row, fill.value);
                }
            }
        }
    }
}

/// Niche statue → (object name table index, niche layer bitmap)
const ROOM20_NICHE: &[(u16, u16, i32)] = &[
    (0, 4, 1190768),
    (561, 5, 1182652),
    (563, 6, 1186044),
    (615, 7, 1181760),
];

const ROOM24_NICHE: &[(u16, u16, i32)] = &[
    (0, 4, 1399610),
    (561, 5, 1381982),
    (615, 7, 1381090),
    (622, 8, 1400502),
    (623, 9, 1398718),
];

const NICHE_LAYER_SIZE: u16 = 892;

fn niche_presentation(
    table: &[(u16, u16, i32)],
    niche: &NicheState,
    object_slot: usize,
    layer_slot: usize,
    position: Point,
) -> Presentation {
    let entry = table.iter().find(|(statue, _, _)| *statue == niche.current());
    Presentation {
        object_names: entry.map(|&(_, name, _)| (object_slot, name)).into_iter().collect(),
        layers: vec![LayerOverride {
            slot: layer_slot,
            bitmap_ref: entry.map(|&(_, _, bitmap)| bitmap),
            size: NICHE_LAYER_SIZE,
            position,
            depth: 1,
        }],
        ..Default::default()
    }
}

/// Overrides room `code` needs given the puzzle state. Pure; applying the
/// result twice is the same as applying it once.
pub fn derive_presentation(code: u16, puzzle: &PuzzleState) -> Presentation {
    match code {
        2 => match puzzle.tv {
            TvState::On => Presentation {
                sound: Some(SoundCue::new("PARASITO", 355778, 20129)),
                ..Default::default()
            },
            TvState::Off => Presentation {
                tv_palette: true,
                ..Default::default()
            },
        },
        17 if puzzle.books[0] => Presentation {
            secondary: SecondaryOverride::Disable,
            ..Default::default()
        },
        20 => niche_presentation(ROOM20_NICHE, &puzzle.niches[0], 9, 1, Point::new(66, 35)),
        24 => {
            let mut p = niche_presentation(ROOM24_NICHE, &puzzle.niches[1], 8, 0, Point::new(217, 48));
            if puzzle.trap == TrapState::Set {
                p.secondary = SecondaryOverride::Enable {
                    start: Point::new(214 - 15, 115 - 42),
                    depth: 14,
                };
            }
            p
        }
        31 if puzzle.seal == SealState::Removed => Presentation {
            layers: vec![LayerOverride {
                slot: 0,
                bitmap_ref: Some(0),
                size: 0,
                position: Point::default(),
                depth: 0,
            }],
            mouse: vec![
                MouseFill { cols: (23, 25), rows: (4, 9), value: 4 },
                MouseFill { cols: (23, 25), rows: (10, 11), value: 3 },
            ],
            ..Default::default()
        },
        _ => Presentation::default(),
    }
}
