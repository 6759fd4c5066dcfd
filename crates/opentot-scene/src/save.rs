//! Save games: registers and the six named save slots
//!
//! A save game is two parts:
//!   - the `SaveGameRegister` (player, secondary actor, inventory, flags),
//!     stored as JSON together with the slot name and a timestamp
//!   - a byte copy of the whole room file, since rooms are mutated in place
//!
//! Slot files live in the configured save directory as `slot{n}.json` and
//! `slot{n}.rooms`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};
use crate::inventory::Inventory;
use crate::motion::PlayerMotion;
use crate::room::ROOM_RECORD_SIZE;
use crate::secondary::SecondaryState;
use crate::state::{PuzzleState, StoryFlags};

pub const SAVE_FORMAT_VERSION: u32 = 1;
pub const SAVE_SLOTS: usize = 6;

// ---------------------------------------------------------------------------
// Register
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundVolumes {
    pub sfx_left: u8,
    pub sfx_right: u8,
    pub music_left: u8,
    pub music_right: u8,
}

impl Default for SoundVolumes {
    fn default() -> Self {
        Self {
            sfx_left: 6,
            sfx_right: 6,
            music_left: 6,
            music_right: 6,
        }
    }
}

/// Zones the player is in and heading for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ZoneState {
    pub current: u8,
    pub target: u8,
    pub previous_target: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveGameRegister {
    pub version: u32,
    pub room: u16,
    pub player: PlayerMotion,
    #[serde(default)]
    pub secondary: Option<SecondaryState>,
    #[serde(default)]
    pub zones: ZoneState,
    #[serde(default)]
    pub volumes: SoundVolumes,
    pub inventory: Inventory,
    #[serde(default)]
    pub inventory_position: usize,
    #[serde(default)]
    pub action_code: u16,
    #[serde(default)]
    pub door_index: u8,
    #[serde(default)]
    pub game_part: u8,
    #[serde(default)]
    pub character_name: String,
    pub puzzle: PuzzleState,
    #[serde(default)]
    pub story: StoryFlags,
    /// Item "used" bytes that differ from the item file
    #[serde(default)]
    pub item_usage: Vec<(u16, [u8; 8])>,
}

impl SaveGameRegister {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SceneError::SaveCorruption(format!("cannot encode register: {e}")))
    }

    /// Decode a register; payloads from another format version are refused
    pub fn from_json(json: &str) -> Result<Self> {
        let register: Self = serde_json::from_str(json).map_err(|e| SceneError::SaveCorruption(e.to_string()))?;
        if register.version != SAVE_FORMAT_VERSION {
            return Err(SceneError::SaveCorruption(format!(
                "format version {} (expected {})",
                register.version, SAVE_FORMAT_VERSION
            )));
        }
        Ok(register)
    }
}

/// Everything needed to resume a game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveGame {
    pub register: SaveGameRegister,
    /// The room file as it was at save time
    pub rooms: Vec<u8>,
}

impl SaveGame {
    /// Reject room images that are not a whole number of records
    pub fn validate(&self) -> Result<()> {
        if self.rooms.is_empty() || self.rooms.len() % ROOM_RECORD_SIZE != 0 {
            return Err(SceneError::SaveCorruption(format!(
                "room image of {} bytes is not a multiple of {}",
                self.rooms.len(),
                ROOM_RECORD_SIZE
            )));
        }
        if (self.register.room as usize + 1) * ROOM_RECORD_SIZE > self.rooms.len() {
            return Err(SceneError::SaveCorruption(format!(
                "saved room {} is missing from the room image",
                self.register.room
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SaveSlots: persistent I/O
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct SlotFile {
    name: String,
    saved_at: DateTime<Local>,
    register: SaveGameRegister,
}

/// Save menu entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    pub slot: usize,
    pub name: String,
    pub saved_at: DateTime<Local>,
    pub room: u16,
}

pub struct SaveSlots {
    dir: PathBuf,
}

impl SaveSlots {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn paths(&self, slot: usize) -> Result<(PathBuf, PathBuf)> {
        if slot >= SAVE_SLOTS {
            return Err(SceneError::Resource(format!(
                "save slot {slot} out of range (0..{SAVE_SLOTS})"
            )));
        }
        Ok((
            self.dir.join(format!("slot{slot}.json")),
            self.dir.join(format!("slot{slot}.rooms")),
        ))
    }

    /// Write a game to `slot`, replacing what was there
    pub fn save(&self, slot: usize, name: &str, game: &SaveGame) -> Result<SlotInfo> {
        let (json_path, rooms_path) = self.paths(slot)?;
        std::fs::create_dir_all(&self.dir)?;

        let file = SlotFile {
            name: name.to_string(),
            saved_at: Local::now(),
            register: game.register.clone(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| SceneError::SaveCorruption(format!("cannot encode slot {slot}: {e}")))?;
        std::fs::write(&rooms_path, &game.rooms)?;
        std::fs::write(&json_path, json)?;
        tracing::info!("Saved '{}' to slot {} ({})", name, slot, json_path.display());

        Ok(SlotInfo {
            slot,
            name: file.name,
            saved_at: file.saved_at,
            room: game.register.room,
        })
    }

    fn read_slot_file(&self, slot: usize) -> Result<SlotFile> {
        let (json_path, _) = self.paths(slot)?;
        let json = std::fs::read_to_string(&json_path)
            .map_err(|e| SceneError::from_read(e, format!("save slot {slot}")))?;
        let file: SlotFile = serde_json::from_str(&json).map_err(|e| SceneError::SaveCorruption(e.to_string()))?;
        if file.register.version != SAVE_FORMAT_VERSION {
            return Err(SceneError::SaveCorruption(format!(
                "slot {slot} has format version {}",
                file.register.version
            )));
        }
        Ok(file)
    }

    pub fn load(&self, slot: usize) -> Result<SaveGame> {
        let file = self.read_slot_file(slot)?;
        let (_, rooms_path) = self.paths(slot)?;
        let rooms = std::fs::read(&rooms_path)
            .map_err(|e| SceneError::from_read(e, format!("room image of slot {slot}")))?;
        let game = SaveGame {
            register: file.register,
            rooms,
        };
        game.validate()?;
        tracing::info!("Loaded '{}' from slot {}", file.name, slot);
        Ok(game)
    }

    /// One entry per slot; empty and unreadable slots are `None`
    pub fn list(&self) -> Vec<Option<SlotInfo>> {
        (0..SAVE_SLOTS)
            .map(|slot| match self.read_slot_file(slot) {
                Ok(file) => Some(SlotInfo {
                    slot,
                    name: file.name,
                    saved_at: file.saved_at,
                    room: file.register.room,
                }),
                Err(SceneError::Resource(_)) => None,
                Err(e) => {
                    tracing::warn!("Save slot {} unreadable: {}", slot, e);
                    None
                }
            })
            .collect()
    }

    pub fn delete(&self, slot: usize) -> Result<()> {
        let (json_path, rooms_path) = self.paths(slot)?;
        for path in [json_path, rooms_path] {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        tracing::debug!("Deleted save slot {}", slot);
        Ok(())
    }
}
