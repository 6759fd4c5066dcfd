//! Random-access store of room records
//!
//! Only one room is materialised at a time. Changes to it live in memory
//! until `save_room` writes them back; nothing is flushed automatically.

use std::fs::OpenOptions;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::codec::{read_room, write_room, ROOM_RECORD_SIZE};
use super::RoomRecord;
use crate::error::{Result, SceneError};

/// Backing store for the registry: a file or an in-memory buffer
pub trait RoomStore: Read + Write + Seek {}

impl<T: Read + Write + Seek> RoomStore for T {}

pub struct RoomRegistry {
    store: Box<dyn RoomStore>,
    len: u64,
}

impl RoomRegistry {
    /// Open a room file for reading and write-back
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| SceneError::from_read(e, format!("room file {}", path.display())))?;
        tracing::info!("Opened room registry {}", path.display());
        Self::from_store(Box::new(file))
    }

    /// Registry over an in-memory copy of a room file
    pub fn in_memory(bytes: Vec<u8>) -> Self {
        let len = bytes.len() as u64;
        Self {
            store: Box::new(Cursor::new(bytes)),
            len,
        }
    }

    pub fn from_store(mut store: Box<dyn RoomStore>) -> Result<Self> {
        let len = store.seek(SeekFrom::End(0))?;
        Ok(Self { store, len })
    }

    /// Number of complete records in the store
    pub fn room_count(&self) -> u16 {
        (self.len / ROOM_RECORD_SIZE as u64).min(u16::MAX as u64) as u16
    }

    fn offset(code: u16) -> u64 {
        code as u64 * ROOM_RECORD_SIZE as u64
    }

    pub fn load_room(&mut self, code: u16) -> Result<RoomRecord> {
        let offset = Self::offset(code);
        if offset + ROOM_RECORD_SIZE as u64 > self.len {
            return Err(SceneError::Resource(format!(
                "room {code} lies beyond the end of the room file ({} bytes)",
                self.len
            )));
        }
        self.store.seek(SeekFrom::Start(offset))?;
        let room = read_room(&mut self.store).map_err(|e| SceneError::from_read(e, format!("room {code}")))?;
        if room.code != code {
            tracing::warn!("Room slot {} carries code {}", code, room.code);
        }
        tracing::debug!(room = code, "room loaded");
        Ok(room)
    }

    /// Write a room back to its slot, growing the store if needed
    pub fn save_room(&mut self, room: &RoomRecord) -> Result<()> {
        let offset = Self::offset(room.code);
        self.store.seek(SeekFrom::Start(offset))?;
        write_room(&mut self.store, room)?;
        self.store.flush()?;
        self.len = self.len.max(offset + ROOM_RECORD_SIZE as u64);
        tracing::debug!(room = room.code, "room saved");
        Ok(())
    }

    /// Mutate another room while `current` stays the resident one.
    ///
    /// Sequence: save current, load other, run `f`, save other, reload current.
    /// The current room is reloaded even when `f` fails; the other room is
    /// only written back when `f` succeeds.
    pub fn peek_room<T>(
        &mut self,
        current: &mut RoomRecord,
        other: u16,
        f: impl FnOnce(&mut RoomRecord) -> Result<T>,
    ) -> Result<T> {
        self.save_room(current)?;
        let code = current.code;

        let outcome = self.load_room(other).and_then(|mut room| {
            let value = f(&mut room)?;
            self.save_room(&room)?;
            Ok(value)
        });

        *current = self.load_room(code)?;
        if let Err(ref e) = outcome {
            tracing::warn!("Swap into room {} abandoned: {}", other, e);
        }
        outcome
    }

    /// Entire store contents, for save games and tests
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.len as usize);
        self.store.seek(SeekFrom::Start(0))?;
        (&mut self.store).take(self.len).read_to_end(&mut out)?;
        Ok(out)
    }

    /// Overwrite the whole store with a saved room image of the same size
    pub fn restore_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() as u64 != self.len {
            return Err(SceneError::SaveCorruption(format!(
                "room image is {} bytes, room file is {}",
                bytes.len(),
                self.len
            )));
        }
        self.store.seek(SeekFrom::Start(0))?;
        self.store.write_all(bytes)?;
        self.store.flush()?;
        tracing::debug!(rooms = self.room_count(), "room file restored from save");
        Ok(())
    }
}
