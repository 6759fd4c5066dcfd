//! Error taxonomy for the scene engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
    /// A backing file is missing or shorter than the record being read
    #[error("Resource unavailable: {0}")]
    Resource(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Save payload could not be decoded or carries the wrong version
    #[error("Corrupt save game: {0}")]
    SaveCorruption(String),

    /// Zone pair outside the room's route table; the walk is refused
    #[error("Invalid zone pair {from} -> {to} in room {room}")]
    InvalidZone { room: u16, from: u8, to: u8 },

    #[error("Trajectory of {len} points exceeds capacity {capacity}")]
    TrajectoryOverflow { len: usize, capacity: usize },

    #[error("No free overlay slot in room {0}")]
    NoFreeLayerSlot(u16),

    #[error("Inventory is full")]
    InventoryFull,

    #[error("Unknown item code {0}")]
    UnknownItem(u16),
}

impl SceneError {
    /// Turn a short read into a `Resource` error naming what was being read
    pub fn from_read(err: std::io::Error, what: impl Into<String>) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            SceneError::Resource(format!("{} is truncated", what.into()))
        } else if err.kind() == std::io::ErrorKind::NotFound {
            SceneError::Resource(format!("{} not found", what.into()))
        } else {
            SceneError::Io(err)
        }
    }

    /// Whether the caller should treat this as a refused walk rather than a fault
    pub fn is_walk_refusal(&self) -> bool {
        matches!(
            self,
            SceneError::InvalidZone { .. } | SceneError::TrajectoryOverflow { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SceneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_read_becomes_resource_error() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err = SceneError::from_read(io, "room 7");
        assert!(matches!(err, SceneError::Resource(ref m) if m == "room 7 is truncated"));
    }

    #[test]
    fn other_io_errors_pass_through() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(SceneError::from_read(io, "x"), SceneError::Io(_)));
    }

    #[test]
    fn walk_refusals() {
        assert!(SceneError::InvalidZone { room: 1, from: 0, to: 3 }.is_walk_refusal());
        assert!(!SceneError::InventoryFull.is_walk_refusal());
    }
}
