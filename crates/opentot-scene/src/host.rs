//! Seams to the platform shell
//!
//! The engine never opens windows, reads asset archives or plays audio
//! itself. `Host` is the window/input/timer/audio side, `ResourceLoader`
//! turns the references stored in room and item records into bitmaps.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bitmap::{AnimationBank, Bitmap, Point, Rect};
use crate::error::Result;
use crate::room::{RoomRecord, ScreenLayer};

/// A slice of a sound resource, played fire-and-forget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundCue {
    pub name: String,
    pub offset: u32,
    pub len: u32,
}

impl SoundCue {
    pub fn new(name: impl Into<String>, offset: u32, len: u32) -> Self {
        Self {
            name: name.into(),
            offset,
            len,
        }
    }
}

/// Input state polled once per loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputSnapshot {
    /// Pointer position in scene pixels
    pub pointer: Point,
    /// Left button went down since the last poll
    pub clicked: bool,
    pub key_pressed: bool,
    /// Window closed or quit requested
    pub quit: bool,
}

impl InputSnapshot {
    /// Any input that cancels a dialogue line or a scroll
    pub fn wants_skip(&self) -> bool {
        self.clicked || self.key_pressed || self.quit
    }
}

pub trait Host {
    /// Show the visible frame; `dirty` lists the rectangles changed since
    /// the previous call (a full-scene rect after a reassembly)
    fn present(&mut self, frame: &Bitmap, dirty: &[Rect]) -> Result<()>;

    fn poll_input(&mut self) -> InputSnapshot;

    /// Yield until the next frame slot; returns monotonic time since start
    fn wait_frame(&mut self) -> Duration;

    fn play_sound(&mut self, cue: &SoundCue);

    fn stop_sound(&mut self);

    /// Caption line under the action area (dialogue text, object names)
    fn show_caption(&mut self, _text: Option<&str>) {}

    /// Step the room's palette animation by one phase
    fn advance_palette(&mut self) {}

    /// Switch to the static-noise palette of a switched-on TV
    fn tv_static_palette(&mut self) {}
}

pub trait ResourceLoader {
    fn room_background(&mut self, room: &RoomRecord) -> Result<Bitmap>;

    fn layer_bitmap(&mut self, layer: &ScreenLayer) -> Result<Bitmap>;

    /// Frames of a secondary actor animation, grouped by direction
    fn secondary_animation(&mut self, name: &str) -> Result<AnimationBank>;

    /// The player's walk cycle: four directions of `WALK_FRAME_COUNT` frames
    fn player_animation(&mut self) -> Result<AnimationBank>;

    /// Object name table entry, for names swapped in by puzzle state
    fn object_name(&mut self, index: u16) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_button_or_key_skips() {
        let mut input = InputSnapshot::default();
        assert!(!input.wants_skip());
        input.key_pressed = true;
        assert!(input.wants_skip());
        let quit = InputSnapshot { quit: true, ..Default::default() };
        assert!(quit.wants_skip());
    }
}
