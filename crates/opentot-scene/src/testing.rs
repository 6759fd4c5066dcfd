//! Fixtures shared by the unit tests

use std::collections::VecDeque;
use std::time::Duration;

use crate::bitmap::{AnimationBank, Bitmap, Point, Rect};
use crate::error::Result;
use crate::host::{Host, InputSnapshot, ResourceLoader, SoundCue};
use crate::items::ItemRegister;
use crate::room::{
    Door, DoorState, GridPatch, ObjectIndexEntry, RoomRecord, RoomRegistry, ScreenLayer, ROOM_RECORD_SIZE,
};
use crate::{GRID_COLS, GRID_ROWS, WALK_FRAME_COUNT};

/// A room with one door, one overlay, one object and two floor zones
pub fn sample_room(code: u16) -> RoomRecord {
    let mut room = RoomRecord::new(code);
    room.image_ref = code as u32 * 100;
    room.image_size = 320;
    room.doors[0] = Door {
        target_room: code + 1,
        exit: Point::new(40, 80),
        state: DoorState::Open,
        zone: 27,
    };
    room.layers[0] = ScreenLayer {
        bitmap_ref: 1000 + code as i32,
        bitmap_size: 64,
        position: Point::new(100, 50),
        depth: 3,
    };
    room.objects[1] = ObjectIndexEntry {
        file_index: 10,
        name: "LLAVE".into(),
    };
    for col in 0..GRID_COLS {
        for row in 10..GRID_ROWS {
            room.walk.set(col, row, if col < 20 { 3 } else { 5 });
        }
    }
    for col in 10..=12 {
        for row in 12..=14 {
            room.mouse.set(col, row, 1);
        }
    }
    room
}

/// In-memory registry holding the given rooms at their codes
pub fn registry_with(rooms: &[RoomRecord]) -> RoomRegistry {
    let slots = rooms.iter().map(|r| r.code as usize + 1).max().unwrap_or(0);
    let mut registry = RoomRegistry::in_memory(vec![0; slots * ROOM_RECORD_SIZE]);
    for room in rooms {
        registry.save_room(room).unwrap();
    }
    registry
}

/// A pickable item whose patch covers `sample_room`'s mouse object
pub fn sample_item(code: u16) -> ItemRegister {
    let mut patch = GridPatch {
        x1: 10,
        y1: 12,
        x2: 12,
        y2: 14,
        ..Default::default()
    };
    for col in patch.walk.iter_mut().take(3) {
        for cell in col.iter_mut().take(3) {
            *cell = 3;
        }
    }
    let mut item = ItemRegister {
        code,
        name: format!("OBJETO {code}"),
        pickable: true,
        depth: 3,
        bitmap_ref: 5000 + code as u32,
        bitmap_size: 64,
        icon: code,
        patch,
        ..Default::default()
    };
    item.texts.pick = 100 + code;
    item
}

/// Four directions of `WALK_FRAME_COUNT` solid frames
pub fn walk_bank(colour: u8) -> AnimationBank {
    let frames = vec![Bitmap::filled(10, 20, colour); WALK_FRAME_COUNT];
    AnimationBank::new(vec![frames; 4])
}

// ----------------------------------------------------------------------------
// Host and loader doubles
// ----------------------------------------------------------------------------

/// Scripted host: inputs are replayed in order, then `idle_input` forever
pub struct MockHost {
    pub inputs: VecDeque<InputSnapshot>,
    pub idle_input: InputSnapshot,
    now: Duration,
    step: Duration,
    pub presents: usize,
    pub last_dirty: Vec<Rect>,
    pub last_frame: Option<Bitmap>,
    pub sounds: Vec<SoundCue>,
    pub stops: usize,
    pub captions: Vec<Option<String>>,
    pub palette_steps: usize,
    pub tv_palette: usize,
}

impl Default for MockHost {
    fn default() -> Self {
        Self {
            inputs: VecDeque::new(),
            idle_input: InputSnapshot::default(),
            now: Duration::ZERO,
            step: Duration::from_millis(20),
            presents: 0,
            last_dirty: Vec::new(),
            last_frame: None,
            sounds: Vec::new(),
            stops: 0,
            captions: Vec::new(),
            palette_steps: 0,
            tv_palette: 0,
        }
    }
}

impl MockHost {
    pub fn with_inputs(inputs: impl IntoIterator<Item = InputSnapshot>) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl Host for MockHost {
    fn present(&mut self, frame: &Bitmap, dirty: &[Rect]) -> Result<()> {
        self.presents += 1;
        self.last_dirty = dirty.to_vec();
        self.last_frame = Some(frame.clone());
        Ok(())
    }

    fn poll_input(&mut self) -> InputSnapshot {
        self.inputs.pop_front().unwrap_or(self.idle_input)
    }

    fn wait_frame(&mut self) -> Duration {
        self.now += self.step;
        self.now
    }

    fn play_sound(&mut self, cue: &SoundCue) {
        self.sounds.push(cue.clone());
    }

    fn stop_sound(&mut self) {
        self.stops += 1;
    }

    fn show_caption(&mut self, text: Option<&str>) {
        self.captions.push(text.map(str::to_string));
    }

    fn advance_palette(&mut self) {
        self.palette_steps += 1;
    }

    fn tv_static_palette(&mut self) {
        self.tv_palette += 1;
    }
}

/// Backgrounds filled with `code % 200 + 1`, overlays 8×8 of colour 50
#[derive(Default)]
pub struct MockLoader {
    pub requested_layers: Vec<i32>,
    pub requested_animations: Vec<String>,
}

impl ResourceLoader for MockLoader {
    fn room_background(&mut self, room: &RoomRecord) -> Result<Bitmap> {
        Ok(Bitmap::filled(320, 140, (room.code % 200) as u8 + 1))
    }

    fn layer_bitmap(&mut self, layer: &ScreenLayer) -> Result<Bitmap> {
        self.requested_layers.push(layer.bitmap_ref);
        Ok(Bitmap::filled(8, 8, 50))
    }

    fn secondary_animation(&mut self, name: &str) -> Result<AnimationBank> {
        self.requested_animations.push(name.to_string());
        Ok(walk_bank(220))
    }

    fn player_animation(&mut self) -> Result<AnimationBank> {
        Ok(walk_bank(240))
    }

    fn object_name(&mut self, index: u16) -> Result<String> {
        Ok(format!("NOMBRE {index}"))
    }
}
