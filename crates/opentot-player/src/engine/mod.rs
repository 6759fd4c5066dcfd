//! Game engine: minifb window, input and the free-roaming loop
//!
//! The scene is palette-indexed; the window shows a 320×200 frame (action
//! area on top, an empty bar below) scaled up with nearest-neighbour sampling.

use std::time::{Duration, Instant};

use anyhow::Result;
use minifb::{Key, MouseButton, MouseMode, Window, WindowOptions};
use opentot_common::WindowConfig;
use opentot_scene::motion::{Speaker, TalkMode};
use opentot_scene::room::DoorState;
use opentot_scene::save::SaveSlots;
use opentot_scene::{
    Bitmap, GameSession, Host, InputSnapshot, PickOutcome, Point, Rect, SceneError, SoundCue, ToggleOutcome,
    SCENE_HEIGHT, SCENE_WIDTH,
};

use crate::assets::palette::Palette;
use crate::assets::AssetStore;

pub const SCREEN_WIDTH: usize = 320;
pub const SCREEN_HEIGHT: usize = 200;
const WINDOW_TITLE: &str = "OpenTot";
/// Save slot used by the F5/F9 quick save keys
const QUICK_SLOT: usize = 0;

/// Copy the dirty rectangles of `frame` into the indexed screen buffer
fn blit_dirty(screen: &mut [u8], frame: &Bitmap, dirty: &[Rect]) {
    let clip = Rect::new(0, 0, SCENE_WIDTH as i32, SCENE_HEIGHT as i32)
        .intersection(&frame.bounds());
    for rect in dirty {
        let r = rect.intersection(&clip);
        if r.is_empty() {
            continue;
        }
        let w = r.w as usize;
        for y in r.y..r.bottom() {
            let src = y as usize * frame.width() + r.x as usize;
            let dst = y as usize * SCREEN_WIDTH + r.x as usize;
            screen[dst..dst + w].copy_from_slice(&frame.pixels()[src..src + w]);
        }
    }
}

/// Resolve the indexed 320×200 buffer through the palette and scale it to
/// any target size using nearest-neighbour sampling
fn scale_to_size(src: &[u8], palette: &Palette, dst: &mut [u32], dst_w: usize, dst_h: usize) {
    for dy in 0..dst_h {
        let sy = (dy * SCREEN_HEIGHT) / dst_h;
        let src_row = sy * SCREEN_WIDTH;
        let dst_row = dy * dst_w;
        for dx in 0..dst_w {
            let sx = (dx * SCREEN_WIDTH) / dst_w;
            dst[dst_row + dx] = palette.argb(src[src_row + sx]);
        }
    }
}

/// Window coordinates → logical 320×200
fn to_logical(mouse: (f32, f32), out_w: usize, out_h: usize) -> Point {
    let x = (mouse.0.max(0.0) as usize * SCREEN_WIDTH / out_w.max(1)) as i32;
    let y = (mouse.1.max(0.0) as usize * SCREEN_HEIGHT / out_h.max(1)) as i32;
    Point::new(x.clamp(0, SCREEN_WIDTH as i32 - 1), y.clamp(0, SCREEN_HEIGHT as i32 - 1))
}

/// `Host` backed by a minifb window
pub struct MinifbHost {
    window: Window,
    palette: Palette,
    room_palette: Palette,
    screen: Vec<u8>,
    scaled: Vec<u32>,
    out_w: usize,
    out_h: usize,
    start: Instant,
    prev_mouse_down: bool,
    prev_right_down: bool,
    right_clicked: bool,
    keys: Vec<Key>,
}

impl MinifbHost {
    pub fn new(config: &WindowConfig, palette: Palette) -> Result<Self> {
        let scale = config.scale.max(1) as usize;
        let (win_w, win_h) = (SCREEN_WIDTH * scale, SCREEN_HEIGHT * scale);
        let options = WindowOptions {
            resize: true,
            scale_mode: minifb::ScaleMode::AspectRatioStretch,
            ..Default::default()
        };
        let mut window = Window::new(WINDOW_TITLE, win_w, win_h, options)
            .map_err(|e| anyhow::anyhow!("Window creation failed: {}", e))?;
        window.set_target_fps(config.fps);

        Ok(Self {
            window,
            room_palette: palette.clone(),
            palette,
            screen: vec![0u8; SCREEN_WIDTH * SCREEN_HEIGHT],
            scaled: vec![0u32; win_w * win_h],
            out_w: win_w,
            out_h: win_h,
            start: Instant::now(),
            prev_mouse_down: false,
            prev_right_down: false,
            right_clicked: false,
            keys: Vec::new(),
        })
    }

    /// Keys pressed since the last call
    pub fn take_keys(&mut self) -> Vec<Key> {
        std::mem::take(&mut self.keys)
    }

    pub fn take_right_click(&mut self) -> bool {
        std::mem::take(&mut self.right_clicked)
    }

    fn redraw(&mut self) -> Result<()> {
        // Track window size changes
        let (actual_w, actual_h) = self.window.get_size();
        if actual_w > 0 && actual_h > 0 && (actual_w != self.out_w || actual_h != self.out_h) {
            self.out_w = actual_w;
            self.out_h = actual_h;
            self.scaled.resize(self.out_w * self.out_h, 0);
        }
        scale_to_size(&self.screen, &self.palette, &mut self.scaled, self.out_w, self.out_h);
        self.window
            .update_with_buffer(&self.scaled, self.out_w, self.out_h)
            .map_err(|e| anyhow::anyhow!("Display error: {}", e))
    }
}

impl Host for MinifbHost {
    fn present(&mut self, frame: &Bitmap, dirty: &[Rect]) -> opentot_scene::Result<()> {
        blit_dirty(&mut self.screen, frame, dirty);
        Ok(())
    }

    fn poll_input(&mut self) -> InputSnapshot {
        let mouse = self.window.get_mouse_pos(MouseMode::Clamp).unwrap_or((0.0, 0.0));
        let mouse_down = self.window.get_mouse_down(MouseButton::Left);
        let right_down = self.window.get_mouse_down(MouseButton::Right);
        let keys = self.window.get_keys_pressed(minifb::KeyRepeat::No);

        let clicked = mouse_down && !self.prev_mouse_down;
        self.prev_mouse_down = mouse_down;
        self.right_clicked |= right_down && !self.prev_right_down;
        self.prev_right_down = right_down;

        let snapshot = InputSnapshot {
            pointer: to_logical(mouse, self.out_w, self.out_h),
            clicked,
            key_pressed: !keys.is_empty(),
            quit: !self.window.is_open() || keys.contains(&Key::Escape),
        };
        self.keys.extend(keys);
        snapshot
    }

    fn wait_frame(&mut self) -> Duration {
        // update_with_buffer sleeps to the target fps and pumps window events
        if let Err(e) = self.redraw() {
            tracing::warn!("{}", e);
        }
        self.start.elapsed()
    }

    fn play_sound(&mut self, cue: &SoundCue) {
        tracing::debug!(name = %cue.name, offset = cue.offset, len = cue.len, "sound cue (no audio output)");
    }

    fn stop_sound(&mut self) {
        tracing::debug!("sound stopped");
    }

    fn show_caption(&mut self, text: Option<&str>) {
        match text {
            Some(text) => self.window.set_title(&format!("{} - {}", WINDOW_TITLE, text)),
            None => self.window.set_title(WINDOW_TITLE),
        }
    }

    fn advance_palette(&mut self) {
        self.palette.rotate();
    }

    fn tv_static_palette(&mut self) {
        self.palette = self.room_palette.clone();
        self.palette.tv_static();
    }
}

// ─── Game loop ───────────────────────────────────────────────────────────

/// Whether a scene error only refuses the action at hand
fn is_refusal(e: &SceneError) -> bool {
    e.is_walk_refusal() || matches!(e, SceneError::InventoryFull | SceneError::NoFreeLayerSlot(_))
}

/// Swallow refusals, propagate faults
fn refuse_quietly(result: opentot_scene::Result<()>) -> Result<()> {
    match result {
        Err(e) if is_refusal(&e) => {
            tracing::debug!("Action refused: {}", e);
            Ok(())
        }
        other => Ok(other?),
    }
}

/// Left click in the action area: doors, then objects, then plain walking
fn on_click(session: &mut GameSession<AssetStore>, host: &mut MinifbHost, click: Point) -> Result<()> {
    let from = session.current_zone();
    let to = session.zone_at_click(click);

    if let Some(door) = session.room().door_for_zone(to).copied() {
        if door.state == DoorState::Open {
            refuse_quietly(session.go_to_object(host, from, to, click))?;
            tracing::info!(from = session.room().code, to = door.target_room, "Walking through door");
            session.load_screen_data(door.target_room)?;
            let facing = session.player().facing;
            session.place_player(door.exit, facing);
            session.assemble_screen();
            session.present(host)?;
            return Ok(());
        }
    }

    match session.pick_screen_object(host, click) {
        Ok(PickOutcome::Nothing) => refuse_quietly(session.begin_walk(from, to, click).map(|_| ())),
        Ok(PickOutcome::Picked { slot, .. }) => {
            let name = session.inventory.slots().get(slot).map(|i| i.name.clone()).unwrap_or_default();
            session.say_line(host, &name, TalkMode::Conversation(Speaker::Player))?;
            Ok(())
        }
        Ok(PickOutcome::Refused { text }) => {
            tracing::debug!(?text, "Object cannot be picked up");
            Ok(())
        }
        Err(e) => refuse_quietly(Err(e)),
    }
}

/// Right click: open the object under the pointer, or close it if it won't open
fn on_right_click(session: &mut GameSession<AssetStore>, host: &mut MinifbHost, click: Point) -> Result<()> {
    let outcome = match session.open_screen_object(host, click) {
        Ok(ToggleOutcome::Refused) => session.close_screen_object(host, click),
        other => other,
    };
    match outcome {
        Ok(outcome) => {
            tracing::debug!(?outcome, "Toggled object");
            Ok(())
        }
        Err(e) => refuse_quietly(Err(e)),
    }
}

fn quick_save(session: &mut GameSession<AssetStore>, slots: &SaveSlots) -> Result<()> {
    let game = session.save_game_to_register()?;
    let info = slots.save(QUICK_SLOT, "Partida rápida", &game)?;
    tracing::info!("Saved slot {} at {}", QUICK_SLOT, info.saved_at);
    Ok(())
}

fn quick_load(session: &mut GameSession<AssetStore>, host: &mut MinifbHost, slots: &SaveSlots) -> Result<()> {
    let game = slots.load(QUICK_SLOT)?;
    session.load_game(host, game)?;
    Ok(())
}

pub fn run(mut session: GameSession<AssetStore>, mut host: MinifbHost, slots: SaveSlots) -> Result<()> {
    tracing::info!("Engine initialized, entering game loop");
    tracing::info!("Controls: left click=walk/pick | right click=open/close | F5=save | F9=load | Esc=quit");

    session.assemble_screen();
    session.present(&mut host)?;

    loop {
        let input = session.idle_tick(&mut host)?;
        if input.quit {
            break;
        }

        for key in host.take_keys() {
            let result = match key {
                Key::F5 => quick_save(&mut session, &slots),
                Key::F9 => quick_load(&mut session, &mut host, &slots),
                _ => Ok(()),
            };
            // A failed save or load leaves the running game as it was
            if let Err(e) = result {
                tracing::warn!("{:#}", e);
            }
        }

        let in_scene = input.pointer.y < SCENE_HEIGHT as i32;
        if input.clicked && in_scene {
            on_click(&mut session, &mut host, input.pointer)?;
        }
        if host.take_right_click() && in_scene {
            on_right_click(&mut session, &mut host, input.pointer)?;
        }
    }

    let game = session.save_game_to_register()?;
    tracing::info!("Leaving in room {}", game.register.room);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirty_rects_are_clipped_to_the_action_area() {
        let mut screen = vec![0u8; SCREEN_WIDTH * SCREEN_HEIGHT];
        let frame = Bitmap::filled(SCENE_WIDTH, SCENE_HEIGHT, 7);
        blit_dirty(&mut screen, &frame, &[Rect::new(310, 130, 40, 40), Rect::new(0, 0, 2, 1)]);

        assert_eq!(screen[139 * SCREEN_WIDTH + 319], 7);
        assert_eq!(screen[130 * SCREEN_WIDTH + 309], 0);
        assert_eq!(screen[140 * SCREEN_WIDTH + 319], 0);
        assert_eq!(&screen[..3], &[7, 7, 0]);
    }

    #[test]
    fn test_scaling_repeats_pixels() {
        let mut screen = vec![0u8; SCREEN_WIDTH * SCREEN_HEIGHT];
        screen[0] = 255;
        screen[1] = 128;
        let mut out = vec![0u32; SCREEN_WIDTH * 2 * SCREEN_HEIGHT * 2];
        scale_to_size(&screen, &Palette::greyscale(), &mut out, SCREEN_WIDTH * 2, SCREEN_HEIGHT * 2);

        let row = SCREEN_WIDTH * 2;
        assert_eq!(&out[..4], &[0x00FF_FFFF, 0x00FF_FFFF, 0x0080_8080, 0x0080_8080]);
        assert_eq!(out[row + 1], 0x00FF_FFFF);
        assert_eq!(out[2 * row], 0);
    }

    #[test]
    fn test_mouse_maps_to_logical_pixels() {
        assert_eq!(to_logical((30.0, 60.0), 960, 600), Point::new(10, 20));
        assert_eq!(to_logical((5000.0, -3.0), 960, 600), Point::new(319, 0));
        assert_eq!(to_logical((10.0, 10.0), 0, 0), Point::new(319, 199));
    }

    #[test]
    fn test_refusals_are_not_faults() {
        assert!(refuse_quietly(Err(SceneError::InventoryFull)).is_ok());
        assert!(refuse_quietly(Err(SceneError::InvalidZone { room: 1, from: 2, to: 3 })).is_ok());
        assert!(refuse_quietly(Err(SceneError::Resource("FONDOS.DAT".into()))).is_err());
    }
}
