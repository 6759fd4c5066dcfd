//! `GameSession`, the one context object the content layer talks to
//!
//! Architecture:
//!   - owns the room registry, the single resident room and its profile,
//!     the compositor, the motion scheduler, the clock and the player's
//!     inventory and flags
//!   - blocking sequences (walking to an object, a spoken line, a scroll)
//!     are plain loops over `Host`: poll, feed the clock, tick, present.
//!     Each one returns at the next step boundary when the host asks to skip
//!   - leaving a room always detaches the secondary actor first, so the
//!     record written back never carries in-memory offsets or footprints

use crate::bitmap::{AnimationBank, Bitmap, Point};
use crate::clock::Chrono;
use crate::compositor::{compose_scene, scene_rect, ActorSprite, SpriteCompositor};
use crate::error::{Result, SceneError};
use crate::host::{Host, InputSnapshot, ResourceLoader};
use crate::inventory::{Inventory, InventoryItem};
use crate::items::ItemCatalog;
use crate::motion::{MotionScheduler, MotionState, PlayerMotion, TalkMode, TickContext};
use crate::path::{self, Facing, MainRoute, Trajectory};
use crate::room::{GridPatch, RoomProfile, RoomRecord, RoomRegistry, ScreenLayer};
use crate::save::{SaveGame, SaveGameRegister, SoundVolumes, ZoneState, SAVE_FORMAT_VERSION};
use crate::scroll::{ScrollDirection, ScrollTransition};
use crate::secondary::SecondaryActor;
use crate::state::{derive_presentation, Presentation, PuzzleState, SecondaryOverride, StoryFlags};
use crate::{CHARACTER_CORRECTION_X, CHARACTER_CORRECTION_Y, CURSOR_HOTSPOT, FIRST_EXIT_ZONE};

/// Result of trying to pick up whatever is under the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickOutcome {
    /// No object under the pointer
    Nothing,
    /// The object stays; `text` is its refusal line, if any
    Refused { text: Option<u16> },
    Picked { slot: usize, text: Option<u16> },
}

/// Result of opening or closing a screen object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Nothing,
    Refused,
    Changed,
}

/// Game ticks skipped between two palette steps
const PALETTE_SKIPS: u8 = 4;
/// Palette animation phases run 0..=LAST_PALETTE_PHASE
const LAST_PALETTE_PHASE: u8 = 7;
/// The cave drips in step with its palette
const DRIP_ROOM: u16 = 4;
const DRIP_PHASE: u8 = 4;

fn text_ref(id: u16) -> Option<u16> {
    (id > 0).then_some(id)
}

/// Pointer position to the scene pixel it designates
fn click_point(click: Point) -> Point {
    click.offset(CURSOR_HOTSPOT, CURSOR_HOTSPOT)
}

pub struct GameSession<L: ResourceLoader> {
    loader: L,
    registry: RoomRegistry,
    items: ItemCatalog,
    room: RoomRecord,
    /// False until a room is entered, and after a save game discarded it
    resident: bool,
    profile: RoomProfile,
    compositor: SpriteCompositor,
    motion: MotionScheduler,
    player_bank: AnimationBank,
    chrono: Chrono,
    palette_skips: u8,
    palette_phase: u8,

    pub inventory: Inventory,
    pub inventory_position: usize,
    pub puzzle: PuzzleState,
    pub story: StoryFlags,
    pub zones: ZoneState,
    pub volumes: SoundVolumes,
    pub character_name: String,
    pub game_part: u8,
    pub action_code: u16,
    pub door_index: u8,
    /// Set while the player walks out through a door
    pub room_change: bool,
}

impl<L: ResourceLoader> GameSession<L> {
    /// New session with no room entered yet; call `load_screen_data` next
    pub fn new(mut loader: L, registry: RoomRegistry, items: ItemCatalog, chrono: Chrono) -> Result<Self> {
        let player_bank = loader.player_animation()?;
        let room = RoomRecord::new(0);
        let profile = RoomProfile::resolve(&room);
        tracing::info!(
            rooms = registry.room_count(),
            items = items.len(),
            "game session created"
        );
        Ok(Self {
            loader,
            registry,
            items,
            room,
            resident: false,
            profile,
            compositor: SpriteCompositor::new(),
            motion: MotionScheduler::new(PlayerMotion::new(Point::default(), Facing::Down)),
            player_bank,
            chrono,
            palette_skips: 0,
            palette_phase: 0,
            inventory: Inventory::default(),
            inventory_position: 0,
            puzzle: PuzzleState::default(),
            story: StoryFlags::default(),
            zones: ZoneState::default(),
            volumes: SoundVolumes::default(),
            character_name: String::new(),
            game_part: 1,
            action_code: 0,
            door_index: 0,
            room_change: false,
        })
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn room(&self) -> &RoomRecord {
        &self.room
    }

    pub fn profile(&self) -> &RoomProfile {
        &self.profile
    }

    pub fn items(&self) -> &ItemCatalog {
        &self.items
    }

    pub fn screen(&self) -> &Bitmap {
        self.compositor.screen()
    }

    pub fn player(&self) -> &PlayerMotion {
        &self.motion.player
    }

    pub fn secondary(&self) -> Option<&SecondaryActor> {
        self.motion.secondary.as_ref()
    }

    pub fn motion_state(&self) -> MotionState {
        self.motion.state()
    }

    /// Put the player somewhere without walking (room entry, cutscenes)
    pub fn place_player(&mut self, position: Point, facing: Facing) {
        self.motion.player.place(position);
        self.motion.player.facing = facing;
        self.motion.player.frame = 0;
    }

    /// Walk-grid zone under the player's feet
    pub fn current_zone(&self) -> u8 {
        let p = self.motion.player.position;
        self.room
            .zone_at(p.offset(CHARACTER_CORRECTION_X, CHARACTER_CORRECTION_Y))
    }

    /// Walk-grid zone designated by a click
    pub fn zone_at_click(&self, click: Point) -> u8 {
        self.room.zone_at(click_point(click))
    }

    // ─── Loop plumbing ───────────────────────────────────────────────────

    /// Wait for the next frame slot, feed the clock and poll input
    fn pump<H: Host + ?Sized>(&mut self, host: &mut H) -> InputSnapshot {
        let now = host.wait_frame();
        self.chrono.update(now);
        host.poll_input()
    }

    /// Hand the dirty rectangles to the host
    pub fn present<H: Host + ?Sized>(&mut self, host: &mut H) -> Result<()> {
        let dirty = self.compositor.take_dirty();
        if dirty.is_empty() {
            return Ok(());
        }
        host.present(self.compositor.screen(), &dirty)
    }

    /// One iteration of the free-roaming loop. Returns the polled input so
    /// the caller can dispatch clicks.
    pub fn idle_tick<H: Host + ?Sized>(&mut self, host: &mut H) -> Result<InputSnapshot> {
        let input = self.pump(host);
        let barred = self.room.is_barred_zone(self.current_zone());
        if self.advance_animations(barred, input.pointer)? {
            self.palette_tick(host);
        }
        self.present(host)?;
        Ok(input)
    }

    /// Count one game tick towards the room's palette animation. Rooms
    /// without the animation flag never step.
    fn palette_tick<H: Host + ?Sized>(&mut self, host: &mut H) {
        if !self.room.secondary.palette_anim {
            return;
        }
        if self.palette_skips < PALETTE_SKIPS {
            self.palette_skips += 1;
            return;
        }
        self.palette_skips = 0;
        self.palette_phase = if self.palette_phase >= LAST_PALETTE_PHASE {
            0
        } else {
            self.palette_phase + 1
        };
        if self.room.code == DRIP_ROOM && self.palette_phase == DRIP_PHASE {
            if let Some(cue) = &self.profile.ambient_sound {
                host.play_sound(cue);
            }
        }
        host.advance_palette();
    }

    // ─── Rooms ───────────────────────────────────────────────────────────

    /// Write the resident room back, clean of in-memory actor state
    fn leave_room(&mut self) -> Result<()> {
        if !self.resident {
            return Ok(());
        }
        if let Some(actor) = self.motion.secondary.take() {
            actor.detach(&mut self.room, true);
        }
        self.resident = false;
        self.registry.save_room(&self.room)
    }

    /// Load the overlays of the resident room into their depth slots
    fn install_layers(&mut self) -> Result<()> {
        self.compositor.clear_layers();
        for layer in self.room.layers {
            let Some(slot) = layer.depth_slot() else {
                continue;
            };
            let bitmap = self.loader.layer_bitmap(&layer)?;
            self.compositor.set_layer(slot, bitmap, layer.position);
        }
        Ok(())
    }

    fn attach_secondary(&mut self) -> Result<SecondaryActor> {
        let bank = self.loader.secondary_animation(&self.room.secondary.name)?;
        let footprint_item = self.room.secondary.footprint_item();
        let patch = match self.items.get(footprint_item) {
            Ok(item) => item.patch.clone(),
            Err(e) => {
                tracing::warn!("Room {} secondary footprint: {}", self.room.code, e);
                GridPatch::default()
            }
        };
        Ok(SecondaryActor::attach(
            &mut self.room,
            bank,
            &patch,
            self.profile.secondary_depth,
        ))
    }

    /// Make `code` the resident room: record, background, overlays, actor
    /// and puzzle overrides. Nothing is drawn yet.
    fn enter_room(&mut self, code: u16) -> Result<Presentation> {
        self.leave_room()?;
        let room = self.registry.load_room(code)?;
        let background = self.loader.room_background(&room)?;
        self.profile = RoomProfile::resolve(&room);
        self.room = room;
        self.resident = true;
        self.compositor.set_background(&background);
        self.install_layers()?;

        if self.room.secondary.enabled && self.profile.load_secondary_on_entry {
            let mut actor = self.attach_secondary()?;
            actor.place_at_start(&mut self.room, self.profile.secondary_entry_depth);
            self.motion.secondary = Some(actor);
        } else {
            self.room.secondary.enabled = false;
        }

        let presentation = derive_presentation(code, &self.puzzle);
        self.apply_presentation(&presentation)?;
        self.motion.player.update_depth();
        tracing::info!(
            room = code,
            secondary = self.motion.secondary.is_some(),
            "entered room"
        );
        Ok(presentation)
    }

    /// Write puzzle overrides into the resident room
    fn apply_presentation(&mut self, presentation: &Presentation) -> Result<()> {
        for &(slot, name_index) in &presentation.object_names {
            let name = self.loader.object_name(name_index)?;
            if let Some(entry) = self.room.objects.get_mut(slot) {
                entry.name = name;
            }
        }
        if !presentation.layers.is_empty() || !presentation.mouse.is_empty() {
            presentation.apply_layout(&mut self.room);
            self.install_layers()?;
        }
        match presentation.secondary {
            SecondaryOverride::Keep => {}
            SecondaryOverride::Disable => self.disable_secondary_animation(),
            SecondaryOverride::Enable { start, depth } => {
                if let Some(actor) = self.motion.secondary.take() {
                    actor.detach(&mut self.room, true);
                }
                self.room.secondary.enabled = true;
                let mut actor = self.attach_secondary()?;
                if let Some(first) = self.room.secondary.trajectory.first_mut() {
                    *first = start;
                }
                actor.place_at_start(&mut self.room, Some(depth));
                self.motion.secondary = Some(actor);
            }
        }
        Ok(())
    }

    /// Enter a room and draw it in one go
    pub fn load_screen_data(&mut self, code: u16) -> Result<()> {
        self.enter_room(code)?;
        self.assemble_screen();
        Ok(())
    }

    /// Scroll from the resident room into `code`.
    ///
    /// `pivot` is the column of the new room the scroll starts from and
    /// `correction` the door's horizontal landing offset. A skip request
    /// runs the remaining steps unseen; the end state is the same.
    pub fn load_scroll_data<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        code: u16,
        direction: ScrollDirection,
        pivot: i32,
        correction: i32,
    ) -> Result<()> {
        let clean_a = compose_scene(self.compositor.background(), self.compositor.layers(), &[]);
        let visible = self.compositor.screen().clone();
        let start = self.motion.player.position;

        self.enter_room(code)?;
        let destination = compose_scene(self.compositor.background(), self.compositor.layers(), &[]);
        let mut scroll = ScrollTransition::new(
            direction,
            visible,
            &clean_a,
            destination,
            pivot,
            start,
            self.player_bank.frame_size(),
        );

        while !scroll.is_done() {
            let input = self.pump(host);
            if input.wants_skip() {
                tracing::debug!("scroll skipped");
                scroll.finish(&self.player_bank);
                break;
            }
            if self.chrono.take_game_tick() {
                scroll.step(&self.player_bank);
                host.present(scroll.visible(), &[scene_rect()])?;
            }
        }

        let (_, _, walker) = scroll.into_parts();
        self.motion.player.place(walker.position.offset(correction, 0));
        self.motion.player.facing = direction.walk_facing();
        self.motion.player.frame = 0;
        self.assemble_screen();
        self.present(host)
    }

    /// Apply another room's puzzle overrides without leaving this one
    pub fn update_alt_screen(&mut self, other: u16) -> Result<()> {
        let presentation = derive_presentation(other, &self.puzzle);
        let mut names = Vec::with_capacity(presentation.object_names.len());
        for &(slot, name_index) in &presentation.object_names {
            names.push((slot, self.loader.object_name(name_index)?));
        }

        if let Some(actor) = &self.motion.secondary {
            actor.detach(&mut self.room, true);
        }
        let outcome = self.registry.peek_room(&mut self.room, other, |room| {
            for (slot, name) in names {
                if let Some(entry) = room.objects.get_mut(slot) {
                    entry.name = name;
                }
            }
            presentation.apply_layout(room);
            Ok(())
        });
        if let Some(actor) = &self.motion.secondary {
            actor.reattach(&mut self.room, true);
        }
        tracing::debug!(room = self.room.code, other, ok = outcome.is_ok(), "alt screen updated");
        outcome
    }

    /// Remove the secondary actor from the room for good
    pub fn disable_secondary_animation(&mut self) {
        if let Some(actor) = self.motion.secondary.take() {
            actor.detach(&mut self.room, true);
        }
        self.room.secondary.enabled = false;
        self.assemble_screen();
    }

    // ─── Drawing ─────────────────────────────────────────────────────────

    /// Redraw the actors' patches
    pub fn sprites(&mut self, draw_player: bool) {
        let facing = self.motion.player_draw_facing();
        let player = self.motion.player.sprite(&self.player_bank, facing);
        let secondary = self.motion.secondary.as_ref().and_then(SecondaryActor::sprite);
        match player {
            Some(player) => self.compositor.sprites(player, secondary, draw_player),
            None => {
                if let Some(secondary) = secondary {
                    let patch = self.compositor.compose_patch(secondary.patch_rect(), &[secondary]);
                    self.compositor.put_patch(&patch);
                }
            }
        }
    }

    /// Rebuild the whole frame, actors included
    pub fn assemble_screen(&mut self) {
        let facing = self.motion.player_draw_facing();
        let mut actors: Vec<ActorSprite<'_>> = Vec::with_capacity(2);
        if let Some(secondary) = self.motion.secondary.as_ref().and_then(SecondaryActor::sprite) {
            actors.push(secondary);
        }
        if let Some(player) = self.motion.player.sprite(&self.player_bank, facing) {
            actors.push(player);
        }
        self.compositor.assemble_screen(&actors, false);
    }

    // ─── Walking ─────────────────────────────────────────────────────────

    pub fn calculate_route(&self, from: u8, to: u8, click: Point, barred: bool) -> Result<MainRoute> {
        path::calculate_route(
            &self.room,
            from,
            to,
            self.motion.player.position,
            click,
            true,
            barred,
            self.profile.route_extension_zone,
        )
    }

    /// Dense path from the player's position straight to `target`
    pub fn calculate_trajectory(&self, target: Point) -> Result<Trajectory> {
        Trajectory::line(self.motion.player.position, target)
    }

    /// Plan and start a walk. Returns whether the target zone is barred.
    /// A refused route leaves the player standing.
    pub fn begin_walk(&mut self, from: u8, to: u8, click: Point) -> Result<bool> {
        let mut barred = self.room.is_barred_zone(to);
        let (mut to, mut click) = (to, click);
        if let Some(redirect) = self
            .profile
            .redirect_target(to, self.motion.secondary.is_some())
        {
            to = redirect.zone;
            click = redirect.click;
            if let Some(b) = redirect.barred {
                barred = b;
            }
        }
        self.zones.previous_target = self.zones.target;
        self.zones.target = to;

        match self.calculate_route(from, to, click, barred) {
            Ok(route) => {
                self.motion.begin_walk(route);
                Ok(barred)
            }
            Err(e) => {
                tracing::warn!("Walk refused: {}", e);
                self.motion.stop();
                Err(e)
            }
        }
    }

    /// One game tick of actor motion, if the clock has one pending.
    /// Returns whether a tick ran.
    pub fn advance_animations(&mut self, barred: bool, pointer: Point) -> Result<bool> {
        if !self.chrono.take_game_tick() {
            return Ok(false);
        }
        let ctx = TickContext {
            pointer,
            barred,
            room_change: self.room_change,
        };
        let secondary_tick = self.chrono.secondary_tick();
        let moved = self.motion.tick(&mut self.room, &ctx, secondary_tick);
        self.sprites(true);
        moved?;
        self.zones.current = self.current_zone();
        Ok(true)
    }

    /// Walk to the object at `click` and block until the player stands.
    /// Exit zones (10 and up) as the starting zone do nothing.
    pub fn go_to_object<H: Host + ?Sized>(&mut self, host: &mut H, from: u8, to: u8, click: Point) -> Result<()> {
        if from >= FIRST_EXIT_ZONE {
            return Ok(());
        }
        let barred = self.begin_walk(from, to, click)?;
        while self.motion.player.is_walking() {
            let input = self.pump(host);
            if input.quit {
                self.motion.stop();
                break;
            }
            if self.advance_animations(barred, input.pointer)? {
                self.palette_tick(host);
            }
            self.present(host)?;
        }
        self.motion.player.frame = 0;
        self.sprites(true);
        self.present(host)
    }

    // ─── Dialogue ────────────────────────────────────────────────────────

    /// Show a line and cycle talk frames until its time runs out or the
    /// player clicks. `@` is replaced by the character's name. Narration
    /// only ends on a click.
    pub fn say_line<H: Host + ?Sized>(&mut self, host: &mut H, text: &str, mode: TalkMode) -> Result<()> {
        let line = text.replace('@', &self.character_name);
        host.show_caption(Some(&line));
        self.motion.begin_talk(mode, line.chars().count());

        loop {
            let input = self.pump(host);
            if input.wants_skip() {
                break;
            }
            if !self.chrono.take_game_tick() {
                continue;
            }
            let mut finished = false;
            if self.chrono.secondary_tick() {
                finished = self.motion.talk_tick(&self.room);
                let draw_player = self.motion.draws_player();
                self.sprites(draw_player);
            }
            self.palette_tick(host);
            self.present(host)?;
            if finished {
                break;
            }
        }

        self.motion.end_talk();
        host.show_caption(None);
        self.sprites(true);
        self.present(host)
    }

    // ─── Objects ─────────────────────────────────────────────────────────

    /// Object index slot and item code under a click
    fn object_under(&self, click: Point) -> Option<(usize, u16)> {
        let index = self.room.mouse.at(click_point(click)) as usize;
        self.room
            .objects
            .get(index)
            .filter(|o| o.file_index != 0)
            .map(|o| (index, o.file_index))
    }

    /// Walk to the object under `click` and put it in the inventory
    pub fn pick_screen_object<H: Host + ?Sized>(&mut self, host: &mut H, click: Point) -> Result<PickOutcome> {
        let Some((_, code)) = self.object_under(click) else {
            return Ok(PickOutcome::Nothing);
        };
        let item = self.items.get(code)?.clone();
        self.go_to_object(host, self.current_zone(), self.zone_at_click(click), click)?;

        if !item.pickable {
            return Ok(PickOutcome::Refused {
                text: text_ref(item.texts.pick),
            });
        }
        let slot = self.inventory.add(InventoryItem::from(&item))?;
        if let Some(depth_slot) = (item.depth as usize).checked_sub(1) {
            self.compositor.clear_layer(depth_slot);
        }
        self.room.clear_layers_showing(item.bitmap_ref as i32);
        self.room.splice_grid_patch(&item.patch);
        self.assemble_screen();
        self.present(host)?;
        tracing::info!(code, slot, room = self.room.code, "picked up {}", item.name);
        Ok(PickOutcome::Picked {
            slot,
            text: text_ref(item.texts.pick),
        })
    }

    pub fn open_screen_object<H: Host + ?Sized>(&mut self, host: &mut H, click: Point) -> Result<ToggleOutcome> {
        self.toggle_screen_object(host, click, true)
    }

    pub fn close_screen_object<H: Host + ?Sized>(&mut self, host: &mut H, click: Point) -> Result<ToggleOutcome> {
        self.toggle_screen_object(host, click, false)
    }

    /// Opening and closing both swap the object for its replacement, splice
    /// the replacement's grids and swap the overlay for the drop overlay
    fn toggle_screen_object<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        click: Point,
        opening: bool,
    ) -> Result<ToggleOutcome> {
        let Some((index, code)) = self.object_under(click) else {
            return Ok(ToggleOutcome::Nothing);
        };
        let item = self.items.get(code)?.clone();
        self.go_to_object(host, self.current_zone(), self.zone_at_click(click), click)?;

        let allowed = if opening { item.openable } else { item.closeable };
        if !allowed {
            return Ok(ToggleOutcome::Refused);
        }
        self.room.objects[index].file_index = item.replace_with;
        self.room.splice_grid_patch(&item.patch);
        let touched = self.room.replace_layer_bitmap(
            item.bitmap_ref as i32,
            item.drop_overlay_ref as i32,
            item.drop_overlay_size,
        );
        if !touched.is_empty() {
            self.install_layers()?;
        }
        self.assemble_screen();
        self.present(host)?;
        tracing::debug!(code, opening, replacement = item.replace_with, "screen object toggled");
        Ok(ToggleOutcome::Changed)
    }

    /// Place an item's overlay and grid patch in the room. Returns the layer
    /// slot used, or `None` for items without an overlay.
    pub fn drop_object_in_screen(&mut self, code: u16) -> Result<Option<usize>> {
        let item = self.items.get(code)?.clone();
        if item.bitmap_size == 0 {
            return Ok(None);
        }
        let slot = self
            .room
            .free_layer_slot()
            .ok_or(SceneError::NoFreeLayerSlot(self.room.code))?;
        let layer = ScreenLayer {
            bitmap_ref: item.bitmap_ref as i32,
            bitmap_size: item.bitmap_size,
            position: item.drop_position,
            depth: item.depth as u16,
        };
        self.room.layers[slot] = layer;
        if let Some(depth_slot) = layer.depth_slot() {
            let bitmap = self.loader.layer_bitmap(&layer)?;
            self.compositor.set_layer(depth_slot, bitmap, layer.position);
        }
        self.room.splice_grid_patch(&item.patch);
        self.assemble_screen();
        tracing::debug!(code, slot, room = self.room.code, "object dropped");
        Ok(Some(slot))
    }

    // ─── Save games ──────────────────────────────────────────────────────

    /// Snapshot everything needed to resume, including the room file
    pub fn save_game_to_register(&mut self) -> Result<SaveGame> {
        if let Some(actor) = &self.motion.secondary {
            actor.detach(&mut self.room, true);
        }
        let rooms = self
            .registry
            .save_room(&self.room)
            .and_then(|()| self.registry.to_bytes());
        if let Some(actor) = &self.motion.secondary {
            actor.reattach(&mut self.room, true);
        }
        let rooms = rooms?;

        let register = SaveGameRegister {
            version: SAVE_FORMAT_VERSION,
            room: self.room.code,
            player: self.motion.player.clone(),
            secondary: self.motion.secondary.as_ref().map(SecondaryActor::snapshot),
            zones: self.zones,
            volumes: self.volumes,
            inventory: self.inventory.clone(),
            inventory_position: self.inventory_position,
            action_code: self.action_code,
            door_index: self.door_index,
            game_part: self.game_part,
            character_name: self.character_name.clone(),
            puzzle: self.puzzle.clone(),
            story: self.story.clone(),
            item_usage: self.items.usage(),
        };
        tracing::info!(room = register.room, "game saved to register");
        Ok(SaveGame { register, rooms })
    }

    /// Resume a saved game. The resident room is discarded, not written back.
    pub fn load_game<H: Host + ?Sized>(&mut self, host: &mut H, game: SaveGame) -> Result<()> {
        game.validate()?;
        let SaveGame { register, rooms } = game;

        self.motion.secondary = None;
        self.motion.end_talk();
        self.resident = false;
        self.registry.restore_bytes(&rooms)?;
        self.items.restore_usage(&register.item_usage);

        self.inventory = register.inventory;
        self.inventory_position = register.inventory_position;
        self.puzzle = register.puzzle;
        self.story = register.story;
        self.zones = register.zones;
        self.volumes = register.volumes;
        self.character_name = register.character_name;
        self.game_part = register.game_part;
        self.action_code = register.action_code;
        self.door_index = register.door_index;
        self.room_change = false;

        host.stop_sound();
        let presentation = self.enter_room(register.room)?;
        self.motion.player = register.player;
        if let (Some(actor), Some(state)) = (self.motion.secondary.as_mut(), register.secondary.as_ref()) {
            actor.restore(&mut self.room, state);
        }

        if let Some(cue) = &self.profile.ambient_sound {
            host.play_sound(cue);
        }
        if let Some(cue) = &presentation.sound {
            host.play_sound(cue);
        }
        if presentation.tv_palette {
            host.tv_static_palette();
        }

        self.assemble_screen();
        tracing::info!(room = self.room.code, "game loaded");
        self.present(host)
    }
}
