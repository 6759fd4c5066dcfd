//! Tick-driven actor state machine
//!
//! Architecture:
//!   - `PlayerMotion`: the walk. A route is walked one segment at a time;
//!     each segment is rasterised only when the previous one runs out.
//!   - `MotionScheduler`: owns the player, the optional secondary actor and
//!     an optional talk cycle, and decides which of them moves on a tick.
//!
//! States: Idle → Walking on a new route, Walking → Idle at the end of the
//! last segment, Idle/Walking → TalkCycling while a line is being spoken,
//! back to the prior state when it ends.

use serde::{Deserialize, Serialize};

use crate::bitmap::{AnimationBank, Point};
use crate::compositor::ActorSprite;
use crate::depth::player_depth;
use crate::error::Result;
use crate::path::{Facing, MainRoute, Trajectory, POINTER_FACING_BIAS, WALK_FACING_BIAS};
use crate::room::RoomRecord;
use crate::secondary::SecondaryActor;
use crate::{CHARACTER_CORRECTION_X, CHARACTER_CORRECTION_Y, CURSOR_HOTSPOT, WALK_FRAME_COUNT};

/// Waypoint deltas this small keep the current facing
const FACING_DEAD_ZONE: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Idle,
    Walking,
    TalkCycling,
}

/// Per-tick inputs from the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickContext {
    pub pointer: Point,
    /// Player stands on a door zone; suppresses idle turning
    pub barred: bool,
    pub room_change: bool,
}

// ============================================================================
// PlayerMotion
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMotion {
    /// Sprite origin (feet are at +14, +49)
    pub position: Point,
    pub facing: Facing,
    pub frame: usize,
    pub depth: u8,
    pub route: MainRoute,
    /// Last route step to walk; 0 while idle
    pub walk_steps: usize,
    /// 1-based route step the next segment heads for
    pub next_waypoint: usize,
    pub trajectory: Trajectory,
}

impl PlayerMotion {
    pub fn new(position: Point, facing: Facing) -> Self {
        Self {
            position,
            facing,
            frame: 0,
            depth: player_depth(position.y),
            route: MainRoute::default(),
            walk_steps: 0,
            next_waypoint: 0,
            trajectory: Trajectory::at(position),
        }
    }

    pub fn is_walking(&self) -> bool {
        self.walk_steps > 0
    }

    /// Replace any walk in progress with `route`
    pub fn begin_walk(&mut self, route: MainRoute) {
        self.walk_steps = route.steps();
        self.next_waypoint = 1;
        self.route = route;
        self.trajectory = Trajectory::pending(self.position);
    }

    /// Drop the walk and stand where the player is
    pub fn stop(&mut self) {
        self.walk_steps = 0;
        self.trajectory = Trajectory::at(self.position);
    }

    /// Teleport (room entry, scroll end)
    pub fn place(&mut self, position: Point) {
        self.position = position;
        self.stop();
        self.update_depth();
    }

    pub fn update_depth(&mut self) {
        self.depth = player_depth(self.position.y);
    }

    /// Turn toward the pointer's click point
    pub fn face_pointer(&mut self, pointer: Point) {
        let dx = (pointer.x + CURSOR_HOTSPOT) - (self.position.x + CHARACTER_CORRECTION_X);
        let dy = (pointer.y + CURSOR_HOTSPOT) - (self.position.y + CHARACTER_CORRECTION_Y);
        self.facing = Facing::toward(dx, dy, POINTER_FACING_BIAS);
    }

    /// Plan the next segment toward the next route step
    fn next_segment(&mut self) -> Result<()> {
        let y = self.next_waypoint;
        let from = self.route.waypoint(y - 1);
        let to = self.route.waypoint(y);
        let (dx, dy) = (to.x - from.x, to.y - from.y);
        if dx.abs() > FACING_DEAD_ZONE || dy.abs() > FACING_DEAD_ZONE {
            self.facing = Facing::toward(dx, dy, WALK_FACING_BIAS);
        }
        self.next_waypoint += 1;
        self.trajectory = Trajectory::line(self.position, to)?;
        Ok(())
    }

    /// One game tick. A segment that cannot be rasterised ends the walk.
    pub fn tick(&mut self, ctx: &TickContext) -> Result<()> {
        if self.is_walking() {
            let steps = if self.facing.is_horizontal() { 2 } else { 1 };
            self.trajectory.advance(steps);
            let len = self.trajectory.segment_len();

            if self.next_waypoint <= self.walk_steps {
                if self.trajectory.index() > len {
                    if let Err(e) = self.next_segment() {
                        tracing::warn!("Walk abandoned: {}", e);
                        self.stop();
                        self.frame = 0;
                        return Err(e);
                    }
                }
            } else if self.trajectory.index() >= len {
                self.walk_steps = 0;
                if !ctx.room_change {
                    let arrived = self.trajectory.current();
                    self.position = arrived;
                    self.face_pointer(ctx.pointer);
                }
            }

            self.frame = if self.frame + 1 >= WALK_FRAME_COUNT { 0 } else { self.frame + 1 };
        } else {
            self.frame = 0;
            if !ctx.barred && !ctx.room_change {
                self.face_pointer(ctx.pointer);
            }
        }

        self.position = self.trajectory.current();
        self.update_depth();
        Ok(())
    }

    pub fn sprite<'a>(&self, bank: &'a AnimationBank, facing: Facing) -> Option<ActorSprite<'a>> {
        Some(ActorSprite {
            frame: bank.frame(facing.index(), self.frame)?,
            position: self.position,
            depth: self.depth,
        })
    }
}

// ============================================================================
// Talk cycling
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Player,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TalkMode {
    /// Someone on screen speaks; the speaker's frames cycle
    Conversation(Speaker),
    /// Off-screen narration; the secondary actor keeps walking
    Narration,
}

#[derive(Debug, Clone)]
struct TalkCycle {
    mode: TalkMode,
    counter: usize,
    budget: usize,
    prior_frame: usize,
    prior_secondary_frame: Option<usize>,
}

// ============================================================================
// MotionScheduler
// ============================================================================

#[derive(Debug, Clone)]
pub struct MotionScheduler {
    pub player: PlayerMotion,
    pub secondary: Option<SecondaryActor>,
    talk: Option<TalkCycle>,
}

impl MotionScheduler {
    pub fn new(player: PlayerMotion) -> Self {
        Self {
            player,
            secondary: None,
            talk: None,
        }
    }

    pub fn state(&self) -> MotionState {
        if self.talk.is_some() {
            MotionState::TalkCycling
        } else if self.player.is_walking() {
            MotionState::Walking
        } else {
            MotionState::Idle
        }
    }

    pub fn begin_walk(&mut self, route: MainRoute) {
        tracing::debug!(steps = route.steps(), "walk started");
        self.player.begin_walk(route);
    }

    pub fn stop(&mut self) {
        self.player.stop();
    }

    /// One game tick: the secondary actor first (on secondary ticks only),
    /// then the player
    pub fn tick(&mut self, room: &mut RoomRecord, ctx: &TickContext, secondary_tick: bool) -> Result<()> {
        if secondary_tick {
            if let Some(secondary) = self.secondary.as_mut() {
                secondary.tick(room);
            }
        }
        self.player.tick(ctx)
    }

    // ─── Talk ────────────────────────────────────────────────────────────

    /// Start cycling talk frames for a line of `chars` characters
    pub fn begin_talk(&mut self, mode: TalkMode, chars: usize) {
        self.talk = Some(TalkCycle {
            mode,
            counter: 0,
            budget: chars * 4,
            prior_frame: self.player.frame,
            prior_secondary_frame: self.secondary.as_ref().map(|s| s.frame),
        });
    }

    pub fn talk_mode(&self) -> Option<TalkMode> {
        self.talk.as_ref().map(|t| t.mode)
    }

    /// One secondary tick of talking. Returns true once the line's
    /// time budget is spent; narration only ends on a skip.
    pub fn talk_tick(&mut self, room: &RoomRecord) -> bool {
        let Some(talk) = self.talk.as_mut() else {
            return true;
        };
        match talk.mode {
            TalkMode::Conversation(speaker) => {
                talk.counter += 1;
                match speaker {
                    Speaker::Player => {
                        if let Some(secondary) = self.secondary.as_mut() {
                            secondary.frame = 0;
                        }
                        self.player.frame = if self.player.frame >= WALK_FRAME_COUNT - 1 {
                            0
                        } else {
                            self.player.frame + 1
                        };
                    }
                    Speaker::Secondary => {
                        self.player.frame = 0;
                        if let Some(secondary) = self.secondary.as_mut() {
                            secondary.cycle_frame();
                        }
                    }
                }
                talk.counter > talk.budget
            }
            TalkMode::Narration => {
                if let Some(secondary) = self.secondary.as_mut() {
                    secondary.step_along(room);
                    secondary.cycle_frame();
                    secondary.update_depth();
                }
                false
            }
        }
    }

    /// Leave talk cycling, putting the frames back as they were
    pub fn end_talk(&mut self) {
        if let Some(talk) = self.talk.take() {
            self.player.frame = talk.prior_frame;
            if let (Some(secondary), Some(frame)) = (self.secondary.as_mut(), talk.prior_secondary_frame) {
                secondary.frame = frame;
            }
        }
    }

    /// Direction the player is drawn with; talking uses the first bank
    pub fn player_draw_facing(&self) -> Facing {
        match self.talk_mode() {
            Some(TalkMode::Conversation(_)) => Facing::Up,
            _ => self.player.facing,
        }
    }

    /// Whether the player should be redrawn this tick
    pub fn draws_player(&self) -> bool {
        !matches!(self.talk_mode(), Some(TalkMode::Narration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Bitmap;
    use crate::room::profile::SecondaryDepth;
    use crate::room::GridPatch;
    use crate::testing::sample_room;
    use crate::SceneError;

    fn still() -> TickContext {
        TickContext { room_change: true, ..Default::default() }
    }

    fn walk_until_idle(motion: &mut PlayerMotion, ctx: &TickContext) -> usize {
        let mut ticks = 0;
        while ticks == 0 || motion.is_walking() {
            motion.tick(ctx).unwrap();
            ticks += 1;
            assert!(ticks < 1000, "walk never ended");
        }
        ticks
    }

    #[test]
    fn horizontal_walk_steps_two_points_per_tick() {
        let mut m = PlayerMotion::new(Point::new(10, 10), Facing::Down);
        m.begin_walk(MainRoute::from_parts(vec![Point::new(10, 10), Point::new(20, 10)], 1));
        m.tick(&still()).unwrap();
        assert_eq!(m.facing, Facing::Right);
        assert_eq!(m.position, Point::new(10, 10));
        m.tick(&still()).unwrap();
        assert_eq!(m.position, Point::new(12, 10));

        walk_until_idle(&mut m, &still());
        assert_eq!(m.position, Point::new(20, 10));
        assert_eq!(m.facing, Facing::Right);
    }

    #[test]
    fn multi_waypoint_walk_reaches_destination() {
        let mut m = PlayerMotion::new(Point::new(10, 10), Facing::Down);
        let route = MainRoute::from_parts(
            vec![Point::new(10, 10), Point::new(10, 40), Point::new(60, 45)],
            2,
        );
        m.begin_walk(route);
        m.tick(&still()).unwrap();
        assert_eq!(m.facing, Facing::Down);
        m.tick(&still()).unwrap();
        assert_eq!(m.position, Point::new(10, 11));

        walk_until_idle(&mut m, &still());
        assert_eq!(m.position, Point::new(60, 45));
        assert_eq!(m.depth, player_depth(45));
        assert!(!m.is_walking());
    }

    #[test]
    fn small_deltas_keep_facing() {
        let mut m = PlayerMotion::new(Point::new(50, 50), Facing::Left);
        m.begin_walk(MainRoute::from_parts(vec![Point::new(50, 50), Point::new(52, 52)], 1));
        m.tick(&still()).unwrap();
        assert_eq!(m.facing, Facing::Left);
    }

    #[test]
    fn arrival_turns_toward_pointer() {
        let mut m = PlayerMotion::new(Point::new(10, 10), Facing::Down);
        m.begin_walk(MainRoute::from_parts(vec![Point::new(10, 10), Point::new(20, 10)], 1));
        // pointer well above the feet
        let ctx = TickContext { pointer: Point::new(27, 0), ..Default::default() };
        walk_until_idle(&mut m, &ctx);
        assert_eq!(m.facing, Facing::Up);
        m.tick(&ctx).unwrap();
        assert_eq!(m.frame, 0);
        assert_eq!(m.position, Point::new(20, 10));
    }

    #[test]
    fn idle_turning_is_suppressed_on_barred_zones() {
        let mut m = PlayerMotion::new(Point::new(100, 50), Facing::Right);
        let ctx = TickContext { pointer: Point::new(0, 50 + 49 - 7), barred: true, room_change: false };
        m.tick(&ctx).unwrap();
        assert_eq!(m.facing, Facing::Right);
        let ctx = TickContext { barred: false, ..ctx };
        m.tick(&ctx).unwrap();
        assert_eq!(m.facing, Facing::Left);
    }

    #[test]
    fn overflowing_segment_leaves_player_idle() {
        let mut m = PlayerMotion::new(Point::new(0, 0), Facing::Right);
        m.begin_walk(MainRoute::from_parts(vec![Point::new(0, 0), Point::new(319, 0)], 1));
        let err = m.tick(&still()).unwrap_err();
        assert!(matches!(err, SceneError::TrajectoryOverflow { .. }));
        assert!(!m.is_walking());
        assert_eq!(m.position, Point::new(0, 0));
    }

    #[test]
    fn new_walk_replaces_old_one() {
        let mut m = PlayerMotion::new(Point::new(10, 10), Facing::Down);
        m.begin_walk(MainRoute::from_parts(vec![Point::new(10, 10), Point::new(100, 10)], 1));
        for _ in 0..5 {
            m.tick(&still()).unwrap();
        }
        let here = m.position;
        m.begin_walk(MainRoute::from_parts(vec![here, Point::new(here.x, 60)], 1));
        walk_until_idle(&mut m, &still());
        assert_eq!(m.position, Point::new(here.x, 60));
    }

    fn scheduler_with_secondary() -> (MotionScheduler, RoomRecord) {
        let mut room = sample_room(3);
        room.secondary.enabled = true;
        room.secondary.name = "PERRO001".into();
        room.secondary.length = 2;
        room.secondary.trajectory[0] = Point::new(40, 80);
        room.secondary.trajectory[1] = Point::new(44, 80);
        let bank = AnimationBank::single(vec![Bitmap::filled(8, 10, 2), Bitmap::filled(8, 10, 3)]);
        let mut secondary = SecondaryActor::attach(&mut room, bank, &GridPatch::default(), SecondaryDepth::Banded);
        secondary.place_at_start(&mut room, None);
        let mut scheduler = MotionScheduler::new(PlayerMotion::new(Point::new(100, 40), Facing::Down));
        scheduler.secondary = Some(secondary);
        (scheduler, room)
    }

    #[test]
    fn secondary_moves_only_on_secondary_ticks() {
        let (mut s, mut room) = scheduler_with_secondary();
        let start = s.secondary.as_ref().unwrap().position;
        s.tick(&mut room, &still(), false).unwrap();
        assert_eq!(s.secondary.as_ref().unwrap().position, start);
        s.tick(&mut room, &still(), true).unwrap();
        assert_eq!(s.secondary.as_ref().unwrap().position, Point::new(40, 70));
        assert_eq!(s.state(), MotionState::Idle);
    }

    #[test]
    fn player_talk_runs_four_ticks_per_character() {
        let (mut s, room) = scheduler_with_secondary();
        s.player.frame = 6;
        s.begin_talk(TalkMode::Conversation(Speaker::Player), 2);
        assert_eq!(s.state(), MotionState::TalkCycling);
        assert_eq!(s.player_draw_facing(), Facing::Up);
        let mut ticks = 1;
        while !s.talk_tick(&room) {
            ticks += 1;
        }
        assert_eq!(ticks, 9);
        assert_eq!(s.secondary.as_ref().unwrap().frame, 0);
        s.end_talk();
        assert_eq!(s.player.frame, 6);
        assert_eq!(s.player_draw_facing(), Facing::Down);
        assert_eq!(s.state(), MotionState::Idle);
    }

    #[test]
    fn secondary_talk_cycles_its_frames() {
        let (mut s, room) = scheduler_with_secondary();
        s.player.frame = 4;
        s.begin_talk(TalkMode::Conversation(Speaker::Secondary), 1);
        s.talk_tick(&room);
        assert_eq!(s.player.frame, 0);
        assert_eq!(s.secondary.as_ref().unwrap().frame, 1);
        s.talk_tick(&room);
        assert_eq!(s.secondary.as_ref().unwrap().frame, 0);
    }

    #[test]
    fn narration_walks_the_secondary_and_never_times_out() {
        let (mut s, room) = scheduler_with_secondary();
        s.begin_talk(TalkMode::Narration, 1);
        assert!(!s.draws_player());
        for _ in 0..20 {
            assert!(!s.talk_tick(&room));
        }
        assert_eq!(s.secondary.as_ref().unwrap().trajectory_index, 1);
        s.talk_tick(&room);
        assert_eq!(s.secondary.as_ref().unwrap().position, Point::new(40, 70));
        s.end_talk();
        assert!(s.draws_player());
    }
}
