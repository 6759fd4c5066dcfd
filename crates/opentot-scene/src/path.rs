//! Route planning and trajectory interpolation
//!
//! A walk is planned in two stages. `calculate_route` turns a zone pair into
//! a short polyline using the room's precomputed route table;
//! `Trajectory::line` then rasterises one polyline segment at a time into
//! dense per-pixel points with integer Bresenham.

use serde::{Deserialize, Serialize};

use crate::bitmap::Point;
use crate::error::{Result, SceneError};
use crate::room::RoomRecord;
use crate::{
    CHARACTER_CORRECTION_X, CHARACTER_CORRECTION_Y, CURSOR_HOTSPOT, FAR_ZONES, FIRST_EXIT_ZONE,
    MAIN_ROUTE_SLOTS, NEAR_ZONES, ROUTE_TABLE_POINTS, ROUTE_TERMINATOR_Y, SCENE_HEIGHT,
    SCENE_WIDTH, TRAJECTORY_CAPACITY,
};

/// Smallest coordinate a waypoint may take
const MIN_WAYPOINT: i32 = 3;

/// Dead zone used while walking between waypoints
pub const WALK_FACING_BIAS: i32 = 5;
/// Dead zone used when turning toward the pointer
pub const POINTER_FACING_BIAS: i32 = 20;

// ============================================================================
// Facing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    Up,
    Right,
    #[default]
    Down,
    Left,
}

impl Facing {
    pub fn index(self) -> usize {
        match self {
            Facing::Up => 0,
            Facing::Right => 1,
            Facing::Down => 2,
            Facing::Left => 3,
        }
    }

    pub fn from_index(i: usize) -> Self {
        match i % 4 {
            0 => Facing::Up,
            1 => Facing::Right,
            2 => Facing::Down,
            _ => Facing::Left,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Facing::Right | Facing::Left)
    }

    /// Facing for a movement delta. Vertical only wins when |dy| exceeds
    /// |dx| by more than `bias`.
    pub fn toward(dx: i32, dy: i32, bias: i32) -> Self {
        if dy.abs() > dx.abs() + bias {
            if dy < 0 {
                Facing::Up
            } else {
                Facing::Down
            }
        } else if dx > 0 {
            Facing::Right
        } else {
            Facing::Left
        }
    }
}

// ============================================================================
// Trajectory
// ============================================================================

/// Dense per-pixel path for one segment. The target is repeated twice past
/// the rasterised points so an actor stepping two at a time still lands on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TrajectoryParts")]
pub struct Trajectory {
    points: Vec<Point>,
    /// Rasterised points, excluding the two target repeats
    segment_len: usize,
    index: usize,
}

/// Trajectory as read from a save, before its index is checked
#[derive(Deserialize)]
struct TrajectoryParts {
    points: Vec<Point>,
    segment_len: usize,
    index: usize,
}

impl TryFrom<TrajectoryParts> for Trajectory {
    type Error = String;

    fn try_from(parts: TrajectoryParts) -> std::result::Result<Self, Self::Error> {
        let TrajectoryParts { points, segment_len, index } = parts;
        if points.is_empty() || points.len() > TRAJECTORY_CAPACITY {
            return Err(format!(
                "trajectory of {} points (expected 1 to {})",
                points.len(),
                TRAJECTORY_CAPACITY
            ));
        }
        if index >= points.len() {
            return Err(format!("trajectory index {} past {} points", index, points.len()));
        }
        if segment_len > points.len() {
            return Err(format!("trajectory segment of {} past {} points", segment_len, points.len()));
        }
        Ok(Self { points, segment_len, index })
    }
}

impl Trajectory {
    /// Standing still at `p`
    pub fn at(p: Point) -> Self {
        Self {
            points: vec![p; 3],
            segment_len: 1,
            index: 0,
        }
    }

    /// Standing at `p`, past the end, so the next walk tick plans a segment
    pub fn pending(p: Point) -> Self {
        Self {
            points: vec![p; 3],
            segment_len: 1,
            index: 2,
        }
    }

    /// Bresenham line from `from` to `to`, dominant axis stepping every point
    pub fn line(from: Point, to: Point) -> Result<Self> {
        let mut dx = (to.x - from.x).abs();
        let mut dy = (to.y - from.y).abs();
        let step_x = if to.x >= from.x { 1 } else { -1 };
        let step_y = if to.y >= from.y { 1 } else { -1 };

        let horizontal = dx >= dy;
        if !horizontal {
            std::mem::swap(&mut dx, &mut dy);
        }
        let segment_len = dx as usize + 1;
        if segment_len + 2 > TRAJECTORY_CAPACITY {
            return Err(SceneError::TrajectoryOverflow {
                len: segment_len + 2,
                capacity: TRAJECTORY_CAPACITY,
            });
        }

        let (straight_x, straight_y) = if horizontal { (step_x, 0) } else { (0, step_y) };
        let straight = 2 * dy;
        let diagonal = straight - 2 * dx;
        let mut decision = straight - dx;

        let mut points = Vec::with_capacity(segment_len + 2);
        let mut p = from;
        points.push(p);
        for _ in 1..segment_len {
            if decision >= 0 {
                p = p.offset(step_x, step_y);
                decision += diagonal;
            } else {
                p = p.offset(straight_x, straight_y);
                decision += straight;
            }
            points.push(p);
        }
        points.push(to);
        points.push(to);

        Ok(Self {
            points,
            segment_len,
            index: 0,
        })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Point {
        self.points[self.index]
    }

    pub fn target(&self) -> Point {
        self.points[self.points.len() - 1]
    }

    /// Step forward, never past the last point
    pub fn advance(&mut self, steps: usize) {
        self.index = (self.index + steps).min(self.points.len() - 1);
    }

    /// Overwrite the current point (actor moved outside the trajectory)
    pub fn set_current(&mut self, p: Point) {
        let i = self.index;
        self.points[i] = p;
    }
}

// ============================================================================
// Route
// ============================================================================

/// Current position plus up to six waypoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainRoute {
    points: Vec<Point>,
    /// Index of the last waypoint to walk to
    steps: usize,
}

impl Default for MainRoute {
    fn default() -> Self {
        Self {
            points: vec![Point::default(); MAIN_ROUTE_SLOTS],
            steps: 0,
        }
    }
}

impl MainRoute {
    pub fn from_parts(mut points: Vec<Point>, steps: usize) -> Self {
        points.resize(MAIN_ROUTE_SLOTS, Point::default());
        Self {
            points,
            steps: steps.min(MAIN_ROUTE_SLOTS - 1),
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn waypoint(&self, i: usize) -> Point {
        self.points.get(i).copied().unwrap_or_default()
    }

    /// The last waypoint walked to
    pub fn destination(&self) -> Point {
        self.waypoint(self.steps)
    }
}

/// Route-table point to sprite origin, kept inside the action area
fn to_waypoint(p: Point) -> Point {
    let x = (p.x - CHARACTER_CORRECTION_X).clamp(MIN_WAYPOINT, SCENE_WIDTH as i32 - 1);
    let y = (p.y - CHARACTER_CORRECTION_Y).clamp(MIN_WAYPOINT, SCENE_HEIGHT as i32 - 1);
    Point::new(x, y)
}

/// Plan a walk from zone `from` to zone `to`.
///
/// `click` is the raw pointer position; for in-room zones (below 10) the
/// walk ends where the player clicked. Exit zones end on the table's own
/// coordinates. `extra_correction` enables the per-room extension and the
/// barred-zone shortening; `route_extension_zone` comes from the room profile.
#[allow(clippy::too_many_arguments)]
pub fn calculate_route(
    room: &RoomRecord,
    from: u8,
    to: u8,
    start: Point,
    click: Point,
    extra_correction: bool,
    barred: bool,
    route_extension_zone: Option<u8>,
) -> Result<MainRoute> {
    let invalid = SceneError::InvalidZone { room: room.code, from, to };
    if from == 0 || to == 0 || from as usize > NEAR_ZONES || to as usize > FAR_ZONES {
        return Err(invalid);
    }
    let polyline = room
        .routes
        .polyline(from as usize - 1, to as usize - 1)
        .ok_or(invalid)?;

    let mut route = MainRoute::default();
    route.points[0] = start;

    let mut steps = 0;
    let mut hit_terminator = false;
    for &p in polyline.iter().take(ROUTE_TABLE_POINTS) {
        steps += 1;
        route.points[steps] = to_waypoint(p);
        if p.y == ROUTE_TERMINATOR_Y {
            hit_terminator = true;
            break;
        }
    }

    let click_target = to_waypoint(click.offset(CURSOR_HOTSPOT, CURSOR_HOTSPOT));
    if to < FIRST_EXIT_ZONE {
        if hit_terminator {
            route.points[steps] = click_target;
        } else {
            steps = MAIN_ROUTE_SLOTS - 1;
            route.points[steps] = click_target;
        }
    } else {
        if hit_terminator {
            steps -= 1;
        }
        if extra_correction && route_extension_zone == Some(to) {
            steps += 1;
        }
    }
    if extra_correction && barred {
        steps = steps.saturating_sub(1);
    }

    route.steps = steps.min(MAIN_ROUTE_SLOTS - 1);
    tracing::debug!(room = room.code, from, to, steps = route.steps, "route planned");
    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_room;

    fn table_point(x: i32, y: i32) -> Point {
        Point::new(x + CHARACTER_CORRECTION_X, y + CHARACTER_CORRECTION_Y)
    }

    #[test]
    fn bresenham_ends_on_target_twice() {
        for (from, to) in [
            (Point::new(10, 10), Point::new(40, 20)),
            (Point::new(40, 20), Point::new(10, 10)),
            (Point::new(5, 50), Point::new(9, 3)),
            (Point::new(7, 7), Point::new(7, 7)),
        ] {
            let t = Trajectory::line(from, to).unwrap();
            let pts = t.points();
            let n = pts.len();
            assert_eq!(pts[0], from);
            assert_eq!(pts[n - 1], to);
            assert_eq!(pts[n - 2], to);
            assert_eq!(n, t.segment_len() + 2);
        }
    }

    #[test]
    fn bresenham_steps_are_unit() {
        let t = Trajectory::line(Point::new(0, 0), Point::new(37, -11)).unwrap();
        for w in t.points()[..t.segment_len()].windows(2) {
            let dx = (w[1].x - w[0].x).abs();
            let dy = (w[1].y - w[0].y).abs();
            assert_eq!(dx, 1, "dominant axis advances every point");
            assert!(dy <= 1);
        }
        assert_eq!(t.points()[t.segment_len() - 1], Point::new(37, -11));
    }

    #[test]
    fn long_lines_overflow() {
        let err = Trajectory::line(Point::new(0, 0), Point::new(310, 0)).unwrap_err();
        assert!(matches!(err, SceneError::TrajectoryOverflow { .. }));
        assert!(Trajectory::line(Point::new(0, 0), Point::new(297, 0)).is_ok());
    }

    #[test]
    fn advance_clamps_to_last_point() {
        let mut t = Trajectory::line(Point::new(0, 0), Point::new(3, 0)).unwrap();
        t.advance(10);
        assert_eq!(t.index(), t.points().len() - 1);
        assert_eq!(t.current(), Point::new(3, 0));
    }

    #[test]
    fn facing_prefers_horizontal() {
        assert_eq!(Facing::toward(3, 8, 5), Facing::Right);
        assert_eq!(Facing::toward(3, 9, 5), Facing::Down);
        assert_eq!(Facing::toward(-3, -9, 5), Facing::Up);
        assert_eq!(Facing::toward(0, 0, 5), Facing::Left);
        assert_eq!(Facing::toward(10, 25, 20), Facing::Right);
    }

    #[test]
    fn in_room_route_ends_at_click() {
        let mut room = sample_room(1);
        room.routes.set(2, 4, 0, table_point(60, 60));
        room.routes.set(2, 4, 1, Point::new(0, ROUTE_TERMINATOR_Y));
        let click = Point::new(100, 110);
        let route = calculate_route(&room, 3, 5, Point::new(20, 30), click, true, false, None).unwrap();
        assert_eq!(route.steps(), 2);
        assert_eq!(route.waypoint(0), Point::new(20, 30));
        assert_eq!(route.waypoint(1), Point::new(60, 60));
        assert_eq!(route.destination(), Point::new(100 + 7 - 14, 110 + 7 - 49));
    }

    #[test]
    fn full_polyline_puts_click_in_last_slot() {
        let mut room = sample_room(1);
        for k in 0..5 {
            room.routes.set(0, 1, k, table_point(10 + k as i32 * 10, 40));
        }
        let route = calculate_route(&room, 1, 2, Point::new(5, 5), Point::new(80, 80), true, false, None).unwrap();
        assert_eq!(route.steps(), 6);
        assert_eq!(route.waypoint(5), Point::new(50, 40));
        assert_eq!(route.destination(), Point::new(73, 38));
    }

    #[test]
    fn exit_zone_uses_table_coordinates() {
        let mut room = sample_room(1);
        room.routes.set(0, 11, 0, table_point(100, 50));
        room.routes.set(0, 11, 1, table_point(300, 50));
        room.routes.set(0, 11, 2, Point::new(0, ROUTE_TERMINATOR_Y));
        let route = calculate_route(&room, 1, 12, Point::new(5, 5), Point::new(0, 0), true, false, None).unwrap();
        assert_eq!(route.steps(), 2);
        assert_eq!(route.destination(), Point::new(300, 50));
    }

    #[test]
    fn barred_door_shortens_route_by_one() {
        let mut room = sample_room(1);
        room.routes.set(2, 26, 0, table_point(100, 50));
        room.routes.set(2, 26, 1, table_point(200, 60));
        room.routes.set(2, 26, 2, table_point(290, 60));
        room.routes.set(2, 26, 3, Point::new(0, ROUTE_TERMINATOR_Y));
        let open = calculate_route(&room, 3, 27, Point::new(50, 50), Point::default(), true, false, None).unwrap();
        let barred = calculate_route(&room, 3, 27, Point::new(50, 50), Point::default(), true, true, None).unwrap();
        assert_eq!(open.steps(), 3);
        assert_eq!(barred.steps(), 2);
        assert_eq!(barred.destination(), Point::new(200, 60));
    }

    #[test]
    fn route_extension_keeps_terminator_waypoint_in_scene() {
        let mut room = sample_room(5);
        room.routes.set(0, 26, 0, table_point(100, 50));
        room.routes.set(0, 26, 1, Point::new(330, ROUTE_TERMINATOR_Y));
        let route = calculate_route(&room, 1, 27, Point::new(50, 50), Point::default(), true, false, Some(27)).unwrap();
        assert_eq!(route.steps(), 2);
        assert_eq!(route.destination(), Point::new(316, SCENE_HEIGHT as i32 - 1));
    }

    #[test]
    fn zones_outside_the_table_are_refused() {
        let room = sample_room(1);
        for (from, to) in [(0, 3), (10, 3), (3, 0), (3, 31)] {
            let err = calculate_route(&room, from, to, Point::default(), Point::default(), true, false, None).unwrap_err();
            assert!(err.is_walk_refusal());
        }
    }

    #[test]
    fn waypoints_clamp_low() {
        assert_eq!(to_waypoint(Point::new(2, 10)), Point::new(3, 3));
    }

    #[test]
    fn saved_trajectory_keeps_its_place() {
        let mut t = Trajectory::line(Point::new(10, 10), Point::new(14, 12)).unwrap();
        t.advance(3);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(serde_json::from_str::<Trajectory>(&json).unwrap(), t);
    }

    #[test]
    fn saved_trajectory_out_of_range_is_refused() {
        let p = r#"{"x":1,"y":2}"#;
        for json in [
            format!(r#"{{"points":[{p},{p},{p}],"segment_len":1,"index":999}}"#),
            format!(r#"{{"points":[{p},{p},{p}],"segment_len":1,"index":3}}"#),
            format!(r#"{{"points":[{p}],"segment_len":4,"index":0}}"#),
            r#"{"points":[],"segment_len":0,"index":0}"#.to_string(),
        ] {
            assert!(serde_json::from_str::<Trajectory>(&json).is_err(), "{json}");
        }
        let json = format!(r#"{{"points":[{p},{p},{p}],"segment_len":1,"index":2}}"#);
        assert_eq!(serde_json::from_str::<Trajectory>(&json).unwrap(), Trajectory::pending(Point::new(1, 2)));
    }
}
