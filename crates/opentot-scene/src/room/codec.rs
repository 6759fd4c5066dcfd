//! Binary room record codec
//!
//! Fixed-size little-endian records, one per room code, in this order:
//! header, walk grid, mouse grid, route table, doors, layers, object index,
//! secondary animation block.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{
    Door, DoorState, Grid, ObjectIndexEntry, RoomRecord, RouteTable, ScreenLayer, SecondaryAnimMeta,
};
use crate::bitmap::Point;
use crate::{
    DOOR_SLOTS, FAR_ZONES, GRID_COLS, GRID_ROWS, LAYER_SLOTS, NEAR_ZONES, OBJECT_INDEX_SLOTS,
    ROUTE_TABLE_POINTS, SECONDARY_TRAJECTORY_CAPACITY,
};

const OBJECT_NAME_LEN: usize = 20;
const ANIMATION_NAME_LEN: usize = 8;

const HEADER_SIZE: usize = 2 + 4 + 2;
const GRID_SIZE: usize = GRID_COLS * GRID_ROWS;
const ROUTE_TABLE_SIZE: usize = NEAR_ZONES * FAR_ZONES * ROUTE_TABLE_POINTS * 4;
const DOOR_SIZE: usize = 2 + 2 + 2 + 1 + 1;
const LAYER_SIZE: usize = 4 + 2 + 2 + 2 + 2;
const OBJECT_ENTRY_SIZE: usize = 2 + 1 + OBJECT_NAME_LEN;
const ANIMATION_BLOCK_SIZE: usize = 1 + 1 + ANIMATION_NAME_LEN + 1 + 2
    + SECONDARY_TRAJECTORY_CAPACITY * 4
    + SECONDARY_TRAJECTORY_CAPACITY * 2
    + 2;

/// Bytes per room record; room `code` lives at `code * ROOM_RECORD_SIZE`
pub const ROOM_RECORD_SIZE: usize = HEADER_SIZE
    + 2 * GRID_SIZE
    + ROUTE_TABLE_SIZE
    + DOOR_SLOTS * DOOR_SIZE
    + LAYER_SLOTS * LAYER_SIZE
    + OBJECT_INDEX_SLOTS * OBJECT_ENTRY_SIZE
    + ANIMATION_BLOCK_SIZE;

// ----------------------------------------------------------------------------
// Primitive helpers
// ----------------------------------------------------------------------------

fn read_point<R: Read>(r: &mut R) -> io::Result<Point> {
    let x = r.read_u16::<LittleEndian>()?;
    let y = r.read_u16::<LittleEndian>()?;
    Ok(Point::new(x as i32, y as i32))
}

fn write_point<W: Write>(w: &mut W, p: Point) -> io::Result<()> {
    w.write_u16::<LittleEndian>(p.x as u16)?;
    w.write_u16::<LittleEndian>(p.y as u16)
}

/// Length byte followed by a fixed `cap`-byte body
pub(crate) fn read_pascal<R: Read>(r: &mut R, cap: usize) -> io::Result<String> {
    let len = r.read_u8()? as usize;
    let mut body = vec![0u8; cap];
    r.read_exact(&mut body)?;
    Ok(body[..len.min(cap)].iter().map(|&b| b as char).collect())
}

pub(crate) fn write_pascal<W: Write>(w: &mut W, s: &str, cap: usize) -> io::Result<()> {
    let bytes: Vec<u8> = s.chars().map(|c| c as u32 as u8).take(cap).collect();
    w.write_u8(bytes.len() as u8)?;
    w.write_all(&bytes)?;
    w.write_all(&vec![0u8; cap - bytes.len()])
}

// ----------------------------------------------------------------------------
// Record
// ----------------------------------------------------------------------------

/// Decode one room record from the current stream position
pub fn read_room<R: Read>(r: &mut R) -> io::Result<RoomRecord> {
    let code = r.read_u16::<LittleEndian>()?;
    let image_ref = r.read_u32::<LittleEndian>()?;
    let image_size = r.read_u16::<LittleEndian>()?;

    let mut grid = vec![0u8; GRID_SIZE];
    r.read_exact(&mut grid)?;
    let walk = Grid::from_bytes(&grid).unwrap_or_default();
    r.read_exact(&mut grid)?;
    let mouse = Grid::from_bytes(&grid).unwrap_or_default();

    let mut route_points = Vec::with_capacity(NEAR_ZONES * FAR_ZONES * ROUTE_TABLE_POINTS);
    for _ in 0..NEAR_ZONES * FAR_ZONES * ROUTE_TABLE_POINTS {
        route_points.push(read_point(r)?);
    }
    let routes = RouteTable::from_points(route_points).unwrap_or_default();

    let mut doors = [Door::default(); DOOR_SLOTS];
    for door in doors.iter_mut() {
        let target_room = r.read_u16::<LittleEndian>()?;
        let exit = read_point(r)?;
        let state = DoorState::from(r.read_u8()?);
        let zone = r.read_u8()?;
        *door = Door { target_room, exit, state, zone };
    }

    let mut layers = [ScreenLayer::default(); LAYER_SLOTS];
    for layer in layers.iter_mut() {
        let bitmap_ref = r.read_i32::<LittleEndian>()?;
        let bitmap_size = r.read_u16::<LittleEndian>()?;
        let position = read_point(r)?;
        let depth = r.read_u16::<LittleEndian>()?;
        *layer = ScreenLayer { bitmap_ref, bitmap_size, position, depth };
    }

    let mut objects = Vec::with_capacity(OBJECT_INDEX_SLOTS);
    for _ in 0..OBJECT_INDEX_SLOTS {
        let file_index = r.read_u16::<LittleEndian>()?;
        let name = read_pascal(r, OBJECT_NAME_LEN)?;
        objects.push(ObjectIndexEntry { file_index, name });
    }

    let enabled = r.read_u8()? != 0;
    let name = read_pascal(r, ANIMATION_NAME_LEN)?;
    let palette_anim = r.read_u8()? != 0;
    let palette_ref = r.read_u16::<LittleEndian>()?;
    let mut trajectory = Vec::with_capacity(SECONDARY_TRAJECTORY_CAPACITY);
    for _ in 0..SECONDARY_TRAJECTORY_CAPACITY {
        trajectory.push(read_point(r)?);
    }
    let mut directions = Vec::with_capacity(SECONDARY_TRAJECTORY_CAPACITY);
    for _ in 0..SECONDARY_TRAJECTORY_CAPACITY {
        directions.push(r.read_u16::<LittleEndian>()?);
    }
    let length = r.read_u16::<LittleEndian>()?;

    Ok(RoomRecord {
        code,
        image_ref,
        image_size,
        walk,
        mouse,
        routes,
        doors,
        layers,
        objects,
        secondary: SecondaryAnimMeta {
            enabled,
            name,
            palette_anim,
            palette_ref,
            trajectory,
            directions,
            length,
        },
    })
}

/// Encode one room record; always writes exactly `ROOM_RECORD_SIZE` bytes
pub fn write_room<W: Write>(w: &mut W, room: &RoomRecord) -> io::Result<()> {
    w.write_u16::<LittleEndian>(room.code)?;
    w.write_u32::<LittleEndian>(room.image_ref)?;
    w.write_u16::<LittleEndian>(room.image_size)?;
    w.write_all(room.walk.as_bytes())?;
    w.write_all(room.mouse.as_bytes())?;

    for &p in room.routes.points() {
        write_point(w, p)?;
    }

    for door in &room.doors {
        w.write_u16::<LittleEndian>(door.target_room)?;
        write_point(w, door.exit)?;
        w.write_u8(door.state.into())?;
        w.write_u8(door.zone)?;
    }

    for layer in &room.layers {
        w.write_i32::<LittleEndian>(layer.bitmap_ref)?;
        w.write_u16::<LittleEndian>(layer.bitmap_size)?;
        write_point(w, layer.position)?;
        w.write_u16::<LittleEndian>(layer.depth)?;
    }

    for i in 0..OBJECT_INDEX_SLOTS {
        let entry = room.objects.get(i).cloned().unwrap_or_default();
        w.write_u16::<LittleEndian>(entry.file_index)?;
        write_pascal(w, &entry.name, OBJECT_NAME_LEN)?;
    }

    let anim = &room.secondary;
    w.write_u8(anim.enabled as u8)?;
    write_pascal(w, &anim.name, ANIMATION_NAME_LEN)?;
    w.write_u8(anim.palette_anim as u8)?;
    w.write_u16::<LittleEndian>(anim.palette_ref)?;
    for i in 0..SECONDARY_TRAJECTORY_CAPACITY {
        write_point(w, anim.trajectory.get(i).copied().unwrap_or_default())?;
    }
    for i in 0..SECONDARY_TRAJECTORY_CAPACITY {
        w.write_u16::<LittleEndian>(anim.directions.get(i).copied().unwrap_or(0))?;
    }
    w.write_u16::<LittleEndian>(anim.length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_room;
    use std::io::Cursor;

    #[test]
    fn record_size_matches_layout() {
        assert_eq!(ROOM_RECORD_SIZE, 10856);
        let mut buf = Vec::new();
        write_room(&mut buf, &RoomRecord::new(0)).unwrap();
        assert_eq!(buf.len(), ROOM_RECORD_SIZE);
    }

    #[test]
    fn write_then_read_preserves_every_field() {
        let mut room = sample_room(7);
        room.doors[4].state = DoorState::Other(9);
        room.layers[14].bitmap_ref = -5;
        room.secondary.name = "FUENTE01".into();
        room.secondary.directions[299] = 612;

        let mut buf = Vec::new();
        write_room(&mut buf, &room).unwrap();
        let back = read_room(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back, room);
    }

    #[test]
    fn truncated_record_is_an_eof() {
        let mut buf = Vec::new();
        write_room(&mut buf, &sample_room(2)).unwrap();
        buf.truncate(ROOM_RECORD_SIZE - 3);
        let err = read_room(&mut Cursor::new(buf)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn pascal_strings_truncate_to_capacity() {
        let mut buf = Vec::new();
        write_pascal(&mut buf, "ABCDEFGHIJ", 8).unwrap();
        assert_eq!(buf.len(), 9);
        assert_eq!(buf[0], 8);
        assert_eq!(read_pascal(&mut Cursor::new(buf), 8).unwrap(), "ABCDEFGH");
    }
}
