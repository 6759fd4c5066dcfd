//! Item registers: static per-object behaviour descriptors
//!
//! One fixed-size record per item code. Everything but the eight "used"
//! bytes is read-only template data; the used bytes travel with save games.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::bitmap::Point;
use crate::error::{Result, SceneError};
use crate::room::codec::{read_pascal, write_pascal};
use crate::room::{GridPatch, GRID_PATCH_SIZE};

const ITEM_NAME_LEN: usize = 20;
const PATCH_BYTES: usize = GRID_PATCH_SIZE * GRID_PATCH_SIZE;

/// Bytes per item record; item `code` lives at `code * ITEM_RECORD_SIZE`
pub const ITEM_RECORD_SIZE: usize = 2 + 1 + 1 + ITEM_NAME_LEN // code, height, name
    + 5 * 2 // text refs
    + 3 + 8 + 1 // speak/open/close, used, pickable
    + 2 + 2 + 1 // use-with, replace-with, depth
    + 4 + 2 + 2 + 2 // bitmap, size, rotating frames/palette
    + 2 + 2 + 4 + 2 // drop overlay
    + 2 // icon
    + 4 + 2 * PATCH_BYTES; // grid rectangle, patches

/// Height the player bends to when picking the item up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PickHeight {
    #[default]
    High,
    Waist,
    Feet,
    Other(u8),
}

impl From<u8> for PickHeight {
    fn from(v: u8) -> Self {
        match v {
            0 => PickHeight::High,
            1 => PickHeight::Waist,
            2 => PickHeight::Feet,
            other => PickHeight::Other(other),
        }
    }
}

impl From<PickHeight> for u8 {
    fn from(h: PickHeight) -> u8 {
        match h {
            PickHeight::High => 0,
            PickHeight::Waist => 1,
            PickHeight::Feet => 2,
            PickHeight::Other(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextRefs {
    pub look_at: u16,
    pub before_use: u16,
    pub after_use: u16,
    pub pick: u16,
    pub use_: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemRegister {
    pub code: u16,
    pub pick_height: PickHeight,
    pub name: String,
    pub texts: TextRefs,
    pub speaks: bool,
    pub openable: bool,
    pub closeable: bool,
    pub used: [u8; 8],
    pub pickable: bool,
    pub use_with: u16,
    pub replace_with: u16,
    /// 1-based depth of the item's overlay in its room
    pub depth: u8,
    pub bitmap_ref: u32,
    pub bitmap_size: u16,
    pub rotating_frames_ref: u16,
    pub rotating_palette_ref: u16,
    pub drop_position: Point,
    pub drop_overlay_ref: u32,
    pub drop_overlay_size: u16,
    pub icon: u16,
    pub patch: GridPatch,
}

impl ItemRegister {
    pub fn read<R: Read>(r: &mut R) -> io::Result<Self> {
        let code = r.read_u16::<LittleEndian>()?;
        let pick_height = PickHeight::from(r.read_u8()?);
        let name = read_pascal(r, ITEM_NAME_LEN)?;
        let texts = TextRefs {
            look_at: r.read_u16::<LittleEndian>()?,
            before_use: r.read_u16::<LittleEndian>()?,
            after_use: r.read_u16::<LittleEndian>()?,
            pick: r.read_u16::<LittleEndian>()?,
            use_: r.read_u16::<LittleEndian>()?,
        };
        let speaks = r.read_u8()? != 0;
        let openable = r.read_u8()? != 0;
        let closeable = r.read_u8()? != 0;
        let mut used = [0u8; 8];
        r.read_exact(&mut used)?;
        let pickable = r.read_u8()? != 0;
        let use_with = r.read_u16::<LittleEndian>()?;
        let replace_with = r.read_u16::<LittleEndian>()?;
        let depth = r.read_u8()?;
        let bitmap_ref = r.read_u32::<LittleEndian>()?;
        let bitmap_size = r.read_u16::<LittleEndian>()?;
        let rotating_frames_ref = r.read_u16::<LittleEndian>()?;
        let rotating_palette_ref = r.read_u16::<LittleEndian>()?;
        let drop_x = r.read_u16::<LittleEndian>()?;
        let drop_y = r.read_u16::<LittleEndian>()?;
        let drop_overlay_ref = r.read_u32::<LittleEndian>()?;
        let drop_overlay_size = r.read_u16::<LittleEndian>()?;
        let icon = r.read_u16::<LittleEndian>()?;

        let mut patch = GridPatch {
            x1: r.read_u8()?,
            y1: r.read_u8()?,
            x2: r.read_u8()?,
            y2: r.read_u8()?,
            ..Default::default()
        };
        for col in patch.walk.iter_mut() {
            r.read_exact(col)?;
        }
        for col in patch.mouse.iter_mut() {
            r.read_exact(col)?;
        }

        Ok(Self {
            code,
            pick_height,
            name,
            texts,
            speaks,
            openable,
            closeable,
            used,
            pickable,
            use_with,
            replace_with,
            depth,
            bitmap_ref,
            bitmap_size,
            rotating_frames_ref,
            rotating_palette_ref,
            drop_position: Point::new(drop_x as i32, drop_y as i32),
            drop_overlay_ref,
            drop_overlay_size,
            icon,
            patch,
        })
    }

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u16::<LittleEndian>(self.code)?;
        w.write_u8(self.pick_height.into())?;
        write_pascal(w, &self.name, ITEM_NAME_LEN)?;
        for t in [
            self.texts.look_at,
            self.texts.before_use,
            self.texts.after_use,
            self.texts.pick,
            self.texts.use_,
        ] {
            w.write_u16::<LittleEndian>(t)?;
        }
        w.write_u8(self.speaks as u8)?;
        w.write_u8(self.openable as u8)?;
        w.write_u8(self.closeable as u8)?;
        w.write_all(&self.used)?;
        w.write_u8(self.pickable as u8)?;
        w.write_u16::<LittleEndian>(self.use_with)?;
        w.write_u16::<LittleEndian>(self.replace_with)?;
        w.write_u8(self.depth)?;
        w.write_u32::<LittleEndian>(self.bitmap_ref)?;
        w.write_u16::<LittleEndian>(self.bitmap_size)?;
        w.write_u16::<LittleEndian>(self.rotating_frames_ref)?;
        w.write_u16::<LittleEndian>(self.rotating_palette_ref)?;
        w.write_u16::<LittleEndian>(self.drop_position.x as u16)?;
        w.write_u16::<LittleEndian>(self.drop_position.y as u16)?;
        w.write_u32::<LittleEndian>(self.drop_overlay_ref)?;
        w.write_u16::<LittleEndian>(self.drop_overlay_size)?;
        w.write_u16::<LittleEndian>(self.icon)?;
        w.write_all(&[self.patch.x1, self.patch.y1, self.patch.x2, self.patch.y2])?;
        for col in &self.patch.walk {
            w.write_all(col)?;
        }
        for col in &self.patch.mouse {
            w.write_all(col)?;
        }
        Ok(())
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// All item registers, keyed by code
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: BTreeMap<u16, ItemRegister>,
}

impl ItemCatalog {
    /// Parse a whole item file. A slot is in use when it carries its own code.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % ITEM_RECORD_SIZE != 0 {
            tracing::warn!(
                "Item file has {} trailing bytes",
                bytes.len() % ITEM_RECORD_SIZE
            );
        }
        let mut items = BTreeMap::new();
        let mut cursor = Cursor::new(bytes);
        for slot in 0..bytes.len() / ITEM_RECORD_SIZE {
            let item = ItemRegister::read(&mut cursor)
                .map_err(|e| SceneError::from_read(e, format!("item slot {slot}")))?;
            if item.code as usize == slot && (slot == 0 || item.code != 0) {
                items.insert(item.code, item);
            }
        }
        tracing::info!("Loaded {} item registers", items.len());
        Ok(Self { items })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let slots = self.items.keys().next_back().map_or(0, |&c| c as usize + 1);
        let mut out = Vec::with_capacity(slots * ITEM_RECORD_SIZE);
        for slot in 0..slots {
            let item = self.items.get(&(slot as u16)).cloned().unwrap_or_default();
            // Writing to a Vec cannot fail
            let _ = item.write(&mut out);
        }
        out
    }

    pub fn insert(&mut self, item: ItemRegister) {
        self.items.insert(item.code, item);
    }

    pub fn get(&self, code: u16) -> Result<&ItemRegister> {
        self.items.get(&code).ok_or(SceneError::UnknownItem(code))
    }

    pub fn get_mut(&mut self, code: u16) -> Result<&mut ItemRegister> {
        self.items.get_mut(&code).ok_or(SceneError::UnknownItem(code))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Used flags of every item that has any set, for save games
    pub fn usage(&self) -> Vec<(u16, [u8; 8])> {
        self.items
            .values()
            .filter(|i| i.used.iter().any(|&b| b != 0))
            .map(|i| (i.code, i.used))
            .collect()
    }

    /// Reset all used flags, then apply the saved ones
    pub fn restore_usage(&mut self, usage: &[(u16, [u8; 8])]) {
        for item in self.items.values_mut() {
            item.used = [0; 8];
        }
        for (code, used) in usage {
            match self.items.get_mut(code) {
                Some(item) => item.used = *used,
                None => tracing::warn!("Save references unknown item {}", code),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_item;

    #[test]
    fn record_size() {
        let mut buf = Vec::new();
        ItemRegister::default().write(&mut buf).unwrap();
        assert_eq!(buf.len(), ITEM_RECORD_SIZE);
    }

    #[test]
    fn catalog_survives_a_file_round_trip() {
        let mut catalog = ItemCatalog::default();
        catalog.insert(sample_item(3));
        catalog.insert(sample_item(5));
        let bytes = catalog.to_bytes();
        assert_eq!(bytes.len(), 6 * ITEM_RECORD_SIZE);

        let back = ItemCatalog::from_bytes(&bytes).unwrap();
        assert_eq!(back.get(5).unwrap(), catalog.get(5).unwrap());
        assert!(matches!(back.get(4), Err(SceneError::UnknownItem(4))));
    }

    #[test]
    fn usage_restore_clears_stale_flags() {
        let mut catalog = ItemCatalog::default();
        catalog.insert(sample_item(1));
        catalog.insert(sample_item(2));
        catalog.get_mut(1).unwrap().used[0] = 9;
        let saved = catalog.usage();
        assert_eq!(saved, vec![(1, [9, 0, 0, 0, 0, 0, 0, 0])]);

        catalog.get_mut(2).unwrap().used[3] = 1;
        catalog.restore_usage(&saved);
        assert_eq!(catalog.get(2).unwrap().used, [0; 8]);
        assert_eq!(catalog.get(1).unwrap().used[0], 9);
    }
}
