//! Game data files and the `ResourceLoader` over them
//!
//! Files read from the data directory:
//!   PANTALLA.DAT  - room records (opened by `RoomRegistry`)
//!   OBJETOS.DAT   - item registers
//!   FONDOS.DAT    - bitmap archive; rooms and layers point into it by offset
//!   PALETAS.DAT   - 256 six-bit VGA triplets
//!   PERSONAJ.SPT  - the player's walk cycle
//!   <NAME>.DAT    - secondary actor animations

pub mod palette;

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use opentot_scene::items::ItemCatalog;
use opentot_scene::room::{RoomRecord, ScreenLayer};
use opentot_scene::{AnimationBank, Bitmap, ResourceLoader, SceneError, WALK_FRAME_COUNT};

use palette::Palette;

pub const ROOM_FILE: &str = "PANTALLA.DAT";
pub const ITEM_FILE: &str = "OBJETOS.DAT";
pub const BITMAP_FILE: &str = "FONDOS.DAT";
pub const PALETTE_FILE: &str = "PALETAS.DAT";
pub const PLAYER_FILE: &str = "PERSONAJ.SPT";

/// Directions stored in a multi-direction animation file
const ANIMATION_DIRECTIONS: usize = 4;

/// Everything the session needs from disk, except the room file itself
pub struct AssetStore {
    pub game_dir: PathBuf,
    bitmaps: File,
    items: ItemCatalog,
    palette: Palette,
}

impl AssetStore {
    pub fn load(game_dir: &Path) -> Result<Self> {
        let item_path = game_dir.join(ITEM_FILE);
        tracing::info!("Parsing: {}", ITEM_FILE);
        let item_bytes =
            std::fs::read(&item_path).with_context(|| format!("Cannot read {}", item_path.display()))?;
        let items = ItemCatalog::from_bytes(&item_bytes).context("Item file is corrupt")?;

        let bitmap_path = game_dir.join(BITMAP_FILE);
        let bitmaps =
            File::open(&bitmap_path).with_context(|| format!("Cannot open {}", bitmap_path.display()))?;

        let palette_path = game_dir.join(PALETTE_FILE);
        let palette = match std::fs::read(&palette_path) {
            Ok(bytes) => Palette::from_vga(&bytes)
                .with_context(|| format!("{} holds {} bytes", PALETTE_FILE, bytes.len()))?,
            Err(e) => {
                tracing::warn!("No palette ({}), using greyscale", e);
                Palette::greyscale()
            }
        };

        Ok(Self {
            game_dir: game_dir.to_path_buf(),
            bitmaps,
            items,
            palette,
        })
    }

    pub fn room_file(&self) -> PathBuf {
        self.game_dir.join(ROOM_FILE)
    }

    pub fn items(&self) -> &ItemCatalog {
        &self.items
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Read `size` bytes at `offset` of the bitmap archive and decode them
    fn read_bitmap(&mut self, offset: u64, size: usize, what: &str) -> opentot_scene::Result<Bitmap> {
        let mut data = vec![0u8; size];
        self.bitmaps.seek(SeekFrom::Start(offset))?;
        self.bitmaps
            .read_exact(&mut data)
            .map_err(|e| SceneError::from_read(e, what.to_string()))?;
        Bitmap::decode_raw(&data)
            .ok_or_else(|| SceneError::Resource(format!("{what} at {offset} is not a bitmap")))
    }

    fn open_animation(&self, file_name: &str) -> opentot_scene::Result<BufReader<File>> {
        let path = self.game_dir.join(file_name);
        let file = File::open(&path).map_err(|e| SceneError::from_read(e, file_name.to_string()))?;
        Ok(BufReader::new(file))
    }
}

/// Read `count` frames of `frame_size` bytes each
fn read_frames<R: Read>(r: &mut R, frame_size: usize, count: usize, what: &str) -> opentot_scene::Result<Vec<Bitmap>> {
    let mut frames = Vec::with_capacity(count);
    let mut data = vec![0u8; frame_size];
    for i in 0..count {
        r.read_exact(&mut data)
            .map_err(|e| SceneError::from_read(e, format!("{what} frame {i}")))?;
        let frame = Bitmap::decode_raw(&data)
            .ok_or_else(|| SceneError::Resource(format!("{what} frame {i} does not decode")))?;
        frames.push(frame);
    }
    Ok(frames)
}

/// Secondary animation file: u16 frame size, u8 frame count, u8 direction
/// flag, then the frames. A non-zero flag splits the frames over four
/// directions.
pub fn read_animation<R: Read>(r: &mut R, what: &str) -> opentot_scene::Result<AnimationBank> {
    let header = |e: std::io::Error| SceneError::from_read(e, format!("{what} header"));
    let frame_size = r.read_u16::<LittleEndian>().map_err(header)? as usize;
    let frame_count = r.read_u8().map_err(header)? as usize;
    let directions = r.read_u8().map_err(header)?;

    if directions == 0 {
        return Ok(AnimationBank::single(read_frames(r, frame_size, frame_count, what)?));
    }
    let per_direction = frame_count / ANIMATION_DIRECTIONS;
    let mut banks = Vec::with_capacity(ANIMATION_DIRECTIONS);
    for _ in 0..ANIMATION_DIRECTIONS {
        banks.push(read_frames(r, frame_size, per_direction, what)?);
    }
    Ok(AnimationBank::new(banks))
}

/// Player file: u16 frame size, then four directions of the walk cycle
pub fn read_player<R: Read>(r: &mut R) -> opentot_scene::Result<AnimationBank> {
    let frame_size = r
        .read_u16::<LittleEndian>()
        .map_err(|e| SceneError::from_read(e, format!("{PLAYER_FILE} header")))? as usize;
    let mut banks = Vec::with_capacity(ANIMATION_DIRECTIONS);
    for _ in 0..ANIMATION_DIRECTIONS {
        banks.push(read_frames(r, frame_size, WALK_FRAME_COUNT, PLAYER_FILE)?);
    }
    Ok(AnimationBank::new(banks))
}

impl ResourceLoader for AssetStore {
    fn room_background(&mut self, room: &RoomRecord) -> opentot_scene::Result<Bitmap> {
        self.read_bitmap(
            room.image_ref as u64,
            room.image_size as usize,
            &format!("background of room {}", room.code),
        )
    }

    fn layer_bitmap(&mut self, layer: &ScreenLayer) -> opentot_scene::Result<Bitmap> {
        let offset = u64::try_from(layer.bitmap_ref)
            .map_err(|_| SceneError::Resource(format!("overlay reference {}", layer.bitmap_ref)))?;
        self.read_bitmap(offset, layer.bitmap_size as usize, "overlay")
    }

    fn secondary_animation(&mut self, name: &str) -> opentot_scene::Result<AnimationBank> {
        let file_name = format!("{}.DAT", name.trim());
        tracing::debug!("Loading animation {}", file_name);
        let mut reader = self.open_animation(&file_name)?;
        read_animation(&mut reader, &file_name)
    }

    fn player_animation(&mut self) -> opentot_scene::Result<AnimationBank> {
        let mut reader = self.open_animation(PLAYER_FILE)?;
        read_player(&mut reader)
    }

    fn object_name(&mut self, index: u16) -> opentot_scene::Result<String> {
        Ok(self.items.get(index)?.name.clone())
    }
}
