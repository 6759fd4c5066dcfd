//! Indexed-colour bitmaps and the masked blit primitive
//!
//! Every sprite, overlay, background and dirty patch in the engine is a
//! `Bitmap` of palette indices. Index 0 is reserved as transparent: the
//! masked blit never writes a destination pixel whose source pixel is 0.

use serde::{Deserialize, Serialize};

/// Screen-space integer point (pixels, origin top-left)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Axis-aligned rectangle, `w`/`h` in pixels (empty when either is <= 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        !self.intersection(other).is_empty()
    }

    pub fn intersection(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let r = self.right().min(other.right());
        let b = self.bottom().min(other.bottom());
        Rect::new(x, y, r - x, b - y)
    }

    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let r = self.right().max(other.right());
        let b = self.bottom().max(other.bottom());
        Rect::new(x, y, r - x, b - y)
    }

    /// Grow by `margin` pixels on every side
    pub fn inflate(&self, margin: i32) -> Rect {
        Rect::new(self.x - margin, self.y - margin, self.w + 2 * margin, self.h + 2 * margin)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.right() && p.y < self.bottom()
    }
}

/// Palette-indexed bitmap, row-major
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bitmap {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bitmap({}x{})", self.width, self.height)
    }
}

impl Bitmap {
    /// All-transparent bitmap
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0)
    }

    pub fn filled(width: usize, height: usize, color: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width * height],
        }
    }

    /// Wrap existing pixels; `None` when the buffer does not match the size
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != width * height {
            return None;
        }
        Some(Self { width, height, pixels })
    }

    /// Decode the in-memory sprite layout: u16 LE (width-1), u16 LE (height-1), pixels
    pub fn decode_raw(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }
        let w = u16::from_le_bytes([data[0], data[1]]) as usize + 1;
        let h = u16::from_le_bytes([data[2], data[3]]) as usize + 1;
        let body = data.get(4..4 + w * h)?;
        Self::from_pixels(w, h, body.to_vec())
    }

    /// Inverse of `decode_raw`
    pub fn encode_raw(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.pixels.len());
        out.extend_from_slice(&(self.width.saturating_sub(1) as u16).to_le_bytes());
        out.extend_from_slice(&(self.height.saturating_sub(1) as u16).to_le_bytes());
        out.extend_from_slice(&self.pixels);
        out
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }

    /// Bounds of this bitmap when drawn at `at`
    pub fn rect_at(&self, at: Point) -> Rect {
        Rect::new(at.x, at.y, self.width as i32, self.height as i32)
    }

    pub fn get(&self, x: i32, y: i32) -> Option<u8> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(self.pixels[y as usize * self.width + x as usize])
    }

    pub fn set(&mut self, x: i32, y: i32, color: u8) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        self.pixels[y as usize * self.width + x as usize] = color;
    }

    pub fn fill(&mut self, color: u8) {
        self.pixels.fill(color);
    }

    pub fn is_transparent(&self) -> bool {
        self.pixels.iter().all(|&p| p == 0)
    }

    /// Masked blit: copy the non-zero pixels of `src`, placed at `at` in this
    /// bitmap's coordinates, clipped to the overlap of both.
    pub fn blit_masked(&mut self, src: &Bitmap, at: Point) {
        let overlap = self.bounds().intersection(&src.rect_at(at));
        if overlap.is_empty() {
            return;
        }
        for y in overlap.y..overlap.bottom() {
            let sy = (y - at.y) as usize;
            let src_row = &src.pixels[sy * src.width..(sy + 1) * src.width];
            let dst_start = y as usize * self.width;
            for x in overlap.x..overlap.right() {
                let c = src_row[(x - at.x) as usize];
                if c != 0 {
                    self.pixels[dst_start + x as usize] = c;
                }
            }
        }
    }

    /// Opaque copy of `area` (in `src` coordinates) to `at` in this bitmap
    pub fn copy_from(&mut self, src: &Bitmap, area: Rect, at: Point) {
        let readable = area.intersection(&src.bounds());
        if readable.is_empty() {
            return;
        }
        let target = Rect::new(at.x, at.y, area.w, area.h).intersection(&self.bounds());
        for y in target.y..target.bottom() {
            let sy = area.y + (y - at.y);
            if sy < readable.y || sy >= readable.bottom() {
                continue;
            }
            for x in target.x..target.right() {
                let sx = area.x + (x - at.x);
                if sx < readable.x || sx >= readable.right() {
                    continue;
                }
                self.pixels[y as usize * self.width + x as usize] =
                    src.pixels[sy as usize * src.width + sx as usize];
            }
        }
    }

    /// Cut `area` out of this bitmap (clipped area stays 0)
    pub fn crop(&self, area: Rect) -> Bitmap {
        let mut out = Bitmap::new(area.w.max(0) as usize, area.h.max(0) as usize);
        out.copy_from(self, area, Point::new(0, 0));
        out
    }

    /// Fill this bitmap's zero pixels from the same-sized `src`
    pub fn fill_transparent_from(&mut self, src: &Bitmap) {
        for (dst, &s) in self.pixels.iter_mut().zip(src.pixels.iter()) {
            if *dst == 0 {
                *dst = s;
            }
        }
    }

    /// Shift every row by `dx` columns (negative = left). Vacated columns keep
    /// their previous contents, to be overwritten by the caller.
    pub fn shift_columns(&mut self, dx: i32) {
        if dx == 0 || self.width == 0 {
            return;
        }
        let n = dx.unsigned_abs() as usize;
        if n >= self.width {
            return;
        }
        for row in self.pixels.chunks_mut(self.width) {
            if dx < 0 {
                row.copy_within(n.., 0);
            } else {
                row.copy_within(..row.len() - n, n);
            }
        }
    }
}

/// Animation frames grouped by facing direction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationBank {
    directions: Vec<Vec<Bitmap>>,
}

impl AnimationBank {
    pub fn new(directions: Vec<Vec<Bitmap>>) -> Self {
        Self { directions }
    }

    /// Single-direction bank: every facing maps to the same frames
    pub fn single(frames: Vec<Bitmap>) -> Self {
        Self::new(vec![frames])
    }

    pub fn direction_count(&self) -> usize {
        self.directions.len()
    }

    /// Frames per direction (the shortest direction wins)
    pub fn frame_count(&self) -> usize {
        self.directions.iter().map(Vec::len).min().unwrap_or(0)
    }

    /// Frame `index` facing `dir`; directions past the bank fall back to the first
    pub fn frame(&self, dir: usize, index: usize) -> Option<&Bitmap> {
        let frames = self.directions.get(dir).or_else(|| self.directions.first())?;
        frames.get(index).or_else(|| frames.first())
    }

    /// Size of the first frame, used for footprints and trajectory offsets
    pub fn frame_size(&self) -> (usize, usize) {
        self.frame(0, 0).map_or((0, 0), |f| (f.width(), f.height()))
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }
}
