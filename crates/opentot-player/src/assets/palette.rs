//! VGA palette and its runtime animation

/// First and last entry of the slice that cycles on animated rooms
pub const ANIMATED_FIRST: usize = 195;
pub const ANIMATED_LAST: usize = 200;
/// Six-bit level of the static-noise grey on a switched-on TV
const TV_STATIC_LEVEL: u8 = 2;

const VGA_BYTES: usize = 256 * 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    rgb: [[u8; 3]; 256],
}

/// Widen a six-bit DAC value to eight bits
fn widen(v: u8) -> u8 {
    (v & 0x3F) << 2
}

impl Palette {
    /// 256 six-bit triplets, as a VGA DAC takes them. Trailing bytes are ignored.
    pub fn from_vga(data: &[u8]) -> Option<Self> {
        let data = data.get(..VGA_BYTES)?;
        let mut rgb = [[0u8; 3]; 256];
        for (entry, chunk) in rgb.iter_mut().zip(data.chunks_exact(3)) {
            *entry = [widen(chunk[0]), widen(chunk[1]), widen(chunk[2])];
        }
        Some(Self { rgb })
    }

    pub fn greyscale() -> Self {
        let mut rgb = [[0u8; 3]; 256];
        for (i, entry) in rgb.iter_mut().enumerate() {
            *entry = [i as u8; 3];
        }
        Self { rgb }
    }

    /// 0x00RRGGBB, the layout minifb expects
    pub fn argb(&self, index: u8) -> u32 {
        let [r, g, b] = self.rgb[index as usize];
        ((r as u32) << 16) | ((g as u32) << 8) | b as u32
    }

    /// Rotate the animated slice by one entry
    pub fn rotate(&mut self) {
        self.rgb[ANIMATED_FIRST..=ANIMATED_LAST].rotate_right(1);
    }

    pub fn tv_static(&mut self) {
        let grey = widen(TV_STATIC_LEVEL);
        for entry in &mut self.rgb[ANIMATED_FIRST..=ANIMATED_LAST] {
            *entry = [grey; 3];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_six_bit_values_are_widened() {
        let mut data = vec![0u8; VGA_BYTES];
        data[3..6].copy_from_slice(&[63, 32, 1]);
        let pal = Palette::from_vga(&data).unwrap();
        assert_eq!(pal.argb(1), 0x00FC_8004);
        assert_eq!(pal.argb(0), 0);
    }

    #[test]
    fn test_short_palette_is_rejected() {
        assert!(Palette::from_vga(&[0; 100]).is_none());
    }

    #[test]
    fn test_rotation_only_touches_the_animated_slice() {
        let mut pal = Palette::greyscale();
        pal.rotate();
        assert_eq!(pal.argb(196), 0x00C3_C3C3);
        assert_eq!(pal.argb(195), 0x00C8_C8C8);
        assert_eq!(pal.argb(201), 0x00C9_C9C9);
        assert_eq!(pal.argb(194), 0x00C2_C2C2);
    }

    #[test]
    fn test_tv_static_greys_the_slice() {
        let mut pal = Palette::greyscale();
        pal.tv_static();
        for i in ANIMATED_FIRST..=ANIMATED_LAST {
            assert_eq!(pal.argb(i as u8), 0x0008_0808);
        }
        assert_eq!(pal.argb(10), 0x000A_0A0A);
    }
}
