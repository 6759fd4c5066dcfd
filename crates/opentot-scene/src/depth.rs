//! Y-to-depth band tables
//!
//! Actors further down the screen are closer to the camera. Both tables are
//! step functions of Y; values outside the table clamp to the end bands.

/// Upper Y bound (inclusive) of each player band
const PLAYER_BANDS: [i32; 10] = [7, 17, 25, 33, 41, 49, 57, 65, 73, 139];

/// Upper bound (inclusive) of each secondary-actor band, measured at its feet.
/// Bands past the first are ten pixels tall.
const SECONDARY_BANDS: [i32; 10] = [56, 66, 74, 82, 90, 98, 106, 114, 122, 140];

fn band(table: &[i32; 10], y: i32) -> u8 {
    table
        .iter()
        .position(|&upper| y <= upper)
        .unwrap_or(table.len() - 1) as u8
}

/// Depth band of the player sprite from its top Y
pub fn player_depth(y: i32) -> u8 {
    band(&PLAYER_BANDS, y)
}

/// Depth band of the secondary actor from its top Y and sprite height
pub fn secondary_depth(y: i32, height: i32) -> u8 {
    band(&SECONDARY_BANDS, y + height - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_band_edges() {
        for (y, depth) in [(0, 0), (7, 0), (8, 1), (17, 1), (18, 2), (65, 7), (66, 8), (73, 8), (74, 9), (139, 9)] {
            assert_eq!(player_depth(y), depth, "y = {y}");
        }
    }

    #[test]
    fn out_of_table_values_clamp() {
        assert_eq!(player_depth(-5), 0);
        assert_eq!(player_depth(400), 9);
        assert_eq!(secondary_depth(200, 10), 9);
    }

    #[test]
    fn secondary_bands_use_feet() {
        assert_eq!(secondary_depth(20, 37), 0); // feet at 56
        assert_eq!(secondary_depth(20, 38), 1); // feet at 57
        assert_eq!(secondary_depth(80, 43), 8); // feet at 122
        assert_eq!(secondary_depth(80, 44), 9);
    }

    #[test]
    fn secondary_band_edges() {
        let cases = [
            (64, 1),
            (65, 1),
            (66, 1),
            (67, 2),
            (74, 2),
            (75, 3),
            (120, 8),
            (121, 8),
            (122, 8),
            (123, 9),
            (140, 9),
        ];
        for (feet, depth) in cases {
            assert_eq!(secondary_depth(feet - 9, 10), depth, "feet = {feet}");
        }
    }

    #[test]
    fn depth_is_monotonic_in_y() {
        let mut last = 0;
        for y in -10..200 {
            let d = player_depth(y);
            assert!(d >= last);
            last = d;
        }
        let mut last = 0;
        for y in -10..200 {
            let d = secondary_depth(y, 30);
            assert!(d >= last);
            last = d;
        }
    }
}
