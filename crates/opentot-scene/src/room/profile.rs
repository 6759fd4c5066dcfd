//! Per-room behaviour hooks, resolved once when a room is loaded
//!
//! A handful of rooms bend the generic rules: fixed secondary-actor depths,
//! route extensions through wide doorways, zone redirects while an actor
//! blocks the floor, looping ambient sounds. Everything room-specific that
//! the engine consults per tick lives here instead of in the tick path.

use super::RoomRecord;
use crate::bitmap::Point;
use crate::host::SoundCue;

/// How the secondary actor's depth is chosen each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryDepth {
    /// Derived from its feet Y via the band table
    Banded,
    Fixed(u8),
}

/// Redirected walk target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneRedirect {
    pub zone: u8,
    pub click: Point,
    /// Overrides the barred-zone flag when set
    pub barred: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomProfile {
    pub code: u16,
    pub secondary_depth: SecondaryDepth,
    /// Depth used right after the actor is placed on room entry
    pub secondary_entry_depth: Option<u8>,
    /// False when the actor only appears through saved puzzle state
    pub load_secondary_on_entry: bool,
    /// Exit zone whose route keeps its terminating waypoint
    pub route_extension_zone: Option<u8>,
    /// Zones rerouted while the room's secondary actor is active
    redirect_zones: &'static [u8],
    redirect: Option<ZoneRedirect>,
    /// Redirected zone that also drops the barred flag
    unbarred_zone: Option<u8>,
    pub ambient_sound: Option<SoundCue>,
}

const ROOM21_REDIRECTS: &[u8] = &[1, 2, 3, 4, 5, 9, 10, 11, 12, 13, 18, 19, 20, 21, 24, 25];

impl RoomProfile {
    pub fn resolve(room: &RoomRecord) -> Self {
        let mut profile = RoomProfile {
            code: room.code,
            secondary_depth: SecondaryDepth::Banded,
            secondary_entry_depth: None,
            load_secondary_on_entry: true,
            route_extension_zone: None,
            redirect_zones: &[],
            redirect: None,
            unbarred_zone: None,
            ambient_sound: None,
        };

        match room.code {
            4 => profile.ambient_sound = Some(SoundCue::new("GOTA", 140972, 1029)),
            5 => {
                profile.route_extension_zone = Some(27);
                profile.ambient_sound = Some(SoundCue::new("CALDERA", 6433, 15386));
            }
            6 => {
                profile.route_extension_zone = Some(21);
                profile.ambient_sound = Some(SoundCue::new("CALDERA", 6433, 15386));
            }
            21 => {
                profile.redirect_zones = ROOM21_REDIRECTS;
                profile.redirect = Some(ZoneRedirect {
                    zone: 7,
                    click: Point::new(232, 75),
                    barred: None,
                });
                profile.unbarred_zone = Some(24);
            }
            23 => {
                profile.secondary_depth = SecondaryDepth::Fixed(0);
                profile.ambient_sound = Some(SoundCue::new("FUENTE", 0, 0));
            }
            24 => {
                profile.secondary_depth = SecondaryDepth::Fixed(14);
                profile.load_secondary_on_entry = false;
            }
            _ => {}
        }

        if room.secondary.name == "FUENTE01" {
            profile.secondary_entry_depth = Some(0);
        }
        profile
    }

    /// Rewrite a walk target while the secondary actor is active
    pub fn redirect_target(&self, zone: u8, secondary_active: bool) -> Option<ZoneRedirect> {
        if !secondary_active || !self.redirect_zones.contains(&zone) {
            return None;
        }
        let mut redirect = self.redirect?;
        if self.unbarred_zone == Some(zone) {
            redirect.barred = Some(false);
        }
        Some(redirect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_room_has_no_hooks() {
        let profile = RoomProfile::resolve(&RoomRecord::new(12));
        assert_eq!(profile.secondary_depth, SecondaryDepth::Banded);
        assert!(profile.load_secondary_on_entry);
        assert!(profile.redirect_target(3, true).is_none());
        assert!(profile.ambient_sound.is_none());
    }

    #[test]
    fn fixed_depth_rooms() {
        assert_eq!(RoomProfile::resolve(&RoomRecord::new(23)).secondary_depth, SecondaryDepth::Fixed(0));
        let p24 = RoomProfile::resolve(&RoomRecord::new(24));
        assert_eq!(p24.secondary_depth, SecondaryDepth::Fixed(14));
        assert!(!p24.load_secondary_on_entry);
    }

    #[test]
    fn room21_redirects_only_while_actor_is_active() {
        let profile = RoomProfile::resolve(&RoomRecord::new(21));
        assert!(profile.redirect_target(3, false).is_none());
        let r = profile.redirect_target(3, true).unwrap();
        assert_eq!((r.zone, r.click, r.barred), (7, Point::new(232, 75), None));
        assert_eq!(profile.redirect_target(24, true).unwrap().barred, Some(false));
        assert!(profile.redirect_target(7, true).is_none());
    }

    #[test]
    fn fountain_animation_starts_at_back() {
        let mut room = RoomRecord::new(23);
        room.secondary.name = "FUENTE01".into();
        assert_eq!(RoomProfile::resolve(&room).secondary_entry_depth, Some(0));
    }
}
