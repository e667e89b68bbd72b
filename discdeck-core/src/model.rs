//! Core catalog types: changers, slots, CDs and tracks.
//!
//! Field lengths and collection sizes are capped at the limits of the device
//! format; anything longer is truncated at the boundary instead of being
//! reported as an error.

/// Smallest changer the catalog accepts.
pub const MIN_SLOTS: i32 = 3;
/// Largest changer the catalog accepts.
pub const MAX_SLOTS: i32 = 200;
/// Slot count for a newly created or synthesized changer.
pub const DEFAULT_SLOTS: i32 = 100;

/// Number of slots held in memory at a time.
pub const CACHE_SIZE: usize = 10;

pub const MAX_CHANGERS: usize = 10;
pub const MAX_TRACKS: usize = 20;

pub const MAX_ID_LEN: usize = 23;
pub const MAX_NAME_LEN: usize = 32;
pub const MAX_LOCATION_LEN: usize = 32;
pub const MAX_ARTIST_LEN: usize = 63;
pub const MAX_ALBUM_LEN: usize = 63;
pub const MAX_GENRE_LEN: usize = 32;
pub const MAX_TRACK_TITLE_LEN: usize = 63;
pub const MAX_DURATION_LEN: usize = 15;
pub const MAX_NOTES_LEN: usize = 255;

pub fn clamp_slot_count(count: i32) -> i32 {
    count.clamp(MIN_SLOTS, MAX_SLOTS)
}

/// Truncates `value` to at most `max` bytes, on a character boundary.
pub fn capped(value: &str, max: usize) -> String {
    if value.len() <= max {
        return value.to_string();
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

/// One physical multi-disc changer: identity, display metadata and capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changer {
    pub id: String,
    pub name: String,
    pub location: String,
    pub total_slots: i32,
}

impl Changer {
    pub fn new(id: &str, name: &str, location: &str, total_slots: i32) -> Changer {
        Changer {
            id: capped(id, MAX_ID_LEN),
            name: capped(name, MAX_NAME_LEN),
            location: capped(location, MAX_LOCATION_LEN),
            total_slots: clamp_slot_count(total_slots),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Track {
    /// Advisory display number; playback order is the array position.
    pub number: i32,
    pub title: String,
    /// Integer seconds, kept as the string the file carried.
    pub duration: String,
}

impl Track {
    pub fn new(number: i32, title: &str, duration: &str) -> Track {
        Track {
            number,
            title: capped(title, MAX_TRACK_TITLE_LEN),
            duration: capped(duration, MAX_DURATION_LEN),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cd {
    pub artist: String,
    pub album_artist: String,
    pub album: String,
    pub year: i32,
    pub disc_number: i32,
    pub genre: String,
    pub tracks: Vec<Track>,
    pub notes: String,
}

impl Cd {
    /// Appends a track, silently refusing past [`MAX_TRACKS`].
    pub fn add_track(&mut self, track: Track) {
        if self.tracks.len() < MAX_TRACKS {
            self.tracks.push(track);
        }
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }
}

/// One addressable disc position in a changer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// 1-based display identity within the changer's logical range.
    pub slot_number: i32,
    pub occupied: bool,
    pub cd: Cd,
}

impl Slot {
    pub fn empty(slot_number: i32) -> Slot {
        Slot {
            slot_number,
            occupied: false,
            cd: Cd::default(),
        }
    }

    /// Empties the slot, zeroing the CD metadata.
    pub fn clear(&mut self) {
        self.occupied = false;
        self.cd = Cd::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_count_clamps_at_both_ends() {
        assert_eq!(clamp_slot_count(0), MIN_SLOTS);
        assert_eq!(clamp_slot_count(2), MIN_SLOTS);
        assert_eq!(clamp_slot_count(100), 100);
        assert_eq!(clamp_slot_count(1000), MAX_SLOTS);
    }

    #[test]
    fn capped_respects_char_boundaries() {
        assert_eq!(capped("short", 32), "short");
        assert_eq!(capped("abcdef", 3), "abc");
        // 'é' is two bytes; cutting inside it backs off to the boundary.
        assert_eq!(capped("aéb", 2), "a");
    }

    #[test]
    fn tracks_cap_at_limit() {
        let mut cd = Cd::default();
        for n in 0..MAX_TRACKS as i32 + 5 {
            cd.add_track(Track::new(n + 1, "t", "180"));
        }
        assert_eq!(cd.track_count(), MAX_TRACKS);
    }
}
