//! On-disk slot store: one JSON file per changer.
//!
//! Loads materialize only the cache window; saves persist the full logical
//! range by overlaying the window onto the previously persisted slots, so
//! slots outside the window survive recentre/save cycles.

use crate::{
    cache::CacheWindow,
    error::Error,
    json::{JsonWriter, Value},
    model::{capped, clamp_slot_count, Cd, Changer, Slot, Track},
    model::{
        CACHE_SIZE, MAX_ALBUM_LEN, MAX_ARTIST_LEN, MAX_DURATION_LEN, MAX_GENRE_LEN,
        MAX_NOTES_LEN, MAX_TRACKS, MAX_TRACK_TITLE_LEN,
    },
};
use std::{
    fs,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

pub const REGISTRY_FILE: &str = "flipchanger_changers.json";
pub const LEGACY_FILE: &str = "flipchanger_data.json";

const FORMAT_VERSION: i64 = 1;

pub struct Store {
    base: PathBuf,
}

impl Store {
    pub fn new(base: impl Into<PathBuf>) -> Store {
        Store { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn registry_path(&self) -> PathBuf {
        self.base.join(REGISTRY_FILE)
    }

    pub fn legacy_path(&self) -> PathBuf {
        self.base.join(LEGACY_FILE)
    }

    /// Deterministic per-changer file name. The legacy single-changer path
    /// is used only when no changer id is set.
    pub fn slots_path(&self, changer_id: &str) -> PathBuf {
        if changer_id.is_empty() {
            self.legacy_path()
        } else {
            self.base.join(format!("flipchanger_{}.json", changer_id))
        }
    }

    pub fn ensure_base_dir(&self) -> Result<(), Error> {
        fs::create_dir_all(&self.base)?;
        Ok(())
    }

    /// Reads and parses a JSON file. Absent or unparseable files read as
    /// `None`; callers fall back to defaults.
    pub(crate) fn read_document(&self, path: &Path) -> Option<Value> {
        let text = fs::read_to_string(path).ok()?;
        Value::parse(&text)
    }

    /// Loads a cache window starting at logical index `start` from the
    /// changer's file. An absent or corrupt file yields an all-empty window
    /// sized by the changer's registered slot count.
    pub fn load_window(&self, changer: &Changer, start: i32) -> CacheWindow {
        let document = self.read_document(&self.slots_path(&changer.id));
        let total_slots = file_total_slots(document.as_ref(), changer.total_slots);
        let start = start.clamp(0, (total_slots - CACHE_SIZE as i32).max(0));
        let len = CACHE_SIZE.min((total_slots - start) as usize);

        let mut loaded = Vec::with_capacity(len);
        if let Some(slots) = document.as_ref().and_then(|doc| doc.array_of("slots")) {
            for (i, entry) in slots.iter().enumerate().skip(start as usize).take(len) {
                loaded.push(parse_slot(entry, i as i32 + 1));
            }
        }
        log::debug!(
            "loaded window [{}, {}) of {:?}",
            start,
            start + len as i32,
            changer.id,
        );
        CacheWindow::from_parts(total_slots, start, loaded)
    }

    /// Loads the full persisted slot range, padding to `total_slots` with
    /// empty slots where the file has fewer entries.
    pub fn load_all_slots(&self, changer: &Changer) -> (i32, Vec<Slot>) {
        let document = self.read_document(&self.slots_path(&changer.id));
        let total_slots = file_total_slots(document.as_ref(), changer.total_slots);
        let mut all: Vec<Slot> = (1..=total_slots).map(Slot::empty).collect();
        if let Some(slots) = document.as_ref().and_then(|doc| doc.array_of("slots")) {
            for (i, entry) in slots.iter().take(total_slots as usize).enumerate() {
                all[i] = parse_slot(entry, i as i32 + 1);
            }
        }
        (total_slots, all)
    }

    /// Persists the changer file, overlaying `window` onto the previously
    /// persisted slots so the whole `[1, total_slots]` range is written.
    /// Overwrite-in-place; a power loss mid-write corrupts the file, which
    /// the forgiving reader then treats as empty.
    pub fn save_window(&self, changer: &Changer, window: &CacheWindow) -> Result<(), Error> {
        let total_slots = window.total_slots();
        let (_, mut all) = self.load_all_slots(changer);
        all.resize_with(total_slots as usize, || Slot::empty(0));
        for (offset, slot) in window.slots().iter().enumerate() {
            all[window.start() as usize + offset] = slot.clone();
        }
        for (i, slot) in all.iter_mut().enumerate() {
            slot.slot_number = i as i32 + 1;
        }

        self.ensure_base_dir()?;
        let path = self.slots_path(&changer.id);
        let file = File::create(&path)?;
        let mut w = JsonWriter::new(BufWriter::new(file));
        w.begin_object()?;
        w.key("version")?;
        w.int(FORMAT_VERSION)?;
        w.key("total_slots")?;
        w.int(total_slots as i64)?;
        w.key("slots")?;
        w.begin_array()?;
        for slot in &all {
            write_slot(&mut w, slot)?;
        }
        w.end_array()?;
        w.end_object()?;
        w.into_inner().flush()?;
        log::debug!("saved {} slots to {:?}", all.len(), path);
        Ok(())
    }

    /// Writes the initial empty file for a newly created changer.
    pub fn seed_slots_file(&self, changer: &Changer) -> Result<(), Error> {
        self.ensure_base_dir()?;
        let body = format!(
            "{{\"version\":{},\"total_slots\":{},\"slots\":[]}}",
            FORMAT_VERSION, changer.total_slots,
        );
        fs::write(self.slots_path(&changer.id), body)?;
        Ok(())
    }
}

fn file_total_slots(document: Option<&Value>, fallback: i32) -> i32 {
    let total = document
        .and_then(|doc| doc.int_of("total_slots"))
        .map(|n| n as i32)
        .unwrap_or(fallback);
    clamp_slot_count(total)
}

fn parse_slot(entry: &Value, slot_number: i32) -> Slot {
    let mut slot = Slot::empty(slot_number);
    if let Some(number) = entry.int_of("slot") {
        slot.slot_number = number as i32;
    }
    slot.occupied = entry.bool_of("occupied").unwrap_or(false);
    if slot.occupied {
        slot.cd = parse_cd(entry);
    }
    slot
}

fn parse_cd(entry: &Value) -> Cd {
    let mut cd = Cd {
        artist: capped(entry.str_of("artist").unwrap_or(""), MAX_ARTIST_LEN),
        album_artist: capped(entry.str_of("album_artist").unwrap_or(""), MAX_ARTIST_LEN),
        album: capped(entry.str_of("album").unwrap_or(""), MAX_ALBUM_LEN),
        year: entry.int_of("year").unwrap_or(0) as i32,
        disc_number: (entry.int_of("disc_number").unwrap_or(0) as i32).max(0),
        genre: capped(entry.str_of("genre").unwrap_or(""), MAX_GENRE_LEN),
        tracks: Vec::new(),
        notes: capped(entry.str_of("notes").unwrap_or(""), MAX_NOTES_LEN),
    };
    if let Some(tracks) = entry.array_of("tracks") {
        for (i, track) in tracks.iter().take(MAX_TRACKS).enumerate() {
            cd.tracks.push(Track {
                number: track.int_of("num").unwrap_or(i as i64 + 1) as i32,
                title: capped(track.str_of("title").unwrap_or(""), MAX_TRACK_TITLE_LEN),
                duration: capped(track.str_of("duration").unwrap_or(""), MAX_DURATION_LEN),
            });
        }
    }
    cd
}

fn write_slot<W: Write>(w: &mut JsonWriter<W>, slot: &Slot) -> std::io::Result<()> {
    w.begin_object()?;
    w.key("slot")?;
    w.int(slot.slot_number as i64)?;
    w.key("occupied")?;
    w.boolean(slot.occupied)?;
    // Unoccupied slots carry no CD fields.
    if slot.occupied {
        let cd = &slot.cd;
        w.key("artist")?;
        w.string(&cd.artist)?;
        w.key("album_artist")?;
        w.string(&cd.album_artist)?;
        w.key("album")?;
        w.string(&cd.album)?;
        w.key("year")?;
        w.int(cd.year as i64)?;
        w.key("disc_number")?;
        w.int(cd.disc_number as i64)?;
        w.key("genre")?;
        w.string(&cd.genre)?;
        w.key("tracks")?;
        w.begin_array()?;
        for track in &cd.tracks {
            w.begin_object()?;
            w.key("num")?;
            w.int(track.number as i64)?;
            w.key("title")?;
            w.string(&track.title)?;
            w.key("duration")?;
            w.string(&track.duration)?;
            w.end_object()?;
        }
        w.end_array()?;
        w.key("notes")?;
        w.string(&cd.notes)?;
    }
    w.end_object()
}
