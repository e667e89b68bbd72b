//! Durable list of changers plus the last-used pointer, one file for the
//! whole registry.

use crate::{
    error::Error,
    json::{JsonWriter, Value},
    migrate,
    model::{capped, Changer, DEFAULT_SLOTS, MAX_CHANGERS, MAX_ID_LEN, MAX_SLOTS, MIN_SLOTS},
    store::Store,
};
use std::{
    fs,
    fs::File,
    io::{BufWriter, Write},
};

const FORMAT_VERSION: i64 = 1;

pub struct Registry {
    changers: Vec<Changer>,
    current_id: String,
}

impl Registry {
    pub fn empty() -> Registry {
        Registry {
            changers: Vec::new(),
            current_id: String::new(),
        }
    }

    pub(crate) fn from_single(changer: Changer) -> Registry {
        let current_id = changer.id.clone();
        Registry {
            changers: vec![changer],
            current_id,
        }
    }

    /// Reads the registry file. An absent file triggers the one-shot legacy
    /// migration; if that yields nothing either, the registry comes back
    /// empty and the caller synthesizes a default changer.
    pub fn load(store: &Store) -> Registry {
        let text = match fs::read_to_string(store.registry_path()) {
            Ok(text) => text,
            Err(_) => {
                return migrate::from_legacy(store).unwrap_or_else(Registry::empty);
            }
        };

        let mut registry = Registry::empty();
        let Some(document) = Value::parse(&text) else {
            return registry;
        };
        if let Some(id) = document.str_of("last_used_id") {
            registry.current_id = capped(id, MAX_ID_LEN);
        }
        for entry in document.array_of("changers").unwrap_or(&[]) {
            if registry.changers.len() >= MAX_CHANGERS {
                // Extra entries in a corrupt file are silently dropped.
                break;
            }
            let Some(id) = entry.str_of("id") else {
                continue;
            };
            if id.is_empty() {
                continue;
            }
            let total_slots = entry
                .int_of("total_slots")
                .map(|n| n as i32)
                .filter(|n| (MIN_SLOTS..=MAX_SLOTS).contains(n))
                .unwrap_or(DEFAULT_SLOTS);
            registry.changers.push(Changer::new(
                id,
                entry.str_of("name").unwrap_or(""),
                entry.str_of("location").unwrap_or(""),
                total_slots,
            ));
        }
        registry.resolve_current();
        registry
    }

    /// Serializes `{version, last_used_id, changers}`, overwrite-in-place.
    pub fn save(&self, store: &Store) -> Result<(), Error> {
        store.ensure_base_dir()?;
        let path = store.registry_path();
        let file = File::create(&path)?;
        let mut w = JsonWriter::new(BufWriter::new(file));
        w.begin_object()?;
        w.key("version")?;
        w.int(FORMAT_VERSION)?;
        w.key("last_used_id")?;
        w.string(&self.current_id)?;
        w.key("changers")?;
        w.begin_array()?;
        for changer in &self.changers {
            w.begin_object()?;
            w.key("id")?;
            w.string(&changer.id)?;
            w.key("name")?;
            w.string(&changer.name)?;
            w.key("location")?;
            w.string(&changer.location)?;
            w.key("total_slots")?;
            w.int(changer.total_slots as i64)?;
            w.end_object()?;
        }
        w.end_array()?;
        w.end_object()?;
        w.into_inner().flush()?;
        log::debug!("saved registry of {} changers to {:?}", self.changers.len(), path);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.changers.is_empty()
    }

    pub fn changers(&self) -> &[Changer] {
        &self.changers
    }

    pub fn get(&self, index: usize) -> Option<&Changer> {
        self.changers.get(index)
    }

    pub fn find(&self, id: &str) -> Option<usize> {
        self.changers.iter().position(|c| c.id == id)
    }

    pub fn current_id(&self) -> &str {
        &self.current_id
    }

    pub fn current_index(&self) -> Option<usize> {
        self.find(&self.current_id)
    }

    pub fn current(&self) -> Option<&Changer> {
        self.current_index().map(|i| &self.changers[i])
    }

    /// Makes `id` current if it names a known changer.
    pub fn set_current(&mut self, id: &str) -> bool {
        if self.find(id).is_some() {
            self.current_id = id.to_string();
            true
        } else {
            false
        }
    }

    /// Creates a changer under the first unused `changer_<n>` id. The id
    /// ordinal skips holes left by deletions so ids stay unique.
    pub fn add(&mut self, name: &str, location: &str, total_slots: i32) -> Result<&Changer, Error> {
        if self.changers.len() >= MAX_CHANGERS {
            return Err(Error::RegistryFull);
        }
        let id = (0..)
            .map(|n| format!("changer_{}", n))
            .find(|id| self.find(id).is_none())
            .unwrap_or_default();
        self.changers
            .push(Changer::new(&id, name, location, total_slots));
        if self.current_id.is_empty() {
            self.current_id = id;
        }
        Ok(self.changers.last().unwrap())
    }

    /// Renames, relocates or resizes an existing changer; out-of-range slot
    /// counts are clamped.
    pub fn update(&mut self, index: usize, name: &str, location: &str, total_slots: i32) -> bool {
        let Some(changer) = self.changers.get_mut(index) else {
            return false;
        };
        let id = changer.id.clone();
        *changer = Changer::new(&id, name, location, total_slots);
        true
    }

    /// Deletes the changer at `index`. Refused (returns `false`) while only
    /// one changer remains, so an initialized registry never goes empty.
    pub fn delete(&mut self, index: usize) -> bool {
        if self.changers.len() <= 1 || index >= self.changers.len() {
            return false;
        }
        self.changers.remove(index);
        self.resolve_current();
        true
    }

    /// Resolves the current id after load or deletion: an unknown or empty
    /// id falls back to the first changer, whose id becomes current.
    fn resolve_current(&mut self) {
        if self.changers.is_empty() {
            self.current_id.clear();
        } else if self.current_index().is_none() {
            self.current_id = self.changers[0].id.clone();
        }
    }
}
