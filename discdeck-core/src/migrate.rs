//! One-shot upgrade from the pre-multi-changer layout: a single data file at
//! a fixed path, with no registry.
//!
//! Idempotent by absence: it only ever runs when the registry file is
//! missing, and a missing legacy file just means first run.

use crate::{
    json::Value,
    model::{Changer, DEFAULT_SLOTS, MAX_SLOTS, MIN_SLOTS},
    registry::Registry,
    store::Store,
};
use std::fs;

/// Migrates the legacy single data file into the registry + per-changer
/// layout under a synthesized `changer_0`/"Default" changer. Returns `None`
/// when there is nothing to migrate.
pub fn from_legacy(store: &Store) -> Option<Registry> {
    let bytes = fs::read(store.legacy_path()).ok()?;

    let total_slots = Value::parse(&String::from_utf8_lossy(&bytes))
        .and_then(|doc| doc.int_of("total_slots"))
        .map(|n| n as i32)
        .filter(|n| (MIN_SLOTS..=MAX_SLOTS).contains(n))
        .unwrap_or(DEFAULT_SLOTS);

    // The payload moves verbatim; the forgiving reader handles the rest.
    let changer = Changer::new("changer_0", "Default", "", total_slots);
    if store.ensure_base_dir().is_err() {
        return None;
    }
    let target = store.slots_path(&changer.id);
    if let Err(err) = fs::write(&target, &bytes) {
        log::error!("legacy migration failed writing {:?}: {}", target, err);
        return None;
    }

    let registry = Registry::from_single(changer);
    if let Err(err) = registry.save(store) {
        log::error!("legacy migration failed saving registry: {}", err);
    }
    log::info!("migrated legacy data file to {:?}", target);
    Some(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn migrates_legacy_file_into_new_layout() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path());
        store.ensure_base_dir().unwrap();
        let payload = r#"{"version":1,"total_slots":50,"slots":[{"slot":1,"occupied":true,"artist":"Can","album_artist":"","album":"Ege Bamyasi","year":1972,"disc_number":1,"genre":"Krautrock","tracks":[],"notes":""}]}"#;
        fs::write(store.legacy_path(), payload).unwrap();

        let registry = Registry::load(&store);
        assert_eq!(registry.changers().len(), 1);
        let changer = &registry.changers()[0];
        assert_eq!(changer.id, "changer_0");
        assert_eq!(changer.name, "Default");
        assert_eq!(changer.total_slots, 50);
        assert_eq!(registry.current_id(), "changer_0");

        // Per-changer file is byte-identical to the legacy payload.
        let migrated = fs::read(store.slots_path("changer_0")).unwrap();
        assert_eq!(migrated, payload.as_bytes());

        // The new registry is on disk, so the next load skips migration.
        let reloaded = Registry::load(&store);
        assert_eq!(reloaded.changers().len(), 1);
    }

    #[test]
    fn out_of_range_legacy_slot_count_defaults() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path());
        store.ensure_base_dir().unwrap();
        fs::write(store.legacy_path(), r#"{"total_slots":1,"slots":[]}"#).unwrap();
        let registry = from_legacy(&store).unwrap();
        assert_eq!(registry.changers()[0].total_slots, DEFAULT_SLOTS);
    }

    #[test]
    fn absent_legacy_file_is_first_run() {
        let dir = TempDir::new().unwrap();
        assert!(from_legacy(&Store::new(dir.path())).is_none());
    }
}
