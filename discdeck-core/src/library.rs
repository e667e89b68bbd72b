//! Owning facade over the registry, the slot store and the cache window.
//!
//! A `Library` is passed by reference into UI handlers instead of living in
//! global state. Render paths get `&Library` and can only do window-relative
//! reads; everything that touches storage takes `&mut Library` and belongs
//! to input handling or the main loop tick.
//!
//! Changer switches requested from an input handler go through a command
//! channel and are executed by [`Library::handle_pending`] on the next main
//! loop tick, keeping file I/O out of input dispatch entirely.

use crate::{
    cache::CacheWindow,
    error::Error,
    model::{clamp_slot_count, Changer, Slot, DEFAULT_SLOTS},
    registry::Registry,
    store::Store,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::PathBuf;

/// Deferred operations sent from input handling, drained by the main loop.
#[derive(Debug, Clone)]
pub enum Command {
    SwitchChanger { id: String },
}

pub struct Library {
    store: Store,
    registry: Registry,
    window: CacheWindow,
    sender: Sender<Command>,
    receiver: Receiver<Command>,
}

impl Library {
    /// Opens the catalog under `base`: loads the registry (running the
    /// legacy migration if needed), synthesizes the default changer on first
    /// run, and loads the initial window of the current changer.
    pub fn open(base: impl Into<PathBuf>) -> Result<Library, Error> {
        let store = Store::new(base);
        let mut registry = Registry::load(&store);
        if registry.is_empty() {
            log::info!("first run, creating the default changer");
            let changer = registry.add("Default", "", DEFAULT_SLOTS)?.clone();
            store.seed_slots_file(&changer)?;
            registry.save(&store)?;
        }
        let changer = registry.current().cloned().ok_or(Error::ChangerNotFound)?;
        let window = store.load_window(&changer, 0);

        let (sender, receiver) = unbounded();
        let mut library = Library {
            store,
            registry,
            window,
            sender,
            receiver,
        };
        library.sync_total_slots();
        Ok(library)
    }

    /// Sender half of the command queue, for input handlers.
    pub fn sender(&self) -> Sender<Command> {
        self.sender.clone()
    }

    /// Drains queued commands. Called from the main loop tick, never from a
    /// callback, so the load/save round trips happen on a shallow stack.
    pub fn handle_pending(&mut self) -> Result<(), Error> {
        while let Ok(command) = self.receiver.try_recv() {
            match command {
                Command::SwitchChanger { id } => self.switch_changer(&id)?,
            }
        }
        Ok(())
    }

    pub fn changers(&self) -> &[Changer] {
        self.registry.changers()
    }

    pub fn current_changer(&self) -> Option<&Changer> {
        self.registry.current()
    }

    pub fn total_slots(&self) -> i32 {
        self.window.total_slots()
    }

    pub fn window(&self) -> &CacheWindow {
        &self.window
    }

    /// Read access to a slot by logical index. Off-window slots read as
    /// `None` ("unknown"); no implicit load happens here.
    pub fn slot(&self, logical: i32) -> Option<&Slot> {
        self.window.get(logical)
    }

    /// Mutable access to a cached slot; marks the window dirty.
    pub fn slot_mut(&mut self, logical: i32) -> Option<&mut Slot> {
        if self.window.contains(logical) {
            self.window.mark_dirty();
        }
        self.window.get_mut(logical)
    }

    /// Recentres the window so `logical` is materialized, flushing first if
    /// dirty. Input-handling side only.
    pub fn ensure_visible(&mut self, logical: i32) -> Result<(), Error> {
        let changer = self.registry.current().cloned().ok_or(Error::ChangerNotFound)?;
        self.window.ensure_visible(&self.store, &changer, logical)?;
        self.sync_total_slots();
        Ok(())
    }

    /// Saves the window if dirty. The dirty flag clears only on success.
    pub fn flush(&mut self) -> Result<(), Error> {
        if !self.window.is_dirty() {
            return Ok(());
        }
        let changer = self.registry.current().cloned().ok_or(Error::ChangerNotFound)?;
        self.store.save_window(&changer, &self.window)?;
        self.window.clear_dirty();
        Ok(())
    }

    /// Switches the active changer: flush, repoint, persist the last-used
    /// id, reload the window at the front of the new range.
    pub fn switch_changer(&mut self, id: &str) -> Result<(), Error> {
        if self.registry.current_id() == id {
            return Ok(());
        }
        self.flush()?;
        if !self.registry.set_current(id) {
            return Err(Error::ChangerNotFound);
        }
        self.registry.save(&self.store)?;
        self.reload_window()?;
        log::info!("switched to changer {:?}", id);
        Ok(())
    }

    /// Creates a changer and seeds its empty slots file. Returns the new id.
    pub fn add_changer(
        &mut self,
        name: &str,
        location: &str,
        total_slots: i32,
    ) -> Result<String, Error> {
        let changer = self.registry.add(name, location, total_slots)?.clone();
        self.store.seed_slots_file(&changer)?;
        self.registry.save(&self.store)?;
        Ok(changer.id)
    }

    /// Renames/relocates/resizes a changer. Resizing the current changer
    /// re-clamps the window and persists the new range immediately, which is
    /// where slots past a shrunk count are destroyed.
    pub fn update_changer(
        &mut self,
        index: usize,
        name: &str,
        location: &str,
        total_slots: i32,
    ) -> Result<(), Error> {
        let clamped = clamp_slot_count(total_slots);
        if !self.registry.update(index, name, location, clamped) {
            return Err(Error::ChangerNotFound);
        }
        if Some(index) == self.registry.current_index() && clamped != self.window.total_slots() {
            self.window.resize_total(clamped);
            self.flush()?;
        }
        self.registry.save(&self.store)
    }

    /// Deletes a changer. Refusal to delete the last one is a logged no-op.
    /// Unsaved edits of a deleted current changer are discarded with it.
    pub fn delete_changer(&mut self, index: usize) -> Result<(), Error> {
        let was_current = Some(index) == self.registry.current_index();
        if !self.registry.delete(index) {
            log::warn!("refusing to delete the last changer");
            return Ok(());
        }
        self.registry.save(&self.store)?;
        if was_current {
            self.reload_window()?;
        }
        Ok(())
    }

    /// Occupied-slot count over the full persisted range, with the current
    /// window overlaid so unsaved edits are included.
    pub fn occupied_count(&self) -> usize {
        let Some(changer) = self.registry.current() else {
            return 0;
        };
        let (_, mut all) = self.store.load_all_slots(changer);
        for (offset, slot) in self.window.slots().iter().enumerate() {
            let i = self.window.start() as usize + offset;
            if i < all.len() {
                all[i] = slot.clone();
            }
        }
        all.iter().filter(|slot| slot.occupied).count()
    }

    fn reload_window(&mut self) -> Result<(), Error> {
        let changer = self.registry.current().cloned().ok_or(Error::ChangerNotFound)?;
        self.window = self.store.load_window(&changer, 0);
        self.sync_total_slots();
        Ok(())
    }

    /// The slots file is authoritative for the slot count once it exists;
    /// mirror it back into the registry entry.
    fn sync_total_slots(&mut self) {
        let total = self.window.total_slots();
        if let Some(index) = self.registry.current_index() {
            if let Some(changer) = self.registry.get(index) {
                if changer.total_slots != total {
                    let (name, location) = (changer.name.clone(), changer.location.clone());
                    self.registry.update(index, &name, &location, total);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cd, CACHE_SIZE, MAX_SLOTS, MIN_SLOTS};
    use tempfile::TempDir;

    fn fill(library: &mut Library, logical: i32, artist: &str) {
        library.ensure_visible(logical).unwrap();
        let slot = library.slot_mut(logical).unwrap();
        slot.occupied = true;
        slot.cd = Cd {
            artist: artist.to_string(),
            album: format!("{} LP", artist),
            ..Cd::default()
        };
    }

    #[test]
    fn first_run_synthesizes_default_changer() {
        let dir = TempDir::new().unwrap();
        let library = Library::open(dir.path()).unwrap();
        assert_eq!(library.changers().len(), 1);
        let changer = library.current_changer().unwrap();
        assert_eq!(changer.id, "changer_0");
        assert_eq!(changer.name, "Default");
        assert_eq!(changer.total_slots, DEFAULT_SLOTS);
        assert_eq!(library.total_slots(), DEFAULT_SLOTS);

        // Reopening finds the persisted registry and slots file.
        drop(library);
        let reopened = Library::open(dir.path()).unwrap();
        assert_eq!(reopened.changers().len(), 1);
        assert_eq!(reopened.occupied_count(), 0);
    }

    #[test]
    fn windowing_invariant_holds_across_the_range() {
        let dir = TempDir::new().unwrap();
        let mut library = Library::open(dir.path()).unwrap();
        let total = library.total_slots();
        let max_start = (total - CACHE_SIZE as i32).max(0);
        for logical in 0..total {
            library.ensure_visible(logical).unwrap();
            assert!(library.slot(logical).is_some(), "slot {} absent", logical);
            let start = library.window().start();
            assert!((0..=max_start).contains(&start), "start {} escaped", start);
            assert_eq!(
                library.slot(logical).unwrap().slot_number,
                logical + 1,
                "renumbering broke at {}",
                logical,
            );
        }
    }

    #[test]
    fn edits_survive_recentring_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut library = Library::open(dir.path()).unwrap();
        fill(&mut library, 2, "Neu!");
        fill(&mut library, 97, "Faust");
        // Recentring away flushed slot 2; flush the tail edit explicitly.
        library.flush().unwrap();
        assert!(!library.window().is_dirty());

        let mut reopened = Library::open(dir.path()).unwrap();
        assert_eq!(reopened.occupied_count(), 2);
        reopened.ensure_visible(2).unwrap();
        assert_eq!(reopened.slot(2).unwrap().cd.artist, "Neu!");
        reopened.ensure_visible(97).unwrap();
        assert_eq!(reopened.slot(97).unwrap().cd.artist, "Faust");
    }

    #[test]
    fn saving_unmodified_window_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut library = Library::open(dir.path()).unwrap();
        fill(&mut library, 0, "Cluster");
        library.flush().unwrap();
        let path = {
            let store = Store::new(dir.path());
            store.slots_path("changer_0")
        };
        let first = std::fs::read(&path).unwrap();

        let mut reopened = Library::open(dir.path()).unwrap();
        reopened.window.mark_dirty();
        reopened.flush().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), first);
    }

    #[test]
    fn off_window_reads_are_absent_without_io() {
        let dir = TempDir::new().unwrap();
        let library = Library::open(dir.path()).unwrap();
        assert!(library.slot(50).is_none());
        assert!(library.slot(-1).is_none());
        assert!(library.slot(DEFAULT_SLOTS).is_none());
    }

    #[test]
    fn queued_switch_is_applied_on_tick() {
        let dir = TempDir::new().unwrap();
        let mut library = Library::open(dir.path()).unwrap();
        let second = library.add_changer("Office", "Desk", 30).unwrap();
        fill(&mut library, 0, "Harmonia");

        let sender = library.sender();
        sender
            .send(Command::SwitchChanger { id: second.clone() })
            .unwrap();
        // Nothing happens until the main loop drains the queue.
        assert_eq!(library.current_changer().unwrap().id, "changer_0");
        library.handle_pending().unwrap();

        let current = library.current_changer().unwrap();
        assert_eq!(current.id, second);
        assert_eq!(library.total_slots(), 30);
        // The dirty edit on the old changer was flushed by the switch.
        assert_eq!(library.slot(0).map(|s| s.occupied), Some(false));

        library.switch_changer("changer_0").unwrap();
        assert_eq!(library.slot(0).unwrap().cd.artist, "Harmonia");
        // Last-used id persisted with each switch.
        let registry = Registry::load(&Store::new(dir.path()));
        assert_eq!(registry.current_id(), "changer_0");
    }

    #[test]
    fn switch_to_unknown_changer_fails() {
        let dir = TempDir::new().unwrap();
        let mut library = Library::open(dir.path()).unwrap();
        assert!(matches!(
            library.switch_changer("changer_9"),
            Err(Error::ChangerNotFound),
        ));
        assert_eq!(library.current_changer().unwrap().id, "changer_0");
    }

    #[test]
    fn deleting_last_changer_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let mut library = Library::open(dir.path()).unwrap();
        library.delete_changer(0).unwrap();
        assert_eq!(library.changers().len(), 1);
    }

    #[test]
    fn deleting_a_changer_keeps_current_valid() {
        let dir = TempDir::new().unwrap();
        let mut library = Library::open(dir.path()).unwrap();
        library.add_changer("B", "", 20).unwrap();
        library.add_changer("C", "", 20).unwrap();

        library.delete_changer(1).unwrap();
        assert_eq!(library.changers().len(), 2);
        let current = library.current_changer().unwrap().id.clone();
        assert!(library.changers().iter().any(|c| c.id == current));

        // Deleting the current changer repoints to a surviving one.
        let index = library
            .changers()
            .iter()
            .position(|c| c.id == current)
            .unwrap();
        library.delete_changer(index).unwrap();
        assert_eq!(library.changers().len(), 1);
        assert!(library.current_changer().is_some());
        assert_eq!(library.total_slots(), 20);
    }

    #[test]
    fn resize_clamps_and_shrink_destroys_tail_slots() {
        let dir = TempDir::new().unwrap();
        let mut library = Library::open(dir.path()).unwrap();
        fill(&mut library, 97, "Amon Duul II");
        library.flush().unwrap();

        library.update_changer(0, "Default", "", 50).unwrap();
        assert_eq!(library.total_slots(), 50);
        assert_eq!(library.occupied_count(), 0);

        // Growing back does not resurrect the destroyed slot.
        library.update_changer(0, "Default", "", 100).unwrap();
        let mut check = Library::open(dir.path()).unwrap();
        check.ensure_visible(97).unwrap();
        assert_eq!(check.slot(97).map(|s| s.occupied), Some(false));

        // Requested counts clamp at both ends.
        library.update_changer(0, "Default", "", 0).unwrap();
        assert_eq!(library.total_slots(), MIN_SLOTS);
        library.update_changer(0, "Default", "", 10_000).unwrap();
        assert_eq!(library.total_slots(), MAX_SLOTS);
    }

    #[test]
    fn occupied_count_sees_unsaved_window_edits() {
        let dir = TempDir::new().unwrap();
        let mut library = Library::open(dir.path()).unwrap();
        fill(&mut library, 3, "Popol Vuh");
        assert!(library.window().is_dirty());
        assert_eq!(library.occupied_count(), 1);
    }
}
