//! Fixed-size window over a changer's logical slot range.
//!
//! Only [`CACHE_SIZE`] slots are materialized at a time; everything else
//! lives in the changer's file. Recentring flushes the dirty window before
//! reloading, so an edit is never discarded by a subsequent load.

use crate::{
    error::Error,
    model::{clamp_slot_count, Changer, Slot, CACHE_SIZE},
    store::Store,
};

pub struct CacheWindow {
    start: i32,
    slots: [Slot; CACHE_SIZE],
    len: usize,
    total_slots: i32,
    dirty: bool,
}

impl CacheWindow {
    /// An all-empty window at the front of a `total_slots`-sized changer.
    pub fn empty(total_slots: i32) -> CacheWindow {
        CacheWindow::from_parts(total_slots, 0, Vec::new())
    }

    /// Builds a window starting at logical index `start` from up to
    /// [`CACHE_SIZE`] loaded slots; missing positions become empty slots.
    pub(crate) fn from_parts(total_slots: i32, start: i32, loaded: Vec<Slot>) -> CacheWindow {
        let total_slots = clamp_slot_count(total_slots);
        let start = start.clamp(0, (total_slots - CACHE_SIZE as i32).max(0));
        let len = CACHE_SIZE.min((total_slots - start) as usize);
        let mut loaded = loaded.into_iter();
        let mut window = CacheWindow {
            start,
            slots: std::array::from_fn(|i| {
                loaded.next().unwrap_or_else(|| Slot::empty(i as i32 + 1))
            }),
            len,
            total_slots,
            dirty: false,
        };
        window.renumber();
        window
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn total_slots(&self) -> i32 {
        self.total_slots
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// The slots currently materialized, in logical order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots[..self.len]
    }

    /// Window start that centres `logical` as far as clamping allows.
    pub fn desired_start(&self, logical: i32) -> i32 {
        let max_start = (self.total_slots - CACHE_SIZE as i32).max(0);
        (logical - CACHE_SIZE as i32 / 2).clamp(0, max_start)
    }

    pub fn contains(&self, logical: i32) -> bool {
        self.offset(logical).is_some()
    }

    fn offset(&self, logical: i32) -> Option<usize> {
        if logical < self.start || logical >= self.total_slots {
            return None;
        }
        let offset = (logical - self.start) as usize;
        (offset < self.len).then_some(offset)
    }

    /// Window-relative access; `None` for off-window indices. Never touches
    /// storage, so it is safe to call from a drawing path.
    pub fn get(&self, logical: i32) -> Option<&Slot> {
        self.offset(logical).map(|i| &self.slots[i])
    }

    pub fn get_mut(&mut self, logical: i32) -> Option<&mut Slot> {
        self.offset(logical).map(|i| &mut self.slots[i])
    }

    /// Recentres the window so `logical` is materialized. Flushes the dirty
    /// window through `store` before reloading. Performs file I/O; must only
    /// be called from input handling, never from a render callback.
    pub fn ensure_visible(
        &mut self,
        store: &Store,
        changer: &Changer,
        logical: i32,
    ) -> Result<(), Error> {
        let desired = self.desired_start(logical);
        if desired == self.start {
            return Ok(());
        }
        if self.dirty {
            store.save_window(changer, self)?;
            self.dirty = false;
        }
        *self = store.load_window(changer, desired);
        Ok(())
    }

    /// Applies a new slot count after a changer resize. Clamps the window
    /// back into range and marks it dirty so the next flush persists the
    /// resized file (shrinking destroys slots past the new count there).
    pub(crate) fn resize_total(&mut self, total_slots: i32) {
        self.total_slots = clamp_slot_count(total_slots);
        self.start = self
            .start
            .clamp(0, (self.total_slots - CACHE_SIZE as i32).max(0));
        self.len = CACHE_SIZE.min((self.total_slots - self.start) as usize);
        self.renumber();
        self.dirty = true;
    }

    fn renumber(&mut self) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            slot.slot_number = self.start + i as i32 + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CACHE_SIZE;

    #[test]
    fn empty_window_covers_front_of_range() {
        let window = CacheWindow::empty(100);
        assert_eq!(window.start(), 0);
        assert_eq!(window.slots().len(), CACHE_SIZE);
        assert_eq!(window.slots()[0].slot_number, 1);
        assert_eq!(window.slots()[9].slot_number, 10);
        assert!(!window.is_dirty());
    }

    #[test]
    fn window_shorter_than_cache_for_tiny_changers() {
        let window = CacheWindow::empty(3);
        assert_eq!(window.slots().len(), 3);
        assert!(window.get(2).is_some());
        assert!(window.get(3).is_none());
    }

    #[test]
    fn desired_start_is_clamped() {
        let window = CacheWindow::empty(100);
        assert_eq!(window.desired_start(0), 0);
        assert_eq!(window.desired_start(2), 0);
        assert_eq!(window.desired_start(50), 45);
        assert_eq!(window.desired_start(99), 90);
        let small = CacheWindow::empty(5);
        assert_eq!(small.desired_start(4), 0);
    }

    #[test]
    fn get_is_window_relative() {
        let window = CacheWindow::from_parts(100, 45, Vec::new());
        assert!(window.get(44).is_none());
        assert_eq!(window.get(45).map(|s| s.slot_number), Some(46));
        assert_eq!(window.get(54).map(|s| s.slot_number), Some(55));
        assert!(window.get(55).is_none());
        assert!(window.get(-1).is_none());
        assert!(window.get(100).is_none());
    }

    #[test]
    fn resize_pulls_window_back_into_range() {
        let mut window = CacheWindow::from_parts(200, 190, Vec::new());
        window.resize_total(50);
        assert_eq!(window.start(), 40);
        assert_eq!(window.total_slots(), 50);
        assert_eq!(window.slots()[0].slot_number, 41);
        assert!(window.is_dirty());
    }
}
