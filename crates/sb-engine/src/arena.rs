//! Arena: fixed pool of event buffers handed out by key.

use heapless::Vec as BoundedVec;
use sb_core::config::{ARENA_SLOTS, SLOT_CAPACITY};
use sb_core::{Event, SlotKey};
use slotmap::SlotMap;

use crate::event_store::StoreError;

/// One arena slot: a pattern's events, kept sorted by tick.
pub type EventBuffer = BoundedVec<Event, SLOT_CAPACITY>;

/// Fixed pool of [`ARENA_SLOTS`] event buffers.
///
/// The slot map is reserved up front, so allocating a slot after construction
/// never grows the heap.
pub struct Arena {
    slots: SlotMap<SlotKey, EventBuffer>,
}

impl Arena {
    pub fn new() -> Self {
        Self {
            slots: SlotMap::with_capacity_and_key(ARENA_SLOTS),
        }
    }

    /// Hand out an empty buffer, or fail when every slot is in use.
    pub fn allocate(&mut self) -> Result<SlotKey, StoreError> {
        if self.slots.len() >= ARENA_SLOTS {
            return Err(StoreError::NoFreeSlot);
        }
        Ok(self.slots.insert(EventBuffer::new()))
    }

    /// Return a slot to the pool, dropping its events.
    ///
    /// Stale or already-released keys are ignored. Returns true if a slot was
    /// actually freed.
    pub fn release(&mut self, key: SlotKey) -> bool {
        self.slots.remove(key).is_some()
    }

    pub fn get(&self, key: SlotKey) -> Option<&EventBuffer> {
        self.slots.get(key)
    }

    pub fn get_mut(&mut self, key: SlotKey) -> Option<&mut EventBuffer> {
        self.slots.get_mut(key)
    }

    /// Slots currently handed out.
    pub fn used(&self) -> usize {
        self.slots.len()
    }

    pub fn free(&self) -> usize {
        ARENA_SLOTS - self.slots.len()
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_until_exhausted() {
        let mut arena = Arena::new();
        for _ in 0..ARENA_SLOTS {
            assert!(arena.allocate().is_ok());
        }
        assert_eq!(arena.free(), 0);
        assert_eq!(arena.allocate(), Err(StoreError::NoFreeSlot));
    }

    #[test]
    fn release_is_idempotent() {
        let mut arena = Arena::new();
        let key = arena.allocate().unwrap();
        assert!(arena.release(key));
        assert!(!arena.release(key));
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn released_slot_comes_back_empty() {
        let mut arena = Arena::new();
        let keys: [SlotKey; ARENA_SLOTS] = core::array::from_fn(|_| arena.allocate().unwrap());
        arena.get_mut(keys[3]).unwrap().push(Event::note_on(0, 60, 100)).unwrap();
        arena.release(keys[3]);
        let key = arena.allocate().unwrap();
        assert!(arena.get(key).unwrap().is_empty());
        // The old key no longer resolves.
        assert!(arena.get(keys[3]).is_none());
    }
}
