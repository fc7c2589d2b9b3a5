//! EventStore: sequences, tracks, and their arena-backed patterns.
//!
//! Events are kept sorted by tick inside each slot. A record inserts after
//! any events already at the same tick, so events sharing a tick play in the
//! order they were recorded.

use alloc::vec::Vec;
use log::{debug, warn};
use sb_core::config::{MAX_SEQUENCES, TICKS_PER_STEP};
use sb_core::{
    is_valid_note, quantize, Event, IndexError, Sequence, SlotKey, Tick, TimingDivision, Track,
    TrackId, TrackKind,
};

use crate::arena::Arena;

/// Errors from pattern storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("no free arena slot")]
    NoFreeSlot,
    #[error("pattern slot is full")]
    SlotFull,
    #[error("track {0} does not exist")]
    InvalidTrack(usize),
    #[error("note {0} out of range")]
    InvalidNote(u8),
    #[error("track {0} has no pattern storage")]
    NotRecordable(usize),
}

/// Owner of every sequence and the arena their patterns live in.
pub struct EventStore {
    arena: Arena,
    sequences: Vec<Sequence>,
    current: usize,
    /// Record quantization; `None` stores ticks as played
    quantize: Option<TimingDivision>,
    /// Events dropped because a slot was full
    saturated: u32,
    /// Bumped whenever stored events change; views compare against it
    generation: u32,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            sequences: (0..MAX_SEQUENCES).map(|_| Sequence::new()).collect(),
            current: 0,
            quantize: None,
            saturated: 0,
            generation: 0,
        }
    }

    // --- Arena ---

    pub fn allocate_slot(&mut self) -> Result<SlotKey, StoreError> {
        self.arena.allocate()
    }

    pub fn release_slot(&mut self, key: SlotKey) {
        self.arena.release(key);
    }

    pub fn free_slots(&self) -> usize {
        self.arena.free()
    }

    // --- Sequences ---

    pub fn sequence(&self) -> &Sequence {
        &self.sequences[self.current]
    }

    fn sequence_mut(&mut self) -> &mut Sequence {
        &mut self.sequences[self.current]
    }

    pub fn sequence_index(&self) -> usize {
        self.current
    }

    /// Make sequence `index` current.
    pub fn select_sequence(&mut self, index: usize) -> Result<(), IndexError> {
        if index >= MAX_SEQUENCES {
            return Err(IndexError::new("sequence", index, MAX_SEQUENCES));
        }
        self.current = index;
        self.generation = self.generation.wrapping_add(1);
        Ok(())
    }

    /// Pattern cycle length of the current sequence.
    pub fn max_ticks(&self) -> Tick {
        self.sequence().max_ticks()
    }

    pub fn set_length(&mut self, bars: u8) -> u8 {
        let applied = self.sequence_mut().set_length_bars(bars);
        self.generation = self.generation.wrapping_add(1);
        applied
    }

    pub fn set_bpm(&mut self, bpm: f32) -> f32 {
        self.sequence_mut().set_bpm(bpm)
    }

    // --- Tracks ---

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.sequence().track(id)
    }

    /// Create track `index` if needed and give it storage.
    ///
    /// When the arena is exhausted the track still exists but cannot record.
    pub fn select_track(&mut self, index: usize) -> Result<TrackId, StoreError> {
        let id = TrackId::new(index).map_err(|_| StoreError::InvalidTrack(index))?;
        self.sequence_mut().ensure_track(id);
        self.activate(id);
        Ok(id)
    }

    fn activate(&mut self, id: TrackId) {
        let needs_slot = match self.sequence().track(id) {
            Some(track) => !track.pattern.is_allocated(),
            None => return,
        };
        let slot = if needs_slot {
            match self.arena.allocate() {
                Ok(key) => Some(key),
                Err(err) => {
                    warn!("track {}: {}, recording disabled", id.index() + 1, err);
                    None
                }
            }
        } else {
            None
        };
        if let Some(track) = self.sequence_mut().track_mut(id) {
            track.active = true;
            if slot.is_some() {
                track.pattern.slot = slot;
            }
        }
    }

    pub fn set_track_kind(&mut self, id: TrackId, kind: TrackKind) {
        if let Some(track) = self.sequence_mut().track_mut(id) {
            track.kind = kind;
        }
    }

    /// Flip a track's mute flag, returning the new state.
    pub fn toggle_mute(&mut self, id: TrackId) -> Option<bool> {
        let track = self.sequence_mut().track_mut(id)?;
        track.muted = !track.muted;
        Some(track.muted)
    }

    /// True if the track's pattern holds at least one event.
    pub fn track_has_data(&self, id: TrackId) -> bool {
        self.events(id).is_some_and(|events| !events.is_empty())
    }

    /// All events of a track, sorted by tick.
    pub fn events(&self, id: TrackId) -> Option<&[Event]> {
        let key = self.track(id)?.pattern.slot?;
        self.arena.get(key).map(|buf| buf.as_slice())
    }

    /// Events stored at exactly `tick`, in record order.
    pub fn events_at(&self, id: TrackId, tick: Tick) -> &[Event] {
        let Some(events) = self.events(id) else {
            return &[];
        };
        let start = events.partition_point(|e| e.tick < tick);
        let end = start + events[start..].partition_point(|e| e.tick == tick);
        &events[start..end]
    }

    // --- Recording ---

    pub fn quantize(&self) -> Option<TimingDivision> {
        self.quantize
    }

    pub fn set_quantize(&mut self, division: Option<TimingDivision>) {
        self.quantize = division;
    }

    /// Store a note event. Velocity 0 records a note-off.
    ///
    /// Note-ons are snapped to the quantize grid; note-offs keep their tick.
    /// A full slot drops the event and counts it.
    pub fn record_event(
        &mut self,
        id: TrackId,
        tick: Tick,
        note: u8,
        velocity: u8,
    ) -> Result<(), StoreError> {
        if !is_valid_note(note) {
            return Err(StoreError::InvalidNote(note));
        }
        let max_ticks = self.max_ticks();
        let step = match (velocity > 0, self.quantize) {
            (true, Some(division)) => division.ticks(),
            _ => 1,
        };
        let tick = quantize(tick, step, max_ticks);
        let key = self
            .track(id)
            .and_then(|t| t.pattern.slot)
            .ok_or(StoreError::NotRecordable(id.index()))?;
        let buf = self
            .arena
            .get_mut(key)
            .ok_or(StoreError::NotRecordable(id.index()))?;

        let pos = buf.partition_point(|e| e.tick <= tick);
        if buf.insert(pos, Event::from_velocity(tick, note, velocity)).is_err() {
            self.saturated = self.saturated.saturating_add(1);
            warn!("track {}: pattern full, event dropped", id.index() + 1);
            return Err(StoreError::SlotFull);
        }
        self.generation = self.generation.wrapping_add(1);
        Ok(())
    }

    /// Drop every event of a track and give it a fresh slot.
    pub fn clear(&mut self, id: TrackId) {
        let Some(old) = self.track(id).map(|t| t.pattern.slot) else {
            return;
        };
        if let Some(key) = old {
            self.arena.release(key);
        }
        let slot = match self.arena.allocate() {
            Ok(key) => Some(key),
            Err(err) => {
                warn!("track {}: {}, recording disabled", id.index() + 1, err);
                None
            }
        };
        if let Some(track) = self.sequence_mut().track_mut(id) {
            track.pattern.slot = slot;
        }
        self.generation = self.generation.wrapping_add(1);
        debug!("track {} cleared", id.index() + 1);
    }

    /// Clear every track of the current sequence.
    pub fn clear_all(&mut self) {
        for id in TrackId::all() {
            if self.track(id).is_some() {
                self.clear(id);
            }
        }
    }

    /// True if a sounding note-on for `note` lies in `[start, end)`.
    pub fn query_range(&self, id: TrackId, note: u8, start: Tick, end: Tick) -> bool {
        let Some(events) = self.events(id) else {
            return false;
        };
        let first = events.partition_point(|e| e.tick < start);
        events[first..]
            .iter()
            .take_while(|e| e.tick < end)
            .any(|e| e.note == note && e.is_trigger())
    }

    /// Events dropped because their slot was full.
    pub fn saturated(&self) -> u32 {
        self.saturated
    }

    /// Changes whenever stored events or the sequence length change.
    pub fn view_generation(&self) -> u32 {
        self.generation
    }

    /// Replace a track's pattern with a two-voice demo groove in 8th notes.
    pub fn load_demo_pattern(&mut self, id: TrackId, velocity: u8) {
        const MELODY: [u8; 16] = [67, 69, 71, 69, 67, 69, 71, 74, 71, 69, 67, 69, 71, 74, 71, 69];
        const BASS: [u8; 16] = [43, 50, 43, 50, 40, 47, 40, 47, 48, 43, 48, 43, 50, 45, 50, 45];
        // 95% of an 8th note
        const NOTE_TICKS: Tick = TICKS_PER_STEP * 2 * 95 / 100;

        self.clear(id);
        let quantize = self.quantize.take();
        let max_ticks = self.max_ticks();
        let bass_velocity = (velocity as u32 * 6 / 10).max(1) as u8;
        for (i, step) in (0..16 * 8).step_by(2).enumerate() {
            let on = step * TICKS_PER_STEP;
            if on >= max_ticks {
                break;
            }
            let (m, b) = (MELODY[i % 16], BASS[i % 16]);
            let _ = self.record_event(id, on, m, velocity);
            let _ = self.record_event(id, on, b, bass_velocity);
            let off = on + NOTE_TICKS;
            if off < max_ticks {
                let _ = self.record_event(id, off, m, 0);
                let _ = self.record_event(id, off, b, 0);
            }
        }
        self.quantize = quantize;
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}
