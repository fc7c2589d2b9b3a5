//! Recorded events and the note demands that flow through the pending queue.

use crate::time::Tick;
use crate::track::TrackId;

/// Kind of a recorded event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    NoteOn,
    NoteOff,
}

/// A note event stored in a pattern.
///
/// Note-on and note-off are independent entries; a note has no implicit
/// duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event {
    /// Pattern tick the event fires on
    pub tick: Tick,
    pub kind: EventKind,
    /// MIDI note number (0-127)
    pub note: u8,
    /// Velocity for note-on, 0 for note-off
    pub value: u8,
}

impl Event {
    /// Build an event from a velocity: non-zero is a note-on, zero a note-off.
    pub const fn from_velocity(tick: Tick, note: u8, velocity: u8) -> Self {
        if velocity > 0 {
            Self::note_on(tick, note, velocity)
        } else {
            Self::note_off(tick, note)
        }
    }

    pub const fn note_on(tick: Tick, note: u8, velocity: u8) -> Self {
        Self { tick, kind: EventKind::NoteOn, note, value: velocity }
    }

    pub const fn note_off(tick: Tick, note: u8) -> Self {
        Self { tick, kind: EventKind::NoteOff, note, value: 0 }
    }

    /// True for a note-on carrying a non-zero velocity.
    pub const fn is_trigger(&self) -> bool {
        matches!(self.kind, EventKind::NoteOn) && self.value > 0
    }

    /// Velocity as sent to voices (0 for note-off).
    pub const fn velocity(&self) -> u8 {
        match self.kind {
            EventKind::NoteOn => self.value,
            EventKind::NoteOff => 0,
        }
    }
}

/// What produced a note demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Played back from a stored pattern
    Pattern,
    /// Generated by note repeat
    NoteRepeat,
    /// Generated by the arpeggiator
    Arpeggiator,
    /// Played on a pad
    Live,
}

impl Origin {
    /// Everything except pattern playback is written back while recording.
    pub const fn is_recorded(self) -> bool {
        !matches!(self, Origin::Pattern)
    }
}

/// A note-on (velocity > 0) or note-off (velocity 0) headed for a voice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteDemand {
    pub track: TrackId,
    pub note: u8,
    pub velocity: u8,
    /// Pattern tick the demand was produced on
    pub tick: Tick,
    pub origin: Origin,
}

impl NoteDemand {
    pub const fn new(track: TrackId, note: u8, velocity: u8, tick: Tick, origin: Origin) -> Self {
        Self { track, note, velocity, tick, origin }
    }

    pub const fn is_note_on(&self) -> bool {
        self.velocity > 0
    }
}

/// Item carried from the tick handler to the main loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingEvent {
    Note(NoteDemand),
    /// Metronome click on a quarter note
    Click { downbeat: bool },
}
