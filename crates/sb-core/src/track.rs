//! Tracks and their pattern handles.

use arrayvec::ArrayString;
use core::fmt::Write;
use slotmap::new_key_type;

use crate::config::MAX_TRACKS;
use crate::error::IndexError;

new_key_type! {
    /// Key of an event buffer in the pattern arena.
    pub struct SlotKey;
}

/// Index of a track within a sequence, validated against [`MAX_TRACKS`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackId(u8);

impl TrackId {
    /// Validate a raw track index.
    pub fn new(index: usize) -> Result<Self, IndexError> {
        if index < MAX_TRACKS {
            Ok(Self(index as u8))
        } else {
            Err(IndexError::new("track", index, MAX_TRACKS))
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Iterate over every valid track id.
    pub fn all() -> impl Iterator<Item = TrackId> {
        (0..MAX_TRACKS as u8).map(TrackId)
    }
}

/// Which voice engine a track plays through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrackKind {
    /// Tonal voices (oscillators, filter, envelope)
    #[default]
    Synth,
    /// One-shot sample playback
    Sampler,
}

impl TrackKind {
    pub const ALL: [TrackKind; 2] = [TrackKind::Synth, TrackKind::Sampler];

    pub const fn label(self) -> &'static str {
        match self {
            TrackKind::Synth => "SYNTH",
            TrackKind::Sampler => "SAMPLER",
        }
    }
}

/// Handle to a track's event storage.
///
/// The key is the only reference into the arena; `None` means the track has
/// no storage (never activated, or the arena was exhausted).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pattern {
    pub slot: Option<SlotKey>,
}

impl Pattern {
    pub const fn empty() -> Self {
        Self { slot: None }
    }

    pub const fn is_allocated(&self) -> bool {
        self.slot.is_some()
    }
}

/// One track of a sequence.
#[derive(Clone, Debug)]
pub struct Track {
    pub id: TrackId,
    /// Display name ("T01")
    pub name: ArrayString<8>,
    /// Set once the track's pattern has been activated
    pub active: bool,
    pub muted: bool,
    pub kind: TrackKind,
    /// MIDI channel (1-16)
    pub midi_channel: u8,
    pub pattern: Pattern,
}

impl Track {
    /// Create an inactive track with defaults for its slot.
    pub fn new(id: TrackId) -> Self {
        let mut name = ArrayString::new();
        let _ = write!(name, "T{:02}", id.index() + 1);
        Self {
            id,
            name,
            active: false,
            muted: false,
            kind: TrackKind::Synth,
            midi_channel: (id.index() % 16) as u8 + 1,
            pattern: Pattern::empty(),
        }
    }

    /// A track is played back when active, unmuted, and backed by storage.
    pub const fn is_audible(&self) -> bool {
        self.active && !self.muted && self.pattern.is_allocated()
    }
}
