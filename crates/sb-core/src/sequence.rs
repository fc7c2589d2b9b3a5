//! Sequence: length, tempo, and the tracks that play together.

use alloc::vec::Vec;

use crate::config::{DEFAULT_SEQ_BARS, MAX_SEQ_BARS, MAX_TRACKS, STEPS_PER_BAR, TICKS_PER_BAR};
use crate::time::Tick;
use crate::track::{Track, TrackId};

/// Slowest tempo, in BPM.
pub const BPM_MIN: f32 = 40.0;
/// Fastest tempo, in BPM.
pub const BPM_MAX: f32 = 300.0;

/// A sequence of up to [`MAX_TRACKS`] tracks sharing one length and tempo.
#[derive(Clone, Debug)]
pub struct Sequence {
    /// Length in bars (1-32)
    length_bars: u8,
    /// Tempo in BPM (40-300)
    bpm: f32,
    /// Track table; a slot stays `None` until the track is first selected
    tracks: Vec<Option<Track>>,
}

impl Default for Sequence {
    fn default() -> Self {
        Self {
            length_bars: DEFAULT_SEQ_BARS,
            bpm: 120.0,
            tracks: (0..MAX_TRACKS).map(|_| None).collect(),
        }
    }
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn length_bars(&self) -> u8 {
        self.length_bars
    }

    /// Set the length, clamped to 1..=32 bars. Returns the applied value.
    pub fn set_length_bars(&mut self, bars: u8) -> u8 {
        self.length_bars = bars.clamp(1, MAX_SEQ_BARS);
        self.length_bars
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Set the tempo, clamped to 40..=300 BPM. Returns the applied value.
    pub fn set_bpm(&mut self, bpm: f32) -> f32 {
        self.bpm = if bpm.is_nan() { self.bpm } else { bpm.clamp(BPM_MIN, BPM_MAX) };
        self.bpm
    }

    /// Pattern cycle length in ticks.
    pub fn max_ticks(&self) -> Tick {
        self.length_bars as u32 * TICKS_PER_BAR
    }

    /// Pattern cycle length in grid steps.
    pub fn total_steps(&self) -> u32 {
        self.length_bars as u32 * STEPS_PER_BAR
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(id.index()).and_then(|t| t.as_ref())
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.get_mut(id.index()).and_then(|t| t.as_mut())
    }

    /// Get a track, creating it on first use.
    pub fn ensure_track(&mut self, id: TrackId) -> &mut Track {
        self.tracks[id.index()].get_or_insert_with(|| Track::new(id))
    }

    /// Iterate over the tracks created so far.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().flatten()
    }

    pub fn tracks_mut(&mut self) -> impl Iterator<Item = &mut Track> {
        self.tracks.iter_mut().flatten()
    }
}
