//! Compile-time configuration.
//!
//! Every pool in the engine is sized from these constants so that nothing
//! allocates once the engine is constructed.

/// Pulses (ticks) per quarter note.
pub const PPQN: u32 = 96;
/// Beats (quarter notes) per bar.
pub const BEATS_PER_BAR: u32 = 4;
/// Grid steps per bar.
pub const STEPS_PER_BAR: u32 = 16;
/// Ticks per grid step (24).
pub const TICKS_PER_STEP: u32 = PPQN * BEATS_PER_BAR / STEPS_PER_BAR;
/// Ticks per bar (384).
pub const TICKS_PER_BAR: u32 = PPQN * BEATS_PER_BAR;

/// Longest sequence, in bars.
pub const MAX_SEQ_BARS: u8 = 32;
/// Default sequence length, in bars.
pub const DEFAULT_SEQ_BARS: u8 = 8;
/// Longest pattern cycle, in ticks.
pub const MAX_PATTERN_TICKS: u32 = MAX_SEQ_BARS as u32 * TICKS_PER_BAR;

/// Number of sequences held in memory.
pub const MAX_SEQUENCES: usize = 8;
/// Tracks per sequence.
pub const MAX_TRACKS: usize = 32;

/// Number of MIDI note numbers.
pub const NOTE_COUNT: usize = 128;

/// Synth/sampler voices shared by all tracks.
pub const MAX_VOICES: usize = 16;
/// Concurrent note-repeat voices.
pub const MAX_REPEAT_VOICES: usize = 4;
/// Notes the arpeggiator can hold at once.
pub const MAX_HELD_NOTES: usize = 8;

/// Event buffers in the pattern arena.
pub const ARENA_SLOTS: usize = 16;
/// Events per arena slot.
pub const SLOT_CAPACITY: usize = 1024;

/// Pending note queue capacity (power of two; holds one less).
pub const PENDING_CAPACITY: usize = 64;
/// Input event queue capacity (power of two; holds one less).
pub const INPUT_CAPACITY: usize = 32;

/// Metronome count-in before recording, in beats.
pub const PREROLL_BEATS: u32 = 4;
/// Count-in length in ticks.
pub const PREROLL_TICKS: u32 = PREROLL_BEATS * PPQN;

/// Columns in the piano-roll viewport.
pub const DISPLAY_STEPS: usize = 32;
/// Note rows in the piano-roll viewport.
pub const DISPLAY_ROWS: usize = 12;
/// Scrollable note range of the piano roll (C0-C8).
pub const NOTE_RANGE: u8 = 96;

/// Default velocity for pads and generated notes.
pub const DEFAULT_VELOCITY: u8 = 120;
