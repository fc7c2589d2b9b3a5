//! Entry points the engine calls into: voice engines and the display.

use sb_core::{TrackId, TrackKind};

/// Identifier for a voice slot in the allocator.
pub type VoiceId = usize;

/// Which voice engine renders a note.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineKind {
    /// Oscillator voices
    Tonal,
    /// Sample playback
    OneShot,
}

impl From<TrackKind> for EngineKind {
    fn from(kind: TrackKind) -> Self {
        match kind {
            TrackKind::Synth => EngineKind::Tonal,
            TrackKind::Sampler => EngineKind::OneShot,
        }
    }
}

/// Everything a voice engine needs to start a note.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteTrigger {
    pub voice: VoiceId,
    pub engine: EngineKind,
    pub track: TrackId,
    pub note: u8,
    pub velocity: u8,
}

/// Trait for audio backends driven by the engine.
pub trait AudioBackend {
    /// Start a note on a voice.
    fn note_on(&mut self, trigger: NoteTrigger);

    /// Release a voice.
    fn note_off(&mut self, voice: VoiceId, engine: EngineKind);

    /// Set a synthesis parameter.
    fn set_param(&mut self, engine: EngineKind, param: u8, value: f32);

    /// Silence every voice.
    fn all_notes_off(&mut self);

    /// Metronome click; `downbeat` on the first beat of a bar.
    fn metronome_click(&mut self, _downbeat: bool) {}
}

/// Named value slots on the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Bar,
    Beat,
    Step,
    Bpm,
    Length,
    Velocity,
    Track,
    Quantize,
    ArpMode,
    ArpDivision,
    ArpOctaves,
    ArpGate,
    RepeatDivision,
    Record,
    Zoom,
    Page,
    TrackKind,
    /// Synth parameter on encoder 0-3
    Param(u8),
}

/// Trait for displays driven by the engine.
pub trait Display {
    fn write_number(&mut self, field: Field, value: i32);

    fn write_label(&mut self, field: Field, text: &str);

    /// Draw one piano-roll cell.
    fn redraw_cell(&mut self, col: usize, row: usize, active: bool);

    /// Move the playhead marker; `None` hides it.
    fn draw_playhead_at(&mut self, column: Option<usize>);
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use alloc::string::{String, ToString};
    use alloc::vec::Vec;

    /// A backend call, as seen by tests.
    #[derive(Clone, Debug, PartialEq)]
    pub enum Call {
        On(NoteTrigger),
        Off(VoiceId),
        Param(EngineKind, u8, f32),
        AllOff,
        Click(bool),
    }

    #[derive(Default)]
    pub struct RecordingBackend {
        pub calls: Vec<Call>,
    }

    impl RecordingBackend {
        /// Notes started, in order.
        pub fn notes_on(&self) -> Vec<u8> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::On(t) => Some(t.note),
                    _ => None,
                })
                .collect()
        }

        pub fn clicks(&self) -> usize {
            self.calls.iter().filter(|c| matches!(c, Call::Click(_))).count()
        }
    }

    impl AudioBackend for RecordingBackend {
        fn note_on(&mut self, trigger: NoteTrigger) {
            self.calls.push(Call::On(trigger));
        }
        fn note_off(&mut self, voice: VoiceId, _engine: EngineKind) {
            self.calls.push(Call::Off(voice));
        }
        fn set_param(&mut self, engine: EngineKind, param: u8, value: f32) {
            self.calls.push(Call::Param(engine, param, value));
        }
        fn all_notes_off(&mut self) {
            self.calls.push(Call::AllOff);
        }
        fn metronome_click(&mut self, downbeat: bool) {
            self.calls.push(Call::Click(downbeat));
        }
    }

    #[derive(Default)]
    pub struct RecordingDisplay {
        pub numbers: Vec<(Field, i32)>,
        pub labels: Vec<(Field, String)>,
        pub cells: Vec<(usize, usize, bool)>,
        pub playhead: Vec<Option<usize>>,
    }

    impl RecordingDisplay {
        pub fn last_label(&self, field: Field) -> Option<&str> {
            self.labels.iter().rev().find(|(f, _)| *f == field).map(|(_, s)| s.as_str())
        }

        pub fn last_number(&self, field: Field) -> Option<i32> {
            self.numbers.iter().rev().find(|(f, _)| *f == field).map(|(_, v)| *v)
        }
    }

    impl Display for RecordingDisplay {
        fn write_number(&mut self, field: Field, value: i32) {
            self.numbers.push((field, value));
        }
        fn write_label(&mut self, field: Field, text: &str) {
            self.labels.push((field, text.to_string()));
        }
        fn redraw_cell(&mut self, col: usize, row: usize, active: bool) {
            self.cells.push((col, row, active));
        }
        fn draw_playhead_at(&mut self, column: Option<usize>) {
            self.playhead.push(column);
        }
    }
}
