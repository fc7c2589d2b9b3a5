//! Front-panel input: pad matrix, encoders and buttons.
//!
//! Scanning code pushes [`InputEvent`]s into the input queue; the main loop
//! drains them through an [`InputRouter`], which tracks modifier buttons and
//! turns each event into engine calls.

use log::{debug, trace};
use sb_core::{TimingDivision, TrackKind};

use crate::arpeggiator::ArpMode;
use crate::backend::AudioBackend;
use crate::engine::Engine;
use crate::ring::{InputQueue, ProducerGate};
use crate::transport::RecordMode;

/// Pad matrix columns.
pub const PAD_COLUMNS: usize = 8;
/// Pad matrix rows.
pub const PAD_ROWS: usize = 4;
pub const PAD_COUNT: usize = PAD_COLUMNS * PAD_ROWS;
/// Note on the bottom-left pad.
pub const BASE_NOTE: u8 = 48;
/// Encoders on the panel.
pub const ENCODERS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    PlayFromStart,
    PlayPause,
    Stop,
    Record,
    Shift,
    Function,
    Repeat,
    Clear,
    Mute,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// Pad `key` (row-major from the top-left) pressed or released
    Pad { key: u8, pressed: bool },
    Encoder { index: u8, delta: i8 },
    Button { button: Button, pressed: bool },
}

/// What the encoders currently edit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EncoderPage {
    #[default]
    Synth,
    Arp,
    Main,
}

impl EncoderPage {
    pub const fn label(self) -> &'static str {
        match self {
            EncoderPage::Synth => "SYNTH",
            EncoderPage::Arp => "ARP",
            EncoderPage::Main => "MAIN",
        }
    }
}

/// Note played by pad `key`. Each row up is eight semitones higher.
pub fn pad_note(key: u8) -> Option<u8> {
    let key = key as usize;
    if key >= PAD_COUNT {
        return None;
    }
    let (row, col) = (key / PAD_COLUMNS, key % PAD_COLUMNS);
    Some(BASE_NOTE + ((PAD_ROWS - 1 - row) * PAD_COLUMNS + col) as u8)
}

/// How a pad press was routed, so the release goes the same way.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum PadRole {
    #[default]
    Idle,
    Note(u8),
    Arp(u8),
    Repeat(u8),
    /// Consumed by a modifier; the release does nothing
    Command,
}

#[derive(Debug)]
pub struct InputRouter {
    shift: bool,
    function: bool,
    mute: bool,
    repeat: bool,
    pads: [PadRole; PAD_COUNT],
}

impl Default for InputRouter {
    fn default() -> Self {
        Self {
            shift: false,
            function: false,
            mute: false,
            repeat: false,
            pads: [PadRole::Idle; PAD_COUNT],
        }
    }
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle everything waiting in `queue`. Returns the events handled.
    pub fn drain<G, B>(&mut self, queue: &mut InputQueue, engine: &mut Engine<G>, backend: &mut B) -> usize
    where
        G: ProducerGate,
        B: AudioBackend,
    {
        let mut handled = 0;
        while let Some(event) = queue.pop() {
            self.handle(event, engine, backend);
            handled += 1;
        }
        handled
    }

    pub fn handle<G, B>(&mut self, event: InputEvent, engine: &mut Engine<G>, backend: &mut B)
    where
        G: ProducerGate,
        B: AudioBackend,
    {
        trace!("input: {:?}", event);
        match event {
            InputEvent::Pad { key, pressed: true } => self.pad_pressed(key, engine, backend),
            InputEvent::Pad { key, pressed: false } => self.pad_released(key, engine, backend),
            InputEvent::Encoder { index, delta } => self.encoder(index, delta as i32, engine, backend),
            InputEvent::Button { button, pressed } => self.button(button, pressed, engine, backend),
        }
    }

    fn pad_pressed<G: ProducerGate, B: AudioBackend>(&mut self, key: u8, engine: &mut Engine<G>, backend: &mut B) {
        let (Some(note), Some(role)) = (pad_note(key), self.pads.get(key as usize).copied()) else {
            return;
        };
        if role != PadRole::Idle {
            return;
        }
        let role = if self.shift {
            engine.select_track(key as usize);
            PadRole::Command
        } else if self.mute {
            engine.toggle_mute(key as usize, backend);
            PadRole::Command
        } else if self.function {
            function_key(key, engine);
            PadRole::Command
        } else if engine.arp_engaged() {
            engine.arp_start(note);
            PadRole::Arp(note)
        } else if self.repeat {
            engine.repeat_start(note);
            PadRole::Repeat(note)
        } else {
            engine.pad_note_on(note, backend);
            PadRole::Note(note)
        };
        self.pads[key as usize] = role;
    }

    fn pad_released<G: ProducerGate, B: AudioBackend>(&mut self, key: u8, engine: &mut Engine<G>, backend: &mut B) {
        let Some(role) = self.pads.get_mut(key as usize) else {
            return;
        };
        match core::mem::take(role) {
            PadRole::Note(note) => engine.pad_note_off(note, backend),
            PadRole::Arp(note) => engine.arp_stop(note, backend),
            PadRole::Repeat(note) => engine.repeat_stop(note, backend),
            PadRole::Idle | PadRole::Command => {}
        }
    }

    fn button<G: ProducerGate, B: AudioBackend>(
        &mut self,
        button: Button,
        pressed: bool,
        engine: &mut Engine<G>,
        backend: &mut B,
    ) {
        match (button, pressed) {
            (Button::Shift, _) => self.shift = pressed,
            (Button::Function, _) => self.function = pressed,
            (Button::Mute, _) => self.mute = pressed,
            (Button::Repeat, true) if self.shift => {
                engine.toggle_arp(backend);
            }
            (Button::Repeat, true) => self.repeat = true,
            (Button::Repeat, false) => {
                if self.repeat {
                    self.repeat = false;
                    engine.release_generative(backend);
                    self.forget_generative_pads();
                }
            }
            (Button::PlayFromStart, true) => {
                engine.play_from_start();
            }
            (Button::PlayPause, true) => {
                engine.play_pause();
            }
            (Button::Stop, true) => {
                engine.stop(backend);
                self.forget_generative_pads();
            }
            (Button::Record, true) => {
                if engine.is_recording() {
                    engine.record_off();
                } else if self.shift {
                    engine.record(RecordMode::Overdub, backend);
                } else {
                    engine.record(RecordMode::Normal, backend);
                }
            }
            (Button::Clear, true) => {
                if self.shift {
                    engine.clear_all();
                } else {
                    engine.clear_track();
                }
            }
            _ => {}
        }
    }

    /// Pads feeding the repeat or arp stop meaning anything once those
    /// engines have been released.
    fn forget_generative_pads(&mut self) {
        for role in &mut self.pads {
            if matches!(role, PadRole::Arp(_) | PadRole::Repeat(_)) {
                *role = PadRole::Command;
            }
        }
    }

    fn encoder<G: ProducerGate, B: AudioBackend>(
        &mut self,
        index: u8,
        delta: i32,
        engine: &mut Engine<G>,
        backend: &mut B,
    ) {
        match (engine.page(), index) {
            (EncoderPage::Synth, i) => engine.adjust_param(i as usize, delta, backend),

            (EncoderPage::Arp, 0) => {
                let index = (engine.arp().division.index() as i32 + delta).max(0);
                engine.set_arp_division(TimingDivision::from_index(index as usize));
            }
            (EncoderPage::Arp, 1) => {
                engine.set_arp_octaves(engine.arp().octaves() as i32 + delta);
            }
            (EncoderPage::Arp, 2) => {
                let modes = ArpMode::ALL;
                let i = modes.iter().position(|m| *m == engine.arp().mode).unwrap_or(0) as i32;
                let next = (i + delta).rem_euclid(modes.len() as i32) as usize;
                engine.set_arp_mode(modes[next]);
            }
            (EncoderPage::Arp, 3) => {
                engine.set_arp_gate(engine.arp().gate() + delta as f32 * 0.05);
            }

            (EncoderPage::Main, 0) => {
                engine.set_bpm(engine.bpm() + delta as f32);
            }
            (EncoderPage::Main, 1) => {
                let bars = engine.store().sequence().length_bars() as i32 + delta;
                engine.set_length(bars.clamp(1, u8::MAX as i32) as u8);
            }
            (EncoderPage::Main, 2) => {
                engine.set_velocity(engine.velocity() as i32 + delta);
            }
            (EncoderPage::Main, 3) => {
                let zoom = engine.view().zoom().step(delta);
                engine.set_zoom(zoom);
            }
            _ => {}
        }
    }
}

/// Shortcuts on the pads while Function is held.
fn function_key<G: ProducerGate>(key: u8, engine: &mut Engine<G>) {
    match key {
        0 => engine.set_quantize(None),
        1 => engine.set_quantize(Some(TimingDivision::Eighth)),
        2 => engine.set_quantize(Some(TimingDivision::Sixteenth)),
        3 => engine.set_quantize(Some(TimingDivision::ThirtySecond)),
        4 => engine.set_page(EncoderPage::Synth),
        5 => engine.set_page(EncoderPage::Arp),
        6 => engine.set_page(EncoderPage::Main),
        8..=13 => engine.set_repeat_division(TimingDivision::from_index(key as usize - 8)),
        16 => engine.set_track_kind(TrackKind::Synth),
        17 => engine.set_track_kind(TrackKind::Sampler),
        _ => {
            debug!("function key {} unassigned", key);
            return;
        }
    }
    trace!("function key {}", key);
}
