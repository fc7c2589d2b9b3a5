//! Audio backend that logs and records what the engine asks of it.

use log::{debug, info};
use sb_engine::{AudioBackend, EngineKind, NoteTrigger, VoiceId};

/// One call into the backend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BackendEvent {
    NoteOn(NoteTrigger),
    NoteOff { voice: VoiceId, engine: EngineKind },
    Param { engine: EngineKind, param: u8, value: f32 },
    AllNotesOff,
    Click { downbeat: bool },
}

#[derive(Debug, Default)]
pub struct LogBackend {
    events: Vec<BackendEvent>,
    sounding: usize,
}

impl LogBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[BackendEvent] {
        &self.events
    }

    /// Hand over everything recorded so far.
    pub fn take_events(&mut self) -> Vec<BackendEvent> {
        std::mem::take(&mut self.events)
    }

    /// Notes started, in order.
    pub fn notes_on(&self) -> impl Iterator<Item = &NoteTrigger> {
        self.events.iter().filter_map(|e| match e {
            BackendEvent::NoteOn(t) => Some(t),
            _ => None,
        })
    }

    pub fn clicks(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, BackendEvent::Click { .. }))
            .count()
    }

    /// Voices started and not yet released, as seen from this side.
    pub fn sounding(&self) -> usize {
        self.sounding
    }
}

impl AudioBackend for LogBackend {
    fn note_on(&mut self, trigger: NoteTrigger) {
        debug!(
            "on  v{:<2} {:?} t{} n{} vel {}",
            trigger.voice,
            trigger.engine,
            trigger.track.index() + 1,
            trigger.note,
            trigger.velocity
        );
        self.sounding += 1;
        self.events.push(BackendEvent::NoteOn(trigger));
    }

    fn note_off(&mut self, voice: VoiceId, engine: EngineKind) {
        debug!("off v{:<2} {:?}", voice, engine);
        self.sounding = self.sounding.saturating_sub(1);
        self.events.push(BackendEvent::NoteOff { voice, engine });
    }

    fn set_param(&mut self, engine: EngineKind, param: u8, value: f32) {
        debug!("param {:?} #{} = {:.2}", engine, param, value);
        self.events.push(BackendEvent::Param { engine, param, value });
    }

    fn all_notes_off(&mut self) {
        info!("all notes off");
        self.sounding = 0;
        self.events.push(BackendEvent::AllNotesOff);
    }

    fn metronome_click(&mut self, downbeat: bool) {
        debug!("click{}", if downbeat { " (downbeat)" } else { "" });
        self.events.push(BackendEvent::Click { downbeat });
    }
}
