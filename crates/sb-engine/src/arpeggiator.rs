//! Arpeggiator: one monophonic voice cycling over the held notes.

use heapless::Vec as BoundedVec;
use sb_core::config::{MAX_HELD_NOTES, NOTE_COUNT};
use sb_core::{is_valid_note, NoteDemand, Origin, Tick, TimingDivision, TrackId};

/// How the next note is picked from the held set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ArpMode {
    /// Lowest held note, stepped up one octave per step
    #[default]
    UpOctave,
    /// Held notes in the order they were pressed
    HeldNotes,
}

impl ArpMode {
    pub const ALL: [ArpMode; 2] = [ArpMode::UpOctave, ArpMode::HeldNotes];

    pub const fn label(self) -> &'static str {
        match self {
            ArpMode::UpOctave => "UP",
            ArpMode::HeldNotes => "HOLD",
        }
    }
}

/// Externally visible arpeggiator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArpState {
    Off,
    Idle,
    Sounding,
}

/// Runtime state of the arpeggiator's voice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArpVoice {
    /// At least one note is held
    pub active: bool,
    /// A note-on has been emitted without its note-off
    pub sounding: bool,
    pub note: u8,
    pub next_tick: Tick,
    pub off_tick: Tick,
    pub track: TrackId,
    /// Steps fired since the voice started
    pub step: u32,
}

pub struct Arpeggiator {
    engaged: bool,
    pub mode: ArpMode,
    pub division: TimingDivision,
    /// Octave span for [`ArpMode::UpOctave`] (1-4)
    octaves: u8,
    /// Fraction of the interval a note sounds for
    gate: f32,
    velocity: u8,
    held: BoundedVec<u8, MAX_HELD_NOTES>,
    voice: ArpVoice,
}

impl Default for Arpeggiator {
    fn default() -> Self {
        Self {
            engaged: false,
            mode: ArpMode::default(),
            division: TimingDivision::Sixteenth,
            octaves: 3,
            gate: 0.8,
            velocity: sb_core::config::DEFAULT_VELOCITY,
            held: BoundedVec::new(),
            voice: ArpVoice::default(),
        }
    }
}

impl Arpeggiator {
    pub const MAX_OCTAVES: u8 = 4;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ArpState {
        match (self.engaged, self.voice.sounding) {
            (false, _) => ArpState::Off,
            (true, false) => ArpState::Idle,
            (true, true) => ArpState::Sounding,
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    pub fn voice(&self) -> &ArpVoice {
        &self.voice
    }

    pub fn held(&self) -> &[u8] {
        &self.held
    }

    pub fn octaves(&self) -> u8 {
        self.octaves
    }

    pub fn set_octaves(&mut self, octaves: u8) -> u8 {
        self.octaves = octaves.clamp(1, Self::MAX_OCTAVES);
        self.octaves
    }

    pub fn gate(&self) -> f32 {
        self.gate
    }

    pub fn set_gate(&mut self, gate: f32) -> f32 {
        if !gate.is_nan() {
            self.gate = gate.clamp(0.05, 1.0);
        }
        self.gate
    }

    pub fn set_velocity(&mut self, velocity: u8) {
        self.velocity = velocity.max(1);
    }

    /// Engage or disengage. Either way the held set starts empty.
    pub fn toggle(&mut self, emit: &mut impl FnMut(NoteDemand)) -> bool {
        self.release(emit);
        self.engaged = !self.engaged;
        self.engaged
    }

    /// Add a held note. The first held note starts the voice at `tick`.
    pub fn start(&mut self, note: u8, track: TrackId, tick: Tick) {
        if !self.engaged || !is_valid_note(note) {
            return;
        }
        if !self.held.contains(&note) && self.held.push(note).is_err() {
            return;
        }
        if !self.voice.active {
            self.voice = ArpVoice {
                active: true,
                sounding: false,
                note: 0,
                next_tick: tick,
                off_tick: 0,
                track,
                step: 0,
            };
        }
    }

    /// Remove a held note, silencing the voice if its note no longer follows
    /// from what is still held.
    pub fn stop(&mut self, note: u8, tick: Tick, emit: &mut impl FnMut(NoteDemand)) {
        if let Some(pos) = self.held.iter().position(|&n| n == note) {
            self.held.remove(pos);
        }
        if self.voice.sounding && !self.derives(self.voice.note) {
            self.note_off(tick, emit);
        }
        if self.held.is_empty() {
            self.voice.active = false;
        }
    }

    /// Advance to `tick`, emitting any due note-off then any due note-on.
    pub fn process(&mut self, tick: Tick, emit: &mut impl FnMut(NoteDemand)) {
        if !self.engaged || !self.voice.active || self.held.is_empty() {
            return;
        }
        if self.voice.sounding && tick >= self.voice.off_tick {
            self.note_off(tick, emit);
        }
        if !self.voice.sounding && tick >= self.voice.next_tick {
            let Some(note) = self.select(self.voice.step) else {
                return;
            };
            let interval = self.division.ticks();
            emit(NoteDemand::new(self.voice.track, note, self.velocity, tick, Origin::Arpeggiator));
            let gate_ticks = ((interval as f32 * self.gate) as u32).max(1);
            self.voice.note = note;
            self.voice.sounding = true;
            self.voice.off_tick = tick + gate_ticks;
            self.voice.next_tick = self.voice.next_tick.saturating_add(interval);
            if self.voice.next_tick <= tick {
                self.voice.next_tick = tick + interval;
            }
            self.voice.step = self.voice.step.wrapping_add(1);
        }
    }

    /// The pattern looped back to `tick`: cut the sounding note and resume
    /// stepping from the new cycle.
    pub fn on_wrap(&mut self, tick: Tick, emit: &mut impl FnMut(NoteDemand)) {
        if self.voice.sounding {
            self.note_off(tick, emit);
        }
        if self.voice.active {
            self.voice.next_tick = tick;
        }
    }

    /// Silence the voice and forget the held notes, staying engaged.
    pub fn release(&mut self, emit: &mut impl FnMut(NoteDemand)) {
        if self.voice.sounding {
            let tick = self.voice.off_tick;
            self.note_off(tick, emit);
        }
        self.held.clear();
        self.voice = ArpVoice::default();
    }

    /// Drop all voice state without emitting anything.
    pub fn reset(&mut self) {
        self.held.clear();
        self.voice = ArpVoice::default();
    }

    fn note_off(&mut self, tick: Tick, emit: &mut impl FnMut(NoteDemand)) {
        emit(NoteDemand::new(self.voice.track, self.voice.note, 0, tick, Origin::Arpeggiator));
        self.voice.sounding = false;
    }

    fn lowest(&self) -> Option<u8> {
        self.held.iter().copied().min()
    }

    fn select(&self, step: u32) -> Option<u8> {
        match self.mode {
            ArpMode::UpOctave => {
                let base = self.lowest()?;
                let note = base as u32 + (step % self.octaves as u32) * 12;
                Some(if note < NOTE_COUNT as u32 { note as u8 } else { base })
            }
            ArpMode::HeldNotes => self.held.get(step as usize % self.held.len().max(1)).copied(),
        }
    }

    /// True if `note` could be produced from the current held set.
    fn derives(&self, note: u8) -> bool {
        match self.mode {
            ArpMode::UpOctave => self.lowest().is_some_and(|base| {
                note >= base && (note - base) % 12 == 0 && (note - base) / 12 < self.octaves
            }),
            ArpMode::HeldNotes => self.held.contains(&note),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn engaged() -> Arpeggiator {
        let mut arp = Arpeggiator::new();
        arp.toggle(&mut |_| {});
        arp
    }

    /// Run ticks `from..to`, collecting emitted demands.
    fn run(arp: &mut Arpeggiator, from: Tick, to: Tick) -> Vec<NoteDemand> {
        let mut out = Vec::new();
        for t in from..to {
            arp.process(t, &mut |d| out.push(d));
        }
        out
    }

    fn ons(demands: &[NoteDemand]) -> Vec<u8> {
        demands.iter().filter(|d| d.is_note_on()).map(|d| d.note).collect()
    }

    #[test]
    fn toggle_cycles_state() {
        let mut arp = Arpeggiator::new();
        assert_eq!(arp.state(), ArpState::Off);
        assert!(arp.toggle(&mut |_| {}));
        assert_eq!(arp.state(), ArpState::Idle);
        assert!(!arp.toggle(&mut |_| {}));
        assert_eq!(arp.state(), ArpState::Off);
    }

    #[test]
    fn start_ignored_when_off() {
        let mut arp = Arpeggiator::new();
        arp.start(60, TrackId::default(), 0);
        assert!(arp.held().is_empty());
    }

    #[test]
    fn up_octave_cycles_three_octaves() {
        let mut arp = engaged();
        arp.start(48, TrackId::default(), 0);
        let out = run(&mut arp, 0, 24 * 6);
        assert_eq!(ons(&out), [48, 60, 72, 48, 60, 72]);
    }

    #[test]
    fn up_octave_starts_from_lowest_not_first_pressed() {
        let mut arp = engaged();
        arp.start(60, TrackId::default(), 0);
        arp.start(48, TrackId::default(), 0);
        let out = run(&mut arp, 0, 24 * 3);
        assert_eq!(ons(&out), [48, 60, 72]);
    }

    #[test]
    fn up_octave_rebases_when_lowest_released() {
        let mut arp = engaged();
        arp.start(60, TrackId::default(), 0);
        arp.start(48, TrackId::default(), 0);
        run(&mut arp, 0, 1);
        assert_eq!(arp.voice().note, 48);

        // 48 no longer follows from {60}, so the voice is cut.
        let mut out = Vec::new();
        arp.stop(48, 2, &mut |d| out.push(d));
        assert_eq!(out.len(), 1);
        assert_eq!((out[0].note, out[0].velocity), (48, 0));
        let out = run(&mut arp, 24, 25);
        assert_eq!(ons(&out), [72]);
    }

    #[test]
    fn gate_sets_note_length() {
        let mut arp = engaged();
        arp.start(60, TrackId::default(), 0);
        let mut out = Vec::new();
        for t in 0..24 {
            arp.process(t, &mut |d| out.push((t, d.velocity)));
        }
        // 80% of a sixteenth is 19 ticks.
        assert_eq!(out, [(0, 120), (19, 0)]);
    }

    #[test]
    fn held_notes_cycle_in_press_order() {
        let mut arp = engaged();
        arp.mode = ArpMode::HeldNotes;
        arp.start(64, TrackId::default(), 0);
        arp.start(60, TrackId::default(), 0);
        arp.start(64, TrackId::default(), 0);
        assert_eq!(arp.held(), [64, 60]);
        let out = run(&mut arp, 0, 24 * 4);
        assert_eq!(ons(&out), [64, 60, 64, 60]);
    }

    #[test]
    fn held_set_is_capped() {
        let mut arp = engaged();
        for n in 0..20 {
            arp.start(40 + n, TrackId::default(), 0);
        }
        assert_eq!(arp.held().len(), MAX_HELD_NOTES);
    }

    #[test]
    fn stop_of_underived_note_cuts_voice() {
        let mut arp = engaged();
        arp.mode = ArpMode::HeldNotes;
        arp.start(60, TrackId::default(), 0);
        arp.start(64, TrackId::default(), 0);
        run(&mut arp, 0, 1);
        assert_eq!(arp.state(), ArpState::Sounding);

        let mut out = Vec::new();
        // Releasing the other note keeps the sounding one.
        arp.stop(64, 2, &mut |d| out.push(d));
        assert!(out.is_empty());
        arp.stop(60, 3, &mut |d| out.push(d));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].velocity, 0);
        assert_eq!(out[0].note, 60);
        assert!(!arp.voice().active);
        assert_eq!(arp.state(), ArpState::Idle);
    }

    #[test]
    fn up_octave_keeps_voice_while_base_held() {
        let mut arp = engaged();
        arp.start(48, TrackId::default(), 0);
        arp.start(55, TrackId::default(), 0);
        run(&mut arp, 0, 25);
        assert_eq!(arp.voice().note, 60);
        let mut out = Vec::new();
        arp.stop(55, 26, &mut |d| out.push(d));
        assert!(out.is_empty());
        assert!(arp.voice().sounding);
    }

    #[test]
    fn octave_overflow_falls_back_to_base() {
        let mut arp = engaged();
        arp.start(120, TrackId::default(), 0);
        let out = run(&mut arp, 0, 24 * 3);
        assert_eq!(ons(&out), [120, 120, 120]);
    }

    #[test]
    fn wrap_cuts_note_and_rebases() {
        let mut arp = engaged();
        arp.start(60, TrackId::default(), 3000);
        run(&mut arp, 3000, 3001);
        let mut out = Vec::new();
        arp.on_wrap(0, &mut |d| out.push(d));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].velocity, 0);
        let out = run(&mut arp, 0, 1);
        assert_eq!(ons(&out), [72]);
    }

    #[test]
    fn release_silences_and_forgets() {
        let mut arp = engaged();
        arp.start(60, TrackId::default(), 0);
        run(&mut arp, 0, 1);
        let mut out = Vec::new();
        arp.release(&mut |d| out.push(d));
        assert_eq!(out.len(), 1);
        assert!(arp.held().is_empty());
        assert!(arp.is_engaged());
    }
}
