//! NoteRepeat: held pads retrigger at a fixed division.

use sb_core::config::{DEFAULT_VELOCITY, MAX_REPEAT_VOICES};
use sb_core::{is_valid_note, NoteDemand, Origin, Tick, TimingDivision, TrackId};

/// One repeating note.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RepeatVoice {
    pub active: bool,
    pub sounding: bool,
    pub note: u8,
    pub track: TrackId,
    pub next_tick: Tick,
    pub off_tick: Tick,
}

pub struct NoteRepeat {
    pub division: TimingDivision,
    velocity: u8,
    voices: [RepeatVoice; MAX_REPEAT_VOICES],
}

impl Default for NoteRepeat {
    fn default() -> Self {
        Self {
            division: TimingDivision::Sixteenth,
            velocity: DEFAULT_VELOCITY,
            voices: [RepeatVoice::default(); MAX_REPEAT_VOICES],
        }
    }
}

impl NoteRepeat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_velocity(&mut self, velocity: u8) {
        self.velocity = velocity.max(1);
    }

    pub fn voices(&self) -> &[RepeatVoice] {
        &self.voices
    }

    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }

    /// Start repeating `note` from `tick`. Ignored if the note is already
    /// repeating or every voice is busy.
    pub fn start(&mut self, note: u8, track: TrackId, tick: Tick) -> bool {
        if !is_valid_note(note) || self.find(note, track).is_some() {
            return false;
        }
        match self.voices.iter_mut().find(|v| !v.active) {
            Some(voice) => {
                *voice = RepeatVoice {
                    active: true,
                    sounding: false,
                    note,
                    track,
                    next_tick: tick,
                    off_tick: 0,
                };
                true
            }
            None => false,
        }
    }

    /// Stop repeating `note`, cutting it if it is sounding.
    pub fn stop(&mut self, note: u8, track: TrackId, tick: Tick, emit: &mut impl FnMut(NoteDemand)) {
        if let Some(i) = self.find(note, track) {
            let voice = self.voices[i];
            if voice.sounding {
                emit(NoteDemand::new(voice.track, voice.note, 0, tick, Origin::NoteRepeat));
            }
            self.voices[i] = RepeatVoice::default();
        }
    }

    /// Advance every voice to `tick`.
    pub fn process(&mut self, tick: Tick, emit: &mut impl FnMut(NoteDemand)) {
        let interval = self.division.ticks();
        let velocity = self.velocity;
        for v in self.voices.iter_mut().filter(|v| v.active) {
            if !v.sounding && tick >= v.next_tick {
                emit(NoteDemand::new(v.track, v.note, velocity, tick, Origin::NoteRepeat));
                v.sounding = true;
                v.off_tick = tick + (interval * 8 / 10).max(1);
            }
            if v.sounding && tick >= v.off_tick {
                emit(NoteDemand::new(v.track, v.note, 0, tick, Origin::NoteRepeat));
                v.sounding = false;
                v.next_tick += interval;
                if v.next_tick <= tick {
                    v.next_tick = tick + interval;
                }
            }
        }
    }

    /// The pattern looped back to `tick`: cut sounding notes and restart
    /// every voice from there.
    pub fn on_wrap(&mut self, tick: Tick, emit: &mut impl FnMut(NoteDemand)) {
        for v in self.voices.iter_mut().filter(|v| v.active) {
            if v.sounding {
                emit(NoteDemand::new(v.track, v.note, 0, tick, Origin::NoteRepeat));
                v.sounding = false;
            }
            v.next_tick = tick;
        }
    }

    /// Stop every voice, emitting note-offs for the sounding ones.
    pub fn release_all(&mut self, tick: Tick, emit: &mut impl FnMut(NoteDemand)) {
        for v in &self.voices {
            if v.active && v.sounding {
                emit(NoteDemand::new(v.track, v.note, 0, tick, Origin::NoteRepeat));
            }
        }
        self.reset();
    }

    /// Drop all voice state without emitting anything.
    pub fn reset(&mut self) {
        self.voices = [RepeatVoice::default(); MAX_REPEAT_VOICES];
    }

    fn find(&self, note: u8, track: TrackId) -> Option<usize> {
        self.voices
            .iter()
            .position(|v| v.active && v.note == note && v.track == track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn run(nr: &mut NoteRepeat, from: Tick, to: Tick) -> Vec<(Tick, u8, u8)> {
        let mut out = Vec::new();
        for t in from..to {
            nr.process(t, &mut |d| out.push((t, d.note, d.velocity)));
        }
        out
    }

    #[test]
    fn repeats_at_division() {
        let mut nr = NoteRepeat::new();
        nr.start(60, TrackId::default(), 0);
        let out = run(&mut nr, 0, 48);
        // Sixteenths with an 80% gate (19 ticks).
        assert_eq!(out, [(0, 60, 120), (19, 60, 0), (24, 60, 120), (43, 60, 0)]);
    }

    #[test]
    fn late_start_keeps_full_gate() {
        let mut nr = NoteRepeat::new();
        nr.start(60, TrackId::default(), 0);
        let out = run(&mut nr, 100, 144);
        assert_eq!(out, [(100, 60, 120), (119, 60, 0), (143, 60, 120)]);
    }

    #[test]
    fn voice_limit() {
        let mut nr = NoteRepeat::new();
        for n in 0..MAX_REPEAT_VOICES as u8 {
            assert!(nr.start(60 + n, TrackId::default(), 0));
        }
        assert!(!nr.start(70, TrackId::default(), 0));
        assert!(!nr.start(60, TrackId::default(), 0));
        assert_eq!(nr.active_count(), MAX_REPEAT_VOICES);
    }

    #[test]
    fn stop_while_sounding_emits_off_and_frees() {
        let mut nr = NoteRepeat::new();
        nr.start(60, TrackId::default(), 0);
        run(&mut nr, 0, 5);
        let mut out = Vec::new();
        nr.stop(60, TrackId::default(), 5, &mut |d| out.push(d));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].velocity, 0);
        assert_eq!(nr.active_count(), 0);
        assert!(run(&mut nr, 5, 100).is_empty());
    }

    #[test]
    fn stop_while_idle_is_silent() {
        let mut nr = NoteRepeat::new();
        nr.start(60, TrackId::default(), 0);
        run(&mut nr, 0, 20);
        let mut out = Vec::new();
        nr.stop(60, TrackId::default(), 20, &mut |d| out.push(d));
        assert!(out.is_empty());
    }

    #[test]
    fn wrap_restarts_from_cycle_start() {
        let mut nr = NoteRepeat::new();
        nr.start(60, TrackId::default(), 3060);
        run(&mut nr, 3060, 3065);
        let mut out = Vec::new();
        nr.on_wrap(0, &mut |d| out.push(d));
        assert_eq!(out.len(), 1);
        assert_eq!(run(&mut nr, 0, 1), [(0, 60, 120)]);
    }

    #[test]
    fn release_all_cuts_sounding_only() {
        let mut nr = NoteRepeat::new();
        nr.start(60, TrackId::default(), 0);
        nr.start(62, TrackId::default(), 10);
        run(&mut nr, 0, 5);
        let mut out = Vec::new();
        nr.release_all(5, &mut |d| out.push(d));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].note, 60);
        assert_eq!(nr.active_count(), 0);
    }
}
