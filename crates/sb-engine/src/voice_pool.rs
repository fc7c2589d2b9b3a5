//! VoiceAllocator: shared voice pool and the (track, note) to voice map.

use log::trace;
use sb_core::config::{MAX_TRACKS, MAX_VOICES, NOTE_COUNT};
use sb_core::{is_valid_note, TrackId};

use crate::backend::{AudioBackend, EngineKind, NoteTrigger, VoiceId};

/// Which voice to take over when the pool is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StealPolicy {
    /// Always voice 0
    #[default]
    FirstVoice,
    /// The voice whose note started longest ago
    Oldest,
}

/// One voice slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Voice {
    /// Owning track while active
    pub track: Option<TrackId>,
    pub note: u8,
    pub active: bool,
    pub engine: EngineKind,
    /// Allocation stamp, for oldest-first stealing
    started: u32,
}

impl Voice {
    const IDLE: Voice = Voice {
        track: None,
        note: 0,
        active: false,
        engine: EngineKind::Tonal,
        started: 0,
    };
}

/// Pool of `VOICES` voices shared by every track.
///
/// Each live (track, note) pair maps to exactly one voice, and each voice is
/// referenced by at most one pair.
pub struct VoiceAllocator<const VOICES: usize = MAX_VOICES> {
    voices: [Voice; VOICES],
    map: [[Option<u8>; NOTE_COUNT]; MAX_TRACKS],
    policy: StealPolicy,
    clock: u32,
}

impl<const VOICES: usize> VoiceAllocator<VOICES> {
    pub fn new(policy: StealPolicy) -> Self {
        Self {
            voices: [Voice::IDLE; VOICES],
            map: [[None; NOTE_COUNT]; MAX_TRACKS],
            policy,
            clock: 0,
        }
    }

    pub fn policy(&self) -> StealPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: StealPolicy) {
        self.policy = policy;
    }

    pub fn voice(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.get(id)
    }

    /// Voice currently sounding `note` on `track`.
    pub fn voice_for(&self, track: TrackId, note: u8) -> Option<VoiceId> {
        if !is_valid_note(note) {
            return None;
        }
        self.map[track.index()][note as usize].map(usize::from)
    }

    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }

    /// Start `note` on `track`, stealing a voice if none is free.
    ///
    /// Retriggering a note that is already sounding reuses its voice.
    pub fn note_on<B: AudioBackend>(
        &mut self,
        track: TrackId,
        note: u8,
        velocity: u8,
        engine: EngineKind,
        backend: &mut B,
    ) -> Option<VoiceId> {
        if !is_valid_note(note) || VOICES == 0 {
            return None;
        }
        let id = match self.voice_for(track, note) {
            Some(id) => id,
            None => match self.voices.iter().position(|v| !v.active) {
                Some(id) => id,
                None => {
                    let id = self.steal_candidate();
                    trace!("stealing voice {} for track {} note {}", id, track.index() + 1, note);
                    self.release(id, backend);
                    id
                }
            },
        };

        self.clock = self.clock.wrapping_add(1);
        self.voices[id] = Voice {
            track: Some(track),
            note,
            active: true,
            engine,
            started: self.clock,
        };
        self.map[track.index()][note as usize] = Some(id as u8);
        backend.note_on(NoteTrigger { voice: id, engine, track, note, velocity });
        Some(id)
    }

    /// Release the voice playing `note` on `track`. Unmapped notes are ignored.
    pub fn note_off<B: AudioBackend>(&mut self, track: TrackId, note: u8, backend: &mut B) -> bool {
        match self.voice_for(track, note) {
            Some(id) => {
                self.release(id, backend);
                true
            }
            None => false,
        }
    }

    /// Release every voice owned by `track`.
    pub fn mute_track<B: AudioBackend>(&mut self, track: TrackId, backend: &mut B) {
        for id in 0..VOICES {
            if self.voices[id].active && self.voices[id].track == Some(track) {
                self.release(id, backend);
            }
        }
    }

    /// Release every voice and drop every mapping.
    pub fn all_notes_off<B: AudioBackend>(&mut self, backend: &mut B) {
        self.voices = [Voice::IDLE; VOICES];
        self.map = [[None; NOTE_COUNT]; MAX_TRACKS];
        backend.all_notes_off();
    }

    fn release<B: AudioBackend>(&mut self, id: VoiceId, backend: &mut B) {
        let voice = self.voices[id];
        if !voice.active {
            return;
        }
        if let Some(track) = voice.track {
            let slot = &mut self.map[track.index()][voice.note as usize];
            if *slot == Some(id as u8) {
                *slot = None;
            }
        }
        self.voices[id] = Voice::IDLE;
        backend.note_off(id, voice.engine);
    }

    fn steal_candidate(&self) -> VoiceId {
        match self.policy {
            StealPolicy::FirstVoice => 0,
            StealPolicy::Oldest => self
                .voices
                .iter()
                .enumerate()
                .max_by_key(|(_, v)| self.clock.wrapping_sub(v.started))
                .map(|(i, _)| i)
                .unwrap_or(0),
        }
    }
}

impl Default for VoiceAllocator<MAX_VOICES> {
    fn default() -> Self {
        Self::new(StealPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{Call, RecordingBackend};

    fn track(i: usize) -> TrackId {
        TrackId::new(i).unwrap()
    }

    /// Every mapping points at a voice playing that exact pair, and no voice
    /// is referenced twice.
    fn assert_mapping_consistent<const V: usize>(alloc: &VoiceAllocator<V>) {
        let mut seen = [false; V];
        for t in 0..MAX_TRACKS {
            for n in 0..NOTE_COUNT {
                if let Some(id) = alloc.map[t][n] {
                    let id = id as usize;
                    assert!(!seen[id], "voice {} mapped twice", id);
                    seen[id] = true;
                    let v = alloc.voices[id];
                    assert!(v.active);
                    assert_eq!(v.track, Some(track(t)));
                    assert_eq!(v.note as usize, n);
                }
            }
        }
    }

    #[test]
    fn allocates_free_voices_in_order() {
        let mut alloc = VoiceAllocator::<4>::new(StealPolicy::FirstVoice);
        let mut be = RecordingBackend::default();
        assert_eq!(alloc.note_on(track(0), 60, 100, EngineKind::Tonal, &mut be), Some(0));
        assert_eq!(alloc.note_on(track(0), 62, 100, EngineKind::Tonal, &mut be), Some(1));
        assert_eq!(alloc.active_count(), 2);
    }

    #[test]
    fn fifth_note_steals_voice_zero() {
        let mut alloc = VoiceAllocator::<4>::new(StealPolicy::FirstVoice);
        let mut be = RecordingBackend::default();
        for n in 0..4 {
            alloc.note_on(track(0), 60 + n, 100, EngineKind::Tonal, &mut be);
        }
        let id = alloc.note_on(track(0), 70, 100, EngineKind::Tonal, &mut be);
        assert_eq!(id, Some(0));
        assert_eq!(alloc.voice_for(track(0), 60), None);
        assert_eq!(alloc.voice_for(track(0), 70), Some(0));
        assert!(be.calls.contains(&Call::Off(0)));
        assert_mapping_consistent(&alloc);
    }

    #[test]
    fn oldest_policy_steals_longest_running() {
        let mut alloc = VoiceAllocator::<4>::new(StealPolicy::Oldest);
        let mut be = RecordingBackend::default();
        for n in 0..4 {
            alloc.note_on(track(0), 60 + n, 100, EngineKind::Tonal, &mut be);
        }
        // Free voice 0 and reuse it so voice 1 becomes the oldest.
        alloc.note_off(track(0), 60, &mut be);
        alloc.note_on(track(0), 70, 100, EngineKind::Tonal, &mut be);
        let id = alloc.note_on(track(0), 71, 100, EngineKind::Tonal, &mut be);
        assert_eq!(id, Some(1));
        assert_mapping_consistent(&alloc);
    }

    #[test]
    fn retrigger_reuses_voice() {
        let mut alloc = VoiceAllocator::<4>::new(StealPolicy::FirstVoice);
        let mut be = RecordingBackend::default();
        let a = alloc.note_on(track(1), 60, 100, EngineKind::Tonal, &mut be);
        let b = alloc.note_on(track(1), 60, 90, EngineKind::Tonal, &mut be);
        assert_eq!(a, b);
        assert_eq!(alloc.active_count(), 1);
    }

    #[test]
    fn note_off_unmapped_is_noop() {
        let mut alloc = VoiceAllocator::<4>::new(StealPolicy::FirstVoice);
        let mut be = RecordingBackend::default();
        assert!(!alloc.note_off(track(0), 60, &mut be));
        assert!(!alloc.note_off(track(0), 200, &mut be));
        assert!(be.calls.is_empty());
    }

    #[test]
    fn invalid_note_is_rejected() {
        let mut alloc = VoiceAllocator::<4>::new(StealPolicy::FirstVoice);
        let mut be = RecordingBackend::default();
        assert_eq!(alloc.note_on(track(0), 128, 100, EngineKind::Tonal, &mut be), None);
    }

    #[test]
    fn mute_track_releases_only_that_track() {
        let mut alloc = VoiceAllocator::<4>::new(StealPolicy::FirstVoice);
        let mut be = RecordingBackend::default();
        alloc.note_on(track(0), 60, 100, EngineKind::Tonal, &mut be);
        alloc.note_on(track(1), 60, 100, EngineKind::OneShot, &mut be);
        alloc.note_on(track(0), 64, 100, EngineKind::Tonal, &mut be);
        alloc.mute_track(track(0), &mut be);
        assert_eq!(alloc.active_count(), 1);
        assert_eq!(alloc.voice_for(track(1), 60), Some(1));
        assert_mapping_consistent(&alloc);
    }

    #[test]
    fn all_notes_off_clears_everything() {
        let mut alloc = VoiceAllocator::<4>::new(StealPolicy::FirstVoice);
        let mut be = RecordingBackend::default();
        for n in 0..6 {
            alloc.note_on(track(n % 2), 60 + n as u8, 100, EngineKind::Tonal, &mut be);
        }
        alloc.all_notes_off(&mut be);
        assert_eq!(alloc.active_count(), 0);
        assert_eq!(be.calls.last(), Some(&Call::AllOff));
        assert_mapping_consistent(&alloc);
    }

    #[test]
    fn mapping_stays_consistent_under_churn() {
        let mut alloc = VoiceAllocator::<4>::new(StealPolicy::Oldest);
        let mut be = RecordingBackend::default();
        let mut seed = 7u32;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let t = track((seed >> 8) as usize % 3);
            let note = 60 + ((seed >> 12) % 8) as u8;
            if (seed >> 20) % 3 == 0 {
                alloc.note_off(t, note, &mut be);
            } else {
                alloc.note_on(t, note, 100, EngineKind::Tonal, &mut be);
            }
            assert_mapping_consistent(&alloc);
        }
    }
}
