//! Transport: STOPPED / PREROLL / PLAYING / PAUSED and the pattern clock.

use core::sync::atomic::{AtomicU32, Ordering};

use log::debug;
use sb_core::config::{BEATS_PER_BAR, PPQN, PREROLL_TICKS};
use sb_core::Tick;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportState {
    #[default]
    Stopped,
    /// Metronome count-in before recording
    Preroll,
    Playing,
    Paused,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordMode {
    /// Record over a cleared pattern
    Normal,
    /// Record on top of the existing pattern
    Overdub,
}

impl RecordMode {
    pub const fn label(self) -> &'static str {
        match self {
            RecordMode::Normal => "REC",
            RecordMode::Overdub => "OVER",
        }
    }
}

/// What a clock tick means for the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickAction {
    /// Not running
    Idle,
    /// Count-in tick; `click` is `Some(downbeat)` on a quarter note
    Count { click: Option<bool> },
    /// Play the pattern at `tick`
    Play {
        tick: Tick,
        /// The pattern looped since the previous tick
        wrapped: bool,
        click: Option<bool>,
    },
}

/// Transport state machine.
///
/// The external clock counts freely; the transport maps it onto pattern
/// ticks. A pending latch pins the next clock tick to a chosen pattern tick,
/// which is how playback starts at 0 and resumes after a pause.
#[derive(Debug, Default)]
pub struct Transport {
    state: TransportState,
    recording: Option<RecordMode>,
    /// Current pattern tick, read by the main loop
    playhead: AtomicU32,
    tick_offset: Tick,
    latch: Option<Tick>,
    /// Restarted mid-play; the next tick counts as a loop wrap
    rewind: bool,
    preroll: u32,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn recording(&self) -> Option<RecordMode> {
        self.recording
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    pub fn playhead(&self) -> Tick {
        self.playhead.load(Ordering::Acquire)
    }

    fn set_playhead(&self, tick: Tick) {
        self.playhead.store(tick, Ordering::Release);
    }

    /// Count-in ticks still to go.
    pub fn preroll_remaining(&self) -> u32 {
        match self.state {
            TransportState::Preroll => PREROLL_TICKS - self.preroll,
            _ => 0,
        }
    }

    /// Start from the top: count in first when recording.
    pub fn play_from_start(&mut self) -> TransportState {
        self.rewind = self.state != TransportState::Stopped;
        self.set_playhead(0);
        self.tick_offset = 0;
        self.preroll = 0;
        self.latch = Some(0);
        self.state = if self.recording.is_some() {
            TransportState::Preroll
        } else {
            TransportState::Playing
        };
        debug!("transport: play from start ({:?})", self.state);
        self.state
    }

    pub fn play_pause(&mut self, max_ticks: Tick) -> TransportState {
        match self.state {
            TransportState::Stopped => {
                self.latch = Some(self.playhead());
                self.state = TransportState::Playing;
            }
            TransportState::Playing | TransportState::Preroll => {
                self.pause();
            }
            TransportState::Paused => {
                self.resume(max_ticks);
            }
        }
        debug!("transport: {:?}", self.state);
        self.state
    }

    pub fn pause(&mut self) {
        if matches!(self.state, TransportState::Playing | TransportState::Preroll) {
            self.state = TransportState::Paused;
        }
    }

    /// Continue from the tick after the one last played. A start that never
    /// reached its first tick keeps its latch, so nothing is skipped.
    pub fn resume(&mut self, max_ticks: Tick) {
        if self.state == TransportState::Paused {
            let next = (self.playhead() + 1) % max_ticks.max(1);
            self.latch.get_or_insert(next);
            self.preroll = 0;
            self.state = TransportState::Playing;
        }
    }

    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.rewind = false;
        self.recording = None;
        self.preroll = 0;
        self.latch = None;
        self.set_playhead(0);
        debug!("transport: stopped");
    }

    /// Arm recording. Normal recording rewinds unless already playing.
    pub fn record(&mut self, mode: RecordMode) {
        self.recording = Some(mode);
        if mode == RecordMode::Normal && self.state != TransportState::Playing {
            self.state = TransportState::Stopped;
            self.preroll = 0;
            self.latch = None;
            self.set_playhead(0);
        }
        debug!("record armed: {:?}", mode);
    }

    pub fn record_off(&mut self) {
        if self.recording.take().is_some() {
            debug!("record off");
        }
    }

    /// Keep the playhead inside a shortened pattern.
    pub fn clamp_playhead(&mut self, max_ticks: Tick) {
        let playhead = self.playhead();
        if playhead >= max_ticks {
            self.set_playhead(playhead % max_ticks.max(1));
        }
    }

    /// Map an external clock tick onto the pattern.
    pub fn advance(&mut self, tick: Tick, max_ticks: Tick) -> TickAction {
        match self.state {
            TransportState::Preroll => {
                let n = self.preroll;
                self.preroll += 1;
                if self.preroll >= PREROLL_TICKS {
                    self.state = TransportState::Playing;
                    self.preroll = 0;
                    self.latch = Some(0);
                    self.set_playhead(0);
                    debug!("transport: preroll done");
                }
                TickAction::Count { click: click_at(n) }
            }
            TransportState::Playing => {
                if let Some(start) = self.latch.take() {
                    self.tick_offset = tick.wrapping_sub(start);
                }
                let pattern_tick = tick.wrapping_sub(self.tick_offset) % max_ticks.max(1);
                let wrapped = pattern_tick < self.playhead() || core::mem::take(&mut self.rewind);
                self.set_playhead(pattern_tick);
                let click = if self.recording.is_some() { click_at(pattern_tick) } else { None };
                TickAction::Play { tick: pattern_tick, wrapped, click }
            }
            TransportState::Stopped | TransportState::Paused => TickAction::Idle,
        }
    }
}

/// `Some(downbeat)` on quarter-note ticks.
fn click_at(tick: Tick) -> Option<bool> {
    (tick % PPQN == 0).then_some((tick / PPQN) % BEATS_PER_BAR == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: Tick = 8 * 384;

    #[test]
    fn stopped_ignores_ticks() {
        let mut tr = Transport::new();
        assert_eq!(tr.advance(5, MAX), TickAction::Idle);
    }

    #[test]
    fn play_starts_at_pattern_zero() {
        let mut tr = Transport::new();
        tr.play_from_start();
        assert_eq!(
            tr.advance(1000, MAX),
            TickAction::Play { tick: 0, wrapped: false, click: None }
        );
        assert!(matches!(tr.advance(1001, MAX), TickAction::Play { tick: 1, .. }));
    }

    #[test]
    fn preroll_lasts_four_beats() {
        let mut tr = Transport::new();
        tr.record(RecordMode::Overdub);
        assert_eq!(tr.play_from_start(), TransportState::Preroll);
        let mut clicks = 0;
        for t in 0..PREROLL_TICKS {
            assert_eq!(tr.state(), TransportState::Preroll);
            if let TickAction::Count { click: Some(_) } = tr.advance(t, MAX) {
                clicks += 1;
            }
        }
        assert_eq!(clicks, 4);
        assert_eq!(tr.state(), TransportState::Playing);
        assert_eq!(tr.playhead(), 0);
        assert_eq!(
            tr.advance(PREROLL_TICKS, MAX),
            TickAction::Play { tick: 0, wrapped: false, click: Some(true) }
        );
    }

    #[test]
    fn wraps_at_pattern_length() {
        let mut tr = Transport::new();
        tr.play_from_start();
        for t in 0..MAX {
            assert!(matches!(tr.advance(t, MAX), TickAction::Play { wrapped: false, .. }));
        }
        assert_eq!(
            tr.advance(MAX, MAX),
            TickAction::Play { tick: 0, wrapped: true, click: None }
        );
    }

    #[test]
    fn pause_resume_continues() {
        let mut tr = Transport::new();
        tr.play_from_start();
        for t in 0..10 {
            tr.advance(t, MAX);
        }
        assert_eq!(tr.play_pause(MAX), TransportState::Paused);
        assert_eq!(tr.advance(10, MAX), TickAction::Idle);
        assert_eq!(tr.advance(500, MAX), TickAction::Idle);
        assert_eq!(tr.play_pause(MAX), TransportState::Playing);
        assert!(matches!(tr.advance(501, MAX), TickAction::Play { tick: 10, wrapped: false, .. }));
    }

    #[test]
    fn pause_before_first_tick_resumes_at_zero() {
        let mut tr = Transport::new();
        tr.play_from_start();
        tr.pause();
        tr.resume(MAX);
        assert!(matches!(tr.advance(40, MAX), TickAction::Play { tick: 0, .. }));
        assert!(matches!(tr.advance(41, MAX), TickAction::Play { tick: 1, .. }));
    }

    #[test]
    fn pause_during_preroll_resumes_at_zero() {
        let mut tr = Transport::new();
        tr.record(RecordMode::Overdub);
        tr.play_from_start();
        for t in 0..10 {
            tr.advance(t, MAX);
        }
        tr.pause();
        tr.resume(MAX);
        assert_eq!(tr.state(), TransportState::Playing);
        assert!(matches!(tr.advance(10, MAX), TickAction::Play { tick: 0, .. }));
    }

    #[test]
    fn restart_while_playing_counts_as_wrap() {
        let mut tr = Transport::new();
        tr.play_from_start();
        for t in 0..100 {
            tr.advance(t, MAX);
        }
        tr.play_from_start();
        assert_eq!(
            tr.advance(100, MAX),
            TickAction::Play { tick: 0, wrapped: true, click: None }
        );
        assert!(matches!(tr.advance(101, MAX), TickAction::Play { tick: 1, wrapped: false, .. }));
    }

    #[test]
    fn invalid_transitions_are_noops() {
        let mut tr = Transport::new();
        tr.pause();
        assert_eq!(tr.state(), TransportState::Stopped);
        tr.resume(MAX);
        assert_eq!(tr.state(), TransportState::Stopped);
        tr.stop();
        tr.stop();
        assert_eq!(tr.state(), TransportState::Stopped);
    }

    #[test]
    fn stop_cancels_recording() {
        let mut tr = Transport::new();
        tr.record(RecordMode::Normal);
        tr.play_from_start();
        tr.stop();
        assert!(!tr.is_recording());
        assert_eq!(tr.playhead(), 0);
    }

    #[test]
    fn normal_record_while_playing_keeps_playing() {
        let mut tr = Transport::new();
        tr.play_from_start();
        tr.advance(0, MAX);
        tr.record(RecordMode::Normal);
        assert_eq!(tr.state(), TransportState::Playing);
        tr.pause();
        tr.record(RecordMode::Normal);
        assert_eq!(tr.state(), TransportState::Stopped);
    }

    #[test]
    fn recording_clicks_on_quarters() {
        let mut tr = Transport::new();
        tr.play_from_start();
        tr.record(RecordMode::Overdub);
        let clicks: usize = (0..384)
            .filter(|&t| matches!(tr.advance(t, MAX), TickAction::Play { click: Some(_), .. }))
            .count();
        assert_eq!(clicks, 4);
    }
}
