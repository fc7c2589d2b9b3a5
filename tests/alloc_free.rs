//! Allocation-free tick path tests.
//!
//! These tests verify that `Engine::on_tick()` and the main-loop drain do not
//! allocate once the engine is built. They run several bars with the pattern,
//! note repeat, the arpeggiator and recording all active.
//!
//! Just run `cargo test`; no feature flags needed.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use sb_core::config::{PREROLL_TICKS, TICKS_PER_BAR};
use sb_engine::{AudioBackend, Display, Engine, EngineKind, Field, NoteTrigger, RecordMode, Settings, VoiceId};

/// Backend and display that only count calls.
#[derive(Default)]
struct Counter {
    calls: u64,
}

impl AudioBackend for Counter {
    fn note_on(&mut self, _trigger: NoteTrigger) {
        self.calls += 1;
    }
    fn note_off(&mut self, _voice: VoiceId, _engine: EngineKind) {
        self.calls += 1;
    }
    fn set_param(&mut self, _engine: EngineKind, _param: u8, _value: f32) {}
    fn all_notes_off(&mut self) {}
    fn metronome_click(&mut self, _downbeat: bool) {
        self.calls += 1;
    }
}

impl Display for Counter {
    fn write_number(&mut self, _field: Field, _value: i32) {
        self.calls += 1;
    }
    fn write_label(&mut self, _field: Field, _text: &str) {
        self.calls += 1;
    }
    fn redraw_cell(&mut self, _col: usize, _row: usize, _active: bool) {
        self.calls += 1;
    }
    fn draw_playhead_at(&mut self, _column: Option<usize>) {
        self.calls += 1;
    }
}

/// Run `ticks` clock pulses with a full main-loop pass after each,
/// aborting on any heap allocation.
fn assert_ticks_alloc_free(engine: &mut Engine, ticks: u32) -> u64 {
    let mut backend = Counter::default();
    let mut display = Counter::default();
    assert_no_alloc(|| {
        for t in 0..ticks {
            engine.on_tick(t);
            engine.process_pending(&mut backend);
            engine.process_display(&mut display);
        }
    });
    backend.calls + display.calls
}

#[test]
fn demo_pattern_alloc_free() {
    let mut engine = Engine::new(Settings::default());
    engine.load_demo_pattern();
    engine.play_from_start();
    assert!(assert_ticks_alloc_free(&mut engine, TICKS_PER_BAR * 16) > 0);
}

#[test]
fn generative_recording_alloc_free() {
    let mut engine = Engine::new(Settings::default());
    let mut backend = Counter::default();
    engine.load_demo_pattern();
    engine.select_track(1);
    engine.record(RecordMode::Overdub, &mut backend);
    engine.toggle_arp(&mut backend);
    engine.arp_start(60);
    engine.arp_start(67);
    engine.repeat_start(36);
    engine.repeat_start(38);
    engine.play_from_start();
    assert!(assert_ticks_alloc_free(&mut engine, PREROLL_TICKS + TICKS_PER_BAR * 8) > 0);
    assert!(engine.store().track_has_data(engine.track()));
}

#[test]
fn stop_and_restart_alloc_free() {
    let mut engine = Engine::new(Settings::default());
    let mut backend = Counter::default();
    engine.load_demo_pattern();
    engine.play_from_start();
    assert_no_alloc(|| {
        for t in 0..TICKS_PER_BAR {
            engine.on_tick(t);
            engine.process_pending(&mut backend);
        }
        engine.stop(&mut backend);
        engine.play_from_start();
        for t in TICKS_PER_BAR..TICKS_PER_BAR * 2 {
            engine.on_tick(t);
            engine.process_pending(&mut backend);
        }
    });
}
