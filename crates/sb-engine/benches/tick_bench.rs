//! Tick and dispatch benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sb_core::config::TICKS_PER_BAR;
use sb_engine::{AudioBackend, EngineKind, Engine, NoteTrigger, Settings, VoiceId};

/// Backend that only counts what it is sent.
#[derive(Default)]
struct CountingBackend {
    notes: u64,
}

impl AudioBackend for CountingBackend {
    fn note_on(&mut self, _trigger: NoteTrigger) {
        self.notes += 1;
    }
    fn note_off(&mut self, _voice: VoiceId, _engine: EngineKind) {}
    fn set_param(&mut self, _engine: EngineKind, _param: u8, _value: f32) {}
    fn all_notes_off(&mut self) {}
}

fn playing_engine(arp: bool) -> (Engine, CountingBackend) {
    let mut engine = Engine::new(Settings::default());
    let mut backend = CountingBackend::default();
    engine.load_demo_pattern();
    if arp {
        engine.toggle_arp(&mut backend);
        engine.arp_start(60);
        engine.arp_start(64);
    }
    engine.play_from_start();
    (engine, backend)
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    for bars in [1u32, 8] {
        let ticks = bars * TICKS_PER_BAR;
        group.throughput(Throughput::Elements(ticks as u64));

        group.bench_with_input(BenchmarkId::new("pattern", bars), &ticks, |b, &ticks| {
            let (mut engine, mut backend) = playing_engine(false);
            let mut clock = 0u32;
            b.iter(|| {
                for _ in 0..ticks {
                    engine.on_tick(clock);
                    engine.process_pending(&mut backend);
                    clock = clock.wrapping_add(1);
                }
                black_box(backend.notes)
            })
        });

        group.bench_with_input(BenchmarkId::new("pattern_arp", bars), &ticks, |b, &ticks| {
            let (mut engine, mut backend) = playing_engine(true);
            let mut clock = 0u32;
            b.iter(|| {
                for _ in 0..ticks {
                    engine.on_tick(clock);
                    engine.process_pending(&mut backend);
                    clock = clock.wrapping_add(1);
                }
                black_box(backend.notes)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
