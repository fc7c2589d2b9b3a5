//! Clock thread: emits monotonically increasing ticks at the sequence tempo.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, trace};
use ringbuf::traits::{Producer, Split};
use ringbuf::{HeapCons, HeapRb};
use sb_core::config::PPQN;
use sb_core::{Tick, BPM_MAX, BPM_MIN};

use crate::error::HostError;

/// Ticks the ring can hold before the clock starts dropping them.
const TICK_BUFFER: usize = 256;

/// Time between ticks at `bpm`.
pub fn tick_interval(bpm: f32) -> Duration {
    Duration::from_secs_f64(60.0 / (bpm as f64 * PPQN as f64))
}

/// A running clock. Dropping it stops the thread.
///
/// The tempo is re-read before every tick, so [`ClockThread::set_bpm`] takes
/// effect from the next tick on.
pub struct ClockThread {
    running: Arc<AtomicBool>,
    /// Tempo as `f32` bits
    tempo: Arc<AtomicU32>,
    dropped: Arc<AtomicU32>,
    handle: Option<JoinHandle<()>>,
}

fn check_tempo(bpm: f32) -> Result<f32, HostError> {
    if (BPM_MIN..=BPM_MAX).contains(&bpm) {
        Ok(bpm)
    } else {
        Err(HostError::InvalidTempo(bpm))
    }
}

impl ClockThread {
    /// Start ticking at `bpm`. Ticks are read from the returned consumer.
    pub fn spawn(bpm: f32) -> Result<(Self, HeapCons<Tick>), HostError> {
        let bpm = check_tempo(bpm)?;
        let (mut producer, consumer) = HeapRb::<Tick>::new(TICK_BUFFER).split();
        let running = Arc::new(AtomicBool::new(true));
        let tempo = Arc::new(AtomicU32::new(bpm.to_bits()));
        let dropped = Arc::new(AtomicU32::new(0));

        let handle = {
            let running = running.clone();
            let tempo = tempo.clone();
            let dropped = dropped.clone();
            std::thread::Builder::new()
                .name("sb-clock".into())
                .spawn(move || {
                    let mut bits = tempo.load(Ordering::Relaxed);
                    let mut interval = tick_interval(f32::from_bits(bits));
                    // Deadlines are measured from the last tempo change so drift does not accumulate.
                    let mut anchor = Instant::now();
                    let mut since_anchor: u32 = 0;
                    let mut tick: Tick = 0;
                    while running.load(Ordering::Relaxed) {
                        let current = tempo.load(Ordering::Relaxed);
                        if current != bits {
                            anchor += interval * since_anchor;
                            since_anchor = 0;
                            bits = current;
                            interval = tick_interval(f32::from_bits(bits));
                            trace!("clock: tempo now {}", f32::from_bits(bits));
                        }
                        let deadline = anchor + interval * since_anchor;
                        if let Some(wait) = deadline.checked_duration_since(Instant::now()) {
                            std::thread::sleep(wait);
                        }
                        if producer.try_push(tick).is_err() {
                            dropped.fetch_add(1, Ordering::Relaxed);
                            trace!("clock: tick {} dropped", tick);
                        }
                        tick = tick.wrapping_add(1);
                        since_anchor = since_anchor.wrapping_add(1);
                    }
                })?
        };
        debug!("clock started at {} BPM ({:?} per tick)", bpm, tick_interval(bpm));

        Ok((
            Self {
                running,
                tempo,
                dropped,
                handle: Some(handle),
            },
            consumer,
        ))
    }

    pub fn bpm(&self) -> f32 {
        f32::from_bits(self.tempo.load(Ordering::Relaxed))
    }

    /// Change the tempo of a running clock.
    pub fn set_bpm(&self, bpm: f32) -> Result<(), HostError> {
        let bpm = check_tempo(bpm)?;
        if self.tempo.swap(bpm.to_bits(), Ordering::Relaxed) != bpm.to_bits() {
            debug!("clock tempo {} BPM", bpm);
        }
        Ok(())
    }

    /// Ticks lost because the main loop fell behind.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            debug!("clock stopped");
        }
    }
}

impl Drop for ClockThread {
    fn drop(&mut self) {
        self.stop();
    }
}
