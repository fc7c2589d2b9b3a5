//! Main loop: clock ticks in, notes and screen updates out.

use std::time::{Duration, Instant};

use log::{info, warn};
use ringbuf::traits::Consumer;
use sb_core::Tick;
use sb_engine::{Engine, InputEvent, InputQueue, InputRouter, Settings};

use crate::clock::ClockThread;
use crate::error::HostError;
use crate::log_backend::LogBackend;
use crate::text_display::TextDisplay;

/// Idle time between main-loop passes in real-time mode.
const POLL: Duration = Duration::from_millis(1);

/// Owns the engine and the host stand-ins for audio, display and input.
pub struct Controller {
    engine: Engine,
    backend: LogBackend,
    display: TextDisplay,
    router: InputRouter,
    input: InputQueue,
    /// Next tick handed to the engine in stepped mode
    clock: Tick,
}

impl Controller {
    pub fn new(settings: Settings) -> Self {
        Self {
            engine: Engine::new(settings),
            backend: LogBackend::new(),
            display: TextDisplay::new(),
            router: InputRouter::new(),
            input: InputQueue::new(),
            clock: 0,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn backend(&self) -> &LogBackend {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut LogBackend {
        &mut self.backend
    }

    /// Borrow the engine and the backend together, for engine calls that
    /// talk to the voices.
    pub fn split_mut(&mut self) -> (&mut Engine, &mut LogBackend) {
        (&mut self.engine, &mut self.backend)
    }

    pub fn display(&self) -> &TextDisplay {
        &self.display
    }

    /// Queue a front-panel event for the next pass of the loop.
    pub fn push_input(&mut self, event: InputEvent) -> Result<(), HostError> {
        self.input.push(event)?;
        Ok(())
    }

    /// One main-loop pass: voices, input, then the display.
    pub fn service(&mut self) {
        self.engine.process_pending(&mut self.backend);
        self.router.drain(&mut self.input, &mut self.engine, &mut self.backend);
        self.engine.process_pending(&mut self.backend);
        self.engine.process_display(&mut self.display);
    }

    /// Step the engine through `n` ticks, servicing after each one.
    pub fn run_ticks(&mut self, n: u32) {
        for _ in 0..n {
            self.engine.on_tick(self.clock);
            self.clock = self.clock.wrapping_add(1);
            self.service();
        }
    }

    /// Hand a backlog of clock ticks to the engine. Each tick's notes reach
    /// the backend before the next tick runs, so a long backlog cannot
    /// overflow the pending queue. Returns the ticks handled.
    pub fn play_ticks(&mut self, ticks: impl IntoIterator<Item = Tick>) -> usize {
        let mut handled = 0;
        for tick in ticks {
            self.engine.on_tick(tick);
            self.engine.process_pending(&mut self.backend);
            handled += 1;
        }
        handled
    }

    /// Run against a real clock at the sequence tempo for `duration`. Tempo
    /// changes made while running retime the clock.
    pub fn run_for(&mut self, duration: Duration) -> Result<(), HostError> {
        let (mut clock, mut ticks) = ClockThread::spawn(self.engine.bpm())?;
        info!("running for {:?} at {} BPM", duration, self.engine.bpm());
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            let handled = self.play_ticks(std::iter::from_fn(|| ticks.try_pop()));
            self.service();
            if self.engine.bpm() != clock.bpm() {
                clock.set_bpm(self.engine.bpm())?;
            }
            if handled == 0 {
                std::thread::sleep(POLL);
            }
        }
        clock.stop();
        if clock.dropped() > 0 {
            warn!("{} clock ticks dropped", clock.dropped());
        }
        Ok(())
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
