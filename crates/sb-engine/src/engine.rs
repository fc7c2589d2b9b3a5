//! Engine: the single context that owns every sequencing component.
//!
//! [`Engine::on_tick`] is the producer and runs once per clock pulse. It reads
//! due pattern events, ticks note repeat and the arpeggiator, and pushes note
//! demands into the pending queue. [`Engine::process_pending`] is the
//! consumer: it drains the queue into the voice allocator and records
//! generated notes. Everything else is main-loop control.

use heapless::Vec as BoundedVec;
use log::{debug, trace};
use sb_core::config::MAX_REPEAT_VOICES;
use sb_core::{is_valid_note, NoteDemand, Origin, PendingEvent, Tick, TimingDivision, TrackId, TrackKind};

use crate::arpeggiator::{ArpMode, Arpeggiator};
use crate::backend::{AudioBackend, Display, EngineKind, Field};
use crate::event_store::EventStore;
use crate::input::{EncoderPage, ENCODERS};
use crate::note_repeat::NoteRepeat;
use crate::ring::{PendingQueue, ProducerGate, SingleContext};
use crate::settings::{clamp_velocity, Settings};
use crate::transport::{RecordMode, TickAction, Transport, TransportState};
use crate::view::{GridView, Zoom};
use crate::voice_pool::VoiceAllocator;

/// Note-offs cut by a main-loop release: every repeat voice plus the arp.
const CUT_CAPACITY: usize = MAX_REPEAT_VOICES + 1;
type CutBuffer = BoundedVec<NoteDemand, CUT_CAPACITY>;

/// Status fields waiting to be written to the display.
#[derive(Clone, Copy, Debug, Default)]
struct Stale {
    quantize: bool,
    arp: bool,
    repeat: bool,
    record: bool,
    bpm: bool,
    length: bool,
    velocity: bool,
    zoom: bool,
    page: bool,
    track: bool,
    params: bool,
}

impl Stale {
    const ALL: Stale = Stale {
        quantize: true,
        arp: true,
        repeat: true,
        record: true,
        bpm: true,
        length: true,
        velocity: true,
        zoom: true,
        page: true,
        track: true,
        params: true,
    };
}

pub struct Engine<G: ProducerGate = SingleContext> {
    store: EventStore,
    voices: VoiceAllocator,
    arp: Arpeggiator,
    repeat: NoteRepeat,
    transport: Transport,
    pending: PendingQueue,
    gate: G,
    /// Track that pads play and record into
    track: TrackId,
    velocity: u8,
    metronome: bool,
    /// Synth parameters on the encoder page (0.0-1.0)
    params: [f32; ENCODERS],
    page: EncoderPage,
    view: GridView,
    stale: Stale,
}

impl Engine<SingleContext> {
    pub fn new(settings: Settings) -> Self {
        Self::with_gate(settings, SingleContext)
    }
}

impl Default for Engine<SingleContext> {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl<G: ProducerGate> Engine<G> {
    /// Build an engine whose consumer side suspends the producer through `gate`.
    pub fn with_gate(settings: Settings, gate: G) -> Self {
        let mut store = EventStore::new();
        store.set_quantize(settings.quantize);
        let track = store.select_track(0).unwrap_or_default();

        let velocity = clamp_velocity(settings.velocity as i32);
        let mut arp = Arpeggiator::new();
        arp.mode = settings.arp_mode;
        arp.division = settings.arp_division;
        arp.set_octaves(settings.arp_octaves);
        arp.set_gate(settings.arp_gate);
        arp.set_velocity(velocity);
        let mut repeat = NoteRepeat::new();
        repeat.division = settings.repeat_division;
        repeat.set_velocity(velocity);

        Self {
            store,
            voices: VoiceAllocator::new(settings.steal_policy),
            arp,
            repeat,
            transport: Transport::new(),
            pending: PendingQueue::new(),
            gate,
            track,
            velocity,
            metronome: settings.metronome,
            params: [0.5; ENCODERS],
            page: EncoderPage::default(),
            view: GridView::new(),
            stale: Stale::ALL,
        }
    }

    // --- Clock (producer) ---

    /// Handle one clock pulse. Never allocates.
    pub fn on_tick(&mut self, tick: Tick) {
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.tick(tick));
        #[cfg(not(feature = "alloc_check"))]
        self.tick(tick);
    }

    fn tick(&mut self, tick: Tick) {
        let max_ticks = self.store.max_ticks();
        let Self { store, pending, arp, repeat, transport, metronome, .. } = self;

        let click = match transport.advance(tick, max_ticks) {
            TickAction::Idle => return,
            TickAction::Count { click } => click,
            TickAction::Play { tick, wrapped, click } => {
                let mut emit = |demand: NoteDemand| {
                    let _ = pending.push(PendingEvent::Note(demand));
                };
                if wrapped {
                    repeat.on_wrap(tick, &mut emit);
                    arp.on_wrap(tick, &mut emit);
                }
                for track in store.sequence().tracks().filter(|t| t.is_audible()) {
                    for event in store.events_at(track.id, tick) {
                        emit(NoteDemand::new(track.id, event.note, event.velocity(), tick, Origin::Pattern));
                    }
                }
                repeat.process(tick, &mut emit);
                arp.process(tick, &mut emit);
                click
            }
        };

        if let (Some(downbeat), true) = (click, *metronome) {
            let _ = pending.push(PendingEvent::Click { downbeat });
        }
    }

    // --- Voice dispatch (consumer) ---

    /// Drain the pending queue into the backend. Returns the items handled.
    pub fn process_pending<B: AudioBackend>(&mut self, backend: &mut B) -> usize {
        let mut handled = 0;
        loop {
            let Self { gate, pending, .. } = self;
            let Some(event) = gate.suspend(|| pending.pop()) else {
                break;
            };
            handled += 1;
            match event {
                PendingEvent::Click { downbeat } => backend.metronome_click(downbeat),
                PendingEvent::Note(demand) => self.dispatch(demand, backend),
            }
        }
        handled
    }

    fn dispatch<B: AudioBackend>(&mut self, demand: NoteDemand, backend: &mut B) {
        let engine = self
            .store
            .track(demand.track)
            .map_or(EngineKind::Tonal, |t| EngineKind::from(t.kind));
        if demand.is_note_on() {
            self.voices
                .note_on(demand.track, demand.note, demand.velocity, engine, backend);
        } else {
            self.voices.note_off(demand.track, demand.note, backend);
        }

        if demand.origin.is_recorded() && self.transport.is_recording() && self.transport.is_playing() {
            if let Err(err) = self
                .store
                .record_event(demand.track, demand.tick, demand.note, demand.velocity)
            {
                trace!("record dropped: {}", err);
            }
        }
    }

    fn dispatch_all<B: AudioBackend>(&mut self, cut: CutBuffer, backend: &mut B) {
        for demand in cut {
            self.dispatch(demand, backend);
        }
    }

    /// Playhead as seen from the main loop.
    pub fn playhead(&self) -> Tick {
        self.gate.suspend(|| self.transport.playhead())
    }

    /// Release every voice and drop everything still queued.
    pub fn all_notes_off<B: AudioBackend>(&mut self, backend: &mut B) {
        let Self { gate, pending, .. } = self;
        gate.suspend(|| pending.reset());
        self.voices.all_notes_off(backend);
    }

    // --- Transport ---

    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    pub fn recording(&self) -> Option<RecordMode> {
        self.transport.recording()
    }

    pub fn is_recording(&self) -> bool {
        self.transport.is_recording()
    }

    /// Ticks of count-in left before recording starts.
    pub fn preroll_remaining(&self) -> u32 {
        self.transport.preroll_remaining()
    }

    pub fn play_from_start(&mut self) -> TransportState {
        let Self { gate, transport, .. } = self;
        gate.suspend(|| transport.play_from_start())
    }

    pub fn play_pause(&mut self) -> TransportState {
        let max_ticks = self.store.max_ticks();
        let Self { gate, transport, .. } = self;
        gate.suspend(|| transport.play_pause(max_ticks))
    }

    pub fn pause(&mut self) {
        let Self { gate, transport, .. } = self;
        gate.suspend(|| transport.pause());
    }

    pub fn resume(&mut self) {
        let max_ticks = self.store.max_ticks();
        let Self { gate, transport, .. } = self;
        gate.suspend(|| transport.resume(max_ticks));
    }

    /// Stop playback, cancel recording, and silence everything.
    ///
    /// With the producer suspended the queue is emptied and the generative
    /// engines forget their voices; then every voice is released.
    pub fn stop<B: AudioBackend>(&mut self, backend: &mut B) {
        let Self { gate, transport, pending, arp, repeat, .. } = self;
        gate.suspend(|| {
            transport.stop();
            pending.reset();
            arp.reset();
            repeat.reset();
        });
        self.voices.all_notes_off(backend);
        self.stale.record = true;
    }

    /// Arm recording. Normal mode clears the current track and stops first
    /// unless already playing.
    pub fn record<B: AudioBackend>(&mut self, mode: RecordMode, backend: &mut B) {
        if mode == RecordMode::Normal {
            if !self.transport.is_playing() {
                self.stop(backend);
            }
            self.store.clear(self.track);
        }
        let Self { gate, transport, .. } = self;
        gate.suspend(|| transport.record(mode));
        self.stale.record = true;
    }

    pub fn record_off(&mut self) {
        let Self { gate, transport, .. } = self;
        gate.suspend(|| transport.record_off());
        self.stale.record = true;
    }

    // --- Sequences and tracks ---

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn voices(&self) -> &VoiceAllocator {
        &self.voices
    }

    pub fn track(&self) -> TrackId {
        self.track
    }

    /// Make `index` the current track, creating it on first use.
    pub fn select_track(&mut self, index: usize) {
        match self.store.select_track(index) {
            Ok(id) => {
                self.track = id;
                self.stale.track = true;
            }
            Err(err) => trace!("select track: {}", err),
        }
    }

    pub fn set_track_kind(&mut self, kind: TrackKind) {
        self.store.set_track_kind(self.track, kind);
        self.stale.track = true;
    }

    /// Flip a track's mute; muting releases its voices.
    pub fn toggle_mute<B: AudioBackend>(&mut self, index: usize, backend: &mut B) {
        let Ok(id) = TrackId::new(index) else {
            return;
        };
        let Self { gate, store, .. } = self;
        if gate.suspend(|| store.toggle_mute(id)) == Some(true) {
            self.voices.mute_track(id, backend);
        }
    }

    pub fn clear_track(&mut self) {
        let Self { gate, store, track, .. } = self;
        gate.suspend(|| store.clear(*track));
    }

    pub fn clear_all(&mut self) {
        let Self { gate, store, .. } = self;
        gate.suspend(|| store.clear_all());
    }

    /// Switch sequences; the transport stops first.
    pub fn select_sequence<B: AudioBackend>(&mut self, index: usize, backend: &mut B) {
        self.stop(backend);
        match self.store.select_sequence(index) {
            Ok(()) => {
                debug!("sequence {} selected", index + 1);
                self.select_track(self.track.index());
                self.view.invalidate();
                self.stale = Stale::ALL;
            }
            Err(err) => trace!("select sequence: {}", err),
        }
    }

    pub fn set_length(&mut self, bars: u8) -> u8 {
        let Self { gate, store, transport, .. } = self;
        let applied = gate.suspend(|| {
            let applied = store.set_length(bars);
            transport.clamp_playhead(store.max_ticks());
            applied
        });
        self.stale.length = true;
        applied
    }

    pub fn bpm(&self) -> f32 {
        self.store.sequence().bpm()
    }

    pub fn set_bpm(&mut self, bpm: f32) -> f32 {
        self.stale.bpm = true;
        self.store.set_bpm(bpm)
    }

    pub fn set_quantize(&mut self, division: Option<TimingDivision>) {
        self.store.set_quantize(division);
        self.stale.quantize = true;
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: i32) -> u8 {
        self.velocity = clamp_velocity(velocity);
        let Self { gate, arp, repeat, velocity, .. } = self;
        gate.suspend(|| {
            arp.set_velocity(*velocity);
            repeat.set_velocity(*velocity);
        });
        self.stale.velocity = true;
        self.velocity
    }

    pub fn set_metronome(&mut self, on: bool) {
        self.metronome = on;
    }

    /// Replace the current track with the demo groove.
    pub fn load_demo_pattern(&mut self) {
        let Self { gate, store, track, velocity, .. } = self;
        gate.suspend(|| store.load_demo_pattern(*track, *velocity));
    }

    // --- Pads ---

    /// Start a note on the current track and record it if recording.
    pub fn pad_note_on<B: AudioBackend>(&mut self, note: u8, backend: &mut B) {
        if !is_valid_note(note) {
            return;
        }
        let tick = self.playhead();
        let demand = NoteDemand::new(self.track, note, self.velocity, tick, Origin::Live);
        self.dispatch(demand, backend);
    }

    pub fn pad_note_off<B: AudioBackend>(&mut self, note: u8, backend: &mut B) {
        if !is_valid_note(note) {
            return;
        }
        let tick = self.playhead();
        self.dispatch(NoteDemand::new(self.track, note, 0, tick, Origin::Live), backend);
    }

    // --- Arpeggiator ---

    pub fn arp(&self) -> &Arpeggiator {
        &self.arp
    }

    pub fn arp_engaged(&self) -> bool {
        self.arp.is_engaged()
    }

    pub fn toggle_arp<B: AudioBackend>(&mut self, backend: &mut B) -> bool {
        let mut cut = CutBuffer::new();
        let Self { gate, arp, .. } = self;
        let engaged = gate.suspend(|| arp.toggle(&mut |d| {
            let _ = cut.push(d);
        }));
        self.dispatch_all(cut, backend);
        debug!("arpeggiator {}", if engaged { "on" } else { "off" });
        self.stale.arp = true;
        engaged
    }

    pub fn arp_start(&mut self, note: u8) {
        let tick = self.playhead();
        let Self { gate, arp, track, .. } = self;
        gate.suspend(|| arp.start(note, *track, tick));
    }

    pub fn arp_stop<B: AudioBackend>(&mut self, note: u8, backend: &mut B) {
        let tick = self.playhead();
        let mut cut = CutBuffer::new();
        let Self { gate, arp, .. } = self;
        gate.suspend(|| arp.stop(note, tick, &mut |d| {
            let _ = cut.push(d);
        }));
        self.dispatch_all(cut, backend);
    }

    pub fn set_arp_mode(&mut self, mode: ArpMode) {
        let Self { gate, arp, .. } = self;
        gate.suspend(|| arp.mode = mode);
        self.stale.arp = true;
    }

    pub fn set_arp_division(&mut self, division: TimingDivision) {
        let Self { gate, arp, .. } = self;
        gate.suspend(|| arp.division = division);
        self.stale.arp = true;
    }

    pub fn set_arp_octaves(&mut self, octaves: i32) -> u8 {
        let octaves = octaves.clamp(1, Arpeggiator::MAX_OCTAVES as i32) as u8;
        let Self { gate, arp, .. } = self;
        let applied = gate.suspend(|| arp.set_octaves(octaves));
        self.stale.arp = true;
        applied
    }

    pub fn set_arp_gate(&mut self, gate_fraction: f32) -> f32 {
        let Self { gate, arp, .. } = self;
        let applied = gate.suspend(|| arp.set_gate(gate_fraction));
        self.stale.arp = true;
        applied
    }

    // --- Note repeat ---

    pub fn repeat(&self) -> &NoteRepeat {
        &self.repeat
    }

    pub fn repeat_start(&mut self, note: u8) {
        let tick = self.playhead();
        let Self { gate, repeat, track, .. } = self;
        gate.suspend(|| repeat.start(note, *track, tick));
    }

    pub fn repeat_stop<B: AudioBackend>(&mut self, note: u8, backend: &mut B) {
        let tick = self.playhead();
        let mut cut = CutBuffer::new();
        let Self { gate, repeat, track, .. } = self;
        gate.suspend(|| repeat.stop(note, *track, tick, &mut |d| {
            let _ = cut.push(d);
        }));
        self.dispatch_all(cut, backend);
    }

    pub fn set_repeat_division(&mut self, division: TimingDivision) {
        let Self { gate, repeat, .. } = self;
        gate.suspend(|| repeat.division = division);
        self.stale.repeat = true;
    }

    /// Stop every repeat voice and release the arpeggiator's held notes.
    pub fn release_generative<B: AudioBackend>(&mut self, backend: &mut B) {
        let tick = self.playhead();
        let mut cut = CutBuffer::new();
        let Self { gate, repeat, arp, .. } = self;
        gate.suspend(|| {
            let mut emit = |d| {
                let _ = cut.push(d);
            };
            repeat.release_all(tick, &mut emit);
            arp.release(&mut emit);
        });
        self.dispatch_all(cut, backend);
    }

    // --- Encoders ---

    pub fn page(&self) -> EncoderPage {
        self.page
    }

    pub fn set_page(&mut self, page: EncoderPage) {
        self.page = page;
        self.stale.page = true;
    }

    pub fn param(&self, index: usize) -> Option<f32> {
        self.params.get(index).copied()
    }

    /// Nudge a synth parameter by `delta` hundredths and send it to the
    /// current track's voice engine.
    pub fn adjust_param<B: AudioBackend>(&mut self, index: usize, delta: i32, backend: &mut B) {
        let Some(value) = self.params.get_mut(index) else {
            return;
        };
        *value = (*value + delta as f32 * 0.01).clamp(0.0, 1.0);
        let value = *value;
        let engine = self
            .store
            .track(self.track)
            .map_or(EngineKind::Tonal, |t| EngineKind::from(t.kind));
        backend.set_param(engine, index as u8, value);
        self.stale.params = true;
    }

    // --- Display ---

    pub fn view(&self) -> &GridView {
        &self.view
    }

    pub fn set_zoom(&mut self, zoom: Zoom) {
        self.view.set_zoom(zoom);
        self.stale.zoom = true;
    }

    pub fn scroll_notes(&mut self, delta: i32) {
        self.view.scroll_notes(delta);
    }

    /// Bring the display up to date: grid, playhead, counters, and any
    /// status field that changed.
    pub fn process_display(&mut self, display: &mut impl Display) {
        let playhead = self.playhead();
        self.view.render(display, &self.store, self.track, playhead);

        let stale = core::mem::take(&mut self.stale);
        if stale.quantize {
            let label = self.store.quantize().map_or("OFF", TimingDivision::label);
            display.write_label(Field::Quantize, label);
        }
        if stale.arp {
            let mode = if self.arp.is_engaged() { self.arp.mode.label() } else { "OFF" };
            display.write_label(Field::ArpMode, mode);
            display.write_label(Field::ArpDivision, self.arp.division.label());
            display.write_number(Field::ArpOctaves, self.arp.octaves() as i32);
            display.write_number(Field::ArpGate, (self.arp.gate() * 100.0 + 0.5) as i32);
        }
        if stale.repeat {
            display.write_label(Field::RepeatDivision, self.repeat.division.label());
        }
        if stale.record {
            let label = self.transport.recording().map_or(" ", RecordMode::label);
            display.write_label(Field::Record, label);
        }
        if stale.bpm {
            display.write_number(Field::Bpm, (self.bpm() + 0.5) as i32);
        }
        if stale.length {
            display.write_number(Field::Length, self.store.sequence().length_bars() as i32);
        }
        if stale.velocity {
            display.write_number(Field::Velocity, self.velocity as i32);
        }
        if stale.zoom {
            display.write_label(Field::Zoom, self.view.zoom().label());
        }
        if stale.page {
            display.write_label(Field::Page, self.page.label());
        }
        if stale.track {
            display.write_number(Field::Track, self.track.index() as i32 + 1);
            if let Some(track) = self.store.track(self.track) {
                display.write_label(Field::TrackKind, track.kind.label());
            }
        }
        if stale.params {
            for (i, value) in self.params.iter().enumerate() {
                display.write_number(Field::Param(i as u8), (value * 100.0 + 0.5) as i32);
            }
        }
    }

    /// Items waiting in the pending queue.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Items dropped on a full pending queue.
    pub fn pending_dropped(&self) -> u32 {
        self.pending.dropped()
    }
}
