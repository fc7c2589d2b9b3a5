//! Piano-roll viewport: a cached grid of note cells, the playhead, and the
//! bar/beat/step counters.

use sb_core::config::{DISPLAY_ROWS, DISPLAY_STEPS, NOTE_RANGE, TICKS_PER_BAR, TICKS_PER_STEP};
use sb_core::{BarPosition, Tick, TrackId};

use crate::backend::{Display, Field};
use crate::event_store::EventStore;

/// Bars shown across the viewport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Zoom {
    Half,
    One,
    #[default]
    Two,
    Four,
}

impl Zoom {
    pub const ALL: [Zoom; 4] = [Zoom::Half, Zoom::One, Zoom::Two, Zoom::Four];

    /// Ticks covered by the whole viewport.
    pub const fn view_ticks(self) -> u32 {
        match self {
            Zoom::Half => TICKS_PER_BAR / 2,
            Zoom::One => TICKS_PER_BAR,
            Zoom::Two => TICKS_PER_BAR * 2,
            Zoom::Four => TICKS_PER_BAR * 4,
        }
    }

    pub const fn ticks_per_column(self) -> u32 {
        self.view_ticks() / DISPLAY_STEPS as u32
    }

    pub const fn label(self) -> &'static str {
        match self {
            Zoom::Half => "X0",
            Zoom::One => "X1",
            Zoom::Two => "X2",
            Zoom::Four => "X4",
        }
    }

    /// Step through the levels, saturating at either end.
    pub fn step(self, delta: i32) -> Zoom {
        let i = Self::ALL.iter().position(|z| *z == self).unwrap_or(0) as i32;
        Self::ALL[(i + delta).clamp(0, Self::ALL.len() as i32 - 1) as usize]
    }
}

/// Counters last written to the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Counters {
    bar: u32,
    beat: u32,
    step: u32,
}

pub struct GridView {
    zoom: Zoom,
    /// Note shown on row 0
    start_note: u8,
    /// First grid step in view (multiple of the steps in view)
    start_step: u32,
    /// Last drawn state of every cell
    cells: [[bool; DISPLAY_ROWS]; DISPLAY_STEPS],
    /// Store generation and track the cache was built from
    drawn: Option<(u32, TrackId)>,
    playhead_col: Option<usize>,
    counters: Option<Counters>,
}

impl Default for GridView {
    fn default() -> Self {
        Self {
            zoom: Zoom::default(),
            start_note: 48,
            start_step: 0,
            cells: [[false; DISPLAY_ROWS]; DISPLAY_STEPS],
            drawn: None,
            playhead_col: None,
            counters: None,
        }
    }
}

impl GridView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: Zoom) {
        if zoom != self.zoom {
            self.zoom = zoom;
            self.invalidate();
        }
    }

    pub fn start_note(&self) -> u8 {
        self.start_note
    }

    pub fn start_step(&self) -> u32 {
        self.start_step
    }

    /// Scroll the note rows, clamped to the playable range.
    pub fn scroll_notes(&mut self, delta: i32) {
        let max = (NOTE_RANGE as usize - DISPLAY_ROWS) as i32;
        let start = (self.start_note as i32 + delta).clamp(0, max) as u8;
        if start != self.start_note {
            self.start_note = start;
            self.invalidate();
        }
    }

    /// Force every cell to be rechecked on the next render.
    pub fn invalidate(&mut self) {
        self.drawn = None;
    }

    /// Snap the viewport to the page holding `tick`. Returns true if it moved.
    pub fn align_to(&mut self, tick: Tick, total_steps: u32) -> bool {
        let steps_in_view = (self.zoom.view_ticks() / TICKS_PER_STEP).max(1);
        let step = tick / TICKS_PER_STEP;
        let mut start = step / steps_in_view * steps_in_view;
        if start + steps_in_view > total_steps {
            start = total_steps.saturating_sub(steps_in_view);
        }
        if start != self.start_step {
            self.start_step = start;
            self.invalidate();
            true
        } else {
            false
        }
    }

    /// Cell state as last drawn.
    pub fn cell(&self, col: usize, row: usize) -> bool {
        self.cells.get(col).and_then(|c| c.get(row)).copied().unwrap_or(false)
    }

    /// Bring the display up to date with `track` at `playhead`.
    pub fn render(&mut self, display: &mut impl Display, store: &EventStore, track: TrackId, playhead: Tick) {
        self.align_to(playhead, store.sequence().total_steps());

        let key = (store.view_generation(), track);
        if self.drawn != Some(key) {
            let first_draw = self.drawn.is_none() && self.playhead_col.is_none() && self.counters.is_none();
            self.refresh_cells(display, store, track, first_draw);
            self.drawn = Some(key);
        }

        self.draw_playhead(display, playhead);
        self.draw_counters(display, playhead);
    }

    fn refresh_cells(&mut self, display: &mut impl Display, store: &EventStore, track: TrackId, force: bool) {
        let per_col = self.zoom.ticks_per_column();
        let view_start = self.start_step * TICKS_PER_STEP;
        let max_ticks = store.max_ticks();
        for col in 0..DISPLAY_STEPS {
            let start = view_start + col as u32 * per_col;
            let end = (start + per_col).min(max_ticks);
            for row in 0..DISPLAY_ROWS {
                let note = self.start_note + row as u8;
                let active = start < end && store.query_range(track, note, start, end);
                if force || self.cells[col][row] != active {
                    display.redraw_cell(col, row, active);
                    self.cells[col][row] = active;
                }
            }
        }
    }

    fn draw_playhead(&mut self, display: &mut impl Display, playhead: Tick) {
        let view_start = self.start_step * TICKS_PER_STEP;
        let col = playhead
            .checked_sub(view_start)
            .map(|off| (off / self.zoom.ticks_per_column()) as usize)
            .filter(|&c| c < DISPLAY_STEPS);
        if col != self.playhead_col {
            display.draw_playhead_at(col);
            self.playhead_col = col;
        }
    }

    fn draw_counters(&mut self, display: &mut impl Display, playhead: Tick) {
        let pos = BarPosition::from_tick(playhead);
        // Step resolution follows the zoom: one step per column.
        let steps_per_bar = TICKS_PER_BAR / self.zoom.ticks_per_column();
        let step = (pos.tick_in_bar / self.zoom.ticks_per_column()).min(steps_per_bar - 1);
        let now = Counters { bar: pos.bar, beat: pos.beat, step };
        let last = self.counters;
        if last.map(|c| c.bar) != Some(now.bar) {
            display.write_number(Field::Bar, now.bar as i32 + 1);
        }
        if last.map(|c| c.beat) != Some(now.beat) {
            display.write_number(Field::Beat, now.beat as i32 + 1);
        }
        if last.map(|c| c.step) != Some(now.step) {
            display.write_number(Field::Step, now.step as i32 + 1);
        }
        self.counters = Some(now);
    }
}
