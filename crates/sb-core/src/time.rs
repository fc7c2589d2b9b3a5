//! Tick arithmetic: timing divisions, quantization, and bar positions.

use crate::config::{PPQN, TICKS_PER_BAR};

/// Position within a pattern cycle, in clock pulses.
pub type Tick = u32;

/// Note-length divisions used by the arpeggiator, note repeat, and quantizer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TimingDivision {
    Quarter,
    Eighth,
    #[default]
    Sixteenth,
    /// Sixteenth-note triplet
    SixteenthTriplet,
    ThirtySecond,
    /// Thirty-second-note triplet
    ThirtySecondTriplet,
}

impl TimingDivision {
    /// All divisions, longest first.
    pub const ALL: [TimingDivision; 6] = [
        TimingDivision::Quarter,
        TimingDivision::Eighth,
        TimingDivision::Sixteenth,
        TimingDivision::SixteenthTriplet,
        TimingDivision::ThirtySecond,
        TimingDivision::ThirtySecondTriplet,
    ];

    /// Length of one division in ticks.
    pub const fn ticks(self) -> u32 {
        match self {
            TimingDivision::Quarter => PPQN,
            TimingDivision::Eighth => PPQN / 2,
            TimingDivision::Sixteenth => PPQN / 4,
            TimingDivision::SixteenthTriplet => PPQN / 6,
            TimingDivision::ThirtySecond => PPQN / 8,
            TimingDivision::ThirtySecondTriplet => PPQN / 12,
        }
    }

    /// Short display label ("1/16T").
    pub const fn label(self) -> &'static str {
        match self {
            TimingDivision::Quarter => "1/4",
            TimingDivision::Eighth => "1/8",
            TimingDivision::Sixteenth => "1/16",
            TimingDivision::SixteenthTriplet => "1/16T",
            TimingDivision::ThirtySecond => "1/32",
            TimingDivision::ThirtySecondTriplet => "1/32T",
        }
    }

    /// Division at `index` in [`Self::ALL`], clamped to the last entry.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    /// Position of this division in [`Self::ALL`].
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|d| *d == self).unwrap_or(0)
    }
}

/// Snap `tick` to the nearest multiple of `step`, clamped into `0..max_ticks`.
///
/// A `step` of 0 or 1 leaves the tick unchanged apart from the clamp.
pub fn quantize(tick: Tick, step: u32, max_ticks: u32) -> Tick {
    let last = max_ticks.saturating_sub(1);
    if step <= 1 {
        return tick.min(last);
    }
    let snapped = (tick.saturating_add(step / 2) / step).saturating_mul(step);
    snapped.min(last)
}

/// Musical position of a tick, 0-based.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BarPosition {
    pub bar: u32,
    pub beat: u32,
    pub tick_in_bar: u32,
}

impl BarPosition {
    pub const fn from_tick(tick: Tick) -> Self {
        let tick_in_bar = tick % TICKS_PER_BAR;
        Self {
            bar: tick / TICKS_PER_BAR,
            beat: tick_in_bar / PPQN,
            tick_in_bar,
        }
    }

    /// True on the first tick of a bar.
    pub const fn is_downbeat(&self) -> bool {
        self.tick_in_bar == 0
    }
}
