//! Runtime settings the engine starts from.

use sb_core::config::DEFAULT_VELOCITY;
use sb_core::TimingDivision;

use crate::arpeggiator::ArpMode;
use crate::voice_pool::StealPolicy;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settings {
    /// Velocity for pads and generated notes (1-127)
    pub velocity: u8,
    /// Record quantization; `None` is off
    pub quantize: Option<TimingDivision>,
    pub arp_mode: ArpMode,
    pub arp_division: TimingDivision,
    pub arp_octaves: u8,
    pub arp_gate: f32,
    pub repeat_division: TimingDivision,
    pub steal_policy: StealPolicy,
    /// Click during count-in and while recording
    pub metronome: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            velocity: DEFAULT_VELOCITY,
            quantize: None,
            arp_mode: ArpMode::UpOctave,
            arp_division: TimingDivision::Sixteenth,
            arp_octaves: 3,
            arp_gate: 0.8,
            repeat_division: TimingDivision::Sixteenth,
            steal_policy: StealPolicy::FirstVoice,
            metronome: true,
        }
    }
}

/// Clamp a velocity into 1..=127.
pub fn clamp_velocity(velocity: i32) -> u8 {
    velocity.clamp(1, 127) as u8
}
