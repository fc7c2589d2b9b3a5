//! Host error types.

/// Error type for host setup and the real-time loop.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("failed to start clock thread: {0}")]
    ClockSpawn(#[from] std::io::Error),
    #[error("tempo {0} BPM is outside {min}-{max}", min = sb_core::BPM_MIN, max = sb_core::BPM_MAX)]
    InvalidTempo(f32),
    #[error("input queue full")]
    InputFull(#[from] sb_engine::QueueFull),
}
