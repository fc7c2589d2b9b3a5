//! Host harness for the stepbox engine.
//!
//! Stands in for the firmware's hardware: a clock thread replaces the timer
//! interrupt, [`LogBackend`] replaces the voice engines and [`TextDisplay`]
//! replaces the screen. [`Controller`] runs the main loop, in real time or
//! stepped tick by tick.

mod clock;
mod controller;
mod error;
mod log_backend;
mod text_display;

pub use clock::{tick_interval, ClockThread};
pub use controller::Controller;
pub use error::HostError;
pub use log_backend::{BackendEvent, LogBackend};
pub use text_display::TextDisplay;
