//! Core sequencing types for the stepbox groovebox.
//!
//! This crate defines the data model shared by the real-time engine and the
//! host harness: ticks and timing divisions, recorded events, tracks and
//! sequences, and the compile-time configuration of the firmware.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod config;
mod error;
mod event;
mod sequence;
mod time;
mod track;

pub use error::IndexError;
pub use event::{Event, EventKind, NoteDemand, Origin, PendingEvent};
pub use sequence::{Sequence, BPM_MAX, BPM_MIN};
pub use time::{quantize, BarPosition, Tick, TimingDivision};
pub use track::{Pattern, SlotKey, Track, TrackId, TrackKind};

/// Returns true if `note` is a valid MIDI note number (0-127).
pub const fn is_valid_note(note: u8) -> bool {
    note < config::NOTE_COUNT as u8
}
