//! Real-time sequencing engine for the stepbox groovebox.
//!
//! The clock drives [`Engine::on_tick`], which reads the pattern, runs note
//! repeat and the arpeggiator, and queues note demands. The main loop drains
//! the queue into the voice allocator and the audio backend, routes front
//! panel input and refreshes the display.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod arena;
pub mod arpeggiator;
mod backend;
mod engine;
mod event_store;
pub mod input;
pub mod note_repeat;
pub mod ring;
mod settings;
pub mod transport;
pub mod view;
pub mod voice_pool;

pub use arena::{Arena, EventBuffer};
pub use arpeggiator::{ArpMode, ArpState, Arpeggiator};
pub use backend::{AudioBackend, Display, EngineKind, Field, NoteTrigger, VoiceId};
pub use engine::Engine;
pub use event_store::{EventStore, StoreError};
pub use input::{Button, EncoderPage, InputEvent, InputRouter};
pub use note_repeat::NoteRepeat;
pub use ring::{BoundedQueue, InputQueue, PendingQueue, ProducerGate, QueueFull, SingleContext};
pub use settings::{clamp_velocity, Settings};
pub use transport::{RecordMode, TransportState};
pub use view::{GridView, Zoom};
pub use voice_pool::{StealPolicy, VoiceAllocator};
