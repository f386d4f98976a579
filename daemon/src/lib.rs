//! health-voice: voice interaction controller for the health assistant chat
//!
//! The controller coordinates speech capture, silence-based commits,
//! delivery to the assistant backend with bounded retries, and reply
//! playback. Capture and playback are never active together; every
//! asynchronous callback carries a generation so late arrivals from a
//! superseded session are dropped.

pub mod adapters;
pub mod config;
pub mod controller;
pub mod delivery;
pub mod error;
pub mod events;
pub mod ipc;
pub mod lifecycle;
pub mod monitor;

pub use controller::{ControllerInput, Generation, State, VoiceController};
pub use error::VoiceError;
pub use events::VoiceEvent;
