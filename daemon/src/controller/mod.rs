//! Voice interaction controller
//!
//! An explicit state machine over six states:
//! - Idle: nothing captured or playing
//! - Listening: speech engine running
//! - PendingCommit: final result buffered, silence timer armed
//! - Delivering: utterance sent, awaiting reply or backoff
//! - Playing: reply audio playing, capture off
//! - Error: last attempt failed, capture off until restarted

mod conversation;
mod debounce;
mod input;
mod machine;
mod retry;
mod state;
mod timers;

pub use conversation::{Conversation, Role, Turn};
pub use debounce::Debouncer;
pub use input::ControllerInput;
pub use machine::{Collaborators, ControllerSnapshot, Origin, VoiceController};
pub use retry::RetryPolicy;
pub use state::{Generation, State};
pub use timers::TimerKind;
