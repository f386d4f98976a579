//! IPC module for daemon-UI communication

mod bridge;
mod protocol;
mod server;

pub use bridge::{IpcCapture, IpcPlayback};
pub use protocol::{
    encode_frame, read_frame, AdapterCommand, DaemonStatus, Notification, Request, Response,
    MAX_FRAME_LEN,
};
pub use server::{Server, ServerLinks};
