//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::adapters::CaptureOptions;
use crate::controller::{ControllerInput, Generation, State};
use crate::events::{StatusLabel, VoiceEvent};
use crate::monitor::{NetworkState, PermissionState};

/// Largest frame either side may send
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from the UI shell to the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request current daemon status
    GetStatus,

    /// Subscribe to events and adapter commands
    Subscribe,

    /// Microphone button
    Toggle,
    Start,
    Stop,

    /// Typed chat message
    SendText { text: String },

    /// Whether the client's platform has a speech engine
    CaptureSupport { supported: bool },

    CapturePartial { generation: Generation, text: String },
    CaptureFinal { generation: Generation, text: String },
    CaptureEnded { generation: Generation },
    CaptureFailed { generation: Generation, reason: String },

    PlaybackStarted { generation: Generation },
    PlaybackEnded { generation: Generation },
    PlaybackFailed { generation: Generation, reason: String },

    NetworkChanged { state: NetworkState },
    PermissionChanged { state: PermissionState },
}

impl Request {
    /// Controller input for requests the controller handles directly
    pub fn into_input(self) -> Option<ControllerInput> {
        let input = match self {
            Request::Toggle => ControllerInput::Toggle,
            Request::Start => ControllerInput::Start,
            Request::Stop => ControllerInput::Stop,
            Request::SendText { text } => ControllerInput::SendText(text),
            Request::CapturePartial { generation, text } => {
                ControllerInput::CapturePartial { generation, text }
            }
            Request::CaptureFinal { generation, text } => ControllerInput::CaptureFinal { generation, text },
            Request::CaptureEnded { generation } => ControllerInput::CaptureEnded { generation },
            Request::CaptureFailed { generation, reason } => {
                ControllerInput::CaptureFailed { generation, reason }
            }
            Request::PlaybackStarted { generation } => ControllerInput::PlaybackStarted { generation },
            Request::PlaybackEnded { generation } => ControllerInput::PlaybackEnded { generation },
            Request::PlaybackFailed { generation, reason } => {
                ControllerInput::PlaybackFailed { generation, reason }
            }
            Request::Ping
            | Request::GetStatus
            | Request::Subscribe
            | Request::CaptureSupport { .. }
            | Request::NetworkChanged { .. }
            | Request::PermissionChanged { .. } => return None,
        };
        Some(input)
    }
}

/// Responses from daemon to UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current daemon status
    Status(DaemonStatus),

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Request handed to the controller or monitors
    Accepted,

    /// Error response
    Error { code: String, message: String },
}

/// Instruction for the client's speech engine or audio element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdapterCommand {
    StartCapture {
        generation: Generation,
        options: CaptureOptions,
    },
    StopCapture {
        generation: Generation,
    },
    AbortCapture {
        generation: Generation,
    },
    PlayAudio {
        generation: Generation,
        audio_base64: String,
    },
    PauseAudio {
        generation: Generation,
    },
}

/// Push notification from daemon to subscribed clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Notification {
    /// Controller event
    Event(VoiceEvent),
    /// Adapter command the client must carry out
    Command(AdapterCommand),
}

/// Full daemon status snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Current controller state
    pub state: State,

    /// Status label shown by the UI
    pub status: StatusLabel,

    /// Live transcript
    pub transcript: String,

    pub network: NetworkState,

    pub permission: PermissionState,

    /// Whether a client reported a working speech engine
    pub capture_supported: bool,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: State::default(),
            status: StatusLabel::default(),
            transcript: String::new(),
            network: NetworkState::default(),
            permission: PermissionState::default(),
            capture_supported: false,
            uptime_secs: 0,
        }
    }
}

/// Serialize a message into a length-prefixed frame
pub fn encode_frame<T: Serialize>(msg: &T) -> serde_json::Result<Vec<u8>> {
    let body = serde_json::to_vec(msg)?;
    let mut frame = Vec::with_capacity(body.len() + 4);
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Read one frame body; `None` on a clean disconnect between frames
pub async fn read_frame<R>(reader: &mut R) -> std::io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit", len),
        ));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}
