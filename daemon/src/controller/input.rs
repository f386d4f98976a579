//! Inputs accepted by the controller's single dispatch entry point

use crate::adapters::DeliveryReply;
use crate::error::DeliveryError;
use crate::monitor::{NetworkState, PermissionState};

use super::state::Generation;

/// Everything that can move the controller.
///
/// Adapter, timer, and delivery inputs carry the generation they were
/// issued under; a mismatch with the current generation marks them stale.
#[derive(Debug)]
pub enum ControllerInput {
    /// Debounced microphone button
    Toggle,
    /// Explicit start request
    Start,
    /// Explicit stop; always wins
    Stop,
    /// Typed message from the chat box
    SendText(String),

    CapturePartial { generation: Generation, text: String },
    CaptureFinal { generation: Generation, text: String },
    /// The speech engine ended on its own
    CaptureEnded { generation: Generation },
    /// The speech engine reported an error code
    CaptureFailed { generation: Generation, reason: String },

    PlaybackStarted { generation: Generation },
    PlaybackEnded { generation: Generation },
    PlaybackFailed { generation: Generation, reason: String },

    /// Timer expiries also carry the sequence number of the arm that set them
    SilenceElapsed { generation: Generation, seq: u64 },
    RetryDue { generation: Generation, seq: u64 },
    SettleElapsed { generation: Generation, seq: u64 },

    DeliveryCompleted {
        generation: Generation,
        delivery_id: u64,
        result: Result<DeliveryReply, DeliveryError>,
    },

    NetworkChanged(NetworkState),
    PermissionChanged(PermissionState),
}

impl ControllerInput {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            ControllerInput::Toggle => "toggle",
            ControllerInput::Start => "start",
            ControllerInput::Stop => "stop",
            ControllerInput::SendText(_) => "send_text",
            ControllerInput::CapturePartial { .. } => "capture_partial",
            ControllerInput::CaptureFinal { .. } => "capture_final",
            ControllerInput::CaptureEnded { .. } => "capture_ended",
            ControllerInput::CaptureFailed { .. } => "capture_failed",
            ControllerInput::PlaybackStarted { .. } => "playback_started",
            ControllerInput::PlaybackEnded { .. } => "playback_ended",
            ControllerInput::PlaybackFailed { .. } => "playback_failed",
            ControllerInput::SilenceElapsed { .. } => "silence_elapsed",
            ControllerInput::RetryDue { .. } => "retry_due",
            ControllerInput::SettleElapsed { .. } => "settle_elapsed",
            ControllerInput::DeliveryCompleted { .. } => "delivery_completed",
            ControllerInput::NetworkChanged(_) => "network_changed",
            ControllerInput::PermissionChanged(_) => "permission_changed",
        }
    }
}
