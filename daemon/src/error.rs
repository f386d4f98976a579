//! Error taxonomy for the voice controller and its collaborators
//!
//! `VoiceError` is what the controller surfaces to the user as a notice.
//! The adapter errors are what collaborators hand back to the controller.

use crate::events::NoticeKind;

/// User-facing failures surfaced by the controller as notices
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoiceError {
    /// Microphone access was refused; only the user can fix this
    #[error("microphone access denied - allow it in your browser or system settings")]
    PermissionDenied,

    /// The platform has no speech recognition engine
    #[error("speech recognition is not supported on this device")]
    CaptureUnsupported,

    /// The speech engine failed to start or aborted
    #[error("speech capture failed: {0}")]
    Capture(String),

    /// Offline; capture cannot start or was stopped
    #[error("you are offline - voice input paused")]
    NetworkUnavailable,

    /// Delivery failed on every attempt
    #[error("could not reach the assistant after {attempts} attempts: {reason}")]
    DeliveryTransport { attempts: u32, reason: String },

    /// Replies kept arriving without audio; the text reply stands
    #[error("voice response unavailable, showing text")]
    DeliveryIncomplete,

    /// The audio element failed to play the reply
    #[error("could not play the voice response: {0}")]
    Playback(String),

    /// A typed message arrived while a reply was still pending
    #[error("still waiting for the previous reply")]
    Busy,
}

impl VoiceError {
    /// Notice category used by the UI to style and replace notices
    pub fn notice_kind(&self) -> NoticeKind {
        match self {
            VoiceError::PermissionDenied => NoticeKind::Permission,
            VoiceError::CaptureUnsupported | VoiceError::Capture(_) => NoticeKind::Capture,
            VoiceError::NetworkUnavailable => NoticeKind::Network,
            VoiceError::DeliveryTransport { .. } | VoiceError::Busy => NoticeKind::Delivery,
            VoiceError::DeliveryIncomplete => NoticeKind::Fallback,
            VoiceError::Playback(_) => NoticeKind::Playback,
        }
    }

    /// Whether retrying without user action can succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            VoiceError::PermissionDenied | VoiceError::CaptureUnsupported
        )
    }
}

/// Errors from a capture adapter
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("no client attached to run speech capture")]
    NoClient,
}

/// Errors from a playback adapter
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("no client attached to play audio")]
    NoClient,
}

/// Errors from the message delivery client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Connection, timeout, or non-success status
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with something we could not read
    #[error("malformed reply: {0}")]
    Malformed(String),
}
