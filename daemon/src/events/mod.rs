//! Events emitted by the voice controller
//!
//! Everything the rest of the system observes about a voice session flows
//! through `VoiceEvent`: state transitions, status labels, the live
//! transcript, notices, and conversation updates.

use serde::{Deserialize, Serialize};

use crate::controller::{State, Turn};

/// Short status label shown next to the microphone control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLabel {
    /// Capture is running
    Listening,
    /// Waiting on the assistant's reply
    Framing,
    /// Reply audio is playing
    Speaking,
    /// Nothing to show
    #[default]
    #[serde(rename = "")]
    Empty,
}

impl StatusLabel {
    /// Label for a controller state
    pub fn for_state(state: State) -> Self {
        match state {
            State::Listening | State::PendingCommit => StatusLabel::Listening,
            State::Delivering => StatusLabel::Framing,
            State::Playing => StatusLabel::Speaking,
            State::Idle | State::Error => StatusLabel::Empty,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLabel::Listening => "listening",
            StatusLabel::Framing => "framing",
            StatusLabel::Speaking => "speaking",
            StatusLabel::Empty => "",
        }
    }
}

impl std::fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Permission,
    Network,
    Capture,
    Playback,
    Delivery,
    /// Text-only fallback after voice delivery was exhausted
    Fallback,
}

/// Events emitted by the controller during a voice session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceEvent {
    /// Controller moved between states
    StateChanged { from: State, to: State },

    /// Status label changed
    Status { label: StatusLabel },

    /// Live transcript for display; empty clears it
    Transcript { text: String },

    /// Short-lived notice for the user
    Notice { kind: NoticeKind, message: String },

    /// A previously shown notice no longer applies
    NoticeCleared { kind: NoticeKind },

    /// New turn appended to the conversation
    TurnAppended { turn: Turn },

    /// Existing turn replaced (reply text from a retried delivery)
    TurnUpdated { turn: Turn },
}

impl std::fmt::Display for VoiceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoiceEvent::StateChanged { from, to } => write!(f, "STATE {} -> {}", from, to),
            VoiceEvent::Status { label } => write!(f, "STATUS '{}'", label),
            VoiceEvent::Transcript { text } => write!(f, "TRANSCRIPT ({} chars)", text.len()),
            VoiceEvent::Notice { kind, message } => write!(f, "NOTICE {:?}: {}", kind, message),
            VoiceEvent::NoticeCleared { kind } => write!(f, "NOTICE_CLEARED {:?}", kind),
            VoiceEvent::TurnAppended { turn } => write!(f, "TURN_APPENDED #{}", turn.id),
            VoiceEvent::TurnUpdated { turn } => write!(f, "TURN_UPDATED #{}", turn.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = VoiceEvent::StateChanged {
            from: State::Listening,
            to: State::PendingCommit,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("state_changed"));
        assert!(json.contains("pending_commit"));
    }

    #[test]
    fn test_empty_status_serializes_as_empty_string() {
        let event = VoiceEvent::Status {
            label: StatusLabel::Empty,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"status","label":""}"#);
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"notice_cleared","kind":"network"}"#;
        let event: VoiceEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            VoiceEvent::NoticeCleared {
                kind: NoticeKind::Network
            }
        );
    }

    #[test]
    fn test_status_for_state() {
        assert_eq!(StatusLabel::for_state(State::PendingCommit), StatusLabel::Listening);
        assert_eq!(StatusLabel::for_state(State::Delivering), StatusLabel::Framing);
        assert_eq!(StatusLabel::for_state(State::Playing), StatusLabel::Speaking);
        assert_eq!(StatusLabel::for_state(State::Error), StatusLabel::Empty);
    }
}
