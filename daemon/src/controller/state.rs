//! Controller states and the generation counter

use serde::{Deserialize, Serialize};

/// The six states of the voice controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Nothing captured, nothing playing
    #[default]
    Idle,
    /// Speech engine running, no final result yet
    Listening,
    /// Final result buffered, silence timer armed
    PendingCommit,
    /// Utterance sent, waiting on the reply (including backoff)
    Delivering,
    /// Reply audio playing; capture is off
    Playing,
    /// Last attempt failed; capture is off until restarted
    Error,
}

impl State {
    /// Whether the speech engine is supposed to be running
    pub fn is_capturing(&self) -> bool {
        matches!(self, State::Listening | State::PendingCommit)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Idle => write!(f, "Idle"),
            State::Listening => write!(f, "Listening"),
            State::PendingCommit => write!(f, "PendingCommit"),
            State::Delivering => write!(f, "Delivering"),
            State::Playing => write!(f, "Playing"),
            State::Error => write!(f, "Error"),
        }
    }
}

/// Epoch stamped on every adapter command, timer, and delivery task.
///
/// Bumped on each capture start and stop and on every explicit stop, so a
/// callback from a superseded session never matches the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_monotonic() {
        let g = Generation::default();
        assert!(g.next() > g);
        assert_eq!(g.next().next().value(), 2);
        assert_eq!(g.next().to_string(), "g1");
    }

    #[test]
    fn test_generation_serializes_as_number() {
        let json = serde_json::to_string(&Generation::new(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn test_capturing_states() {
        assert!(State::Listening.is_capturing());
        assert!(State::PendingCommit.is_capturing());
        assert!(!State::Playing.is_capturing());
        assert!(!State::Delivering.is_capturing());
    }
}
