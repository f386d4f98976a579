//! Process-wide connectivity and microphone permission state
//!
//! Each value has exactly one writer, its monitor. The controller and the
//! IPC server only hold read handles (`watch::Receiver`).

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

/// Network connectivity as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkState {
    Online,
    Offline,
}

impl Default for NetworkState {
    fn default() -> Self {
        Self::Online
    }
}

/// Microphone permission as reported by the platform's permission query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
    #[default]
    Unknown,
}

/// Single write point for a piece of process-wide state
pub struct Monitor<T> {
    name: &'static str,
    tx: watch::Sender<T>,
}

pub type NetworkMonitor = Monitor<NetworkState>;
pub type PermissionMonitor = Monitor<PermissionState>;

impl<T> Monitor<T>
where
    T: Copy + PartialEq + std::fmt::Debug + Send + Sync + 'static,
{
    /// Create a monitor with the state read at startup
    pub fn new(name: &'static str, initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { name, tx }
    }

    /// Read handle for guards and change notification
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> T {
        *self.tx.borrow()
    }

    /// Record a new value; returns whether it changed
    pub fn set(&self, value: T) -> bool {
        let name = self.name;
        self.tx.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            let previous = *current;
            info!(monitor = name, from = ?previous, to = ?value, "state changed");
            *current = value;
            true
        })
    }
}

impl NetworkMonitor {
    pub fn network(initial: NetworkState) -> Self {
        Self::new("network", initial)
    }
}

impl PermissionMonitor {
    pub fn permission(initial: PermissionState) -> Self {
        Self::new("permission", initial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_reports_changes_only() {
        let monitor = NetworkMonitor::network(NetworkState::Online);
        assert!(!monitor.set(NetworkState::Online));
        assert!(monitor.set(NetworkState::Offline));
        assert_eq!(monitor.current(), NetworkState::Offline);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let monitor = PermissionMonitor::permission(PermissionState::Unknown);
        let mut rx = monitor.subscribe();

        monitor.set(PermissionState::Denied);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), PermissionState::Denied);
    }

    #[test]
    fn test_state_serialization() {
        assert_eq!(serde_json::to_string(&NetworkState::Offline).unwrap(), r#""offline""#);
        let state: PermissionState = serde_json::from_str(r#""prompt""#).unwrap();
        assert_eq!(state, PermissionState::Prompt);
    }
}
