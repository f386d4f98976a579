//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::adapters::CaptureOptions;

const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000/api";
const DEFAULT_LANGUAGE: &str = "en-US";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Base URL of the assistant backend
    pub backend_url: String,

    /// Bearer token for the backend, if the UI has signed in
    pub auth_token: Option<String>,

    /// Voice controller tuning
    pub controller: ControllerConfig,
}

/// Timing and retry knobs for the voice controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Quiet time after a final result before it is committed
    pub silence_window: Duration,
    /// Toggle invocations inside this window are dropped
    pub debounce_window: Duration,
    /// Wait after playback before capture resumes, so the mic misses the echo
    pub settle_delay: Duration,
    /// Retries after the first delivery attempt
    pub max_retries: u32,
    /// Backoff unit; retry `n` waits `n` units
    pub retry_base_delay: Duration,
    /// Speech engine language
    pub language: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            silence_window: Duration::from_millis(2500),
            debounce_window: Duration::from_millis(300),
            settle_delay: Duration::from_millis(500),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(1000),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl ControllerConfig {
    /// Options handed to the speech engine on each start
    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            continuous: true,
            interim_results: true,
            language: self.language.clone(),
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = lookup("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("health-voice");

        let socket_path = lookup("HEALTH_VOICE_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("daemon.sock"));

        let backend_url = lookup("HEALTH_VOICE_BACKEND_URL")
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let auth_token = lookup("HEALTH_VOICE_TOKEN").filter(|t| !t.trim().is_empty());

        let mut controller = ControllerConfig::default();
        if let Some(language) = lookup("HEALTH_VOICE_LANGUAGE") {
            controller.language = language;
        }

        Ok(Self {
            socket_path,
            data_dir,
            backend_url,
            auth_token,
            controller,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup_from(&[("HOME", "/home/ada")])).unwrap();
        assert_eq!(
            config.socket_path,
            PathBuf::from("/home/ada/.local/share/health-voice/daemon.sock")
        );
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert!(config.auth_token.is_none());
        assert_eq!(config.controller, ControllerConfig::default());
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("HOME", "/home/ada"),
            ("HEALTH_VOICE_BACKEND_URL", "https://assistant.example/api/"),
            ("HEALTH_VOICE_LANGUAGE", "fr-FR"),
            ("HEALTH_VOICE_TOKEN", "abc"),
            ("HEALTH_VOICE_SOCKET", "/tmp/voice.sock"),
        ]))
        .unwrap();
        assert_eq!(config.backend_url, "https://assistant.example/api");
        assert_eq!(config.controller.capture_options().language, "fr-FR");
        assert_eq!(config.auth_token.as_deref(), Some("abc"));
        assert_eq!(config.socket_path, PathBuf::from("/tmp/voice.sock"));
    }

    #[test]
    fn test_missing_home() {
        assert!(Config::from_lookup(lookup_from(&[])).is_err());
    }

    #[test]
    fn test_controller_timings() {
        let config = ControllerConfig::default();
        assert_eq!(config.silence_window, Duration::from_millis(2500));
        assert_eq!(config.debounce_window, Duration::from_millis(300));
        assert_eq!(config.settle_delay, Duration::from_millis(500));
        assert_eq!(config.max_retries, 3);
    }
}
