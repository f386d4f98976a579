//! Collaborator contracts consumed by the voice controller
//!
//! The controller never touches a microphone, speaker, or socket itself.
//! It drives these traits, and the implementations report back through
//! `ControllerInput` values stamped with the generation they were issued
//! under.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::controller::Generation;
use crate::error::{CaptureError, DeliveryError, PlaybackError};

/// Options passed to the speech engine on every start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOptions {
    /// Keep recognizing across pauses
    pub continuous: bool,
    /// Emit partial results while the user speaks
    pub interim_results: bool,
    /// BCP-47 language tag
    pub language: String,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            continuous: true,
            interim_results: true,
            language: "en-US".to_string(),
        }
    }
}

/// Speech-to-text engine
pub trait CaptureAdapter: Send {
    /// Whether the platform has a speech engine at all
    fn is_supported(&self) -> bool;

    /// Begin capturing; results must carry `generation`
    fn start(&mut self, generation: Generation, options: &CaptureOptions) -> Result<(), CaptureError>;

    /// Stop and let the engine flush its last result
    fn stop(&mut self, generation: Generation);

    /// Stop immediately, discarding anything pending
    fn abort(&mut self, generation: Generation);
}

/// Audio output for synthesized replies
pub trait PlaybackAdapter: Send {
    /// Start playing `audio`; lifecycle events must carry `generation`
    fn play(&mut self, generation: Generation, audio: &AudioPayload) -> Result<(), PlaybackError>;

    fn pause(&mut self, generation: Generation);
}

/// Sends a committed utterance to the assistant backend
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    async fn deliver(&self, text: &str, mic_originated: bool) -> Result<DeliveryReply, DeliveryError>;
}

/// Encoded audio for a reply, opaque to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload(Vec<u8>);

impl AudioPayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Decode from the base64 form the backend sends
    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        STANDARD.decode(encoded.trim()).map(Self)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Successful delivery outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReply {
    pub reply_text: String,
    /// Missing audio is a valid reply, but mic-originated messages retry for it
    pub audio: Option<AudioPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_base64() {
        let audio = AudioPayload::from_base64("SUQzBA==").unwrap();
        assert_eq!(audio.as_bytes(), b"ID3\x04");
        assert_eq!(audio.to_base64(), "SUQzBA==");
        assert!(AudioPayload::from_base64("not base64!").is_err());
    }

    #[test]
    fn test_default_capture_options() {
        let options = CaptureOptions::default();
        assert!(options.continuous);
        assert!(options.interim_results);
        assert_eq!(options.language, "en-US");
    }
}
