//! Socket-backed capture and playback adapters
//!
//! The speech engine and audio element live in the UI client. These
//! adapters turn controller calls into `AdapterCommand` notifications for
//! subscribed clients; the client answers with capture and playback
//! requests carrying the same generation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use crate::adapters::{AudioPayload, CaptureAdapter, CaptureOptions, PlaybackAdapter};
use crate::controller::Generation;
use crate::error::{CaptureError, PlaybackError};

use super::protocol::{AdapterCommand, Notification};

fn push(
    notifications: &broadcast::Sender<Notification>,
    command: AdapterCommand,
) -> Result<usize, broadcast::error::SendError<Notification>> {
    debug!(?command, "pushing adapter command");
    notifications.send(Notification::Command(command))
}

/// Speech capture carried out by the connected client
pub struct IpcCapture {
    notifications: broadcast::Sender<Notification>,
    supported: Arc<AtomicBool>,
}

impl IpcCapture {
    pub fn new(notifications: broadcast::Sender<Notification>, supported: Arc<AtomicBool>) -> Self {
        Self {
            notifications,
            supported,
        }
    }
}

impl CaptureAdapter for IpcCapture {
    fn is_supported(&self) -> bool {
        self.supported.load(Ordering::SeqCst)
    }

    fn start(&mut self, generation: Generation, options: &CaptureOptions) -> Result<(), CaptureError> {
        let command = AdapterCommand::StartCapture {
            generation,
            options: options.clone(),
        };
        push(&self.notifications, command)
            .map(|_| ())
            .map_err(|_| CaptureError::NoClient)
    }

    fn stop(&mut self, generation: Generation) {
        let _ = push(&self.notifications, AdapterCommand::StopCapture { generation });
    }

    fn abort(&mut self, generation: Generation) {
        let _ = push(&self.notifications, AdapterCommand::AbortCapture { generation });
    }
}

/// Audio playback carried out by the connected client
pub struct IpcPlayback {
    notifications: broadcast::Sender<Notification>,
}

impl IpcPlayback {
    pub fn new(notifications: broadcast::Sender<Notification>) -> Self {
        Self { notifications }
    }
}

impl PlaybackAdapter for IpcPlayback {
    fn play(&mut self, generation: Generation, audio: &AudioPayload) -> Result<(), PlaybackError> {
        let command = AdapterCommand::PlayAudio {
            generation,
            audio_base64: audio.to_base64(),
        };
        push(&self.notifications, command)
            .map(|_| ())
            .map_err(|_| PlaybackError::NoClient)
    }

    fn pause(&mut self, generation: Generation) {
        let _ = push(&self.notifications, AdapterCommand::PauseAudio { generation });
    }
}
