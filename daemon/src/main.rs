//! health-voice-daemon: voice session daemon for the health assistant chat
//!
//! The UI shell connects over a Unix socket and provides:
//! - speech recognition results and playback lifecycle events
//! - connectivity and microphone permission changes
//! - mic toggles and typed messages
//!
//! The daemon runs the voice controller, talks to the assistant backend,
//! and pushes capture/playback commands and session events back.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use health_voice::config::Config;
use health_voice::controller::{Collaborators, VoiceController};
use health_voice::delivery::HttpDeliveryClient;
use health_voice::events::VoiceEvent;
use health_voice::ipc::{IpcCapture, IpcPlayback, Notification, Server, ServerLinks};
use health_voice::lifecycle::ShutdownSignal;
use health_voice::monitor::{NetworkMonitor, NetworkState, PermissionMonitor, PermissionState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "health-voice-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, backend = %config.backend_url, "configuration loaded");

    let mut shutdown = ShutdownSignal::new().context("failed to register signal handlers")?;

    // Process-wide platform state; the client reports real values on connect
    let network = Arc::new(NetworkMonitor::network(NetworkState::Online));
    let permission = Arc::new(PermissionMonitor::permission(PermissionState::Unknown));
    let capture_supported = Arc::new(AtomicBool::new(false));

    // Controller -> subscribers (events), adapters -> subscribers (commands)
    let (notifications, _) = broadcast::channel::<Notification>(256);
    let (event_tx, _event_rx) = broadcast::channel::<VoiceEvent>(128);

    let delivery = HttpDeliveryClient::new(&config.backend_url, config.auth_token.clone())
        .context("failed to build backend client")?;

    let collaborators = Collaborators {
        capture: Box::new(IpcCapture::new(
            notifications.clone(),
            Arc::clone(&capture_supported),
        )),
        playback: Box::new(IpcPlayback::new(notifications.clone())),
        delivery: Arc::new(delivery),
    };

    let mut controller = VoiceController::new(
        config.controller.clone(),
        collaborators,
        network.subscribe(),
        permission.subscribe(),
        event_tx.clone(),
    );

    let server = Server::new(
        &config.socket_path,
        ServerLinks {
            inputs: controller.sender(),
            notifications,
            network,
            permission,
            capture_supported,
        },
    )?;

    let mut event_rx = event_tx.subscribe();

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        _ = controller.run() => {
            info!("voice controller exited");
        }

        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Mirror controller events into server status and subscriber pushes
        _ = async {
            loop {
                match event_rx.recv().await {
                    Ok(event) => server.apply_event(&event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "voice event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("voice event handler exited");
        }

        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    info!("shutting down...");

    controller.stop();
    server.shutdown().await;

    info!("health-voice-daemon stopped");

    Ok(())
}
