//! Unix domain socket server for IPC
//!
//! Accepts requests from UI clients, forwards controller inputs, records
//! platform state through the monitors, and pushes events and adapter
//! commands to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::controller::ControllerInput;
use crate::events::{StatusLabel, VoiceEvent};
use crate::monitor::{NetworkMonitor, PermissionMonitor};

use super::protocol::{encode_frame, read_frame, DaemonStatus, Notification, Request, Response};

const CLIENT_QUEUE: usize = 64;

/// Channels and shared state the server needs from the rest of the daemon
#[derive(Clone)]
pub struct ServerLinks {
    /// Controller input queue
    pub inputs: mpsc::Sender<ControllerInput>,
    /// Fan-out to subscribed clients; the IPC adapters push commands here too
    pub notifications: broadcast::Sender<Notification>,
    pub network: Arc<NetworkMonitor>,
    pub permission: Arc<PermissionMonitor>,
    /// Read by `IpcCapture::is_supported`
    pub capture_supported: Arc<AtomicBool>,
}

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    state: Arc<RwLock<ServerState>>,
    links: ServerLinks,
    shutdown_tx: broadcast::Sender<()>,
}

/// Shared server state
struct ServerState {
    status: DaemonStatus,
    start_time: std::time::Instant,
}

impl Server {
    /// Create a new IPC server
    pub fn new(socket_path: &Path, links: ServerLinks) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            status: DaemonStatus::default(),
            start_time: std::time::Instant::now(),
        }));

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            state,
            links,
            shutdown_tx,
        })
    }

    /// Fold a controller event into the status and push it to subscribers
    pub async fn apply_event(&self, event: &VoiceEvent) {
        {
            let mut server_state = self.state.write().await;
            match event {
                VoiceEvent::StateChanged { to, .. } => {
                    server_state.status.state = *to;
                    server_state.status.status = StatusLabel::for_state(*to);
                }
                VoiceEvent::Transcript { text } => {
                    server_state.status.transcript = text.clone();
                }
                _ => {}
            }
        }

        // No subscribers is fine
        let _ = self.links.notifications.send(Notification::Event(event.clone()));
    }

    /// Current status as a client would see it
    pub async fn status(&self) -> DaemonStatus {
        Self::refresh_status(&self.state, &self.links).await
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let state = Arc::clone(&self.state);
                    let links = self.links.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, state, links) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(
        stream: UnixStream,
        state: Arc<RwLock<ServerState>>,
        links: ServerLinks,
    ) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();

        // One writer per client so responses and pushes never interleave
        let (out_tx, mut out_rx) = mpsc::channel::<Vec<u8>>(CLIENT_QUEUE);
        let writer_task = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if let Err(e) = writer.write_all(&frame).await {
                    debug!(?e, "client write failed");
                    break;
                }
            }
        });

        let mut forwarder: Option<tokio::task::JoinHandle<()>> = None;

        let result = loop {
            let body = match read_frame(&mut reader).await {
                Ok(Some(body)) => body,
                Ok(None) => {
                    debug!("client disconnected");
                    break Ok(());
                }
                Err(e) => break Err(e.into()),
            };

            let response = match serde_json::from_slice::<Request>(&body) {
                Ok(request) => {
                    debug!(?request, "received request");
                    let (response, subscribe) = Self::process_request(request, &state, &links).await;
                    if subscribe && forwarder.is_none() {
                        forwarder = Some(Self::forward_notifications(&links, out_tx.clone()));
                        debug!("client subscribed to notifications");
                    }
                    response
                }
                Err(e) => {
                    warn!(?e, "failed to parse request");
                    Response::Error {
                        code: "bad_request".to_string(),
                        message: e.to_string(),
                    }
                }
            };

            let frame = match encode_frame(&response).context("failed to encode response") {
                Ok(frame) => frame,
                Err(e) => break Err(e),
            };
            if out_tx.send(frame).await.is_err() {
                break Ok(());
            }
        };

        if let Some(forwarder) = forwarder {
            forwarder.abort();
        }
        drop(out_tx);
        let _ = writer_task.await;

        result
    }

    /// Copy notifications into a client's outgoing queue
    fn forward_notifications(
        links: &ServerLinks,
        out_tx: mpsc::Sender<Vec<u8>>,
    ) -> tokio::task::JoinHandle<()> {
        let mut notifications = links.notifications.subscribe();

        tokio::spawn(async move {
            loop {
                match notifications.recv().await {
                    Ok(note) => {
                        let frame = match encode_frame(&note) {
                            Ok(frame) => frame,
                            Err(e) => {
                                warn!(?e, "failed to encode notification");
                                continue;
                            }
                        };
                        if out_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "subscriber lagged behind notifications");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    async fn refresh_status(state: &Arc<RwLock<ServerState>>, links: &ServerLinks) -> DaemonStatus {
        let mut state = state.write().await;
        state.status.uptime_secs = state.start_time.elapsed().as_secs();
        state.status.network = links.network.current();
        state.status.permission = links.permission.current();
        state.status.capture_supported = links.capture_supported.load(Ordering::SeqCst);
        state.status.clone()
    }

    /// Process a request and return a response
    /// Returns (Response, should_subscribe)
    async fn process_request(
        request: Request,
        state: &Arc<RwLock<ServerState>>,
        links: &ServerLinks,
    ) -> (Response, bool) {
        match request {
            Request::Ping => (Response::Pong, false),

            Request::GetStatus => {
                let status = Self::refresh_status(state, links).await;
                (Response::Status(status), false)
            }

            Request::Subscribe => (Response::Subscribed, true),

            Request::CaptureSupport { supported } => {
                links.capture_supported.store(supported, Ordering::SeqCst);
                info!(supported, "client reported speech engine support");
                (Response::Accepted, false)
            }

            Request::NetworkChanged { state } => {
                links.network.set(state);
                (Response::Accepted, false)
            }

            Request::PermissionChanged { state } => {
                links.permission.set(state);
                (Response::Accepted, false)
            }

            other => match other.into_input() {
                Some(input) => match links.inputs.send(input).await {
                    Ok(()) => (Response::Accepted, false),
                    Err(_) => (
                        Response::Error {
                            code: "controller_unavailable".to_string(),
                            message: "voice controller is not running".to_string(),
                        },
                        false,
                    ),
                },
                None => (
                    Response::Error {
                        code: "unsupported".to_string(),
                        message: "request not handled".to_string(),
                    },
                    false,
                ),
            },
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::controller::{Generation, State};
    use crate::monitor::{NetworkState, PermissionState};

    struct Fixture {
        server: Arc<Server>,
        inputs: mpsc::Receiver<ControllerInput>,
        links: ServerLinks,
        socket_path: PathBuf,
    }

    fn fixture(name: &str) -> Fixture {
        let socket_path = std::env::temp_dir().join(format!(
            "health-voice-{}-{}.sock",
            name,
            std::process::id()
        ));
        let (inputs_tx, inputs) = mpsc::channel(16);
        let (notifications, _) = broadcast::channel(64);
        let links = ServerLinks {
            inputs: inputs_tx,
            notifications,
            network: Arc::new(NetworkMonitor::network(NetworkState::Online)),
            permission: Arc::new(PermissionMonitor::permission(PermissionState::Unknown)),
            capture_supported: Arc::new(AtomicBool::new(false)),
        };
        let server = Arc::new(Server::new(&socket_path, links.clone()).unwrap());

        let runner = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = runner.run().await;
        });

        Fixture {
            server,
            inputs,
            links,
            socket_path,
        }
    }

    async fn send(stream: &mut UnixStream, request: &Request) {
        let frame = encode_frame(request).unwrap();
        stream.write_all(&frame).await.unwrap();
    }

    async fn recv<T: serde::de::DeserializeOwned>(stream: &mut UnixStream) -> T {
        let body = tokio::time::timeout(Duration::from_secs(2), read_frame(stream))
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_ping_and_status() {
        let fx = fixture("ping");
        let mut stream = UnixStream::connect(&fx.socket_path).await.unwrap();

        send(&mut stream, &Request::Ping).await;
        assert_eq!(recv::<Response>(&mut stream).await, Response::Pong);

        send(&mut stream, &Request::CaptureSupport { supported: true }).await;
        assert_eq!(recv::<Response>(&mut stream).await, Response::Accepted);

        send(&mut stream, &Request::GetStatus).await;
        match recv::<Response>(&mut stream).await {
            Response::Status(status) => {
                assert_eq!(status.state, State::Idle);
                assert!(status.capture_supported);
                assert_eq!(status.network, NetworkState::Online);
            }
            other => panic!("unexpected response: {:?}", other),
        }

        fx.server.shutdown().await;
    }

    #[tokio::test]
    async fn test_requests_reach_controller_and_monitors() {
        let mut fx = fixture("forward");
        let mut stream = UnixStream::connect(&fx.socket_path).await.unwrap();

        send(&mut stream, &Request::Toggle).await;
        assert_eq!(recv::<Response>(&mut stream).await, Response::Accepted);
        assert!(matches!(fx.inputs.recv().await, Some(ControllerInput::Toggle)));

        send(
            &mut stream,
            &Request::PlaybackEnded {
                generation: Generation::new(6),
            },
        )
        .await;
        assert_eq!(recv::<Response>(&mut stream).await, Response::Accepted);
        assert!(matches!(
            fx.inputs.recv().await,
            Some(ControllerInput::PlaybackEnded { generation }) if generation == Generation::new(6)
        ));

        send(
            &mut stream,
            &Request::NetworkChanged {
                state: NetworkState::Offline,
            },
        )
        .await;
        assert_eq!(recv::<Response>(&mut stream).await, Response::Accepted);
        assert_eq!(fx.links.network.current(), NetworkState::Offline);

        fx.server.shutdown().await;
    }

    #[tokio::test]
    async fn test_bad_request_keeps_connection() {
        let fx = fixture("bad");
        let mut stream = UnixStream::connect(&fx.socket_path).await.unwrap();

        let garbage = b"{\"type\":\"launch\"}";
        stream
            .write_all(&(garbage.len() as u32).to_le_bytes())
            .await
            .unwrap();
        stream.write_all(garbage).await.unwrap();
        assert!(matches!(
            recv::<Response>(&mut stream).await,
            Response::Error { code, .. } if code == "bad_request"
        ));

        send(&mut stream, &Request::Ping).await;
        assert_eq!(recv::<Response>(&mut stream).await, Response::Pong);

        fx.server.shutdown().await;
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let fx = fixture("subscribe");
        let mut stream = UnixStream::connect(&fx.socket_path).await.unwrap();

        send(&mut stream, &Request::Subscribe).await;
        assert_eq!(recv::<Response>(&mut stream).await, Response::Subscribed);

        let event = VoiceEvent::StateChanged {
            from: State::Idle,
            to: State::Listening,
        };
        fx.server.apply_event(&event).await;

        assert_eq!(recv::<Notification>(&mut stream).await, Notification::Event(event));
        assert_eq!(fx.server.status().await.status, StatusLabel::Listening);

        fx.server.shutdown().await;
    }
}
