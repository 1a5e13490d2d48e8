//! Unix domain socket server for the UI shell
//!
//! Provides request-response communication and push notifications of
//! conversation events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::StateEvent;
use crate::state::{ControllerEvent, ConversationState};

use super::protocol::{ChatStatus, Notification, Request, Response};

/// Largest accepted message body
const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    shutdown_tx: broadcast::Sender<()>,
    context: ClientContext,
}

/// Shared server state
struct ServerState {
    status: ChatStatus,
    start_time: std::time::Instant,
}

/// Everything a client handler needs
#[derive(Clone)]
struct ClientContext {
    state: Arc<RwLock<ServerState>>,
    /// Source of notifications for subscribed clients
    events: broadcast::Sender<StateEvent>,
    /// Start requests go to the controller through here
    control_tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl Server {
    /// Create a new IPC server bound to `socket_path`
    pub fn new(
        socket_path: &Path,
        events: broadcast::Sender<StateEvent>,
        control_tx: mpsc::UnboundedSender<ControllerEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path)
            .context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            status: ChatStatus::default(),
            start_time: std::time::Instant::now(),
        }));

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            shutdown_tx,
            context: ClientContext {
                state,
                events,
                control_tx,
            },
        })
    }

    /// Keep the status view in step with controller events
    pub async fn track(&self, mut event_rx: broadcast::Receiver<StateEvent>) {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    debug!(%event, "state event received");
                    self.context.state.write().await.status.apply(&event);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "state event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref()
            .context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let context = self.context.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, context) => {
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
    async fn handle_client(stream: UnixStream, context: ClientContext) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let (request_tx, mut request_rx) = mpsc::channel(8);
        let reader_task = tokio::spawn(Self::read_requests(reader, request_tx));
        let mut subscription: Option<broadcast::Receiver<StateEvent>> = None;

        loop {
            tokio::select! {
                request = request_rx.recv() => {
                    let Some(request) = request else {
                        break;
                    };

                    let response = match request {
                        Ok(request) => {
                            debug!(?request, "received request");
                            if matches!(request, Request::Subscribe) && subscription.is_none() {
                                subscription = Some(context.events.subscribe());
                                debug!("client subscribed to notifications");
                            }
                            Self::process_request(request, &context).await
                        }
                        Err(message) => Response::Error {
                            code: "invalid_request".to_string(),
                            message,
                        },
                    };

                    Self::send_message(&mut writer, &response).await?;
                }
                event = Self::next_event(&mut subscription) => {
                    match event {
                        Ok(event) => {
                            Self::send_message(&mut writer, &Notification::StateEvent(event)).await?;
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            subscription = None;
                        }
                    }
                }
            }
        }

        reader_task.await.context("request reader panicked")?
    }

    /// Read length-prefixed requests until the client hangs up
    ///
    /// Bodies that fail to parse are passed on as `Err` so the client gets
    /// an error response instead of a dropped connection.
    async fn read_requests(
        mut stream: OwnedReadHalf,
        request_tx: mpsc::Sender<std::result::Result<Request, String>>,
    ) -> Result<()> {
        let mut len_buf = [0u8; 4];

        loop {
            // Read message length (4-byte little-endian)
            match stream.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("client disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_MESSAGE_LEN {
                warn!(len, "message too large, disconnecting");
                return Ok(());
            }

            let mut msg_buf = vec![0u8; len];
            stream.read_exact(&mut msg_buf).await?;

            let request = serde_json::from_slice::<Request>(&msg_buf).map_err(|e| e.to_string());
            if request_tx.send(request).await.is_err() {
                return Ok(());
            }
        }
    }

    /// Wait for the next notification, or forever when not subscribed
    async fn next_event(
        subscription: &mut Option<broadcast::Receiver<StateEvent>>,
    ) -> std::result::Result<StateEvent, broadcast::error::RecvError> {
        match subscription {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Send a length-prefixed JSON message
    async fn send_message<T: serde::Serialize>(stream: &mut OwnedWriteHalf, msg: &T) -> Result<()> {
        let msg_bytes = serde_json::to_vec(msg)?;
        let msg_len = (msg_bytes.len() as u32).to_le_bytes();

        stream.write_all(&msg_len).await?;
        stream.write_all(&msg_bytes).await?;

        Ok(())
    }

    /// Process a request and return a response
    async fn process_request(request: Request, context: &ClientContext) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => {
                let mut state = context.state.write().await;
                state.status.uptime_secs = state.start_time.elapsed().as_secs();
                Response::Status(state.status.clone())
            }

            Request::Start => {
                let current = context.state.read().await.status.state;
                if current != ConversationState::Idle {
                    info!(state = %current, "start refused");
                    return Response::Rejected {
                        reason: format!("conversation already in {}", current),
                    };
                }

                match context.control_tx.send(ControllerEvent::StartRequested) {
                    Ok(()) => Response::Started,
                    Err(_) => Response::Error {
                        code: "controller_unavailable".to_string(),
                        message: "conversation controller is not running".to_string(),
                    },
                }
            }

            Request::Subscribe => Response::Subscribed,
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
