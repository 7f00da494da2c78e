//! The connection manager: one persistent link to the game server.
//!
//! It owns exactly one socket at a time, stamps outgoing frames with a
//! monotonically increasing sequence id, dispatches incoming frames to the
//! command registry, and decides when to try reconnecting.
//!
//! # Delivery
//!
//! Sending is fire-and-forget. There is no queue, no acknowledgment, and no
//! resend: a frame sent while disconnected is dropped, and a frame lost on
//! a dying socket is simply lost. Socket failures show up as close/error
//! events on the read side, which move the state machine.
//!
//! # Reconnect policy
//!
//! Sending while disconnected may start a reconnect round, at most once per
//! [`ConnectionConfig::reconnect_interval`]. A round is a chain of delayed
//! liveness checks; each one that still finds the link down calls
//! [`ConnectionManager::reconnect`]. Once the server kicks the client out,
//! no further rounds or checks are scheduled.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gamelink_protocol::{CommandRegistry, DecodedFrame, Frame, ProtocolError};
use gamelink_transport::{ClientConnection, Connection, WebSocketConnector};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::state::LinkState;
use crate::{ClientError, ConnectionConfig, ConnectionState, Endpoint};

/// Called every time the transport opens, including after a reconnect.
type OnOpen = Arc<dyn Fn(&ConnectionManager) + Send + Sync>;

struct Inner {
    config: ConnectionConfig,
    commands: CommandRegistry<ConnectionManager>,
    link: Mutex<LinkState>,
    on_open: Mutex<Option<OnOpen>>,
}

/// Handle to the client's link. Cheap to clone; all clones share one link.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    /// Creates a disconnected manager that dispatches inbound frames to
    /// `commands`.
    pub fn new(
        config: ConnectionConfig,
        commands: CommandRegistry<ConnectionManager>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                commands,
                link: Mutex::new(LinkState::new()),
                on_open: Mutex::new(None),
            }),
        }
    }

    fn link(&self) -> MutexGuard<'_, LinkState> {
        self.inner.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the link to `endpoint`. `on_open` runs each time the socket
    /// opens, on this connect and on every later reconnect.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn connect<F>(&self, endpoint: Endpoint, on_open: F)
    where
        F: Fn(&ConnectionManager) + Send + Sync + 'static,
    {
        *self
            .inner
            .on_open
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(on_open));
        let generation = self
            .link()
            .begin_connect(endpoint.clone(), ConnectionState::Connecting);
        tracing::info!(%endpoint, "connecting");
        tokio::spawn(self.clone().drive(endpoint, generation));
    }

    /// Drops the current socket (if any) and connects again to the last
    /// endpoint.
    ///
    /// # Errors
    /// [`ClientError::NoEndpoint`] if [`connect`](Self::connect) was never
    /// called.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn reconnect(&self) -> Result<(), ClientError> {
        let (endpoint, generation) = {
            let mut link = self.link();
            let endpoint = link.endpoint().cloned().ok_or(ClientError::NoEndpoint)?;
            let generation =
                link.begin_connect(endpoint.clone(), ConnectionState::Reconnecting);
            (endpoint, generation)
        };
        tracing::info!(%endpoint, "reconnecting");
        tokio::spawn(self.clone().drive(endpoint, generation));
        Ok(())
    }

    /// Closes the link on request. Automatic reconnect rounds can still
    /// bring it back unless the client was kicked out.
    pub fn disconnect(&self) {
        self.link().shut_down();
        tracing::info!("disconnected by request");
    }

    /// Sends a frame, stamping it with the next sequence id.
    ///
    /// While not connected the frame is dropped, and the call may schedule a
    /// reconnect round (see the module docs). Never fails and never blocks.
    pub fn send(&self, frame: Frame) {
        let command = frame.command_type();
        let mut link = self.link();
        match link.transmit(frame) {
            Ok(sequence_id) => {
                tracing::trace!(%command, sequence_id, "frame sent");
            }
            Err(ClientError::TransportUnavailable) => {
                let schedule = link.claim_retry(Instant::now(), &self.inner.config);
                drop(link);
                tracing::debug!(%command, "not connected, frame dropped");
                if schedule {
                    self.schedule_check(1);
                }
            }
            Err(e) => {
                tracing::warn!(%command, error = %e, "frame dropped");
            }
        }
    }

    /// Records that the server kicked this client out. From now on no
    /// automatic reconnect is ever scheduled.
    pub fn mark_kicked_out(&self) {
        self.link().mark_kicked_out();
        tracing::info!("kicked out by server, automatic reconnect disabled");
    }

    pub fn is_kicked_out(&self) -> bool {
        self.link().kicked_out()
    }

    pub fn state(&self) -> ConnectionState {
        self.link().state()
    }

    /// Sequence id the next transmitted frame will carry.
    pub fn next_sequence_id(&self) -> u32 {
        self.link().next_sequence()
    }

    /// Total liveness checks scheduled over this manager's lifetime.
    pub fn scheduled_checks(&self) -> u64 {
        self.link().scheduled_checks()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// Arms liveness check number `attempt` of the current round.
    fn schedule_check(&self, attempt: u32) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no Tokio runtime, reconnect check not scheduled");
            return;
        };
        let delay = self.inner.config.liveness_check_delay;
        tracing::debug!(attempt, ?delay, "reconnect check scheduled");
        let this = self.clone();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            this.run_check(attempt);
        });
    }

    fn run_check(&self, attempt: u32) {
        let follow_up = {
            let mut link = self.link();
            if link.kicked_out() || link.state() != ConnectionState::Disconnected {
                tracing::debug!(attempt, state = %link.state(), "reconnect check skipped");
                return;
            }
            link.claim_follow_up(attempt, &self.inner.config)
        };
        if let Err(e) = self.reconnect() {
            tracing::warn!(attempt, error = %e, "reconnect check failed");
        }
        if follow_up {
            self.schedule_check(attempt + 1);
        }
    }

    /// Runs one socket from connect to close.
    async fn drive(self, endpoint: Endpoint, generation: u64) {
        let conn = match WebSocketConnector.connect(&endpoint.url()).await {
            Ok(conn) => Arc::new(conn),
            Err(e) => {
                tracing::warn!(%endpoint, error = %e, "connect failed");
                self.link().closed(generation);
                return;
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        if !self.link().opened(generation, tx) {
            tracing::debug!(%endpoint, "connect superseded, closing socket");
            let _ = conn.close().await;
            return;
        }
        tracing::info!(%endpoint, conn_id = %conn.id(), "connected");

        let on_open = self
            .inner
            .on_open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(on_open) = on_open {
            on_open(&self);
        }

        tokio::spawn(write_loop(Arc::clone(&conn), rx));
        self.read_loop(&conn, generation).await;

        if self.link().closed(generation) {
            tracing::info!(%endpoint, "disconnected");
        }
    }

    async fn read_loop(&self, conn: &ClientConnection, generation: u64) {
        loop {
            match conn.recv().await {
                Ok(Some(bytes)) => {
                    if !self.link().is_current(generation) {
                        break;
                    }
                    self.handle_inbound(&bytes);
                }
                Ok(None) => {
                    tracing::debug!(conn_id = %conn.id(), "server closed the connection");
                    break;
                }
                Err(e) => {
                    tracing::debug!(conn_id = %conn.id(), error = %e, "recv error");
                    break;
                }
            }
        }
    }

    fn handle_inbound(&self, bytes: &[u8]) {
        let frame = match DecodedFrame::decode(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(error = %e, "dropping malformed frame");
                return;
            }
        };
        match self.inner.commands.dispatch(self, &frame) {
            Ok(()) => {}
            Err(ProtocolError::HandlerNotFound(command)) => {
                tracing::warn!(%command, "no handler, frame dropped");
            }
            Err(e) => {
                tracing::debug!(command = %frame.command_type(), error = %e, "handler failed");
            }
        }
    }
}

/// Sole writer for one socket. Ends when its sender is dropped or a write
/// fails, then closes the socket so the read side sees the close.
async fn write_loop(conn: Arc<ClientConnection>, mut rx: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(bytes) = rx.recv().await {
        if let Err(e) = conn.send(&bytes).await {
            tracing::warn!(conn_id = %conn.id(), error = %e, "write failed");
            break;
        }
    }
    let _ = conn.close().await;
}
