//! Per-connection task: session registration, writer task, read loop.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The flow is:
//!   1. Register a session and get its outbound channel
//!   2. Spawn a writer task draining that channel into the socket
//!   3. Loop: receive frames → decode → dispatch to a command handler
//!   4. On exit, a drop guard removes the session and notifies the rest

use std::sync::Arc;

use gamelink_protocol::{DecodedFrame, ProtocolError};
use gamelink_session::{Liveness, SessionId};
use gamelink_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::context::lock_registry;
use crate::server::ServerState;
use crate::{GameLinkError, SessionContext};

/// Drop guard that closes a session when its connection task exits.
///
/// Runs on every exit path, panics included. Never panics itself: a
/// poisoned registry lock is recovered and the close still happens.
struct SessionGuard {
    session_id: SessionId,
    state: Arc<ServerState>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let mut sessions = lock_registry(&self.state.sessions);
        let notice = &self.state.disconnect_notice;
        sessions.close(self.session_id, notice);
        let pruned = sessions.prune_dead(notice);
        if !pruned.is_empty() {
            tracing::debug!(?pruned, "pruned dead sessions");
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), GameLinkError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();

    let (tx, rx) = mpsc::unbounded_channel();
    let (session_id, liveness) = lock_registry(&state.sessions).register(tx)?;
    let guard = SessionGuard {
        session_id,
        state: Arc::clone(&state),
    };
    tracing::info!(%conn_id, %session_id, "session opened");

    let writer = tokio::spawn(write_loop(Arc::clone(&conn), rx, liveness, session_id));

    let ctx = SessionContext::new(session_id, Arc::clone(&state.sessions));
    let result = read_loop(&conn, &state, &ctx).await;

    // Closing the session drops its outbound sender, which ends the writer.
    drop(guard);
    let _ = writer.await;
    if let Err(e) = conn.close().await {
        tracing::trace!(%session_id, error = %e, "close after session end");
    }
    tracing::info!(%session_id, "session ended");

    result
}

async fn read_loop(
    conn: &WebSocketConnection,
    state: &ServerState,
    ctx: &SessionContext,
) -> Result<(), GameLinkError> {
    let session_id = ctx.session_id();
    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%session_id, "connection closed cleanly");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(%session_id, error = %e, "recv error");
                return Err(e.into());
            }
        };

        let frame = match DecodedFrame::decode(&data) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(%session_id, error = %e, "dropping undecodable frame");
                continue;
            }
        };

        match state.commands.dispatch(ctx, &frame) {
            Ok(()) => {}
            Err(ProtocolError::HandlerNotFound(command)) => {
                tracing::warn!(%session_id, %command, "no handler for command");
            }
            Err(e) => {
                tracing::debug!(
                    %session_id,
                    command = %frame.command_type(),
                    error = %e,
                    "handler failed"
                );
            }
        }
    }
}

/// Drains a session's outbound channel into its socket.
///
/// A failed write flags the session dead and stops the writer; the read
/// side notices the broken socket on its own.
async fn write_loop(
    conn: Arc<WebSocketConnection>,
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
    liveness: Liveness,
    session_id: SessionId,
) {
    while let Some(bytes) = rx.recv().await {
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%session_id, error = %e, "write failed");
            liveness.mark_dead();
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use gamelink_protocol::{CommandRegistry, CommandType, Frame};
    use gamelink_session::SessionRegistry;

    use super::*;

    type Rx = mpsc::UnboundedReceiver<Vec<u8>>;

    fn state() -> Arc<ServerState> {
        Arc::new(ServerState {
            sessions: Arc::new(Mutex::new(SessionRegistry::new())),
            commands: CommandRegistry::new(),
            disconnect_notice: Frame::new(CommandType::ALERT_NOTICE),
        })
    }

    fn join(state: &Arc<ServerState>) -> (SessionId, Liveness, Rx) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (id, liveness) = lock_registry(&state.sessions).register(tx).unwrap();
        (id, liveness, rx)
    }

    fn guard(state: &Arc<ServerState>, session_id: SessionId) -> SessionGuard {
        SessionGuard {
            session_id,
            state: Arc::clone(state),
        }
    }

    fn alerts(rx: &mut Rx) -> usize {
        std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|bytes| {
                DecodedFrame::decode(bytes)
                    .map(|f| f.command_type().is_alert())
                    .unwrap_or(false)
            })
            .count()
    }

    #[test]
    fn test_guard_drop_closes_session_and_notifies_peers() {
        let state = state();
        let (s1, _l1, _r1) = join(&state);
        let (_s2, _l2, mut r2) = join(&state);

        drop(guard(&state, s1));

        assert!(!lock_registry(&state.sessions).contains(s1));
        assert_eq!(alerts(&mut r2), 1);
    }

    #[test]
    fn test_dead_session_is_announced_once_when_pruned_before_its_close() {
        let state = state();
        let (s1, _l1, _r1) = join(&state);
        let (s2, l2, _r2) = join(&state);
        let (_s3, _l3, mut r3) = join(&state);

        // Session 2's writer failed; session 1 leaves first and its guard
        // prunes session 2, then session 2's own task ends.
        l2.mark_dead();
        drop(guard(&state, s1));
        drop(guard(&state, s2));

        // One notice for session 1, one for session 2.
        assert_eq!(alerts(&mut r3), 2);
        assert_eq!(lock_registry(&state.sessions).len(), 1);
    }

    #[test]
    fn test_guard_drop_recovers_poisoned_lock() {
        let state = state();
        let (s1, _l1, _r1) = join(&state);
        let (_s2, _l2, mut r2) = join(&state);

        let poisoner = Arc::clone(&state);
        let _ = std::thread::spawn(move || {
            let _held = poisoner.sessions.lock().unwrap();
            panic!("handler panicked while holding the registry");
        })
        .join();

        drop(guard(&state, s1));
        assert_eq!(alerts(&mut r2), 1);
    }
}
