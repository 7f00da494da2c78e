//! The context handed to server-side command handlers.

use std::sync::{Arc, Mutex, MutexGuard};

use gamelink_protocol::Frame;
use gamelink_session::{SessionId, SessionRegistry};

/// What a server-side handler sees: which session sent the frame, and the
/// registry to answer through.
///
/// Every method takes the registry lock for the duration of one synchronous
/// call, so handlers may freely call several of them in a row.
#[derive(Clone)]
pub struct SessionContext {
    session_id: SessionId,
    sessions: Arc<Mutex<SessionRegistry>>,
}

impl SessionContext {
    pub(crate) fn new(session_id: SessionId, sessions: Arc<Mutex<SessionRegistry>>) -> Self {
        Self {
            session_id,
            sessions,
        }
    }

    /// The session the current frame arrived on.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Sends `frame` back to the originating session.
    pub fn reply(&self, frame: &Frame) -> bool {
        self.registry().unicast(self.session_id, frame)
    }

    /// Sends `frame` to one session; unknown ids are ignored.
    pub fn send_to(&self, id: SessionId, frame: &Frame) -> bool {
        self.registry().unicast(id, frame)
    }

    /// Sends `frame` to every live session, the sender included.
    pub fn broadcast(&self, frame: &Frame) -> usize {
        self.registry().broadcast(frame)
    }

    /// Sends `frame` to every session except the sender.
    pub fn broadcast_except_self(&self, frame: &Frame) -> usize {
        self.registry().broadcast_except(frame, self.session_id)
    }

    /// Ids of every registered session, in registration order.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.registry().ids()
    }

    fn registry(&self) -> MutexGuard<'_, SessionRegistry> {
        lock_registry(&self.sessions)
    }
}

/// Locks the registry, recovering the guard if a handler panicked while
/// holding it. The registry has no multi-step invariants a panic could
/// leave half-applied.
pub(crate) fn lock_registry(sessions: &Mutex<SessionRegistry>) -> MutexGuard<'_, SessionRegistry> {
    sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
