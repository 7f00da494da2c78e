//! The session registry: every live session on the server.
//!
//! Sessions are kept in insertion order but treated as an unordered working
//! set; lookups and removal are linear scans. Writes are best-effort: one
//! failing session is logged and skipped, never allowed to stop delivery to
//! the rest.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is a plain struct. The server shares it behind a mutex
//! and only ever holds the lock for these synchronous calls, since writes
//! just push onto per-session channels.

use gamelink_protocol::Frame;
use tokio::sync::mpsc;

use crate::{Liveness, Session, SessionError, SessionId};

/// Tracks connected sessions and routes frames to them.
pub struct SessionRegistry {
    sessions: Vec<Session>,
    /// `None` once every `u32` id has been handed out.
    next_id: Option<u32>,
}

impl SessionRegistry {
    /// Creates an empty registry. The first session gets id 1.
    pub fn new() -> Self {
        Self {
            sessions: Vec::new(),
            next_id: Some(1),
        }
    }

    /// Registers a newly accepted connection.
    ///
    /// `outbound` feeds the connection's writer task. Returns the assigned
    /// id and the liveness flag the writer task should clear if the socket
    /// write fails.
    ///
    /// # Errors
    /// [`SessionError::IdsExhausted`] once the id space is used up; ids are
    /// never handed out twice.
    pub fn register(
        &mut self,
        outbound: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Result<(SessionId, Liveness), SessionError> {
        let raw = self.next_id.ok_or(SessionError::IdsExhausted)?;
        self.next_id = raw.checked_add(1);
        let id = SessionId(raw);
        let liveness = Liveness::new();
        self.sessions.push(Session::new(id, outbound, liveness.clone()));
        tracing::info!(session_id = %id, live = self.sessions.len(), "session registered");
        Ok((id, liveness))
    }

    /// Sends to one session. Unknown ids are a silent no-op.
    ///
    /// Returns `true` if the frame was handed to the session's writer.
    pub fn unicast(&mut self, id: SessionId, frame: &Frame) -> bool {
        match self.sessions.iter_mut().find(|s| s.id() == id) {
            Some(session) => deliver(session, frame),
            None => false,
        }
    }

    /// Sends to each listed session that exists. Returns how many accepted it.
    pub fn multicast(&mut self, ids: &[SessionId], frame: &Frame) -> usize {
        self.sessions
            .iter_mut()
            .filter(|s| ids.contains(&s.id()))
            .map(|s| deliver(s, frame))
            .filter(|delivered| *delivered)
            .count()
    }

    /// Sends to every session. Returns how many accepted it.
    pub fn broadcast(&mut self, frame: &Frame) -> usize {
        self.sessions
            .iter_mut()
            .map(|s| deliver(s, frame))
            .filter(|delivered| *delivered)
            .count()
    }

    /// Sends to every session except `excluded`. Returns how many accepted it.
    pub fn broadcast_except(&mut self, frame: &Frame, excluded: SessionId) -> usize {
        self.sessions
            .iter_mut()
            .filter(|s| s.id() != excluded)
            .map(|s| deliver(s, frame))
            .filter(|delivered| *delivered)
            .count()
    }

    /// Removes a closed session and tells everyone else it left.
    ///
    /// Returns `false` (and notifies nobody) if the session was already gone.
    pub fn close(&mut self, id: SessionId, notice: &Frame) -> bool {
        let Some(index) = self.sessions.iter().position(|s| s.id() == id) else {
            tracing::debug!(session_id = %id, "close for unknown session ignored");
            return false;
        };
        self.sessions.remove(index);
        tracing::info!(session_id = %id, live = self.sessions.len(), "session closed");
        self.broadcast_except(notice, id);
        true
    }

    /// Drops every session whose liveness flag has been cleared, sending
    /// `notice` to the survivors once per dropped session.
    ///
    /// Fan-out never consults the flag on its own; callers that want dead
    /// sessions gone sooner than their socket close call this. A later
    /// [`close`](Self::close) for a pruned id is a no-op, so every departed
    /// session is announced exactly once.
    pub fn prune_dead(&mut self, notice: &Frame) -> Vec<SessionId> {
        let mut pruned = Vec::new();
        self.sessions.retain(|s| {
            if s.is_alive() {
                true
            } else {
                pruned.push(s.id());
                false
            }
        });
        if !pruned.is_empty() {
            tracing::info!(count = pruned.len(), "pruned dead sessions");
        }
        for _ in &pruned {
            self.broadcast(notice);
        }
        pruned
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.get(id).is_some()
    }

    /// Ids of all live sessions, in registration order.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(Session::id).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes to one session, logging and swallowing a failure.
fn deliver(session: &mut Session, frame: &Frame) -> bool {
    match session.send(frame) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, command = %frame.command_type(), "dropped frame");
            false
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
