//! Session types: the server's record of one accepted connection.
//!
//! A session owns the outbound side of its socket through a channel to a
//! single writer task, so the session is the only thing that ever writes to
//! that socket. Every frame it sends gets the session's next sequence id.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use gamelink_protocol::Frame;
use tokio::sync::mpsc;

use crate::SessionError;

/// Server-wide unique session identifier, never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// Shared "alive" flag for a session.
///
/// Cleared by whichever side first notices the socket can't be written:
/// the registry when the writer task is gone, or the writer task when the
/// socket write itself fails.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn mark_dead(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// One accepted client connection.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    liveness: Liveness,
    next_sequence: u32,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        outbound: mpsc::UnboundedSender<Vec<u8>>,
        liveness: Liveness,
    ) -> Self {
        Self {
            id,
            outbound,
            liveness,
            next_sequence: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    /// Sequence id the next sent frame will carry.
    pub fn next_sequence_id(&self) -> u32 {
        self.next_sequence
    }

    /// Stamps a copy of `frame` with this session's next sequence id and
    /// hands it to the writer task.
    ///
    /// The counter only advances when the frame was actually handed off.
    ///
    /// # Errors
    /// [`SessionError::WriteFailure`] if the writer task is gone; the
    /// session is marked dead.
    pub fn send(&mut self, frame: &Frame) -> Result<(), SessionError> {
        let bytes = frame.to_stamped_bytes(self.next_sequence);
        if self.outbound.send(bytes).is_err() {
            self.liveness.mark_dead();
            return Err(SessionError::WriteFailure(self.id));
        }
        self.next_sequence = self.next_sequence.wrapping_add(1);
        Ok(())
    }
}
