//! The link state machine, kept free of I/O so it can be tested directly.
//!
//! ```text
//!   Disconnected ──(connect)────→ Connecting ──(open)──→ Connected
//!        ↑   └────(reconnect)──→ Reconnecting ──(open)──┘    │
//!        └──────────────(close / error / disconnect)─────────┘
//! ```
//!
//! Every connect attempt gets a new generation number. Events from an older
//! socket carry its stale generation and are ignored, so a superseded link
//! can never knock the current one back to `Disconnected`.

use std::fmt;

use gamelink_protocol::Frame;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::{ClientError, ConnectionConfig, Endpoint};

/// Where the link is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// First connect attempt in progress.
    Connecting,
    Connected,
    /// Connecting again after an earlier link was lost.
    Reconnecting,
}

impl ConnectionState {
    /// `true` for both `Connecting` and `Reconnecting`.
    pub fn is_connecting(self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// Mutable link bookkeeping guarded by the connection manager's lock.
#[derive(Debug)]
pub(crate) struct LinkState {
    state: ConnectionState,
    endpoint: Option<Endpoint>,
    outbound: Option<mpsc::UnboundedSender<Vec<u8>>>,
    generation: u64,
    next_sequence: u32,
    last_retry_at: Option<Instant>,
    kicked_out: bool,
    scheduled_checks: u64,
}

impl LinkState {
    pub(crate) fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            endpoint: None,
            outbound: None,
            generation: 0,
            next_sequence: 0,
            last_retry_at: None,
            kicked_out: false,
            scheduled_checks: 0,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    pub(crate) fn next_sequence(&self) -> u32 {
        self.next_sequence
    }

    pub(crate) fn kicked_out(&self) -> bool {
        self.kicked_out
    }

    pub(crate) fn scheduled_checks(&self) -> u64 {
        self.scheduled_checks
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Starts a connect attempt and returns its generation.
    ///
    /// Dropping the old outbound sender lets the previous socket's writer
    /// finish and close that socket.
    pub(crate) fn begin_connect(&mut self, endpoint: Endpoint, state: ConnectionState) -> u64 {
        self.endpoint = Some(endpoint);
        self.outbound = None;
        self.state = state;
        self.generation += 1;
        self.generation
    }

    /// The transport opened. Returns `false` if this attempt was superseded.
    pub(crate) fn opened(
        &mut self,
        generation: u64,
        outbound: mpsc::UnboundedSender<Vec<u8>>,
    ) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.state = ConnectionState::Connected;
        self.outbound = Some(outbound);
        true
    }

    /// The transport closed or failed. Returns `false` for a stale socket.
    pub(crate) fn closed(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.state = ConnectionState::Disconnected;
        self.outbound = None;
        true
    }

    /// Local shutdown: invalidates the current socket's events.
    pub(crate) fn shut_down(&mut self) {
        self.generation += 1;
        self.state = ConnectionState::Disconnected;
        self.outbound = None;
    }

    pub(crate) fn mark_kicked_out(&mut self) {
        self.kicked_out = true;
    }

    /// Stamps `frame` with the next sequence id and hands it to the writer.
    ///
    /// The counter advances only for frames actually handed off.
    pub(crate) fn transmit(&mut self, mut frame: Frame) -> Result<u32, ClientError> {
        if self.state != ConnectionState::Connected {
            return Err(ClientError::TransportUnavailable);
        }
        let outbound = self
            .outbound
            .as_ref()
            .ok_or(ClientError::TransportUnavailable)?;
        let sequence_id = self.next_sequence;
        frame.set_sequence_id(sequence_id);
        outbound
            .send(frame.into_bytes())
            .map_err(|_| ClientError::WriteFailure)?;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        Ok(sequence_id)
    }

    /// Decides whether a send while disconnected should start a reconnect
    /// round, and records the attempt if so.
    pub(crate) fn claim_retry(&mut self, now: Instant, config: &ConnectionConfig) -> bool {
        if self.kicked_out {
            return false;
        }
        if let Some(last) = self.last_retry_at {
            if now.duration_since(last) < config.reconnect_interval {
                return false;
            }
        }
        self.last_retry_at = Some(now);
        self.scheduled_checks += 1;
        true
    }

    /// Decides whether a liveness check that found the link still down may
    /// schedule the next one.
    pub(crate) fn claim_follow_up(&mut self, attempt: u32, config: &ConnectionConfig) -> bool {
        if self.kicked_out || attempt >= config.max_liveness_checks {
            return false;
        }
        self.scheduled_checks += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use gamelink_protocol::{CommandType, DecodedFrame};

    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint::new("127.0.0.1", 9000)
    }

    fn connected() -> (LinkState, mpsc::UnboundedReceiver<Vec<u8>>) {
        let mut link = LinkState::new();
        let generation = link.begin_connect(endpoint(), ConnectionState::Connecting);
        let (tx, rx) = mpsc::unbounded_channel();
        assert!(link.opened(generation, tx));
        (link, rx)
    }

    fn frame() -> Frame {
        Frame::new(CommandType(3))
    }

    #[test]
    fn test_transmit_stamps_consecutive_sequence_ids() {
        let (mut link, mut rx) = connected();
        // Built but never sent; must not consume a sequence id.
        let _unsent = frame();

        for expected in 0..5u32 {
            assert_eq!(link.transmit(frame()).unwrap(), expected);
        }

        let ids: Vec<u32> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|bytes| DecodedFrame::decode(&bytes).unwrap().sequence_id())
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(link.next_sequence(), 5);
    }

    #[test]
    fn test_transmit_while_disconnected_leaves_counter() {
        let mut link = LinkState::new();

        let result = link.transmit(frame());

        assert!(matches!(result, Err(ClientError::TransportUnavailable)));
        assert_eq!(link.next_sequence(), 0);
    }

    #[test]
    fn test_transmit_with_dead_writer_returns_write_failure() {
        let (mut link, rx) = connected();
        drop(rx);

        assert!(matches!(link.transmit(frame()), Err(ClientError::WriteFailure)));
        assert_eq!(link.next_sequence(), 0);
    }

    #[test]
    fn test_sequence_continues_across_reconnect() {
        let (mut link, _rx) = connected();
        link.transmit(frame()).unwrap();
        let generation = link.begin_connect(endpoint(), ConnectionState::Reconnecting);
        let (tx, _rx2) = mpsc::unbounded_channel();
        link.opened(generation, tx);

        assert_eq!(link.transmit(frame()).unwrap(), 1);
    }

    #[test]
    fn test_stale_generation_events_are_ignored() {
        let mut link = LinkState::new();
        let old = link.begin_connect(endpoint(), ConnectionState::Connecting);
        let new = link.begin_connect(endpoint(), ConnectionState::Reconnecting);

        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(!link.opened(old, tx.clone()));
        assert_eq!(link.state(), ConnectionState::Reconnecting);

        assert!(link.opened(new, tx));
        assert!(!link.closed(old));
        assert_eq!(link.state(), ConnectionState::Connected);

        assert!(link.closed(new));
        assert_eq!(link.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_shut_down_invalidates_current_socket() {
        let (mut link, _rx) = connected();
        let generation = 1;

        link.shut_down();

        assert_eq!(link.state(), ConnectionState::Disconnected);
        assert!(!link.closed(generation));
        assert!(matches!(link.transmit(frame()), Err(ClientError::TransportUnavailable)));
    }

    #[test]
    fn test_claim_retry_rate_limited_by_interval() {
        let config = ConnectionConfig::default();
        let mut link = LinkState::new();
        let t0 = Instant::now();

        assert!(link.claim_retry(t0, &config));
        assert!(!link.claim_retry(t0 + Duration::from_millis(4_999), &config));
        assert!(link.claim_retry(t0 + Duration::from_millis(5_000), &config));
        assert_eq!(link.scheduled_checks(), 2);
    }

    #[test]
    fn test_claim_retry_after_kick_never_schedules() {
        let config = ConnectionConfig::default();
        let mut link = LinkState::new();
        link.mark_kicked_out();

        assert!(!link.claim_retry(Instant::now(), &config));
        assert!(!link.claim_follow_up(1, &config));
        assert_eq!(link.scheduled_checks(), 0);
    }

    #[test]
    fn test_claim_follow_up_stops_at_max_checks() {
        let config = ConnectionConfig::default();
        let mut link = LinkState::new();

        assert!(link.claim_follow_up(1, &config));
        assert!(!link.claim_follow_up(2, &config));
    }

    #[test]
    fn test_connection_state_is_connecting() {
        assert!(ConnectionState::Connecting.is_connecting());
        assert!(ConnectionState::Reconnecting.is_connecting());
        assert!(!ConnectionState::Connected.is_connecting());
        assert_eq!(ConnectionState::Reconnecting.to_string(), "reconnecting");
    }
}
