//! Connection configuration and endpoint addressing.

use std::fmt;
use std::time::Duration;

/// Reconnect policy knobs.
///
/// The defaults are what the deployed game client uses.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Minimum time between two reconnect rounds triggered by sending while
    /// disconnected. Sends inside this window are silent no-ops.
    pub reconnect_interval: Duration,

    /// Delay before each liveness check of a reconnect round.
    pub liveness_check_delay: Duration,

    /// How many delayed checks one round may run before giving up.
    pub max_liveness_checks: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            reconnect_interval: Duration::from_millis(5_000),
            liveness_check_delay: Duration::from_millis(15_000),
            max_liveness_checks: 2,
        }
    }
}

/// Where the server lives.
///
/// `path` is appended to the URL as-is and otherwise ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            path: String::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// The WebSocket URL for this endpoint.
    pub fn url(&self) -> String {
        format!("ws://{}:{}{}", self.host, self.port, self.path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}
