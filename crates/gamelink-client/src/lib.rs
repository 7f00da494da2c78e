//! Client side of the gamelink protocol.
//!
//! [`ConnectionManager`] keeps one persistent link to the game server:
//!
//! 1. **State machine** — [`ConnectionState`]: connecting, connected,
//!    disconnected, reconnecting, driven by transport open/close/error.
//! 2. **Sequencing** — every transmitted frame is stamped with the next
//!    sequence id; frames that are built but never sent don't count.
//! 3. **Reconnect policy** — rate-limited, delayed reconnect checks that
//!    stop for good once the server kicks the client out
//!    ([`ConnectionConfig`]).
//! 4. **Dispatch** — inbound frames go to a
//!    [`CommandRegistry`](gamelink_protocol::CommandRegistry) whose handlers
//!    receive the manager itself, so they can reply.

mod config;
mod connection;
mod error;
mod state;

pub use config::{ConnectionConfig, Endpoint};
pub use connection::ConnectionManager;
pub use error::ClientError;
pub use state::ConnectionState;
