//! # gamelink
//!
//! Real-time binary command transport for game clients and servers.
//!
//! Frames are an 8-byte header (flags, encryption form, sequence id, command
//! type) followed by a big-endian payload written and read with cursors.
//! On the server, [`GameServer`] accepts WebSocket connections, registers a
//! session per socket and dispatches incoming frames to the handler
//! registered for their command type. On the client, [`ConnectionManager`]
//! owns the link, stamps outgoing sequence ids and reconnects with a
//! rate-limited policy.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gamelink::prelude::*;
//!
//! # async fn start() -> Result<(), GameLinkError> {
//! let commands: CommandRegistry<SessionContext> = CommandRegistry::new();
//! let server = GameServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build(commands)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod context;
mod error;
mod handler;
mod server;

pub use context::SessionContext;
pub use error::GameLinkError;
pub use server::{
    DEFAULT_DISCONNECT_TEXT, GameServer, GameServerBuilder, ServerConfig,
    default_disconnect_notice,
};

pub use gamelink_client as client;
pub use gamelink_protocol as protocol;
pub use gamelink_session as session;
pub use gamelink_transport as transport;

pub use gamelink_client::{
    ClientError, ConnectionConfig, ConnectionManager, ConnectionState, Endpoint,
};
pub use gamelink_protocol::{
    ByteReader, ByteWriter, CommandHandler, CommandRegistry, CommandType,
    DecodedFrame, Frame, FrameHeader, JsonCodec, PayloadCodec, ProtocolError,
};
pub use gamelink_session::{SessionError, SessionId};
pub use gamelink_transport::TransportError;

/// Common imports for writing handlers, servers and clients.
pub mod prelude {
    pub use crate::{
        ByteReader, ByteWriter, CommandRegistry, CommandType, ConnectionConfig,
        ConnectionManager, ConnectionState, DecodedFrame, Endpoint, Frame,
        GameLinkError, GameServer, ProtocolError, SessionContext, SessionId,
    };
}
