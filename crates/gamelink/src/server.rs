//! `GameServer` builder and accept loop.
//!
//! This is the entry point for running a gamelink server. It ties together
//! the layers: transport → frame codec → session registry → command
//! handlers.

use std::sync::{Arc, Mutex};

use gamelink_protocol::{CommandRegistry, CommandType, Frame, ProtocolError};
use gamelink_session::SessionRegistry;
use gamelink_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{GameLinkError, SessionContext};

/// Text carried by the default disconnect notice.
pub const DEFAULT_DISCONNECT_TEXT: &str = "session closed";

/// Builds the notice sent to the remaining sessions when one closes:
/// an [`CommandType::ALERT_NOTICE`] frame carrying a short string.
pub fn default_disconnect_notice() -> Result<Frame, ProtocolError> {
    let mut frame = Frame::new(CommandType::ALERT_NOTICE);
    frame.writer().write_str(DEFAULT_DISCONNECT_TEXT)?;
    Ok(frame)
}

/// Shared server state passed to each connection task.
pub(crate) struct ServerState {
    pub(crate) sessions: Arc<Mutex<SessionRegistry>>,
    pub(crate) commands: CommandRegistry<SessionContext>,
    pub(crate) disconnect_notice: Frame,
}

/// Server settings collected by [`GameServerBuilder`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: String,
    /// Frame broadcast to the others when a session closes. `None` means
    /// [`default_disconnect_notice`].
    pub disconnect_notice: Option<Frame>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            disconnect_notice: None,
        }
    }
}

/// Builder for configuring and starting a [`GameServer`].
///
/// # Example
///
/// ```rust,no_run
/// use gamelink::prelude::*;
///
/// # async fn start() -> Result<(), GameLinkError> {
/// let mut commands = CommandRegistry::new();
/// commands.add_handler(
///     CommandType(1),
///     |ctx: &SessionContext, frame: &DecodedFrame| -> Result<(), ProtocolError> {
///         let text = frame.reader().read_str()?;
///         let mut echo = Frame::new(CommandType(1));
///         echo.writer().write_str(text)?;
///         ctx.reply(&echo);
///         Ok(())
///     },
/// );
///
/// let server = GameServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(commands)
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Default)]
pub struct GameServerBuilder {
    config: ServerConfig,
}

impl GameServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the frame sent to the others when a session closes.
    pub fn disconnect_notice(mut self, frame: Frame) -> Self {
        self.config.disconnect_notice = Some(frame);
        self
    }

    /// Binds the listener and wires `commands` in as the dispatch table.
    pub async fn build(
        self,
        commands: CommandRegistry<SessionContext>,
    ) -> Result<GameServer, GameLinkError> {
        let disconnect_notice = match self.config.disconnect_notice {
            Some(frame) => frame,
            None => default_disconnect_notice()?,
        };
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        tracing::debug!(
            addr = %self.config.bind_addr,
            commands = commands.len(),
            "server built"
        );

        let state = Arc::new(ServerState {
            sessions: Arc::new(Mutex::new(SessionRegistry::new())),
            commands,
            disconnect_notice,
        });

        Ok(GameServer { transport, state })
    }
}

/// A bound gamelink server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct GameServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl GameServer {
    /// Creates a new builder.
    pub fn builder() -> GameServerBuilder {
        GameServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop.
    ///
    /// Each accepted connection becomes a session with its own task. Runs
    /// until the process is terminated; accept failures are logged and the
    /// loop carries on.
    pub async fn run(mut self) -> Result<(), GameLinkError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "gamelink server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamelink_protocol::DecodedFrame;

    #[test]
    fn test_default_disconnect_notice_is_alert_with_text() {
        let frame = default_disconnect_notice().unwrap();
        let decoded = DecodedFrame::decode(frame.as_bytes()).unwrap();
        assert!(decoded.command_type().is_alert());
        assert_eq!(decoded.reader().read_str().unwrap(), DEFAULT_DISCONNECT_TEXT);
    }

    #[test]
    fn test_builder_defaults() {
        let builder = GameServerBuilder::new();
        assert_eq!(builder.config.bind_addr, "127.0.0.1:8080");
        assert!(builder.config.disconnect_notice.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let notice = Frame::new(CommandType(7));
        let builder = GameServerBuilder::new()
            .bind("0.0.0.0:9000")
            .disconnect_notice(notice.clone());
        assert_eq!(builder.config.bind_addr, "0.0.0.0:9000");
        assert_eq!(builder.config.disconnect_notice, Some(notice));
    }

    #[tokio::test]
    async fn test_build_binds_ephemeral_port() {
        let server = GameServer::builder()
            .bind("127.0.0.1:0")
            .build(CommandRegistry::new())
            .await
            .unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_build_reports_bind_failure() {
        let result = GameServer::builder()
            .bind("not-an-address")
            .build(CommandRegistry::new())
            .await;
        assert!(matches!(result, Err(GameLinkError::Transport(_))));
    }
}
