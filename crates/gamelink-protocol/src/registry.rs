//! Command registry: maps command types to handlers.
//!
//! The registry is filled once at startup and then only read. It is generic
//! over a dispatch context `C` so the same machinery serves the client
//! (context = its connection) and the server (context = the sending
//! session).
//!
//! Registering a second handler for a command type replaces the first.
//! Applications are known to register the same command twice in a row, and
//! last-wins is the behavior they rely on.

use std::collections::HashMap;

use crate::{CommandType, DecodedFrame, ProtocolError};

/// Processes frames of one command type.
///
/// Any `Fn(&C, &DecodedFrame) -> Result<(), ProtocolError>` closure is a
/// handler too, so small commands don't need their own type.
pub trait CommandHandler<C>: Send + Sync + 'static {
    /// Handles one decoded frame.
    fn execute(&self, ctx: &C, frame: &DecodedFrame) -> Result<(), ProtocolError>;
}

impl<C, F> CommandHandler<C> for F
where
    F: Fn(&C, &DecodedFrame) -> Result<(), ProtocolError> + Send + Sync + 'static,
{
    fn execute(&self, ctx: &C, frame: &DecodedFrame) -> Result<(), ProtocolError> {
        self(ctx, frame)
    }
}

/// Maps [`CommandType`]s to their handlers.
pub struct CommandRegistry<C> {
    handlers: HashMap<CommandType, Box<dyn CommandHandler<C>>>,
}

impl<C: 'static> CommandRegistry<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` for `command`, silently replacing any previous one.
    pub fn add_handler<H>(&mut self, command: CommandType, handler: H) -> &mut Self
    where
        H: CommandHandler<C>,
    {
        if self.handlers.insert(command, Box::new(handler)).is_some() {
            tracing::debug!(%command, "replaced existing command handler");
        }
        self
    }

    /// Looks up the handler for `command`.
    pub fn get_handler(&self, command: CommandType) -> Option<&dyn CommandHandler<C>> {
        self.handlers.get(&command).map(|h| h.as_ref())
    }

    /// Resolves the frame's handler and runs it.
    ///
    /// # Errors
    /// [`ProtocolError::HandlerNotFound`] when nothing is registered for the
    /// frame's command type, otherwise whatever the handler returns.
    pub fn dispatch(&self, ctx: &C, frame: &DecodedFrame) -> Result<(), ProtocolError> {
        let command = frame.command_type();
        let handler = self
            .get_handler(command)
            .ok_or(ProtocolError::HandlerNotFound(command))?;
        handler.execute(ctx, frame)
    }

    pub fn contains(&self, command: CommandType) -> bool {
        self.handlers.contains_key(&command)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<C: 'static> Default for CommandRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
