use gamelink::prelude::*;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

const HEARTBEAT: CommandType = CommandType(0);
const CHAT: CommandType = CommandType(1);

/// Relays a chat line to every other session, prefixed with the sender.
///
/// Inbound payload: `str text`. Outbound: `u32 sender, str text`.
fn relay_chat(ctx: &SessionContext, frame: &DecodedFrame) -> Result<(), ProtocolError> {
    let text = frame.reader().read_str()?;
    let mut out = Frame::new(CHAT);
    out.writer().write_u32(ctx.session_id().0).write_str(text)?;
    let delivered = ctx.broadcast_except_self(&out);
    tracing::debug!(session_id = %ctx.session_id(), delivered, "chat relayed");
    Ok(())
}

fn heartbeat(ctx: &SessionContext, _frame: &DecodedFrame) -> Result<(), ProtocolError> {
    ctx.reply(&Frame::new(HEARTBEAT));
    Ok(())
}

fn commands() -> CommandRegistry<SessionContext> {
    let mut commands = CommandRegistry::new();
    commands
        .add_handler(HEARTBEAT, heartbeat)
        .add_handler(CHAT, relay_chat);
    commands
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "0.0.0.0:8080".to_string());
    tracing::info!(%addr, "starting chat relay");

    let server = GameServer::builder().bind(&addr).build(commands()).await?;
    server.run().await?;
    Ok(())
}
