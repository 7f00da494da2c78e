//! Server-side session tracking for gamelink.
//!
//! Every accepted socket becomes a [`Session`] with a process-unique
//! [`SessionId`]. The [`SessionRegistry`] holds the live set and routes
//! outbound frames to one, many, or all sessions. When a socket closes its
//! session is removed and everyone else gets a disconnect notice.
//!
//! ```text
//! Server accept loop (above)  ← registers sessions, reaps them on close
//!     ↕
//! Session layer (this crate)  ← ids, liveness, fan-out
//!     ↕
//! Protocol layer (below)      ← provides Frame
//! ```

mod error;
mod registry;
mod session;

pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::{Liveness, Session, SessionId};
