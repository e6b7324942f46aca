//! # Pocketgate
//!
//! Session layer for Minecraft: Pocket Edition servers.
//!
//! Pocketgate takes a client from its first datagram to standing in the
//! world: it verifies the login certificate chain, agrees on an encryption
//! key, and walks the session through its states. Game code plugs in
//! through a few traits ([`LoginListener`], [`LevelProvider`],
//! [`PlayHandler`]) and the framework handles the rest.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pocketgate::prelude::*;
//!
//! # async fn start() -> Result<(), PocketgateError> {
//! pocketgate::logging::init("info");
//! let (transport, _connector) = MemoryTransport::pair();
//! let server = PocketgateServer::<MemoryTransport>::builder()
//!     .config(ServerConfig::default())
//!     .build(transport)?;
//! server.run().await
//! # }
//! ```

pub mod config;
mod error;
mod handler;
pub mod logging;
mod server;

pub use config::ServerConfig;
pub use error::PocketgateError;
pub use handler::TIMED_OUT_MESSAGE;
pub use server::{PocketgateServer, PocketgateServerBuilder};

pub use pocketgate_protocol as protocol;
pub use pocketgate_session as session;
pub use pocketgate_transport as transport;

/// Everything needed to run a server and write game hooks.
pub mod prelude {
    pub use crate::{PocketgateError, PocketgateServer, PocketgateServerBuilder, ServerConfig};
    pub use pocketgate_protocol::{Packet, ProtocolError};
    pub use pocketgate_session::{
        AuthProfile, ClientData, LevelId, LevelProvider, LoginEvent, LoginListener, PlayContext,
        PlayHandler, SessionError, SessionManager, SessionPhase, SessionSnapshot, TrustRoot,
    };
    pub use pocketgate_transport::{
        Connection, ConnectionId, MemoryConnector, MemoryTransport, Transport, TransportError,
    };
}
