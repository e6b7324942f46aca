//! Transport abstraction layer for Pocketgate.
//!
//! Pocket Edition clients talk to the server over a reliable-UDP protocol
//! (RakNet). Pocketgate does not implement RakNet itself: it consumes an
//! already-ordered, already-reassembled stream of *datagrams* per client.
//! The [`Transport`] and [`Connection`] traits describe exactly that
//! boundary, so any RakNet implementation can be plugged in underneath.
//!
//! ```text
//! RakNet (external) → Transport (datagrams) → Session (packets)
//! ```
//!
//! # Feature Flags
//!
//! - `memory` (default): an in-process transport built on Tokio channels,
//!   used by tests and by embedders that bridge their own RakNet stack.

mod error;
#[cfg(feature = "memory")]
mod memory;

pub use error::TransportError;
#[cfg(feature = "memory")]
pub use memory::{MemoryConnection, MemoryConnector, MemoryPeer, MemoryTransport};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;

/// Identifies one client for as long as its RakNet session lives.
///
/// The session manager keys everything on this, so a transport must never
/// hand out the same id twice while the first holder is connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
///
/// The returned futures are `Send` so the server can drive each
/// connection on its own Tokio task.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;

    /// Resolves with the next client that finished the RakNet handshake.
    ///
    /// Returns [`TransportError::Shutdown`] once the transport stops
    /// producing connections.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;

    /// Stops accepting new connections.
    fn shutdown(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// A single client connection that carries whole datagrams.
pub trait Connection: Send + Sync + 'static {
    /// Sends one datagram to the remote peer.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next datagram from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Closes the connection without any further exchange.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn id(&self) -> ConnectionId;

    /// Where the client's datagrams come from. Login events report it.
    fn remote_addr(&self) -> SocketAddr;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_ordering_follows_raw_value() {
        let mut ids = vec![ConnectionId::new(3), ConnectionId::new(1)];
        ids.sort();
        assert_eq!(ids, vec![ConnectionId::new(1), ConnectionId::new(3)]);
    }
}
