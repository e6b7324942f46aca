//! In-memory transport built on Tokio channels.
//!
//! A [`MemoryTransport`] and its [`MemoryConnector`] are created as a pair.
//! Each call to [`MemoryConnector::connect`] produces a [`MemoryPeer`] for
//! the client side, and the matching [`MemoryConnection`] pops out of
//! [`Transport::accept`] on the server side. Datagrams keep their
//! boundaries and arrive in order, which is what RakNet's reliable-ordered
//! channel gives the real server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc, watch};

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Server side of the in-memory transport.
pub struct MemoryTransport {
    incoming: mpsc::UnboundedReceiver<MemoryConnection>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

/// Cloneable handle that opens client connections to a [`MemoryTransport`].
#[derive(Clone)]
pub struct MemoryConnector {
    sender: mpsc::UnboundedSender<MemoryConnection>,
    next_id: Arc<AtomicU64>,
}

impl MemoryTransport {
    /// Creates a transport and the connector that feeds it.
    pub fn pair() -> (Self, MemoryConnector) {
        let (sender, incoming) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let transport = Self {
            incoming,
            shutdown_tx,
            shutdown_rx,
        };
        let connector = MemoryConnector {
            sender,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        (transport, connector)
    }
}

impl MemoryConnector {
    /// Opens a new connection that appears to come from `remote_addr`.
    ///
    /// # Errors
    /// Returns [`TransportError::Shutdown`] if the transport was dropped.
    pub fn connect(
        &self,
        remote_addr: SocketAddr,
    ) -> Result<MemoryPeer, TransportError> {
        let id = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (to_server, server_inbound) = mpsc::unbounded_channel();
        let (to_client, client_inbound) = mpsc::unbounded_channel();

        let server_side = MemoryConnection {
            id,
            remote_addr,
            inbound: Mutex::new(server_inbound),
            outbound: Mutex::new(Some(to_client)),
        };

        self.sender
            .send(server_side)
            .map_err(|_| TransportError::Shutdown)?;

        tracing::debug!(%id, %remote_addr, "opened in-memory connection");

        Ok(MemoryPeer {
            id,
            outbound: Some(to_server),
            inbound: client_inbound,
        })
    }
}

impl Transport for MemoryTransport {
    type Connection = MemoryConnection;

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        if *self.shutdown_rx.borrow() {
            return Err(TransportError::Shutdown);
        }

        tokio::select! {
            conn = self.incoming.recv() => conn.ok_or(TransportError::Shutdown),
            _ = self.shutdown_rx.changed() => Err(TransportError::Shutdown),
        }
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        // `send_replace` never fails, even with no receivers left.
        self.shutdown_tx.send_replace(true);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Server-side connection
// ---------------------------------------------------------------------------

/// Server side of one in-memory connection.
pub struct MemoryConnection {
    id: ConnectionId,
    remote_addr: SocketAddr,
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
}

impl Connection for MemoryConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let outbound = self.outbound.lock().await;
        let sender = outbound
            .as_ref()
            .ok_or_else(|| TransportError::ConnectionClosed("closed locally".into()))?;
        sender
            .send(data.to_vec())
            .map_err(|_| TransportError::ConnectionClosed("peer dropped".into()))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.inbound.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), TransportError> {
        // Dropping the sender is what the peer observes as end-of-stream.
        self.outbound.lock().await.take();
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }
}

// ---------------------------------------------------------------------------
// Client-side peer
// ---------------------------------------------------------------------------

/// Client side of one in-memory connection.
pub struct MemoryPeer {
    id: ConnectionId,
    outbound: Option<mpsc::UnboundedSender<Vec<u8>>>,
    inbound: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MemoryPeer {
    /// The id the server sees for this connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Sends one datagram to the server.
    ///
    /// # Errors
    /// Returns [`TransportError::ConnectionClosed`] after [`close`](Self::close)
    /// or once the server side is gone.
    pub fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let sender = self
            .outbound
            .as_ref()
            .ok_or_else(|| TransportError::ConnectionClosed("closed locally".into()))?;
        sender
            .send(data.to_vec())
            .map_err(|_| TransportError::ConnectionClosed("server dropped".into()))
    }

    /// Receives the next datagram, or `None` once the server closed.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.inbound.recv().await
    }

    /// Closes the client side; the server's `recv` then returns `Ok(None)`.
    pub fn close(&mut self) {
        self.outbound.take();
    }
}
