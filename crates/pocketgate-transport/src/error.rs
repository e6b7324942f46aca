/// Failures at the datagram boundary.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer, or our own side, already hung up.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Socket-level failure reported by the reliable-UDP stack underneath.
    #[error("datagram i/o: {0}")]
    Io(#[from] std::io::Error),

    /// No more connections will be accepted.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// Returns `true` if the error means the peer is gone for good.
    ///
    /// Handlers use this to stop their receive loop instead of retrying.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::ConnectionClosed(_) | Self::Shutdown)
    }
}
