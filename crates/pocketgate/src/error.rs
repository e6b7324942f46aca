//! Unified error type for Pocketgate.

use pocketgate_protocol::ProtocolError;
use pocketgate_session::SessionError;
use pocketgate_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `pocketgate` crate, you deal with this single error type
/// instead of importing errors from each layer. The `#[from]` attributes
/// let `?` convert layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PocketgateError {
    /// A transport-level error (accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A wire-format error (varint, compression, unknown packet).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (login, encryption, protocol violation).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The server configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Reading a configuration file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
