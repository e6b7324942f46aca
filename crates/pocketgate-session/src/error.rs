//! Error types for the session layer.

use pocketgate_protocol::ProtocolError;
use pocketgate_transport::ConnectionId;

/// Errors that can occur while authenticating or driving a session.
///
/// Authentication failures are never shown to the client verbatim: the
/// session logs them and sends a sanitised disconnect reason instead.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A token was not three base64 segments of JSON.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The login chain was not a `{"chain": [...]}` object of strings.
    #[error("malformed certificate chain: {0}")]
    MalformedChain(String),

    /// A public key could not be decoded as SPKI DER.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// A link in the chain was not signed by its predecessor's key.
    #[error("certificate chain link {index} failed verification")]
    ChainVerificationFailed { index: usize },

    /// A link had no string `identityPublicKey` claim.
    #[error("certificate chain link {index} has no identityPublicKey")]
    MissingIdentityKey { index: usize },

    /// No link in the chain was signed by the trusted root key.
    #[error("certificate chain is not signed by the trusted root")]
    UntrustedChain,

    /// The client data token was not signed by the leaf identity key.
    #[error("client data failed verification: {0}")]
    ClientDataVerificationFailed(String),

    /// The client speaks a protocol version this server does not.
    #[error("unsupported protocol version {0}")]
    UnsupportedProtocolVersion(i32),

    /// A packet arrived in a state that does not accept it.
    #[error("protocol violation: {packet} received in state {state}")]
    ProtocolViolation {
        packet: &'static str,
        state: &'static str,
    },

    /// A decrypted frame's checksum did not match.
    #[error("frame checksum mismatch")]
    ChecksumMismatch,

    /// The key exchange could not produce a session key.
    #[error("encryption handshake failed: {0}")]
    Handshake(String),

    /// Every login worker is busy.
    #[error("too many concurrent logins")]
    LoginBusy,

    /// A session for this connection is already registered.
    #[error("connection {0} already has a session")]
    AlreadyConnected(ConnectionId),

    /// No session is registered for this connection.
    #[error("no session for connection {0}")]
    NotFound(ConnectionId),

    /// An inventory index was outside its range.
    #[error("{what} index {index} out of range")]
    InventoryIndex { what: &'static str, index: i32 },

    /// Something went wrong on the server side.
    #[error("internal error: {0}")]
    Internal(String),

    /// A frame or packet failed to decode or encode.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl SessionError {
    /// Returns `true` if the session must end immediately, without the
    /// courtesy of a disconnect packet.
    ///
    /// Both cases mean the peer is not following the protocol: either it
    /// sent a packet out of order, or its encrypted stream no longer
    /// lines up with ours.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ProtocolViolation { .. } | Self::ChecksumMismatch
        )
    }

    /// Returns `true` for failures caused by the client's credentials
    /// rather than by the server.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::MalformedToken(_)
                | Self::MalformedChain(_)
                | Self::InvalidPublicKey(_)
                | Self::ChainVerificationFailed { .. }
                | Self::MissingIdentityKey { .. }
                | Self::UntrustedChain
                | Self::ClientDataVerificationFailed(_)
        )
    }
}
