//! Error types for the protocol layer.
//!
//! Everything that can go wrong while turning bytes into packets (or back)
//! ends up here. None of these errors carry session context: the session
//! layer decides whether a bad datagram is dropped or ends the connection.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A varint ran past 10 bytes, or the input ended before its last byte.
    #[error("malformed varint")]
    MalformedVarint,

    /// A field needed more bytes than the buffer had left.
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput { needed: usize, remaining: usize },

    /// An enum-typed field carried a value outside its range.
    #[error("invalid {kind} value {value}")]
    InvalidEnumValue { kind: &'static str, value: i64 },

    /// zlib inflate or deflate failed.
    #[error("compression error: {0}")]
    Compression(#[from] std::io::Error),

    /// Decompressed output went over the configured limit.
    #[error("payload too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// A string field was not valid UTF-8.
    #[error("invalid string: {0}")]
    InvalidString(#[from] std::string::FromUtf8Error),

    /// No codec is registered for this packet id.
    #[error("unknown packet id 0x{0:02x}")]
    UnknownPacket(u8),

    /// The packet has a registered id but no real codec yet.
    #[error("{0} has no codec")]
    Unimplemented(&'static str),

    /// A batch held more packets than allowed.
    #[error("batch holds more than {limit} packets")]
    TooManyPackets { limit: usize },

    /// A value does not fit the field it is written into.
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: i64 },
}

impl ProtocolError {
    /// Shorthand for a [`TruncatedInput`](Self::TruncatedInput) error.
    pub(crate) fn truncated(needed: usize, remaining: usize) -> Self {
        Self::TruncatedInput { needed, remaining }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_truncated_mentions_counts() {
        let err = ProtocolError::truncated(4, 1);
        assert_eq!(
            err.to_string(),
            "truncated input: needed 4 bytes, 1 remaining"
        );
    }

    #[test]
    fn test_display_unknown_packet_is_hex() {
        assert_eq!(
            ProtocolError::UnknownPacket(0x9c).to_string(),
            "unknown packet id 0x9c"
        );
    }
}
