//! Batch frames: many packets, one zlib stream.
//!
//! ```text
//! u8      0x06
//! varint  compressed_len
//! zlib    [varint len][packet bytes] repeated
//! ```
//!
//! The server sends everything except the encryption handshake inside
//! batches. Decoding returns the raw packet bytes rather than typed
//! packets, so a single unknown packet inside a batch can be skipped by
//! the caller without losing its neighbours.

use bytes::BufMut;

use crate::ProtocolError;
use crate::codec::{decode_unsigned, encode_unsigned, ensure_remaining, read_byte_array, read_u8};
use crate::compression::{DEFAULT_MAX_DECOMPRESSED, deflate_with_level, inflate_limited};
use crate::packets::ids;
use crate::registry::Packet;

/// Resource limits applied while decoding a batch.
#[derive(Debug, Clone, Copy)]
pub struct BatchLimits {
    /// Largest decompressed payload accepted.
    pub max_decompressed: usize,
    /// Most packets accepted in one batch.
    pub max_packets: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_decompressed: DEFAULT_MAX_DECOMPRESSED,
            max_packets: 512,
        }
    }
}

/// Encodes packets into a single batch frame, including the `0x06` id.
pub fn encode_batch(packets: &[Packet], level: u32) -> Result<Vec<u8>, ProtocolError> {
    let mut payload = Vec::new();
    let mut scratch = Vec::new();
    for packet in packets {
        scratch.clear();
        packet.encode_into(&mut scratch)?;
        encode_unsigned(&mut payload, scratch.len() as u64);
        payload.put_slice(&scratch);
    }

    let compressed = deflate_with_level(&payload, level)?;
    let mut out = Vec::with_capacity(compressed.len() + 6);
    out.put_u8(ids::BATCH);
    encode_unsigned(&mut out, compressed.len() as u64);
    out.put_slice(&compressed);
    Ok(out)
}

/// Returns `true` if `data` starts with the batch id.
pub fn is_batch(data: &[u8]) -> bool {
    data.first() == Some(&ids::BATCH)
}

/// Decodes a batch frame (starting at the `0x06` id) into raw packets.
///
/// # Errors
/// - [`ProtocolError::UnknownPacket`] if the frame is not a batch.
/// - [`ProtocolError::TooManyPackets`] past `limits.max_packets`.
/// - Any truncation or compression error from the payload.
pub fn decode_batch(data: &[u8], limits: BatchLimits) -> Result<Vec<Vec<u8>>, ProtocolError> {
    let mut buf = data;
    let id = read_u8(&mut buf)?;
    if id != ids::BATCH {
        return Err(ProtocolError::UnknownPacket(id));
    }

    let compressed_len = decode_unsigned(&mut buf)? as usize;
    ensure_remaining(&buf, compressed_len)?;
    let payload = inflate_limited(&buf[..compressed_len], limits.max_decompressed)?;

    let mut packets = Vec::new();
    let mut rest = payload.as_slice();
    while !rest.is_empty() {
        if packets.len() == limits.max_packets {
            return Err(ProtocolError::TooManyPackets {
                limit: limits.max_packets,
            });
        }
        packets.push(read_byte_array(&mut rest)?);
    }
    Ok(packets)
}
