//! Turning packets into datagrams and back.
//!
//! Every game datagram starts with `0xFE`. What follows is a batch frame,
//! encrypted once the session has a cipher:
//!
//! ```text
//! 0xFE │ batch(0x06, varint len, zlib[ [varint len][packet] ... ])
//!      │ └── AES-CFB8(batch ‖ checksum) after the handshake
//! ```
//!
//! The codec is owned by its session, so it needs no locking. Clients and
//! tests can use the same type to speak to a server.

use pocketgate_protocol::batch::{self, BatchLimits};
use pocketgate_protocol::compression::DEFAULT_LEVEL;
use pocketgate_protocol::{Packet, ProtocolError};

use crate::SessionError;
use crate::encryption::PacketCipher;

/// First byte of every game datagram.
pub const GAME_PACKET_HEADER: u8 = 0xfe;

#[derive(Debug)]
pub struct FrameCodec {
    cipher: Option<PacketCipher>,
    limits: BatchLimits,
    compression_level: u32,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(BatchLimits::default(), DEFAULT_LEVEL)
    }
}

impl FrameCodec {
    pub fn new(limits: BatchLimits, compression_level: u32) -> Self {
        Self {
            cipher: None,
            limits,
            compression_level,
        }
    }

    /// Switches both directions to encrypted frames, starting with the
    /// next call to [`encode`](Self::encode) or [`decode`](Self::decode).
    pub fn enable_encryption(&mut self, cipher: PacketCipher) {
        self.cipher = Some(cipher);
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    /// Encodes packets into one datagram, encrypting if a cipher is set.
    pub fn encode(&mut self, packets: &[Packet]) -> Result<Vec<u8>, SessionError> {
        let frame = batch::encode_batch(packets, self.compression_level)?;
        let body = match self.cipher.as_mut() {
            Some(cipher) => cipher.encrypt(&frame),
            None => frame,
        };
        Ok(with_header(body))
    }

    /// Encodes packets into one datagram that is never encrypted.
    ///
    /// Only the server's handshake packet uses this: the client cannot
    /// decrypt anything until it has read it.
    pub fn encode_plain(&self, packets: &[Packet]) -> Result<Vec<u8>, SessionError> {
        let frame = batch::encode_batch(packets, self.compression_level)?;
        Ok(with_header(frame))
    }

    /// Decodes one datagram into packets.
    ///
    /// A packet inside a batch that fails to decode is logged and skipped;
    /// its neighbours are still returned. A broken frame (bad header, bad
    /// checksum, corrupt batch) fails as a whole.
    pub fn decode(&mut self, datagram: &[u8]) -> Result<Vec<Packet>, SessionError> {
        let (&header, body) = datagram.split_first().ok_or(ProtocolError::TruncatedInput {
            needed: 1,
            remaining: 0,
        })?;
        if header != GAME_PACKET_HEADER {
            return Err(ProtocolError::UnknownPacket(header).into());
        }

        let body = match self.cipher.as_mut() {
            Some(cipher) => cipher.decrypt(body)?,
            None => body.to_vec(),
        };

        if !batch::is_batch(&body) {
            return Ok(vec![Packet::decode_limited(&body, self.limits)?]);
        }

        let mut packets = Vec::new();
        for raw in batch::decode_batch(&body, self.limits)? {
            match Packet::decode_limited(&raw, self.limits) {
                Ok(packet) => packets.push(packet),
                Err(e) => {
                    tracing::debug!(
                        id = raw.first().copied().unwrap_or_default(),
                        error = %e,
                        "skipping undecodable packet in batch"
                    );
                }
            }
        }
        Ok(packets)
    }
}

fn with_header(body: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 1);
    out.push(GAME_PACKET_HEADER);
    out.extend_from_slice(&body);
    out
}
