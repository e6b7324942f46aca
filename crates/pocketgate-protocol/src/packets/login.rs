//! The Login packet: the first thing a client sends.
//!
//! ```text
//! i32 BE  protocol_version
//! u8      game_edition            ┐
//! varint  body_len                │ only present when the version
//! zlib    body[body_len]          │ is the one this server speaks
//!           le_string chain_data  │
//!           le_string skin_data   ┘
//! ```
//!
//! A client on a different protocol may lay the body out differently, so
//! decoding stops right after the version and returns a `Login` with empty
//! payload fields. Callers check [`Login::is_supported_version`] before
//! looking at anything else.

use bytes::{Buf, BufMut};

use crate::ProtocolError;
use crate::codec::{
    decode_unsigned, encode_unsigned, ensure_remaining, read_i32, read_le_string, read_u8,
    write_le_string,
};
use crate::compression::{DEFAULT_MAX_DECOMPRESSED, deflate, inflate_limited};
use crate::packets::{McpePacket, ids};
use crate::version::PROTOCOL_VERSION;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Login {
    pub protocol_version: i32,
    pub game_edition: u8,
    /// JSON object `{"chain": [jwt, ...]}`.
    pub chain_data: String,
    /// A single JWT carrying skin and device data.
    pub skin_data: String,
}

impl Login {
    pub fn is_supported_version(&self) -> bool {
        self.protocol_version == PROTOCOL_VERSION
    }

    /// Decodes a Login whose inflated body may hold at most `max_body`
    /// bytes.
    ///
    /// # Errors
    /// [`ProtocolError::PayloadTooLarge`] if the body inflates past
    /// `max_body`, or any truncation or compression error.
    pub fn decode_with_limit<B: Buf>(buf: &mut B, max_body: usize) -> Result<Self, ProtocolError> {
        let protocol_version = read_i32(buf)?;
        if protocol_version != PROTOCOL_VERSION {
            return Ok(Self {
                protocol_version,
                ..Self::default()
            });
        }

        let game_edition = read_u8(buf)?;
        let body_len = decode_unsigned(buf)? as usize;
        ensure_remaining(buf, body_len)?;
        let compressed = buf.copy_to_bytes(body_len);

        let body = inflate_limited(&compressed, max_body)?;
        let mut body = body.as_slice();
        let chain_data = read_le_string(&mut body)?;
        let skin_data = read_le_string(&mut body)?;

        Ok(Self {
            protocol_version,
            game_edition,
            chain_data,
            skin_data,
        })
    }
}

impl McpePacket for Login {
    const ID: u8 = ids::LOGIN;
    const NAME: &'static str = "Login";

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Self::decode_with_limit(buf, DEFAULT_MAX_DECOMPRESSED)
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        buf.put_i32(self.protocol_version);
        buf.put_u8(self.game_edition);

        let mut body = Vec::with_capacity(self.chain_data.len() + self.skin_data.len() + 8);
        write_le_string(&mut body, &self.chain_data)?;
        write_le_string(&mut body, &self.skin_data)?;
        let compressed = deflate(&body)?;

        encode_unsigned(buf, compressed.len() as u64);
        buf.put_slice(&compressed);
        Ok(())
    }
}
