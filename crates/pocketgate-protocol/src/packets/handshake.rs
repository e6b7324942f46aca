//! Encryption handshake packets.

use bytes::{Buf, BufMut};

use crate::ProtocolError;
use crate::codec::{read_byte_array, read_string, write_byte_array, write_string};
use crate::packets::{McpePacket, ids};

/// Sent by the server after login: the server's ephemeral public key
/// (base64 DER) and the random token mixed into the session key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerToClientHandshake {
    pub public_key: String,
    pub token: Vec<u8>,
}

impl McpePacket for ServerToClientHandshake {
    const ID: u8 = ids::SERVER_TO_CLIENT_HANDSHAKE;
    const NAME: &'static str = "ServerToClientHandshake";

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Self {
            public_key: read_string(buf)?,
            token: read_byte_array(buf)?,
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        write_string(buf, &self.public_key);
        write_byte_array(buf, &self.token);
        Ok(())
    }
}

/// Sent by the client once it has switched its own cipher on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientToServerHandshake;

impl McpePacket for ClientToServerHandshake {
    const ID: u8 = ids::CLIENT_TO_SERVER_HANDSHAKE;
    const NAME: &'static str = "ClientToServerHandshake";

    fn decode<B: Buf>(_buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Self)
    }

    fn encode<B: BufMut>(&self, _buf: &mut B) -> Result<(), ProtocolError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_handshake_layout_string_then_token() {
        let packet = ServerToClientHandshake {
            public_key: "MHYw".to_string(),
            token: vec![1, 2, 3],
        };
        let mut out = Vec::new();
        packet.encode(&mut out).unwrap();
        assert_eq!(out, vec![4, b'M', b'H', b'Y', b'w', 3, 1, 2, 3]);
        assert_eq!(
            ServerToClientHandshake::decode(&mut out.as_slice()).unwrap(),
            packet
        );
    }

    #[test]
    fn test_client_handshake_has_empty_body() {
        let mut out = Vec::new();
        ClientToServerHandshake.encode(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
