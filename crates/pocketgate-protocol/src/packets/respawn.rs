//! The Respawn packet.

use bytes::{Buf, BufMut};

use crate::ProtocolError;
use crate::codec::{Vector3f, decode_unsigned, encode_unsigned, read_u8};
use crate::packets::{McpePacket, ids};

/// Where the respawn handshake between client and server stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RespawnState {
    Searching,
    ServerReady,
    ClientReady,
}

impl RespawnState {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Searching => 0,
            Self::ServerReady => 1,
            Self::ClientReady => 2,
        }
    }
}

impl TryFrom<u8> for RespawnState {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Searching),
            1 => Ok(Self::ServerReady),
            2 => Ok(Self::ClientReady),
            other => Err(ProtocolError::InvalidEnumValue {
                kind: "respawn state",
                value: i64::from(other),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Respawn {
    pub position: Vector3f,
    pub state: RespawnState,
    pub entity_id: u64,
}

impl McpePacket for Respawn {
    const ID: u8 = ids::RESPAWN;
    const NAME: &'static str = "Respawn";

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        let position = Vector3f::read(buf)?;
        let state = RespawnState::try_from(read_u8(buf)?)?;
        let entity_id = decode_unsigned(buf)?;
        Ok(Self {
            position,
            state,
            entity_id,
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        self.position.write(buf);
        buf.put_u8(self.state.as_u8());
        encode_unsigned(buf, self.entity_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_respawn_all_states_survive_encode_decode() {
        for state in [
            RespawnState::Searching,
            RespawnState::ServerReady,
            RespawnState::ClientReady,
        ] {
            let packet = Respawn {
                position: Vector3f::new(12.5, 70.0, -3.25),
                state,
                entity_id: 4_000_000_001,
            };
            let mut out = Vec::new();
            packet.encode(&mut out).unwrap();
            assert_eq!(out[12], state.as_u8());
            assert_eq!(Respawn::decode(&mut out.as_slice()).unwrap(), packet);
        }
    }

    #[test]
    fn test_respawn_state_three_is_invalid() {
        let mut out = Vec::new();
        Vector3f::default().write(&mut out);
        out.push(3);
        encode_unsigned(&mut out, 1);
        assert!(matches!(
            Respawn::decode(&mut out.as_slice()),
            Err(ProtocolError::InvalidEnumValue {
                kind: "respawn state",
                value: 3
            })
        ));
    }

    #[test]
    fn test_respawn_missing_entity_id_fails() {
        let mut out = Vec::new();
        Vector3f::default().write(&mut out);
        out.push(0);
        assert!(matches!(
            Respawn::decode(&mut out.as_slice()),
            Err(ProtocolError::MalformedVarint)
        ));
    }
}
