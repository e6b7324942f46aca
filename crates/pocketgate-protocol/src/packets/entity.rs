//! The AddEntity packet.
//!
//! Spawning non-player entities is owned by the world simulation, which
//! this layer does not implement. The packet keeps its id and the full
//! codec signature so the registry can name it, but both directions
//! refuse with [`ProtocolError::Unimplemented`] instead of producing
//! bytes a client would misread.

use bytes::{Buf, BufMut};

use crate::ProtocolError;
use crate::codec::Vector3f;
use crate::packets::{McpePacket, ids};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddEntity {
    pub entity_id: u64,
    pub entity_type: u32,
    pub position: Vector3f,
    pub velocity: Vector3f,
    pub yaw: f32,
    pub pitch: f32,
}

impl McpePacket for AddEntity {
    const ID: u8 = ids::ADD_ENTITY;
    const NAME: &'static str = "AddEntity";

    fn decode<B: Buf>(_buf: &mut B) -> Result<Self, ProtocolError> {
        Err(ProtocolError::Unimplemented(Self::NAME))
    }

    fn encode<B: BufMut>(&self, _buf: &mut B) -> Result<(), ProtocolError> {
        Err(ProtocolError::Unimplemented(Self::NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_entity_refuses_both_directions() {
        let mut out = Vec::new();
        assert!(matches!(
            AddEntity::default().encode(&mut out),
            Err(ProtocolError::Unimplemented("AddEntity"))
        ));
        assert!(out.is_empty());

        let mut slice: &[u8] = &[1, 2, 3];
        assert!(matches!(
            AddEntity::decode(&mut slice),
            Err(ProtocolError::Unimplemented(_))
        ));
    }
}
