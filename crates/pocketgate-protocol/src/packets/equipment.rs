//! The MobEquipment packet: which item an entity holds.

use bytes::{Buf, BufMut};

use crate::ProtocolError;
use crate::codec::{ItemStack, decode_unsigned, encode_unsigned, read_u8};
use crate::packets::{McpePacket, ids};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MobEquipment {
    /// Runtime entity id. The local player refers to itself as `0`.
    pub entity_id: u64,
    pub hotbar_slot: u8,
    pub inventory_slot: u8,
    pub stack: Option<ItemStack>,
}

impl McpePacket for MobEquipment {
    const ID: u8 = ids::MOB_EQUIPMENT;
    const NAME: &'static str = "MobEquipment";

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Self {
            entity_id: decode_unsigned(buf)?,
            hotbar_slot: read_u8(buf)?,
            inventory_slot: read_u8(buf)?,
            stack: ItemStack::read_optional(buf)?,
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        encode_unsigned(buf, self.entity_id);
        buf.put_u8(self.hotbar_slot);
        buf.put_u8(self.inventory_slot);
        ItemStack::write_optional(self.stack.as_ref(), buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mob_equipment_field_order() {
        let packet = MobEquipment {
            entity_id: 1,
            hotbar_slot: 2,
            inventory_slot: 11,
            stack: None,
        };
        let mut out = Vec::new();
        packet.encode(&mut out).unwrap();
        assert_eq!(out, vec![1, 2, 11, 0]);
    }

    #[test]
    fn test_mob_equipment_with_stack_decodes() {
        let packet = MobEquipment {
            entity_id: 300,
            hotbar_slot: 0,
            inventory_slot: 9,
            stack: Some(ItemStack::new(1, 64)),
        };
        let mut out = Vec::new();
        packet.encode(&mut out).unwrap();
        assert_eq!(MobEquipment::decode(&mut out.as_slice()).unwrap(), packet);
    }
}
