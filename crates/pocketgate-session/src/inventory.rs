//! The player's inventory, as far as held items are concerned.
//!
//! MCPE separates the hotbar from the inventory: each of the 9 hotbar
//! buttons is a *link* to one of the 36 inventory slots (or to nothing,
//! `-1`). The held slot picks one hotbar button. So the item in hand is
//! `slots[hotbar_links[held_slot]]`, and either index may be unset.
//!
//! ```text
//! held_slot ──→ hotbar_links[0..9] ──→ slots[0..36]
//!    -1 = none        -1 = unlinked       None = empty
//! ```

use pocketgate_protocol::ItemStack;
use pocketgate_protocol::packets::MobEquipment;

use crate::SessionError;

pub const INVENTORY_SIZE: usize = 36;
pub const HOTBAR_SIZE: usize = 9;

/// Marks an unset hotbar link or held slot.
pub const UNLINKED: i32 = -1;

/// Added to the linked slot when telling the player about their own
/// equipment. Clients of this protocol version expect it.
pub const SELF_SLOT_OFFSET: i32 = 9;

/// The equipment packets produced by a held slot change.
#[derive(Debug, Clone, PartialEq)]
pub struct HeldSlotUpdate {
    /// For the player themselves, if they asked to be notified.
    pub for_self: Option<MobEquipment>,
    /// For everyone who can see the player.
    pub for_viewers: MobEquipment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerInventory {
    slots: Vec<Option<ItemStack>>,
    hotbar_links: [i32; HOTBAR_SIZE],
    held_slot: i32,
}

impl Default for PlayerInventory {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerInventory {
    pub fn new() -> Self {
        Self {
            slots: vec![None; INVENTORY_SIZE],
            hotbar_links: [UNLINKED; HOTBAR_SIZE],
            held_slot: UNLINKED,
        }
    }

    pub fn held_slot(&self) -> i32 {
        self.held_slot
    }

    pub fn hotbar_link(&self, hotbar: usize) -> Option<i32> {
        self.hotbar_links.get(hotbar).copied()
    }

    pub fn item(&self, slot: usize) -> Option<&ItemStack> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Points hotbar button `hotbar` at inventory slot `slot`, or unlinks
    /// it when `slot` is [`UNLINKED`].
    pub fn set_link(&mut self, hotbar: usize, slot: i32) -> Result<(), SessionError> {
        if slot != UNLINKED && !(0..INVENTORY_SIZE as i32).contains(&slot) {
            return Err(SessionError::InventoryIndex {
                what: "inventory slot",
                index: slot,
            });
        }
        let link = self
            .hotbar_links
            .get_mut(hotbar)
            .ok_or(SessionError::InventoryIndex {
                what: "hotbar",
                index: hotbar as i32,
            })?;
        *link = slot;
        Ok(())
    }

    pub fn set_item(&mut self, slot: usize, stack: Option<ItemStack>) -> Result<(), SessionError> {
        let target = self.slots.get_mut(slot).ok_or(SessionError::InventoryIndex {
            what: "inventory slot",
            index: slot as i32,
        })?;
        *target = stack;
        Ok(())
    }

    /// The item in the player's hand. `None` when nothing is held, the
    /// held button is unlinked, or the linked slot is empty.
    pub fn stack_in_hand(&self) -> Option<&ItemStack> {
        let link = self.link_of_held()?;
        self.item(link as usize)
    }

    fn link_of_held(&self) -> Option<i32> {
        let held = usize::try_from(self.held_slot).ok()?;
        let link = *self.hotbar_links.get(held)?;
        (link != UNLINKED).then_some(link)
    }

    /// Selects hotbar button `slot` and builds the equipment packets that
    /// announce it.
    ///
    /// The packet for the player carries entity id `0` and the linked slot
    /// plus [`SELF_SLOT_OFFSET`]. The packet for viewers carries the real
    /// entity id and the linked slot as is, so an unlinked button goes out
    /// as `255`.
    pub fn set_held_slot(
        &mut self,
        slot: u8,
        notify_self: bool,
        entity_id: u64,
    ) -> Result<HeldSlotUpdate, SessionError> {
        let link = *self
            .hotbar_links
            .get(usize::from(slot))
            .ok_or(SessionError::InventoryIndex {
                what: "hotbar",
                index: i32::from(slot),
            })?;
        self.held_slot = i32::from(slot);
        let stack = self.stack_in_hand().cloned();

        let for_self = notify_self.then(|| MobEquipment {
            entity_id: 0,
            hotbar_slot: slot,
            inventory_slot: (link + SELF_SLOT_OFFSET) as u8,
            stack: stack.clone(),
        });
        let for_viewers = MobEquipment {
            entity_id,
            hotbar_slot: slot,
            inventory_slot: link as u8,
            stack,
        };
        Ok(HeldSlotUpdate {
            for_self,
            for_viewers,
        })
    }
}
