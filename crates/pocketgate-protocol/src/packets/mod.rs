//! Typed packet codecs.
//!
//! Every packet implements [`McpePacket`]: a fixed id, a name for logs, and
//! a pair of functions that move between bytes and the typed struct. The
//! id byte itself is *not* part of `decode`/`encode`; the
//! [`registry`](crate::registry) reads it to pick the codec.
//!
//! Encoding mirrors decoding field for field. Packets that carry a
//! compressed body recompute its length from the freshly compressed bytes
//! every time they are encoded.

mod entity;
mod equipment;
mod gameplay;
mod handshake;
mod login;
mod resource_packs;
mod respawn;
mod status;

use bytes::{Buf, BufMut};

use crate::ProtocolError;

pub use entity::AddEntity;
pub use equipment::MobEquipment;
pub use gameplay::{
    Animate, CommandRequest, ContainerClose, DropItem, InventorySlot, MovePlayer, MoveMode,
    PlayerAction, PlayerActionKind, RemoveBlock, RequestChunkRadius, Text, TextKind, UseItem,
};
pub use handshake::{ClientToServerHandshake, ServerToClientHandshake};
pub use login::Login;
pub use resource_packs::{PackEntry, ResourcePackClientResponse, ResourcePacksInfo};
pub use respawn::{Respawn, RespawnState};
pub use status::{Disconnect, PlayStatus, PlayStatusKind};

/// Packet ids for protocol 91.
pub mod ids {
    pub const LOGIN: u8 = 0x01;
    pub const PLAY_STATUS: u8 = 0x02;
    pub const SERVER_TO_CLIENT_HANDSHAKE: u8 = 0x03;
    pub const CLIENT_TO_SERVER_HANDSHAKE: u8 = 0x04;
    pub const DISCONNECT: u8 = 0x05;
    pub const BATCH: u8 = 0x06;
    pub const RESOURCE_PACKS_INFO: u8 = 0x07;
    pub const RESOURCE_PACK_CLIENT_RESPONSE: u8 = 0x09;
    pub const TEXT: u8 = 0x0a;
    pub const ADD_ENTITY: u8 = 0x0e;
    pub const MOVE_PLAYER: u8 = 0x14;
    pub const REMOVE_BLOCK: u8 = 0x16;
    pub const MOB_EQUIPMENT: u8 = 0x20;
    pub const USE_ITEM: u8 = 0x23;
    pub const PLAYER_ACTION: u8 = 0x24;
    pub const ANIMATE: u8 = 0x2c;
    pub const RESPAWN: u8 = 0x2d;
    pub const DROP_ITEM: u8 = 0x2e;
    pub const CONTAINER_CLOSE: u8 = 0x31;
    pub const INVENTORY_SLOT: u8 = 0x32;
    pub const REQUEST_CHUNK_RADIUS: u8 = 0x45;
    pub const COMMAND_REQUEST: u8 = 0x4e;
}

/// A packet with a fixed id and a bidirectional byte codec.
pub trait McpePacket: Sized {
    /// The id byte that precedes the body on the wire.
    const ID: u8;
    /// Human-readable name, used in logs and errors.
    const NAME: &'static str;

    /// Reads the packet body (everything after the id byte).
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError>;

    /// Writes the packet body (everything after the id byte).
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError>;
}
