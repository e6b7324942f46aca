//! The packet registry: one enum variant per known packet id.
//!
//! [`Packet`] is what the session layer works with. It knows how to read
//! an id byte and pick the right codec, and how to write one back out.
//! The enum and its dispatch tables are generated by a small macro so a
//! new packet only has to be listed once.

use bytes::{Buf, BufMut};

use crate::ProtocolError;
use crate::batch::BatchLimits;
use crate::codec::read_u8;
use crate::packets::*;

macro_rules! packet_registry {
    ($($variant:ident),* $(,)?) => {
        /// Any packet the server understands.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Packet {
            $($variant($variant),)*
        }

        impl Packet {
            /// The wire id of this packet.
            pub fn id(&self) -> u8 {
                match self {
                    $(Self::$variant(_) => <$variant as McpePacket>::ID,)*
                }
            }

            /// The packet's name, for logs and errors.
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => <$variant as McpePacket>::NAME,)*
                }
            }

            /// Decodes a packet body for the given id.
            ///
            /// # Errors
            /// [`ProtocolError::UnknownPacket`] if nothing is registered
            /// under `id`, or whatever the packet's codec reports.
            pub fn decode_body<B: Buf>(id: u8, buf: &mut B) -> Result<Self, ProtocolError> {
                match id {
                    $(id if id == <$variant as McpePacket>::ID => {
                        Ok(Self::$variant(<$variant as McpePacket>::decode(buf)?))
                    })*
                    other => Err(ProtocolError::UnknownPacket(other)),
                }
            }

            /// Writes the packet body (without the id byte).
            pub fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
                match self {
                    $(Self::$variant(packet) => packet.encode(buf),)*
                }
            }
        }

        $(
            impl From<$variant> for Packet {
                fn from(packet: $variant) -> Self {
                    Self::$variant(packet)
                }
            }
        )*
    };
}

packet_registry! {
    Login,
    PlayStatus,
    ServerToClientHandshake,
    ClientToServerHandshake,
    Disconnect,
    ResourcePacksInfo,
    ResourcePackClientResponse,
    Text,
    AddEntity,
    MovePlayer,
    RemoveBlock,
    MobEquipment,
    UseItem,
    PlayerAction,
    Animate,
    Respawn,
    DropItem,
    ContainerClose,
    InventorySlot,
    RequestChunkRadius,
    CommandRequest,
}

impl Packet {
    /// Decodes a full packet: the id byte followed by its body.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        Self::decode_limited(data, BatchLimits::default())
    }

    /// Decodes a full packet, holding any compressed body nested inside it
    /// to `limits.max_decompressed`.
    pub fn decode_limited(data: &[u8], limits: BatchLimits) -> Result<Self, ProtocolError> {
        let mut buf = data;
        let id = read_u8(&mut buf)?;
        if id == ids::LOGIN {
            return Login::decode_with_limit(&mut buf, limits.max_decompressed).map(Self::Login);
        }
        Self::decode_body(id, &mut buf)
    }

    /// Writes the id byte followed by the body.
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        buf.put_u8(self.id());
        self.encode_body(buf)
    }

    /// Encodes the packet into a fresh buffer.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut out = Vec::with_capacity(32);
        self.encode_into(&mut out)?;
        Ok(out)
    }

    /// Returns `true` for packets that only make sense once a player is in
    /// the world. These are refused before login completes.
    pub fn is_gameplay(&self) -> bool {
        matches!(
            self,
            Self::MovePlayer(_)
                | Self::RequestChunkRadius(_)
                | Self::PlayerAction(_)
                | Self::Animate(_)
                | Self::Text(_)
                | Self::ContainerClose(_)
                | Self::InventorySlot(_)
                | Self::MobEquipment(_)
                | Self::RemoveBlock(_)
                | Self::UseItem(_)
                | Self::DropItem(_)
                | Self::Respawn(_)
                | Self::ResourcePackClientResponse(_)
                | Self::CommandRequest(_)
        )
    }
}
