//! Inbound gameplay packets.
//!
//! These only make sense once a player is in the world. The session layer
//! refuses every one of them before login completes, so the codecs here
//! only have to be correct and defensive: they are handed to the game's
//! play handler untouched.

use bytes::{Buf, BufMut};

use crate::ProtocolError;
use crate::codec::{
    BlockPosition, ItemStack, Vector3f, decode_unsigned, encode_signed, encode_unsigned,
    read_bool, read_f32_le, read_signed_i32, read_string, read_u8, write_string,
};
use crate::packets::{McpePacket, ids};

// ---------------------------------------------------------------------------
// MovePlayer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MoveMode {
    #[default]
    Normal,
    Reset,
    Rotation,
}

impl TryFrom<u8> for MoveMode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Normal),
            1 => Ok(Self::Reset),
            2 => Ok(Self::Rotation),
            other => Err(ProtocolError::InvalidEnumValue {
                kind: "move mode",
                value: i64::from(other),
            }),
        }
    }
}

impl From<MoveMode> for u8 {
    fn from(mode: MoveMode) -> u8 {
        match mode {
            MoveMode::Normal => 0,
            MoveMode::Reset => 1,
            MoveMode::Rotation => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovePlayer {
    pub entity_id: u64,
    pub position: Vector3f,
    pub pitch: f32,
    pub yaw: f32,
    pub head_yaw: f32,
    pub mode: MoveMode,
    pub on_ground: bool,
}

impl McpePacket for MovePlayer {
    const ID: u8 = ids::MOVE_PLAYER;
    const NAME: &'static str = "MovePlayer";

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Self {
            entity_id: decode_unsigned(buf)?,
            position: Vector3f::read(buf)?,
            pitch: read_f32_le(buf)?,
            yaw: read_f32_le(buf)?,
            head_yaw: read_f32_le(buf)?,
            mode: MoveMode::try_from(read_u8(buf)?)?,
            on_ground: read_bool(buf)?,
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        encode_unsigned(buf, self.entity_id);
        self.position.write(buf);
        buf.put_f32_le(self.pitch);
        buf.put_f32_le(self.yaw);
        buf.put_f32_le(self.head_yaw);
        buf.put_u8(self.mode.into());
        buf.put_u8(u8::from(self.on_ground));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RequestChunkRadius
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestChunkRadius {
    pub radius: i32,
}

impl McpePacket for RequestChunkRadius {
    const ID: u8 = ids::REQUEST_CHUNK_RADIUS;
    const NAME: &'static str = "RequestChunkRadius";

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Self {
            radius: read_signed_i32(buf, "chunk radius")?,
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        encode_signed(buf, i64::from(self.radius));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PlayerAction
// ---------------------------------------------------------------------------

/// The well-known player action codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerActionKind {
    StartBreak,
    AbortBreak,
    StopBreak,
    ReleaseItem,
    StopSleeping,
    Respawn,
    Jump,
    StartSprint,
    StopSprint,
    StartSneak,
    StopSneak,
}

impl PlayerActionKind {
    fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::StartBreak,
            1 => Self::AbortBreak,
            2 => Self::StopBreak,
            5 => Self::ReleaseItem,
            6 => Self::StopSleeping,
            7 => Self::Respawn,
            8 => Self::Jump,
            9 => Self::StartSprint,
            10 => Self::StopSprint,
            11 => Self::StartSneak,
            12 => Self::StopSneak,
            _ => return None,
        })
    }
}

/// A discrete player action. Unknown codes are kept as-is so newer clients
/// do not get kicked for actions the game simply ignores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerAction {
    pub entity_id: u64,
    pub action: i32,
    pub position: BlockPosition,
    pub face: i32,
}

impl PlayerAction {
    pub fn kind(&self) -> Option<PlayerActionKind> {
        PlayerActionKind::from_code(self.action)
    }
}

impl McpePacket for PlayerAction {
    const ID: u8 = ids::PLAYER_ACTION;
    const NAME: &'static str = "PlayerAction";

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Self {
            entity_id: decode_unsigned(buf)?,
            action: read_signed_i32(buf, "player action")?,
            position: BlockPosition::read(buf)?,
            face: read_signed_i32(buf, "block face")?,
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        encode_unsigned(buf, self.entity_id);
        encode_signed(buf, i64::from(self.action));
        self.position.write(buf);
        encode_signed(buf, i64::from(self.face));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Animate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Animate {
    pub action: i32,
    pub entity_id: u64,
}

impl McpePacket for Animate {
    const ID: u8 = ids::ANIMATE;
    const NAME: &'static str = "Animate";

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Self {
            action: read_signed_i32(buf, "animate action")?,
            entity_id: decode_unsigned(buf)?,
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        encode_signed(buf, i64::from(self.action));
        encode_unsigned(buf, self.entity_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// A chat line. The layout after the type byte depends on the type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextKind {
    Raw { message: String },
    Chat { source: String, message: String },
    Translation { message: String, parameters: Vec<String> },
    Popup { source: String, message: String },
    Tip { message: String },
    System { message: String },
    Whisper { source: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    pub kind: TextKind,
}

impl Text {
    pub fn chat(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: TextKind::Chat {
                source: source.into(),
                message: message.into(),
            },
        }
    }
}

impl McpePacket for Text {
    const ID: u8 = ids::TEXT;
    const NAME: &'static str = "Text";

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        let kind = match read_u8(buf)? {
            0 => TextKind::Raw {
                message: read_string(buf)?,
            },
            1 => TextKind::Chat {
                source: read_string(buf)?,
                message: read_string(buf)?,
            },
            2 => {
                let message = read_string(buf)?;
                let count = read_u8(buf)?;
                let parameters = (0..count)
                    .map(|_| read_string(buf))
                    .collect::<Result<_, _>>()?;
                TextKind::Translation {
                    message,
                    parameters,
                }
            }
            3 => TextKind::Popup {
                source: read_string(buf)?,
                message: read_string(buf)?,
            },
            4 => TextKind::Tip {
                message: read_string(buf)?,
            },
            5 => TextKind::System {
                message: read_string(buf)?,
            },
            6 => TextKind::Whisper {
                source: read_string(buf)?,
                message: read_string(buf)?,
            },
            other => {
                return Err(ProtocolError::InvalidEnumValue {
                    kind: "text type",
                    value: i64::from(other),
                });
            }
        };
        Ok(Self { kind })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        match &self.kind {
            TextKind::Raw { message } => {
                buf.put_u8(0);
                write_string(buf, message);
            }
            TextKind::Chat { source, message } => {
                buf.put_u8(1);
                write_string(buf, source);
                write_string(buf, message);
            }
            TextKind::Translation {
                message,
                parameters,
            } => {
                let count = u8::try_from(parameters.len()).map_err(|_| {
                    ProtocolError::OutOfRange {
                        field: "translation parameters",
                        value: parameters.len() as i64,
                    }
                })?;
                buf.put_u8(2);
                write_string(buf, message);
                buf.put_u8(count);
                for parameter in parameters {
                    write_string(buf, parameter);
                }
            }
            TextKind::Popup { source, message } => {
                buf.put_u8(3);
                write_string(buf, source);
                write_string(buf, message);
            }
            TextKind::Tip { message } => {
                buf.put_u8(4);
                write_string(buf, message);
            }
            TextKind::System { message } => {
                buf.put_u8(5);
                write_string(buf, message);
            }
            TextKind::Whisper { source, message } => {
                buf.put_u8(6);
                write_string(buf, source);
                write_string(buf, message);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ContainerClose
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerClose {
    pub window_id: u8,
}

impl McpePacket for ContainerClose {
    const ID: u8 = ids::CONTAINER_CLOSE;
    const NAME: &'static str = "ContainerClose";

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Self {
            window_id: read_u8(buf)?,
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        buf.put_u8(self.window_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// InventorySlot
// ---------------------------------------------------------------------------

/// A single slot change inside an open window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventorySlot {
    pub window_id: u8,
    pub slot: i32,
    pub hotbar_slot: i32,
    pub stack: Option<ItemStack>,
}

impl McpePacket for InventorySlot {
    const ID: u8 = ids::INVENTORY_SLOT;
    const NAME: &'static str = "InventorySlot";

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Self {
            window_id: read_u8(buf)?,
            slot: read_signed_i32(buf, "slot")?,
            hotbar_slot: read_signed_i32(buf, "hotbar slot")?,
            stack: ItemStack::read_optional(buf)?,
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        buf.put_u8(self.window_id);
        encode_signed(buf, i64::from(self.slot));
        encode_signed(buf, i64::from(self.hotbar_slot));
        ItemStack::write_optional(self.stack.as_ref(), buf)
    }
}

// ---------------------------------------------------------------------------
// RemoveBlock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveBlock {
    pub position: BlockPosition,
}

impl McpePacket for RemoveBlock {
    const ID: u8 = ids::REMOVE_BLOCK;
    const NAME: &'static str = "RemoveBlock";

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Self {
            position: BlockPosition::read(buf)?,
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        self.position.write(buf);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// UseItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UseItem {
    pub position: BlockPosition,
    pub face: i32,
    pub click_position: Vector3f,
    pub player_position: Vector3f,
    pub slot: i32,
    pub stack: Option<ItemStack>,
}

impl McpePacket for UseItem {
    const ID: u8 = ids::USE_ITEM;
    const NAME: &'static str = "UseItem";

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Self {
            position: BlockPosition::read(buf)?,
            face: read_signed_i32(buf, "block face")?,
            click_position: Vector3f::read(buf)?,
            player_position: Vector3f::read(buf)?,
            slot: read_signed_i32(buf, "slot")?,
            stack: ItemStack::read_optional(buf)?,
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        self.position.write(buf);
        encode_signed(buf, i64::from(self.face));
        self.click_position.write(buf);
        self.player_position.write(buf);
        encode_signed(buf, i64::from(self.slot));
        ItemStack::write_optional(self.stack.as_ref(), buf)
    }
}

// ---------------------------------------------------------------------------
// DropItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropItem {
    pub kind: u8,
    pub stack: Option<ItemStack>,
}

impl McpePacket for DropItem {
    const ID: u8 = ids::DROP_ITEM;
    const NAME: &'static str = "DropItem";

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Self {
            kind: read_u8(buf)?,
            stack: ItemStack::read_optional(buf)?,
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        buf.put_u8(self.kind);
        ItemStack::write_optional(self.stack.as_ref(), buf)
    }
}

// ---------------------------------------------------------------------------
// CommandRequest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandRequest {
    pub command: String,
}

impl McpePacket for CommandRequest {
    const ID: u8 = ids::COMMAND_REQUEST;
    const NAME: &'static str = "CommandRequest";

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Self {
            command: read_string(buf)?,
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        write_string(buf, &self.command);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_player_decodes_what_it_encodes() {
        let packet = MovePlayer {
            entity_id: 1,
            position: Vector3f::new(0.5, 65.62, 0.5),
            pitch: 10.0,
            yaw: 90.0,
            head_yaw: 90.0,
            mode: MoveMode::Normal,
            on_ground: true,
        };
        let mut out = Vec::new();
        packet.encode(&mut out).unwrap();
        assert_eq!(MovePlayer::decode(&mut out.as_slice()).unwrap(), packet);
    }

    #[test]
    fn test_move_player_bad_mode_fails() {
        let mut out = Vec::new();
        MovePlayer::default().encode(&mut out).unwrap();
        let mode_at = out.len() - 2;
        out[mode_at] = 7;
        assert!(matches!(
            MovePlayer::decode(&mut out.as_slice()),
            Err(ProtocolError::InvalidEnumValue {
                kind: "move mode",
                ..
            })
        ));
    }

    #[test]
    fn test_player_action_unknown_code_has_no_kind() {
        let known = PlayerAction {
            action: 8,
            ..PlayerAction::default()
        };
        assert_eq!(known.kind(), Some(PlayerActionKind::Jump));

        let unknown = PlayerAction {
            action: 99,
            ..PlayerAction::default()
        };
        assert_eq!(unknown.kind(), None);
    }

    #[test]
    fn test_text_chat_layout() {
        let mut out = Vec::new();
        Text::chat("Steve", "hi").encode(&mut out).unwrap();
        assert_eq!(out, vec![1, 5, b'S', b't', b'e', b'v', b'e', 2, b'h', b'i']);
    }

    #[test]
    fn test_text_translation_parameters_survive() {
        let packet = Text {
            kind: TextKind::Translation {
                message: "chat.type.announcement".into(),
                parameters: vec!["Server".into(), "hello".into()],
            },
        };
        let mut out = Vec::new();
        packet.encode(&mut out).unwrap();
        assert_eq!(Text::decode(&mut out.as_slice()).unwrap(), packet);
    }

    #[test]
    fn test_text_unknown_type_fails() {
        let mut slice: &[u8] = &[42];
        assert!(matches!(
            Text::decode(&mut slice),
            Err(ProtocolError::InvalidEnumValue { value: 42, .. })
        ));
    }

    #[test]
    fn test_use_item_with_stack_decodes() {
        let packet = UseItem {
            position: BlockPosition::new(1, 2, 3),
            face: 1,
            click_position: Vector3f::new(0.5, 1.0, 0.5),
            player_position: Vector3f::new(1.5, 3.6, 3.5),
            slot: 0,
            stack: Some(ItemStack::new(4, 12)),
        };
        let mut out = Vec::new();
        packet.encode(&mut out).unwrap();
        assert_eq!(UseItem::decode(&mut out.as_slice()).unwrap(), packet);
    }

    #[test]
    fn test_request_chunk_radius_is_zigzag() {
        let mut out = Vec::new();
        RequestChunkRadius { radius: 8 }.encode(&mut out).unwrap();
        assert_eq!(out, vec![16]);
    }
}
