//! Login status and disconnect packets.

use bytes::{Buf, BufMut};

use crate::ProtocolError;
use crate::codec::{read_bool, read_i32, read_string, write_string};
use crate::packets::{McpePacket, ids};

/// Outcome codes carried by [`PlayStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayStatusKind {
    LoginSuccess,
    FailedClient,
    FailedServer,
    PlayerSpawn,
}

impl PlayStatusKind {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::LoginSuccess => 0,
            Self::FailedClient => 1,
            Self::FailedServer => 2,
            Self::PlayerSpawn => 3,
        }
    }

    pub fn from_i32(value: i32) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(Self::LoginSuccess),
            1 => Ok(Self::FailedClient),
            2 => Ok(Self::FailedServer),
            3 => Ok(Self::PlayerSpawn),
            other => Err(ProtocolError::InvalidEnumValue {
                kind: "play status",
                value: i64::from(other),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayStatus {
    pub status: PlayStatusKind,
}

impl PlayStatus {
    pub fn new(status: PlayStatusKind) -> Self {
        Self { status }
    }
}

impl McpePacket for PlayStatus {
    const ID: u8 = ids::PLAY_STATUS;
    const NAME: &'static str = "PlayStatus";

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Self {
            status: PlayStatusKind::from_i32(read_i32(buf)?)?,
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        buf.put_i32(self.status.as_i32());
        Ok(())
    }
}

/// Ends the session. The message is shown to the player unless
/// `hide_screen` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Disconnect {
    pub hide_screen: bool,
    pub message: String,
}

impl Disconnect {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            hide_screen: false,
            message: message.into(),
        }
    }
}

impl McpePacket for Disconnect {
    const ID: u8 = ids::DISCONNECT;
    const NAME: &'static str = "Disconnect";

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Self {
            hide_screen: read_bool(buf)?,
            message: read_string(buf)?,
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        buf.put_u8(u8::from(self.hide_screen));
        write_string(buf, &self.message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_status_is_big_endian_i32() {
        let mut out = Vec::new();
        PlayStatus::new(PlayStatusKind::PlayerSpawn)
            .encode(&mut out)
            .unwrap();
        assert_eq!(out, vec![0, 0, 0, 3]);
    }

    #[test]
    fn test_play_status_unknown_code_fails() {
        let mut slice: &[u8] = &[0, 0, 0, 9];
        assert!(matches!(
            PlayStatus::decode(&mut slice),
            Err(ProtocolError::InvalidEnumValue { value: 9, .. })
        ));
    }

    #[test]
    fn test_disconnect_carries_message() {
        let packet = Disconnect::new("Internal server error");
        let mut out = Vec::new();
        packet.encode(&mut out).unwrap();
        assert_eq!(out[0], 0);
        assert_eq!(Disconnect::decode(&mut out.as_slice()).unwrap(), packet);
    }
}
