//! Resource pack negotiation packets.
//!
//! The server announces which packs it wants the client to use right after
//! a successful login. Pocketgate ships no packs itself; collaborators may
//! fill the lists in before the session sends them.

use bytes::{Buf, BufMut};

use crate::ProtocolError;
use crate::codec::{read_bool, read_string, read_u16_le, read_u64_le, read_u8, write_string};
use crate::packets::{McpePacket, ids};

/// One pack listed in [`ResourcePacksInfo`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackEntry {
    pub id: String,
    pub version: String,
    pub size: u64,
}

impl PackEntry {
    fn read<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: read_string(buf)?,
            version: read_string(buf)?,
            size: read_u64_le(buf)?,
        })
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        write_string(buf, &self.id);
        write_string(buf, &self.version);
        buf.put_u64_le(self.size);
    }
}

fn write_count<B: BufMut>(buf: &mut B, len: usize) -> Result<(), ProtocolError> {
    let count = u16::try_from(len).map_err(|_| ProtocolError::OutOfRange {
        field: "pack count",
        value: len as i64,
    })?;
    buf.put_u16_le(count);
    Ok(())
}

fn read_entries<B: Buf>(buf: &mut B) -> Result<Vec<PackEntry>, ProtocolError> {
    let count = read_u16_le(buf)?;
    (0..count).map(|_| PackEntry::read(buf)).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourcePacksInfo {
    pub must_accept: bool,
    pub behavior_packs: Vec<PackEntry>,
    pub resource_packs: Vec<PackEntry>,
}

impl McpePacket for ResourcePacksInfo {
    const ID: u8 = ids::RESOURCE_PACKS_INFO;
    const NAME: &'static str = "ResourcePacksInfo";

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(Self {
            must_accept: read_bool(buf)?,
            behavior_packs: read_entries(buf)?,
            resource_packs: read_entries(buf)?,
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        buf.put_u8(u8::from(self.must_accept));
        for list in [&self.behavior_packs, &self.resource_packs] {
            write_count(buf, list.len())?;
            for entry in list {
                entry.write(buf);
            }
        }
        Ok(())
    }
}

/// The client's answer to [`ResourcePacksInfo`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourcePackClientResponse {
    pub status: u8,
    pub pack_ids: Vec<String>,
}

impl McpePacket for ResourcePackClientResponse {
    const ID: u8 = ids::RESOURCE_PACK_CLIENT_RESPONSE;
    const NAME: &'static str = "ResourcePackClientResponse";

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        let status = read_u8(buf)?;
        let count = read_u16_le(buf)?;
        let pack_ids = (0..count)
            .map(|_| read_string(buf))
            .collect::<Result<_, _>>()?;
        Ok(Self { status, pack_ids })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        buf.put_u8(self.status);
        write_count(buf, self.pack_ids.len())?;
        for id in &self.pack_ids {
            write_string(buf, id);
        }
        Ok(())
    }
}
