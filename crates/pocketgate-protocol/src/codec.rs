//! Primitive wire codecs: varints, strings, vectors, and item stacks.
//!
//! Every packet in the protocol is built from a handful of primitives.
//! This module provides them as free functions over the [`bytes`] crate's
//! [`Buf`] (reading) and [`BufMut`] (writing) traits, so the same code works
//! on `&[u8]`, `Bytes`, and `BytesMut` without copying.
//!
//! ## Reading never panics
//!
//! `Buf::get_u8` and friends panic when the buffer is empty. Every reader
//! here checks `remaining()` first and returns
//! [`ProtocolError::TruncatedInput`] instead, because the bytes come from
//! untrusted clients.
//!
//! ## Varints
//!
//! A varint stores an integer in 7-bit groups, least significant group
//! first. The high bit of each byte says "another byte follows":
//!
//! ```text
//! 300 = 0b1_0010_1100  →  [0xAC, 0x02]
//!                          1010_1100 → low 7 bits 0x2C, continue
//!                          0000_0010 → next 7 bits 0x02, stop
//! ```
//!
//! A `u64` needs at most 10 groups, so a decoder that reads more than 10
//! continuation bytes is looking at garbage (or an attack) and bails out.

use bytes::{Buf, BufMut};

use crate::ProtocolError;

/// Longest legal varint, in bytes.
pub const MAX_VARINT_LEN: usize = 10;

/// Fails with `TruncatedInput` unless `buf` has at least `needed` bytes.
pub fn ensure_remaining<B: Buf>(buf: &B, needed: usize) -> Result<(), ProtocolError> {
    let remaining = buf.remaining();
    if remaining < needed {
        return Err(ProtocolError::truncated(needed, remaining));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Varints
// ---------------------------------------------------------------------------

/// Writes `value` as an unsigned base-128 varint.
pub fn encode_unsigned<B: BufMut>(buf: &mut B, mut value: u64) {
    loop {
        let group = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(group);
            return;
        }
        buf.put_u8(group | 0x80);
    }
}

/// Reads an unsigned base-128 varint.
///
/// # Errors
/// Returns [`ProtocolError::MalformedVarint`] if the input ends before the
/// terminating byte, if more than [`MAX_VARINT_LEN`] bytes carry the
/// continuation bit, or if the last byte holds bits past 64.
pub fn decode_unsigned<B: Buf>(buf: &mut B) -> Result<u64, ProtocolError> {
    let mut value = 0u64;
    for i in 0..MAX_VARINT_LEN {
        if !buf.has_remaining() {
            return Err(ProtocolError::MalformedVarint);
        }
        let byte = buf.get_u8();
        // The tenth byte has room for bit 63 only.
        if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
            return Err(ProtocolError::MalformedVarint);
        }
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(ProtocolError::MalformedVarint)
}

/// Writes `value` as a zigzag-encoded varint.
///
/// Zigzag maps small negative numbers to small unsigned ones
/// (`0, -1, 1, -2, …` → `0, 1, 2, 3, …`) so they stay short on the wire.
pub fn encode_signed<B: BufMut>(buf: &mut B, value: i64) {
    encode_unsigned(buf, ((value << 1) ^ (value >> 63)) as u64);
}

/// Reads a zigzag-encoded varint.
pub fn decode_signed<B: Buf>(buf: &mut B) -> Result<i64, ProtocolError> {
    let raw = decode_unsigned(buf)?;
    Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
}

/// Reads a varint that is used as a length, and checks it fits in `usize`.
fn decode_length<B: Buf>(buf: &mut B) -> Result<usize, ProtocolError> {
    let len = decode_unsigned(buf)?;
    usize::try_from(len).map_err(|_| ProtocolError::OutOfRange {
        field: "length",
        value: len as i64,
    })
}

// ---------------------------------------------------------------------------
// Byte arrays and strings
// ---------------------------------------------------------------------------

/// Writes a varint length followed by the raw bytes.
pub fn write_byte_array<B: BufMut>(buf: &mut B, data: &[u8]) {
    encode_unsigned(buf, data.len() as u64);
    buf.put_slice(data);
}

/// Reads a varint length followed by that many raw bytes.
pub fn read_byte_array<B: Buf>(buf: &mut B) -> Result<Vec<u8>, ProtocolError> {
    let len = decode_length(buf)?;
    ensure_remaining(buf, len)?;
    let mut out = vec![0u8; len];
    buf.copy_to_slice(&mut out);
    Ok(out)
}

/// Writes a varint-length-prefixed UTF-8 string.
pub fn write_string<B: BufMut>(buf: &mut B, value: &str) {
    write_byte_array(buf, value.as_bytes());
}

/// Reads a varint-length-prefixed UTF-8 string.
pub fn read_string<B: Buf>(buf: &mut B) -> Result<String, ProtocolError> {
    let raw = read_byte_array(buf)?;
    Ok(String::from_utf8(raw)?)
}

/// Writes a string with a 32-bit little-endian length prefix.
///
/// Only the compressed login body uses this older layout.
pub fn write_le_string<B: BufMut>(buf: &mut B, value: &str) -> Result<(), ProtocolError> {
    let len = u32::try_from(value.len()).map_err(|_| ProtocolError::OutOfRange {
        field: "le string length",
        value: value.len() as i64,
    })?;
    buf.put_u32_le(len);
    buf.put_slice(value.as_bytes());
    Ok(())
}

/// Reads a string with a 32-bit little-endian length prefix.
pub fn read_le_string<B: Buf>(buf: &mut B) -> Result<String, ProtocolError> {
    ensure_remaining(buf, 4)?;
    let len = buf.get_u32_le() as usize;
    ensure_remaining(buf, len)?;
    let mut raw = vec![0u8; len];
    buf.copy_to_slice(&mut raw);
    Ok(String::from_utf8(raw)?)
}

// ---------------------------------------------------------------------------
// Fixed-width helpers
// ---------------------------------------------------------------------------

/// Reads one byte.
pub fn read_u8<B: Buf>(buf: &mut B) -> Result<u8, ProtocolError> {
    ensure_remaining(buf, 1)?;
    Ok(buf.get_u8())
}

/// Reads a boolean encoded as one byte (non-zero is `true`).
pub fn read_bool<B: Buf>(buf: &mut B) -> Result<bool, ProtocolError> {
    Ok(read_u8(buf)? != 0)
}

/// Reads a big-endian `i32`.
pub fn read_i32<B: Buf>(buf: &mut B) -> Result<i32, ProtocolError> {
    ensure_remaining(buf, 4)?;
    Ok(buf.get_i32())
}

/// Reads a little-endian `u16`.
pub fn read_u16_le<B: Buf>(buf: &mut B) -> Result<u16, ProtocolError> {
    ensure_remaining(buf, 2)?;
    Ok(buf.get_u16_le())
}

/// Reads a little-endian `u64`.
pub fn read_u64_le<B: Buf>(buf: &mut B) -> Result<u64, ProtocolError> {
    ensure_remaining(buf, 8)?;
    Ok(buf.get_u64_le())
}

/// Reads a little-endian `f32`.
pub fn read_f32_le<B: Buf>(buf: &mut B) -> Result<f32, ProtocolError> {
    ensure_remaining(buf, 4)?;
    Ok(buf.get_f32_le())
}

/// Reads a signed varint and narrows it to `i32`.
pub fn read_signed_i32<B: Buf>(buf: &mut B, field: &'static str) -> Result<i32, ProtocolError> {
    let value = decode_signed(buf)?;
    i32::try_from(value).map_err(|_| ProtocolError::OutOfRange { field, value })
}

// ---------------------------------------------------------------------------
// Vector3f
// ---------------------------------------------------------------------------

/// A position or motion vector: three little-endian `f32`s, 12 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3f {
    /// Wire size in bytes.
    pub const SIZE: usize = 12;

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_f32_le(self.x);
        buf.put_f32_le(self.y);
        buf.put_f32_le(self.z);
    }

    pub fn read<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        ensure_remaining(buf, Self::SIZE)?;
        Ok(Self {
            x: buf.get_f32_le(),
            y: buf.get_f32_le(),
            z: buf.get_f32_le(),
        })
    }
}

// ---------------------------------------------------------------------------
// BlockPosition
// ---------------------------------------------------------------------------

/// A block coordinate. `y` is unsigned on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BlockPosition {
    pub x: i32,
    pub y: u32,
    pub z: i32,
}

impl BlockPosition {
    pub fn new(x: i32, y: u32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn write<B: BufMut>(&self, buf: &mut B) {
        encode_signed(buf, i64::from(self.x));
        encode_unsigned(buf, u64::from(self.y));
        encode_signed(buf, i64::from(self.z));
    }

    pub fn read<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        let x = read_signed_i32(buf, "block x")?;
        let y = decode_unsigned(buf)?;
        let y = u32::try_from(y).map_err(|_| ProtocolError::OutOfRange {
            field: "block y",
            value: y as i64,
        })?;
        let z = read_signed_i32(buf, "block z")?;
        Ok(Self { x, y, z })
    }
}

// ---------------------------------------------------------------------------
// ItemStack
// ---------------------------------------------------------------------------

/// One stack of items as it appears in inventory and equipment packets.
///
/// On the wire a stack is optional: a zero id means "nothing here" and no
/// further fields follow. Otherwise the id is followed by
/// `aux = damage << 8 | count` and a little-endian `u16` length-prefixed
/// NBT blob, which this layer carries without interpreting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemStack {
    pub id: i32,
    pub damage: i16,
    pub count: u8,
    pub nbt: Vec<u8>,
}

impl ItemStack {
    pub fn new(id: i32, count: u8) -> Self {
        Self {
            id,
            damage: 0,
            count,
            nbt: Vec::new(),
        }
    }

    /// Writes an optional stack; `None` becomes a single zero id.
    pub fn write_optional<B: BufMut>(
        stack: Option<&ItemStack>,
        buf: &mut B,
    ) -> Result<(), ProtocolError> {
        let Some(stack) = stack.filter(|s| s.id != 0) else {
            encode_signed(buf, 0);
            return Ok(());
        };

        let nbt_len = u16::try_from(stack.nbt.len()).map_err(|_| ProtocolError::OutOfRange {
            field: "nbt length",
            value: stack.nbt.len() as i64,
        })?;

        encode_signed(buf, i64::from(stack.id));
        let aux = (i64::from(stack.damage) << 8) | i64::from(stack.count);
        encode_signed(buf, aux);
        buf.put_u16_le(nbt_len);
        buf.put_slice(&stack.nbt);
        Ok(())
    }

    /// Reads an optional stack.
    pub fn read_optional<B: Buf>(buf: &mut B) -> Result<Option<ItemStack>, ProtocolError> {
        let id = read_signed_i32(buf, "item id")?;
        if id == 0 {
            return Ok(None);
        }

        let aux = read_signed_i32(buf, "item aux")?;
        let nbt_len = read_u16_le(buf)? as usize;
        ensure_remaining(buf, nbt_len)?;
        let mut nbt = vec![0u8; nbt_len];
        buf.copy_to_slice(&mut nbt);

        Ok(Some(ItemStack {
            id,
            damage: (aux >> 8) as i16,
            count: (aux & 0xff) as u8,
            nbt,
        }))
    }
}
