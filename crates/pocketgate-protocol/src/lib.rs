//! Wire protocol for Pocketgate.
//!
//! This crate defines the bytes that Pocket Edition clients and the
//! server exchange once RakNet has delivered a datagram:
//!
//! - **Codec** ([`codec`]): varints, strings, vectors, item stacks.
//! - **Compression** ([`compression`]): zlib with a decompression ceiling.
//! - **Packets** ([`packets`]): one typed struct per packet, each
//!   implementing [`McpePacket`].
//! - **Registry** ([`Packet`]): id-byte dispatch over every known packet.
//! - **Batch** ([`batch`]): many packets in one compressed frame.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! Everything here is a pure function of its input. Nothing knows about
//! connections, sessions, or encryption, so any worker thread can decode
//! any datagram.
//!
//! ```text
//! Transport (datagram) → Protocol (Packet) → Session (state machine)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

pub mod batch;
pub mod codec;
pub mod compression;
mod error;
pub mod packets;
mod registry;
pub mod version;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use batch::{BatchLimits, decode_batch, encode_batch};
pub use codec::{BlockPosition, ItemStack, Vector3f};
pub use error::ProtocolError;
pub use packets::McpePacket;
pub use registry::Packet;
pub use version::{PROTOCOL_VERSION, is_compatible};
