//! zlib compression for login bodies and batch frames.
//!
//! Both functions take a plain byte slice and return a fresh `Vec<u8>`;
//! nothing is cached between calls, so they are safe to call from any
//! worker thread.
//!
//! Inflating untrusted data needs a ceiling: a few kilobytes of zlib can
//! expand to gigabytes. [`inflate_limited`] reads at most `limit + 1` bytes
//! and fails if the stream had more to give.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::ProtocolError;

/// Default ceiling for a single inflated body (8 MiB).
pub const DEFAULT_MAX_DECOMPRESSED: usize = 8 * 1024 * 1024;

/// Default zlib level used for outbound batches.
pub const DEFAULT_LEVEL: u32 = 7;

/// Compresses `data` with the default level.
pub fn deflate(data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    deflate_with_level(data, DEFAULT_LEVEL)
}

/// Compresses `data` with the given zlib level (0-9).
pub fn deflate_with_level(data: &[u8], level: u32) -> Result<Vec<u8>, ProtocolError> {
    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(data.len() / 2 + 16),
        Compression::new(level.min(9)),
    );
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompresses `data`, failing if the output would exceed `limit` bytes.
///
/// # Errors
/// - [`ProtocolError::Compression`] for a corrupt or truncated stream.
/// - [`ProtocolError::PayloadTooLarge`] if the output passes `limit`.
pub fn inflate_limited(data: &[u8], limit: usize) -> Result<Vec<u8>, ProtocolError> {
    let decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    // One extra byte tells "exactly at the limit" apart from "over it".
    decoder.take(limit as u64 + 1).read_to_end(&mut out)?;
    if out.len() > limit {
        return Err(ProtocolError::PayloadTooLarge { limit });
    }
    Ok(out)
}
