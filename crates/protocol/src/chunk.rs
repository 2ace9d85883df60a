//! Binary framing for chunk replies.
//!
//! # Wire format
//!
//! ```text
//! [4 bytes BE: sequence number (chunk index)]
//! [0..=1024 bytes: chunk payload]
//! ```
//!
//! The sequence number is always the resource-relative chunk index, never a
//! transmission counter, so a resent request produces a byte-identical reply.

use std::ops::Range;

use crate::{CHUNK_SIZE, HEADER_SIZE};

/// Errors from chunk packet encoding and decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    #[error("packet too short: {0} bytes (need at least {HEADER_SIZE})")]
    TooShort(usize),

    #[error("payload too large: {0} bytes (max {CHUNK_SIZE})")]
    PayloadTooLarge(usize),
}

/// Encodes a chunk packet: big-endian `seq` followed by `payload`.
pub fn encode_chunk(seq: u32, payload: &[u8]) -> Result<Vec<u8>, ChunkError> {
    if payload.len() > CHUNK_SIZE {
        return Err(ChunkError::PayloadTooLarge(payload.len()));
    }

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&seq.to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Decodes a chunk packet into its sequence number and payload.
pub fn decode_chunk(packet: &[u8]) -> Result<(u32, &[u8]), ChunkError> {
    if packet.len() < HEADER_SIZE {
        return Err(ChunkError::TooShort(packet.len()));
    }

    let (header, payload) = packet.split_at(HEADER_SIZE);
    if payload.len() > CHUNK_SIZE {
        return Err(ChunkError::PayloadTooLarge(payload.len()));
    }

    let seq = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    Ok((seq, payload))
}

/// Number of chunks needed for a resource of `len` bytes (`ceil(len / CHUNK_SIZE)`).
pub fn chunk_count(len: u64) -> u64 {
    len.div_ceil(CHUNK_SIZE as u64)
}

/// Byte range covered by chunk `index` of a resource of `len` bytes.
///
/// Returns `None` when the chunk starts at or past the end of the resource.
pub fn chunk_range(index: u32, len: u64) -> Option<Range<u64>> {
    let start = u64::from(index) * CHUNK_SIZE as u64;
    if start >= len {
        return None;
    }
    let end = (start + CHUNK_SIZE as u64).min(len);
    Some(start..end)
}
