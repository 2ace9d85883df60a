//! Wire protocol for the udpfetch chunked-transfer service.
//!
//! Two framings travel over the datagram socket and are never mixed:
//!
//! - control messages (commands and info replies) are single-line UTF-8 text;
//! - chunk replies are binary [`chunk`] packets carrying a big-endian
//!   sequence number followed by at most [`CHUNK_SIZE`] payload bytes.

pub mod chunk;
pub mod command;
pub mod listing;
pub mod reply;

pub use chunk::{ChunkError, chunk_count, chunk_range, decode_chunk, encode_chunk};
pub use command::{Command, CommandError, ResourceId};
pub use listing::{encode_listing, parse_listing};
pub use reply::{InfoReply, InfoReplyError, UNKNOWN_COMMAND_REPLY};

use std::time::Duration;

/// Maximum payload bytes carried by one chunk packet.
pub const CHUNK_SIZE: usize = 1024;

/// Size of the sequence-number header prepended to every chunk packet.
pub const HEADER_SIZE: usize = 4;

/// Receive buffer size for datagrams; larger than any valid packet so an
/// oversized datagram is detected instead of silently truncated to a valid one.
pub const RECV_BUFFER_SIZE: usize = 2048;

/// Default UDP port the server listens on.
pub const DEFAULT_PORT: u16 = 12345;

/// How long the client waits for a reply before resending.
pub const RECV_TIMEOUT: Duration = Duration::from_millis(2000);

/// Number of send attempts per request before the client gives up.
pub const MAX_RETRIES: u32 = 5;
