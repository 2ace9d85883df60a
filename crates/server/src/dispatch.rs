//! Per-datagram command dispatch.
//!
//! The dispatcher is pure with respect to the network: it maps one inbound
//! datagram to at most one reply and never remembers anything between calls.

use std::sync::Arc;

use tracing::{debug, error, warn};
use udpfetch_protocol::{
    Command, CommandError, InfoReply, ResourceId, UNKNOWN_COMMAND_REPLY, encode_chunk,
};
use udpfetch_store::ResourceStore;

use crate::chunks::read_chunk;
use crate::metadata::resolve_chunk_count;

/// A reply datagram produced for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Text reply to an info request.
    Info(InfoReply),
    /// Text reply to a command with an unknown verb.
    Unknown,
    /// Encoded chunk packet for chunk `seq`.
    Chunk { seq: u32, packet: Vec<u8> },
}

impl Reply {
    /// Datagram payload to send.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Reply::Info(info) => info.to_bytes(),
            Reply::Unknown => UNKNOWN_COMMAND_REPLY.as_bytes().to_vec(),
            Reply::Chunk { packet, .. } => packet.clone(),
        }
    }

    /// Whether this reply carries chunk data.
    pub fn is_chunk(&self) -> bool {
        matches!(self, Reply::Chunk { .. })
    }
}

/// Routes commands to the metadata resolver or the chunk reader.
pub struct Dispatcher<S: ResourceStore> {
    store: Arc<S>,
}

impl<S: ResourceStore> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ResourceStore> Dispatcher<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Handles one datagram.
    ///
    /// Returns `None` when nothing should be sent back: malformed arguments,
    /// or a fetch for a missing resource or an out-of-range chunk.
    pub fn handle(&self, datagram: &[u8]) -> Option<Reply> {
        let command = match Command::parse(datagram) {
            Ok(command) => command,
            Err(CommandError::Unknown(verb)) => {
                warn!(%verb, "unknown command");
                return Some(Reply::Unknown);
            }
            Err(e) => {
                warn!("malformed command: {e}");
                return None;
            }
        };

        debug!(%command, "received");

        match command {
            Command::Info(resource) => Some(Reply::Info(self.info(&resource))),
            Command::Fetch { resource, seq } => self.fetch(&resource, seq),
        }
    }

    fn info(&self, resource: &ResourceId) -> InfoReply {
        match resolve_chunk_count(self.store.as_ref(), resource) {
            Ok(Some(chunk_count)) => InfoReply::Found { chunk_count },
            Ok(None) => {
                debug!(%resource, "resource not found");
                InfoReply::NotFound
            }
            Err(e) => {
                error!(%resource, "failed to resolve metadata: {e}");
                InfoReply::NotFound
            }
        }
    }

    fn fetch(&self, resource: &ResourceId, seq: u32) -> Option<Reply> {
        let payload = match read_chunk(self.store.as_ref(), resource, seq) {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!(%resource, seq, "chunk out of range, not replying");
                return None;
            }
            Err(e) => {
                error!(%resource, seq, "failed to read chunk: {e}");
                return None;
            }
        };

        match encode_chunk(seq, &payload) {
            Ok(packet) => Some(Reply::Chunk { seq, packet }),
            Err(e) => {
                error!(%resource, seq, "failed to encode chunk: {e}");
                None
            }
        }
    }
}
