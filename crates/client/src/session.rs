//! Client-side state of one transfer and the reply acceptance rule.

use udpfetch_protocol::{ChunkError, ResourceId, decode_chunk};

/// Outcome of offering a reply datagram to a [`TransferSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accept {
    /// The reply carried the expected chunk; the session advanced.
    Accepted,
    /// The reply carried another chunk (a duplicate, a late reply to an
    /// earlier resend, or a reordered packet).
    Stale { seq: u32, expected: u32 },
    /// Every chunk has already been received.
    Complete { seq: u32 },
    /// The datagram is not a chunk packet.
    Malformed(ChunkError),
}

/// An in-progress transfer: target resource, resolved chunk count,
/// accumulated bytes and the next chunk index.
///
/// The chunk count is fixed at creation and never changes.
#[derive(Debug)]
pub struct TransferSession {
    resource: ResourceId,
    chunk_count: u32,
    next_index: u32,
    data: Vec<u8>,
}

impl TransferSession {
    pub fn new(resource: ResourceId, chunk_count: u32) -> Self {
        Self {
            resource,
            chunk_count,
            next_index: 0,
            data: Vec::new(),
        }
    }

    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    pub fn chunk_count(&self) -> u32 {
        self.chunk_count
    }

    /// Index of the chunk to fetch next, or `None` when complete.
    pub fn current_index(&self) -> Option<u32> {
        (self.next_index < self.chunk_count).then_some(self.next_index)
    }

    pub fn is_complete(&self) -> bool {
        self.next_index >= self.chunk_count
    }

    /// Bytes received so far.
    pub fn received_len(&self) -> usize {
        self.data.len()
    }

    /// Offers a reply datagram. Only a packet whose sequence number equals
    /// the current index is appended.
    pub fn accept(&mut self, packet: &[u8]) -> Accept {
        let (seq, payload) = match decode_chunk(packet) {
            Ok(decoded) => decoded,
            Err(e) => return Accept::Malformed(e),
        };

        let Some(expected) = self.current_index() else {
            return Accept::Complete { seq };
        };
        if seq != expected {
            return Accept::Stale { seq, expected };
        }

        self.data.extend_from_slice(payload);
        self.next_index += 1;
        Accept::Accepted
    }

    /// The reassembled resource. Meaningful once [`is_complete`](Self::is_complete).
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
