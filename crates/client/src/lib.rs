//! Stop-and-wait transfer client for udpfetch.
//!
//! A transfer resolves the chunk count of a resource with one info request,
//! then fetches chunks strictly in index order with a single request in
//! flight. Lost replies are recovered by resending after a timeout; replies
//! carrying the wrong sequence number are discarded without counting as a
//! failed attempt.

mod engine;
mod retry;
mod session;
mod transport;

pub use engine::TransferClient;
pub use retry::RetryBudget;
pub use session::{Accept, TransferSession};
pub use transport::{Transport, TransportFuture, UdpTransport};

use std::time::Duration;

use udpfetch_protocol::{MAX_RETRIES, RECV_TIMEOUT};

/// Retry and timeout policy for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// How long to wait for a matching reply before resending.
    pub timeout: Duration,
    /// Send attempts per request before giving up.
    pub max_retries: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: RECV_TIMEOUT,
            max_retries: MAX_RETRIES,
        }
    }
}

/// Errors produced by a transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("no metadata reply for {resource} after {attempts} attempts")]
    MetadataTimeout { resource: String, attempts: u32 },

    #[error("chunk {index}/{chunk_count} of {resource} not received after {attempts} attempts")]
    ChunkTimeout {
        resource: String,
        index: u32,
        chunk_count: u32,
        attempts: u32,
    },
}
