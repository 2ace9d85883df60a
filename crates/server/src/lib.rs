//! Stateless UDP server for udpfetch.
//!
//! Every datagram is an independent request: it is parsed into a
//! [`Command`](udpfetch_protocol::Command), answered from a read-only
//! [`ResourceStore`](udpfetch_store::ResourceStore), and forgotten. No
//! per-client state is kept between datagrams, so handlers run concurrently
//! on a bounded worker pool without any locking.

mod chunks;
mod dispatch;
mod fault;
mod metadata;
mod server;

pub use chunks::read_chunk;
pub use dispatch::{Dispatcher, Reply};
pub use fault::{FaultConfig, FaultInjector};
pub use metadata::resolve_chunk_count;
pub use server::{ServerConfig, ServerStats, UdpFetchServer};

/// Errors produced by the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },
}
