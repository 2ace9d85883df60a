//! Read-only resource providers.
//!
//! The server core only sees resources through [`ResourceStore`]: a flat
//! namespace of byte sequences that can be listed, sized and read by range.
//! Providers never mutate anything, so a single instance is shared by every
//! request handler without locking.

mod directory;
mod listing;
mod memory;
mod validation;

pub use directory::DirectoryStore;
pub use listing::listing_document;
pub use memory::MemoryStore;
pub use validation::validate_name;

/// Errors produced by resource stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid resource root: {0}")]
    InvalidRoot(String),

    #[error("invalid resource name: {0}")]
    InvalidName(String),

    #[error("resource not found: {0}")]
    NotFound(String),
}

/// A read-only collection of named byte sequences.
pub trait ResourceStore: Send + Sync + 'static {
    /// Names of all resources, sorted by byte order.
    fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Byte length of `name`, or `None` if no such resource exists.
    ///
    /// Invalid names (see [`validate_name`]) are reported as missing.
    fn size(&self, name: &str) -> Result<Option<u64>, StoreError>;

    /// Reads up to `len` bytes of `name` starting at `offset`.
    ///
    /// Returns fewer bytes at the end of the resource and an empty buffer when
    /// `offset` is at or past the end.
    fn read_range(&self, name: &str, offset: u64, len: usize) -> Result<Vec<u8>, StoreError>;
}
