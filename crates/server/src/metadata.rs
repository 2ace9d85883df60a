//! Chunk count resolution for info requests.

use tracing::warn;
use udpfetch_protocol::{ResourceId, chunk_count};
use udpfetch_store::{ResourceStore, StoreError, listing_document};

/// Number of chunks `resource` spans, or `None` if it does not exist.
///
/// Recomputed from the store on every call. A resource too large for the
/// 32-bit sequence space is reported as missing.
pub fn resolve_chunk_count<S: ResourceStore + ?Sized>(
    store: &S,
    resource: &ResourceId,
) -> Result<Option<u32>, StoreError> {
    let len = match resource {
        ResourceId::Listing => listing_document(store)?.len() as u64,
        ResourceId::Named(name) => match store.size(name)? {
            Some(len) => len,
            None => return Ok(None),
        },
    };

    let count = chunk_count(len);
    match u32::try_from(count) {
        Ok(count) => Ok(Some(count)),
        Err(_) => {
            warn!(%resource, len, "resource exceeds sequence space");
            Ok(None)
        }
    }
}
