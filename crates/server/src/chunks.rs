//! Chunk reads for fetch requests.

use udpfetch_protocol::{CHUNK_SIZE, ResourceId, chunk_range};
use udpfetch_store::{ResourceStore, StoreError, listing_document};

/// Reads chunk `index` of `resource`.
///
/// Returns `None` when the resource does not exist or the chunk starts at or
/// past its end; the caller sends no reply in that case. The resource is read
/// fresh on every call.
pub fn read_chunk<S: ResourceStore + ?Sized>(
    store: &S,
    resource: &ResourceId,
    index: u32,
) -> Result<Option<Vec<u8>>, StoreError> {
    match resource {
        ResourceId::Listing => {
            let doc = listing_document(store)?;
            Ok(chunk_range(index, doc.len() as u64)
                .map(|range| doc[range.start as usize..range.end as usize].to_vec()))
        }
        ResourceId::Named(name) => {
            let Some(len) = store.size(name)? else {
                return Ok(None);
            };
            let Some(range) = chunk_range(index, len) else {
                return Ok(None);
            };

            let want = (range.end - range.start) as usize;
            debug_assert!(want <= CHUNK_SIZE);
            let data = store.read_range(name, range.start, want)?;
            // The file shrank between the size check and the read.
            if data.is_empty() {
                return Ok(None);
            }
            Ok(Some(data))
        }
    }
}
