//! The listing resource: a generated document naming every resource.
//!
//! Names are emitted in byte order, so regenerating the document against an
//! unchanged store yields identical bytes and chunk reads stay consistent
//! across requests.

use udpfetch_protocol::encode_listing;

use crate::{ResourceStore, StoreError};

/// Builds the listing document for `store`.
pub fn listing_document<S: ResourceStore + ?Sized>(store: &S) -> Result<Vec<u8>, StoreError> {
    let mut names = store.list()?;
    names.sort();
    Ok(encode_listing(&names))
}
