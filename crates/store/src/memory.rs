use std::collections::BTreeMap;

use crate::{ResourceStore, StoreError, validate_name};

/// In-memory store, mainly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    resources: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a resource, returning the store for chaining.
    pub fn with(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(name, data);
        self
    }

    /// Adds (or replaces) a resource.
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.resources.insert(name.into(), data.into());
    }

    fn get(&self, name: &str) -> Option<&[u8]> {
        validate_name(name).ok()?;
        self.resources.get(name).map(Vec::as_slice)
    }
}

impl ResourceStore for MemoryStore {
    fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .resources
            .keys()
            .filter(|name| validate_name(name).is_ok())
            .cloned()
            .collect())
    }

    fn size(&self, name: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.get(name).map(|data| data.len() as u64))
    }

    fn read_range(&self, name: &str, offset: u64, len: usize) -> Result<Vec<u8>, StoreError> {
        let data = self
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let end = start.saturating_add(len).min(data.len());
        Ok(data[start..end].to_vec())
    }
}
