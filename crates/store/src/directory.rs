//! Directory-backed store: every regular file directly under the root is a
//! resource named after its file name.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{ResourceStore, StoreError, validate_name};

/// Serves the regular files of a single directory.
///
/// Subdirectories are not listed and cannot be addressed. Files are opened
/// fresh on every read; the directory is assumed not to change while a client
/// is transferring from it.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Opens `root` as a store.
    ///
    /// Fails if `root` does not exist or is not a directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let root = std::fs::canonicalize(&root)
            .map_err(|e| StoreError::InvalidRoot(format!("{}: {e}", root.display())))?;

        if !root.is_dir() {
            return Err(StoreError::InvalidRoot(format!(
                "not a directory: {}",
                root.display()
            )));
        }

        Ok(Self { root })
    }

    /// Absolute path of the store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `name` to a regular file under the root, if there is one.
    fn resolve(&self, name: &str) -> Option<(PathBuf, std::fs::Metadata)> {
        if let Err(e) = validate_name(name) {
            debug!(name, "rejected resource name: {e}");
            return None;
        }

        let path = self.root.join(name);
        // Follows symlinks, so a link to a regular file is served as one.
        let metadata = std::fs::metadata(&path).ok()?;
        metadata.is_file().then_some((path, metadata))
    }
}

impl ResourceStore for DirectoryStore {
    fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = std::fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                if validate_name(&name).is_err() {
                    return None;
                }
                let metadata = std::fs::metadata(entry.path()).ok()?;
                metadata.is_file().then_some(name)
            })
            .collect();

        names.sort();
        Ok(names)
    }

    fn size(&self, name: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.resolve(name).map(|(_, metadata)| metadata.len()))
    }

    fn read_range(&self, name: &str, offset: u64, len: usize) -> Result<Vec<u8>, StoreError> {
        let (path, _) = self
            .resolve(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        let mut file = File::open(&path)?;
        file.seek(SeekFrom::Start(offset))?;

        let mut buf = Vec::with_capacity(len);
        file.take(len as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }
}
