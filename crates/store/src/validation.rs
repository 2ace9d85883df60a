use std::path::{Component, Path};

use crate::StoreError;

/// Validates that a resource name refers to a single entry directly under
/// the store root.
///
/// Rejects:
/// - Empty names
/// - Absolute paths (Unix `/` or Windows `C:\`)
/// - Any path separator, so nested paths cannot be requested
/// - `.` and `..` components
/// - Line breaks, which cannot travel inside a one-line command
/// - Leading or trailing whitespace, which command parsing trims away
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() {
        return Err(StoreError::InvalidName("empty name".into()));
    }

    if name.trim() != name {
        return Err(StoreError::InvalidName(format!(
            "surrounding whitespace not allowed: {name:?}"
        )));
    }

    if name.contains(['\n', '\r']) {
        return Err(StoreError::InvalidName(format!(
            "line break not allowed: {name:?}"
        )));
    }

    if name.contains(['/', '\\']) {
        return Err(StoreError::InvalidName(format!(
            "path separator not allowed: {name}"
        )));
    }

    // Windows drive prefix (`C:`).
    if name.len() >= 2 && name.as_bytes()[1] == b':' {
        return Err(StoreError::InvalidName(format!(
            "drive prefix not allowed: {name}"
        )));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(StoreError::InvalidName(format!(
            "not a plain file name: {name}"
        ))),
    }
}
