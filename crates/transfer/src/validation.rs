use std::path::{Component, Path};

use crate::TransferError;

/// Validates a remote destination path before an upload is negotiated.
///
/// Rejects:
/// - Empty paths (or paths made only of `/`)
/// - Paths ending in `/` (a folder, not a file)
/// - Parent directory traversal (`..`)
/// - Windows prefix components (`C:`, `\\server`)
///
/// A leading `/` is accepted; storage paths are rooted at the user's space.
pub fn validate_destination_path(destination: &str) -> Result<(), TransferError> {
    if destination.trim_matches('/').is_empty() {
        return Err(TransferError::InvalidPath("empty destination path".into()));
    }

    if destination.ends_with('/') {
        return Err(TransferError::InvalidPath(format!(
            "destination is a folder, not a file: {destination}"
        )));
    }

    for component in Path::new(destination).components() {
        match component {
            Component::ParentDir => {
                return Err(TransferError::InvalidPath(format!(
                    "parent directory traversal not allowed: {destination}"
                )));
            }
            Component::Prefix(_) => {
                return Err(TransferError::InvalidPath(format!(
                    "path prefix not allowed: {destination}"
                )));
            }
            Component::RootDir | Component::CurDir | Component::Normal(_) => {}
        }
    }

    Ok(())
}
