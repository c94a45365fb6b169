//! Upload request and receipt types.

use std::path::Path;

use taskdeck_protocol::UploadStrategy;
use taskdeck_transfer::{PartResult, SourceFile};

use crate::error::UploadError;

/// A file to upload and where it should land.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Destination path in the storage service, e.g. `reports/q3.pdf`.
    pub destination_path: String,
    pub file: SourceFile,
}

impl UploadRequest {
    pub fn new(destination_path: impl Into<String>, file: SourceFile) -> Self {
        Self {
            destination_path: destination_path.into(),
            file,
        }
    }

    /// Opens `local` and targets `destination_path`.
    pub fn from_path(local: &Path, destination_path: impl Into<String>) -> Result<Self, UploadError> {
        let file = SourceFile::open(local)?;
        Ok(Self::new(destination_path, file))
    }
}

/// Summary of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub upload_id: String,
    pub destination_path: String,
    pub strategy: UploadStrategy,
    pub total_bytes: u64,
    pub part_count: u32,
    /// Part results in ascending part number. Empty for simple uploads.
    pub parts: Vec<PartResult>,
}
