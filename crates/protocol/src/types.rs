use serde::{Deserialize, Serialize};

/// Current state of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in_progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl UploadStatus {
    /// Returns `true` once the upload has settled.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Transfer strategy chosen by the storage service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStrategy {
    Simple,
    Multipart,
}

/// Progress snapshot handed to progress callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub upload_id: String,
    pub status: UploadStatus,
    pub total_bytes: u64,
    pub transferred_bytes: u64,
    /// Part currently in flight (1-based), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_part: Option<u32>,
    pub part_count: u32,
    /// Aggregate percentage in `[0, 100]`.
    pub percent: f64,
}

impl UploadProgress {
    /// Returns the raw byte ratio as a percentage (0-100), without the
    /// monotonic/settlement rules applied to [`percent`](Self::percent).
    pub fn byte_percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.transferred_bytes as f64 * 100.0 / self.total_bytes as f64).min(100.0)
    }
}
