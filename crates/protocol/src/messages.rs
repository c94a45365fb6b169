use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Value of `upload_info.type` that selects a multipart upload.
pub const MULTIPART_UPLOAD_TYPE: &str = "multipart";

/// Path of the negotiation endpoint, relative to the API base URL.
pub const CREATE_FILE_PATH: &str = "/storage/files";

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Registers an intended upload with the storage service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFileRequest {
    pub path: String,
    pub size: u64,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Storage service answer to [`CreateFileRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFileResponse {
    pub upload_info: UploadInfo,
}

/// How the file must be transferred.
///
/// The service decides the strategy: `type == "multipart"` comes with `urls`,
/// anything else with a single `url` (plus optional `headers`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadInfo {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub upload_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<MultipartUrls>,
}

impl UploadInfo {
    /// Returns `true` when the service asked for a multipart upload.
    pub fn is_multipart(&self) -> bool {
        self.upload_type.as_deref() == Some(MULTIPART_UPLOAD_TYPE)
    }
}

/// Pre-signed URLs of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipartUrls {
    pub parts: Vec<PartUrl>,
    pub finalize: String,
}

/// One pre-signed part URL.
///
/// `n_bytes` is the nominal part size; the last part may carry fewer bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartUrl {
    pub part: u32,
    pub n_bytes: u64,
    pub url: String,
}
