//! Wire types for the storage service upload contract.
//!
//! Covers the JSON negotiation exchange (`POST /storage/files`), the XML
//! body that finalizes a multipart upload, and the progress/status DTOs
//! reported to callers.

pub mod complete;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use complete::{CompletedPart, XML_CONTENT_TYPE, complete_multipart_body};
pub use messages::{
    CREATE_FILE_PATH, CreateFileRequest, CreateFileResponse, MULTIPART_UPLOAD_TYPE,
    MultipartUrls, PartUrl, UploadInfo,
};
pub use types::{UploadProgress, UploadStatus, UploadStrategy};
