//! Upload coordinator for the storage service.
//!
//! Uploads one local file to a destination path, letting the storage service
//! pick between a single pre-signed `PUT` and a multipart upload, reporting
//! aggregate progress, and honouring a cancellation token at every step.
//!
//! # Pipeline
//!
//! 1. **Negotiate**: `POST /storage/files` returns the upload plan
//! 2. **Transfer**: one `PUT` of the whole file, or one `PUT` per part in
//!    ascending order, collecting ETags
//! 3. **Finalize** (multipart only): `POST` of the `CompleteMultipartUpload`
//!    document
//!
//! The network is reached through the [`Transport`] trait; [`HttpTransport`]
//! is the `reqwest` implementation.

pub mod cancel;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod multipart;
pub mod negotiator;
pub mod part;
pub mod single;
pub mod state;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export primary types for convenience.
pub use cancel::{CancellationBridge, UploadHandle};
pub use coordinator::UploadCoordinator;
pub use error::{ErrorKind, UploadError, UploadOutcome};
pub use http::{HttpTransport, HttpTransportConfig};
pub use negotiator::Negotiator;
pub use state::UploadState;
pub use transport::{Method, ProgressSink, Transport, TransportError, TransportReply, TransportRequest};
pub use types::{UploadReceipt, UploadRequest};

pub use taskdeck_protocol::{UploadProgress, UploadStatus, UploadStrategy};
pub use taskdeck_transfer::{PartResult, ProgressCallback, SourceFile, UploadPlan};
pub use tokio_util::sync::CancellationToken;
