//! Upload plans, source-file slicing and aggregate progress tracking.
//!
//! Everything here is transport-agnostic: the `taskdeck-upload` crate drives
//! these types over HTTP.

mod plan;
mod progress;
mod source;
mod validation;

pub use plan::{PartResult, PartSpec, UploadPlan};
pub use progress::{PRE_COMPLETION_CAP, ProgressCallback, ProgressTracker};
pub use source::SourceFile;
pub use validation::validate_destination_path;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid upload plan: {0}")]
    InvalidPlan(String),
}
