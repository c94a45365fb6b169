//! Upload error types and the settled outcome of an upload.

use taskdeck_transfer::TransferError;

use crate::types::UploadReceipt;

/// Errors produced while uploading a file.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid destination path: {0}")]
    InvalidPath(String),

    #[error("failed to read source file: {0}")]
    SourceRead(String),

    #[error("negotiation failed{}: {message}", status_label(.status))]
    NegotiationFailed {
        status: Option<u16>,
        message: String,
    },

    #[error("transport error{}: {message}", part_label(.part))]
    Transport { part: Option<u32>, message: String },

    #[error("server rejected upload{}: HTTP {status}", part_label(.part))]
    ServerRejected { status: u16, part: Option<u32> },

    #[error("part {0} succeeded without an ETag")]
    MissingETag(u32),

    #[error("finalize failed{}: {message}", status_label(.status))]
    FinalizeFailed {
        status: Option<u16>,
        message: String,
    },

    #[error("upload aborted")]
    Aborted,
}

fn part_label(part: &Option<u32>) -> String {
    part.map(|n| format!(" (part {n})")).unwrap_or_default()
}

fn status_label(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl From<TransferError> for UploadError {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::InvalidPath(msg) => UploadError::InvalidPath(msg),
            TransferError::Io(err) => UploadError::SourceRead(err.to_string()),
            TransferError::InvalidPlan(msg) => UploadError::NegotiationFailed {
                status: None,
                message: msg,
            },
        }
    }
}

/// Coarse classification of an [`UploadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidPath,
    SourceRead,
    NegotiationFailed,
    TransportError,
    ServerRejected,
    MissingETag,
    FinalizeFailed,
    Aborted,
}

impl ErrorKind {
    /// Stable snake_case name, used in logs and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidPath => "invalid_path",
            ErrorKind::SourceRead => "source_read",
            ErrorKind::NegotiationFailed => "negotiation_failed",
            ErrorKind::TransportError => "transport_error",
            ErrorKind::ServerRejected => "server_rejected",
            ErrorKind::MissingETag => "missing_etag",
            ErrorKind::FinalizeFailed => "finalize_failed",
            ErrorKind::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl UploadError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::InvalidPath(_) => ErrorKind::InvalidPath,
            UploadError::SourceRead(_) => ErrorKind::SourceRead,
            UploadError::NegotiationFailed { .. } => ErrorKind::NegotiationFailed,
            UploadError::Transport { .. } => ErrorKind::TransportError,
            UploadError::ServerRejected { .. } => ErrorKind::ServerRejected,
            UploadError::MissingETag(_) => ErrorKind::MissingETag,
            UploadError::FinalizeFailed { .. } => ErrorKind::FinalizeFailed,
            UploadError::Aborted => ErrorKind::Aborted,
        }
    }

    /// Returns `true` if starting the whole upload again may succeed.
    ///
    /// Local problems and user aborts are never retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            UploadError::InvalidPath(_) | UploadError::SourceRead(_) | UploadError::Aborted
        )
    }
}

/// Exactly one of these is produced per upload.
#[derive(Debug)]
pub enum UploadOutcome {
    Success(UploadReceipt),
    Failure { kind: ErrorKind, message: String },
    Aborted,
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success(_))
    }
}

impl From<Result<UploadReceipt, UploadError>> for UploadOutcome {
    fn from(result: Result<UploadReceipt, UploadError>) -> Self {
        match result {
            Ok(receipt) => UploadOutcome::Success(receipt),
            Err(UploadError::Aborted) => UploadOutcome::Aborted,
            Err(e) => UploadOutcome::Failure {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}
