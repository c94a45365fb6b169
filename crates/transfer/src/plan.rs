use std::collections::HashMap;
use std::ops::Range;

use taskdeck_protocol::{CompletedPart, PartUrl, UploadStrategy};

use crate::TransferError;

/// One part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSpec {
    /// 1-based part number.
    pub part_number: u32,
    /// Pre-signed URL the part is `PUT` to.
    pub url: String,
    /// Byte offset of the part within the source file.
    pub offset: u64,
    /// Number of bytes in this part. Only the last part may be shorter than
    /// the nominal part size.
    pub byte_length: u64,
}

impl PartSpec {
    /// Byte range `[offset, offset + byte_length)` of this part.
    pub fn byte_range(&self) -> Range<u64> {
        self.offset..self.offset + self.byte_length
    }
}

/// How a file is transferred, as decided by the storage service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadPlan {
    /// One `PUT` of the whole file.
    Simple {
        url: String,
        headers: HashMap<String, String>,
    },
    /// Sequential part `PUT`s followed by a finalize `POST`.
    Multipart {
        parts: Vec<PartSpec>,
        finalize_url: String,
    },
}

/// Completion token of a transferred part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartResult {
    pub part_number: u32,
    pub etag: String,
}

impl From<PartResult> for CompletedPart {
    fn from(r: PartResult) -> Self {
        CompletedPart {
            part_number: r.part_number,
            etag: r.etag,
        }
    }
}

impl UploadPlan {
    /// Builds a simple plan.
    pub fn simple(
        url: String,
        headers: HashMap<String, String>,
    ) -> Result<Self, TransferError> {
        if url.is_empty() {
            return Err(TransferError::InvalidPlan("empty upload URL".into()));
        }
        Ok(UploadPlan::Simple { url, headers })
    }

    /// Builds a multipart plan from the service's part URLs.
    ///
    /// Part `i` (zero-based, ascending part number) covers
    /// `[i * n_bytes, min((i + 1) * n_bytes, file_size))`. The resulting parts
    /// must cover `[0, file_size)` exactly once; anything else, including a
    /// plan whose parts disagree on `n_bytes`, is rejected.
    pub fn multipart(
        mut urls: Vec<PartUrl>,
        finalize_url: String,
        file_size: u64,
    ) -> Result<Self, TransferError> {
        if finalize_url.is_empty() {
            return Err(TransferError::InvalidPlan("empty finalize URL".into()));
        }
        if urls.is_empty() {
            return Err(TransferError::InvalidPlan("no part URLs".into()));
        }

        urls.sort_by_key(|p| p.part);

        let part_count = urls.len();
        let mut parts = Vec::with_capacity(part_count);
        let mut covered = 0u64;

        for (index, url) in urls.into_iter().enumerate() {
            let expected = index as u32 + 1;
            if url.part != expected {
                return Err(TransferError::InvalidPlan(format!(
                    "expected part {expected}, got part {}",
                    url.part
                )));
            }
            if url.n_bytes == 0 {
                return Err(TransferError::InvalidPlan(format!(
                    "part {} has zero size",
                    url.part
                )));
            }
            if url.url.is_empty() {
                return Err(TransferError::InvalidPlan(format!(
                    "part {} has an empty URL",
                    url.part
                )));
            }

            let offset = (index as u64).saturating_mul(url.n_bytes);
            if offset != covered {
                return Err(TransferError::InvalidPlan(format!(
                    "part {} starts at byte {offset}, expected {covered}",
                    url.part
                )));
            }

            let end = offset.saturating_add(url.n_bytes).min(file_size);
            // A zero-byte file may still be sent as one empty part.
            if end <= offset && !(file_size == 0 && part_count == 1) {
                return Err(TransferError::InvalidPlan(format!(
                    "part {} starts at byte {offset}, beyond the {file_size}-byte file",
                    url.part
                )));
            }

            parts.push(PartSpec {
                part_number: url.part,
                url: url.url,
                offset,
                byte_length: end - offset,
            });
            covered = end;
        }

        if covered != file_size {
            return Err(TransferError::InvalidPlan(format!(
                "parts cover {covered} of {file_size} bytes"
            )));
        }

        Ok(UploadPlan::Multipart {
            parts,
            finalize_url,
        })
    }

    /// Returns the transfer strategy of this plan.
    pub fn strategy(&self) -> UploadStrategy {
        match self {
            UploadPlan::Simple { .. } => UploadStrategy::Simple,
            UploadPlan::Multipart { .. } => UploadStrategy::Multipart,
        }
    }

    /// Number of transfers the plan requires (1 for a simple plan).
    pub fn part_count(&self) -> u32 {
        match self {
            UploadPlan::Simple { .. } => 1,
            UploadPlan::Multipart { parts, .. } => parts.len() as u32,
        }
    }

    /// Byte length of every transfer, in part order.
    pub fn part_lengths(&self, file_size: u64) -> Vec<u64> {
        match self {
            UploadPlan::Simple { .. } => vec![file_size],
            UploadPlan::Multipart { parts, .. } => parts.iter().map(|p| p.byte_length).collect(),
        }
    }
}
