//! Multipart upload: sequential part transfers followed by finalize.

use std::sync::Arc;

use bytes::Bytes;
use taskdeck_protocol::{CompletedPart, XML_CONTENT_TYPE, complete_multipart_body};
use taskdeck_transfer::{PartResult, PartSpec, ProgressTracker, SourceFile};
use tracing::{debug, info};

use crate::cancel::CancellationBridge;
use crate::error::UploadError;
use crate::part::transfer_part;
use crate::state::{StateMachine, UploadState};
use crate::transport::{Transport, TransportRequest};

/// Drives the parts of one multipart upload, strictly one at a time.
pub struct MultipartUpload<'a> {
    transport: &'a dyn Transport,
    source: &'a SourceFile,
    tracker: &'a Arc<ProgressTracker>,
    bridge: &'a CancellationBridge,
}

impl<'a> MultipartUpload<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        source: &'a SourceFile,
        tracker: &'a Arc<ProgressTracker>,
        bridge: &'a CancellationBridge,
    ) -> Self {
        Self {
            transport,
            source,
            tracker,
            bridge,
        }
    }

    /// Transfers every part in ascending order, then finalizes.
    ///
    /// Part `n + 1` starts only after part `n` succeeded. The first failure
    /// stops the upload: no further parts are sent and finalize is skipped.
    /// Returns the part results sorted by part number.
    pub async fn run(
        &self,
        parts: &[PartSpec],
        finalize_url: &str,
        machine: &mut StateMachine,
    ) -> Result<Vec<PartResult>, UploadError> {
        let mut results = Vec::with_capacity(parts.len());

        for part in parts {
            self.bridge.check()?;
            machine.advance(UploadState::TransferringPart(part.part_number));
            self.tracker.begin_part(part.part_number);

            let body = self.read_part(part).await?;
            self.bridge.check()?;

            let result =
                transfer_part(self.transport, part, body, self.tracker, self.bridge).await?;
            results.push(result);
        }
        machine.advance(UploadState::AllPartsDone);

        results.sort_by_key(|r| r.part_number);

        self.bridge.check()?;
        machine.advance(UploadState::Finalizing);
        self.finalize(finalize_url, &results).await?;
        info!(parts = results.len(), "multipart upload finalized");
        Ok(results)
    }

    async fn read_part(&self, part: &PartSpec) -> Result<Bytes, UploadError> {
        let source = self.source.clone();
        let range = part.byte_range();
        let data = tokio::task::spawn_blocking(move || source.read_range(range))
            .await
            .map_err(|e| UploadError::SourceRead(format!("read task failed: {e}")))??;
        Ok(Bytes::from(data))
    }

    async fn finalize(&self, url: &str, results: &[PartResult]) -> Result<(), UploadError> {
        let completed: Vec<CompletedPart> = results.iter().cloned().map(Into::into).collect();
        let body = complete_multipart_body(&completed);
        debug!(parts = completed.len(), "finalizing multipart upload");

        let request = TransportRequest::post(url, body).header("Content-Type", XML_CONTENT_TYPE);
        let reply = self
            .bridge
            .run_final(self.transport.send(request, None))
            .await?
            .map_err(|e| UploadError::FinalizeFailed {
                status: None,
                message: e.to_string(),
            })?;

        if !reply.is_success() {
            return Err(UploadError::FinalizeFailed {
                status: Some(reply.status),
                message: reply.body_text(),
            });
        }
        Ok(())
    }
}
