//! Upload coordinator.
//!
//! Runs one upload end to end: path validation, negotiation, single-shot or
//! multipart transfer, progress settlement and logging. Every upload gets a
//! fresh `upload_id` that tags its tracing span and progress snapshots.

use std::sync::Arc;

use taskdeck_transfer::{ProgressCallback, ProgressTracker, UploadPlan, validate_destination_path};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::cancel::{CancellationBridge, UploadHandle};
use crate::error::UploadError;
use crate::multipart::MultipartUpload;
use crate::negotiator::Negotiator;
use crate::single::upload_simple;
use crate::state::{StateMachine, UploadState};
use crate::transport::Transport;
use crate::types::{UploadReceipt, UploadRequest};

/// Uploads files through a [`Transport`] to one storage API.
pub struct UploadCoordinator {
    transport: Arc<dyn Transport>,
    api_url: String,
}

impl UploadCoordinator {
    /// Creates a coordinator for the API at `api_url`.
    pub fn new(transport: Arc<dyn Transport>, api_url: impl Into<String>) -> Self {
        Self {
            transport,
            api_url: api_url.into(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Uploads `request.file` to `request.destination_path`.
    ///
    /// `on_progress` receives 0 once the transfer starts, monotonically
    /// increasing values while bytes flow, and exactly 100 only on success.
    /// Firing `cancel` at any point settles the upload as
    /// [`UploadError::Aborted`] and stops all further network activity.
    pub async fn upload(
        &self,
        request: UploadRequest,
        on_progress: Option<ProgressCallback>,
        cancel: CancellationToken,
    ) -> Result<UploadReceipt, UploadError> {
        let upload_id = Uuid::new_v4().to_string();
        let bridge = CancellationBridge::new(cancel);
        self.upload_with_id(upload_id, request, on_progress, bridge).await
    }

    /// Starts the upload on its own task and returns a handle to it.
    pub fn spawn(
        self: &Arc<Self>,
        request: UploadRequest,
        on_progress: Option<ProgressCallback>,
    ) -> UploadHandle {
        let upload_id = Uuid::new_v4().to_string();
        let bridge = CancellationBridge::new(CancellationToken::new());
        let this = Arc::clone(self);
        let task = {
            let id = upload_id.clone();
            let bridge = bridge.clone();
            tokio::spawn(async move { this.upload_with_id(id, request, on_progress, bridge).await })
        };
        UploadHandle::new(upload_id, bridge, task)
    }

    async fn upload_with_id(
        &self,
        upload_id: String,
        request: UploadRequest,
        on_progress: Option<ProgressCallback>,
        bridge: CancellationBridge,
    ) -> Result<UploadReceipt, UploadError> {
        let span = info_span!(
            "upload",
            upload_id = %upload_id,
            destination = %request.destination_path,
        );

        async move {
            let tracker = Arc::new(ProgressTracker::new(&upload_id, request.file.size()));
            if let Some(cb) = on_progress {
                tracker.on_progress(cb);
            }
            let mut machine = StateMachine::new();

            info!(
                file = %request.file.path().display(),
                bytes = request.file.size(),
                "upload started"
            );
            let result = self
                .run(&upload_id, &request, &tracker, &bridge, &mut machine)
                .await;
            bridge.settle();
            let last_state = machine.current();

            match &result {
                Ok(receipt) => {
                    machine.advance(UploadState::Finalized);
                    tracker.complete();
                    info!(
                        strategy = ?receipt.strategy,
                        parts = receipt.part_count,
                        bytes = receipt.total_bytes,
                        "upload completed"
                    );
                }
                Err(UploadError::Aborted) => {
                    machine.advance(UploadState::Aborted);
                    tracker.cancel();
                    warn!(during = %last_state, "upload aborted");
                }
                Err(e) => {
                    machine.advance(UploadState::Failed);
                    tracker.fail();
                    error!(during = %last_state, kind = %e.kind(), error = %e, "upload failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        upload_id: &str,
        request: &UploadRequest,
        tracker: &Arc<ProgressTracker>,
        bridge: &CancellationBridge,
        machine: &mut StateMachine,
    ) -> Result<UploadReceipt, UploadError> {
        validate_destination_path(&request.destination_path)?;
        bridge.check()?;

        let size = request.file.size();
        machine.advance(UploadState::Negotiating);
        let negotiator = Negotiator::new(self.transport.as_ref(), &self.api_url);
        let plan = bridge
            .run(negotiator.negotiate(&request.destination_path, size))
            .await??;

        tracker.set_parts(plan.part_lengths(size));
        tracker.start();

        let strategy = plan.strategy();
        let part_count = plan.part_count();
        let parts = match &plan {
            UploadPlan::Simple { url, headers } => {
                upload_simple(
                    self.transport.as_ref(),
                    &request.file,
                    url,
                    headers,
                    tracker,
                    bridge,
                    machine,
                )
                .await?;
                Vec::new()
            }
            UploadPlan::Multipart {
                parts,
                finalize_url,
            } => {
                MultipartUpload::new(self.transport.as_ref(), &request.file, tracker, bridge)
                    .run(parts, finalize_url, machine)
                    .await?
            }
        };

        Ok(UploadReceipt {
            upload_id: upload_id.to_string(),
            destination_path: request.destination_path.clone(),
            strategy,
            total_bytes: size,
            part_count,
            parts,
        })
    }
}
