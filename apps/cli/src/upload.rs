//! `taskdeck upload`: one upload with manual retry and Ctrl-C cancellation.

use std::path::Path;

use taskdeck_upload::{
    CancellationToken, ProgressCallback, UploadCoordinator, UploadError, UploadReceipt,
    UploadRequest,
};
use tracing::{info, warn};

use crate::progress::UploadBar;

/// Runs the upload, starting it again from scratch after a retryable
/// failure, at most `retries` extra times.
///
/// Aborts and local failures (bad path, unreadable file) end the loop at
/// once. The source file is reopened for every attempt.
pub async fn upload_with_retries(
    coordinator: &UploadCoordinator,
    local: &Path,
    destination: &str,
    retries: u32,
    bar: &UploadBar,
    cancel: &CancellationToken,
) -> Result<UploadReceipt, UploadError> {
    let attempts = retries.saturating_add(1);
    let mut attempt = 1;
    loop {
        let request = UploadRequest::from_path(local, destination)?;
        let callback: ProgressCallback = bar.callback();
        match coordinator
            .upload(request, Some(callback), cancel.clone())
            .await
        {
            Ok(receipt) => return Ok(receipt),
            Err(e) if e.is_retryable() && attempt < attempts && !cancel.is_cancelled() => {
                warn!(attempt, attempts, error = %e, "upload failed, starting again");
                attempt += 1;
                bar.restart(attempt);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Fires `cancel` on the first Ctrl-C. Later interrupts are swallowed.
pub fn cancel_on_ctrl_c(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling upload");
            cancel.cancel();
        }
    })
}
