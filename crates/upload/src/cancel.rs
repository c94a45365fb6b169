//! Cancellation bridge and spawned upload handles.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{UploadError, UploadOutcome};
use crate::types::UploadReceipt;

const LIVE: u8 = 0;
const CANCELLED: u8 = 1;
const SETTLED: u8 = 2;

/// Connects a caller's cancellation token to the in-flight upload.
///
/// Every await point of the pipeline that touches the network runs through
/// [`run`](Self::run), which drops the in-flight future as soon as the token
/// fires. Cheap to clone; clones share state.
///
/// A bridge is either cancelled or settled, never both: whichever of
/// [`cancel`](Self::cancel) and [`settle`](Self::settle) lands first wins.
#[derive(Debug, Clone)]
pub struct CancellationBridge {
    token: CancellationToken,
    state: Arc<AtomicU8>,
}

impl CancellationBridge {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            state: Arc::new(AtomicU8::new(LIVE)),
        }
    }

    /// Returns the underlying token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Fires the token. Returns `false` if the upload has already settled or
    /// the token had already fired.
    pub fn cancel(&self) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        if self
            .state
            .compare_exchange(LIVE, CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        debug!("cancellation requested");
        self.token.cancel();
        true
    }

    /// Returns `Err(Aborted)` if the token has fired.
    pub fn check(&self) -> Result<(), UploadError> {
        if self.token.is_cancelled() {
            return Err(UploadError::Aborted);
        }
        Ok(())
    }

    /// Runs `fut` to completion unless the token fires first.
    ///
    /// When both are ready at once, cancellation wins.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, UploadError> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(UploadError::Aborted),
            out = fut => Ok(out),
        }
    }

    /// Runs the last network exchange of an upload and settles the bridge
    /// the moment it completes.
    ///
    /// A cancellation that lands after `fut` is ready but before the bridge
    /// settles still wins, so a `cancel()` that returned `true` always
    /// matches an aborted outcome.
    pub async fn run_final<F: Future>(&self, fut: F) -> Result<F::Output, UploadError> {
        let out = self.run(fut).await?;
        if !self.settle() || self.token.is_cancelled() {
            return Err(UploadError::Aborted);
        }
        Ok(out)
    }

    /// Marks the upload as settled; later cancellation requests are no-ops.
    ///
    /// Returns `false` if a cancellation got there first.
    pub fn settle(&self) -> bool {
        match self
            .state
            .compare_exchange(LIVE, SETTLED, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => true,
            Err(current) => current == SETTLED,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.state.load(Ordering::SeqCst) == SETTLED
    }
}

/// Handle to an upload running on its own task.
pub struct UploadHandle {
    upload_id: String,
    bridge: CancellationBridge,
    task: JoinHandle<Result<UploadReceipt, UploadError>>,
}

impl UploadHandle {
    pub(crate) fn new(
        upload_id: String,
        bridge: CancellationBridge,
        task: JoinHandle<Result<UploadReceipt, UploadError>>,
    ) -> Self {
        Self {
            upload_id,
            bridge,
            task,
        }
    }

    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    /// Requests cancellation. Idempotent; returns `true` only for the call
    /// that actually fired the token before the upload settled, in which
    /// case the outcome is [`UploadOutcome::Aborted`].
    pub fn cancel(&self) -> bool {
        self.bridge.cancel()
    }

    /// Returns a clone of the bridge, e.g. to cancel from a signal handler.
    pub fn canceller(&self) -> CancellationBridge {
        self.bridge.clone()
    }

    /// Returns `true` once the upload task has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the upload to settle.
    pub async fn join(self) -> Result<UploadReceipt, UploadError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(UploadError::Aborted),
        }
    }

    /// Waits for the upload to settle and returns its outcome.
    pub async fn outcome(self) -> UploadOutcome {
        self.join().await.into()
    }
}
