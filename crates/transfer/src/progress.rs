use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use taskdeck_protocol::{UploadProgress, UploadStatus};

/// Highest percentage reported before the upload has settled successfully.
///
/// 100 is reserved for "finished", which for multipart uploads only happens
/// after finalize.
pub const PRE_COMPLETION_CAP: f64 = 99.9;

/// Callback invoked with every progress update.
pub type ProgressCallback = Arc<dyn Fn(&UploadProgress) + Send + Sync>;

/// Aggregates per-part byte counts of one upload into a single percentage.
///
/// The reported percentage never decreases and never exceeds 100.
pub struct ProgressTracker {
    inner: Mutex<TrackerInner>,
    callbacks: RwLock<Vec<ProgressCallback>>,
}

struct TrackerInner {
    upload_id: String,
    status: UploadStatus,
    total_bytes: u64,
    part_lengths: Vec<u64>,
    part_bytes: Vec<u64>,
    current_part: Option<u32>,
    percent: f64,
}

impl TrackerInner {
    fn transferred(&self) -> u64 {
        self.part_bytes.iter().sum()
    }

    fn snapshot(&self) -> UploadProgress {
        UploadProgress {
            upload_id: self.upload_id.clone(),
            status: self.status,
            total_bytes: self.total_bytes,
            transferred_bytes: self.transferred(),
            current_part: self.current_part,
            part_count: self.part_lengths.len() as u32,
            percent: self.percent,
        }
    }
}

impl ProgressTracker {
    /// Creates a pending tracker for a `total_bytes` upload sent as one part.
    pub fn new(upload_id: impl Into<String>, total_bytes: u64) -> Self {
        Self {
            inner: Mutex::new(TrackerInner {
                upload_id: upload_id.into(),
                status: UploadStatus::Pending,
                total_bytes,
                part_lengths: vec![total_bytes],
                part_bytes: vec![0],
                current_part: None,
                percent: 0.0,
            }),
            callbacks: RwLock::new(Vec::new()),
        }
    }

    /// Registers a progress callback.
    pub fn on_progress(&self, callback: ProgressCallback) {
        let mut callbacks = self.callbacks.write().unwrap_or_else(|e| e.into_inner());
        callbacks.push(callback);
    }

    /// Replaces the part layout once the plan is known. Resets byte counts.
    pub fn set_parts(&self, part_lengths: Vec<u64>) {
        let mut s = self.lock();
        s.part_bytes = vec![0; part_lengths.len()];
        s.part_lengths = part_lengths;
    }

    /// Marks the upload as in progress and reports 0%.
    pub fn start(&self) {
        let snapshot = {
            let mut s = self.lock();
            s.status = UploadStatus::InProgress;
            s.snapshot()
        };
        self.notify(&snapshot);
    }

    /// Records that `part_number` is now in flight.
    pub fn begin_part(&self, part_number: u32) {
        let mut s = self.lock();
        s.current_part = Some(part_number);
    }

    /// Records the cumulative bytes sent for `part_number` (1-based).
    ///
    /// Values above the part length are clamped, values below a previously
    /// recorded count are ignored. Callbacks run only when the aggregate
    /// byte count changed.
    pub fn record(&self, part_number: u32, sent: u64) {
        let snapshot = {
            let mut s = self.lock();
            let Some(index) = (part_number as usize).checked_sub(1) else {
                return;
            };
            let Some(&length) = s.part_lengths.get(index) else {
                return;
            };
            let sent = sent.min(length);
            if sent <= s.part_bytes[index] {
                return;
            }
            s.part_bytes[index] = sent;

            if s.total_bytes > 0 {
                let ratio = s.transferred() as f64 * 100.0 / s.total_bytes as f64;
                s.percent = s.percent.max(ratio.min(PRE_COMPLETION_CAP));
            }
            s.snapshot()
        };
        self.notify(&snapshot);
    }

    /// Marks the upload as completed; the percentage becomes exactly 100.
    pub fn complete(&self) {
        let snapshot = {
            let mut s = self.lock();
            s.status = UploadStatus::Completed;
            s.current_part = None;
            let lengths = s.part_lengths.clone();
            s.part_bytes = lengths;
            s.percent = 100.0;
            s.snapshot()
        };
        self.notify(&snapshot);
    }

    /// Marks the upload as failed. The percentage is left where it was.
    pub fn fail(&self) {
        self.settle(UploadStatus::Failed);
    }

    /// Marks the upload as cancelled. The percentage is left where it was.
    pub fn cancel(&self) {
        self.settle(UploadStatus::Cancelled);
    }

    /// Returns the current progress snapshot.
    pub fn snapshot(&self) -> UploadProgress {
        self.lock().snapshot()
    }

    /// Returns the current aggregate percentage.
    pub fn percent(&self) -> f64 {
        self.lock().percent
    }

    fn settle(&self, status: UploadStatus) {
        let snapshot = {
            let mut s = self.lock();
            s.status = status;
            s.current_part = None;
            s.snapshot()
        };
        self.notify(&snapshot);
    }

    fn notify(&self, progress: &UploadProgress) {
        let callbacks = self.callbacks.read().unwrap_or_else(|e| e.into_inner());
        for cb in callbacks.iter() {
            cb(progress);
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
