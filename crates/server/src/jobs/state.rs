// crates/server/src/jobs/state.rs
//! Atomic state tracking for a single background job.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::RwLock;
use tokio::sync::broadcast;

use super::types::{JobId, JobProgress, JobStatus};

/// Atomic state for a single job.
///
/// Counters and status are lock-free; only `message` sits behind a RwLock.
pub struct JobState {
    id: JobId,
    job_type: String,
    status: AtomicU8,
    current: AtomicU64,
    total: AtomicU64,
    message: RwLock<Option<String>>,
    progress_tx: broadcast::Sender<JobProgress>,
}

impl JobState {
    pub fn new(id: JobId, job_type: String, total: u64) -> Self {
        let (progress_tx, _) = broadcast::channel(64);
        Self {
            id,
            job_type,
            status: AtomicU8::new(JobStatus::Pending as u8),
            current: AtomicU64::new(0),
            total: AtomicU64::new(total),
            message: RwLock::new(None),
            progress_tx,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn status(&self) -> JobStatus {
        JobStatus::from_u8(self.status.load(Ordering::Relaxed))
    }

    pub fn set_running(&self) {
        self.set_status(JobStatus::Running);
    }

    /// Increment the progress counter and broadcast an update.
    /// Returns the new current value.
    pub fn increment(&self) -> u64 {
        let new = self.current.fetch_add(1, Ordering::Relaxed) + 1;
        self.broadcast_progress();
        new
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.store_message(msg.into());
        self.broadcast_progress();
    }

    pub fn complete(&self) {
        self.set_status(JobStatus::Completed);
    }

    pub fn cancel(&self) {
        self.store_message("Cancelled".to_string());
        self.set_status(JobStatus::Cancelled);
    }

    pub fn fail(&self, error: impl Into<String>) {
        self.store_message(error.into());
        self.set_status(JobStatus::Failed);
    }

    /// Subscribe to progress updates for this specific job.
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgress> {
        self.progress_tx.subscribe()
    }

    pub fn snapshot(&self) -> JobProgress {
        JobProgress {
            job_id: self.id,
            job_type: self.job_type.clone(),
            status: self.status(),
            current: self.current.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
            message: match self.message.read() {
                Ok(g) => g.clone(),
                Err(e) => {
                    tracing::error!("RwLock poisoned reading message: {e}");
                    None
                }
            },
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn set_status(&self, status: JobStatus) {
        self.status.store(status as u8, Ordering::Relaxed);
        self.broadcast_progress();
    }

    fn store_message(&self, msg: String) {
        match self.message.write() {
            Ok(mut guard) => *guard = Some(msg),
            Err(e) => tracing::error!("RwLock poisoned writing message: {e}"),
        }
    }

    fn broadcast_progress(&self) {
        // No subscribers is fine.
        let _ = self.progress_tx.send(self.snapshot());
    }
}
