// crates/server/src/jobs/runner.rs
//! Central job runner that manages all background jobs.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{broadcast, oneshot};

use super::state::JobState;
use super::types::{JobId, JobProgress};

/// Finished jobs kept around for `GET /api/jobs?all=true`.
const MAX_RETAINED_JOBS: usize = 100;

type CancelMap = Arc<Mutex<HashMap<JobId, oneshot::Sender<()>>>>;

/// Central job runner that manages all background jobs.
///
/// Call `start_job` to spawn async work with progress tracking, `cancel` to
/// abort it, and `subscribe` to get SSE-compatible updates for every job.
pub struct JobRunner {
    next_id: AtomicU64,
    jobs: RwLock<HashMap<JobId, Arc<JobState>>>,
    cancels: CancelMap,
    global_tx: broadcast::Sender<JobProgress>,
}

impl JobRunner {
    pub fn new() -> Self {
        let (global_tx, _) = broadcast::channel(256);
        Self {
            next_id: AtomicU64::new(1),
            jobs: RwLock::new(HashMap::new()),
            cancels: Arc::new(Mutex::new(HashMap::new())),
            global_tx,
        }
    }

    /// Start a new background job and return its id.
    ///
    /// `f` receives the job's `JobState` for progress reporting. Cancelling
    /// the job drops the future returned by `f`.
    pub fn start_job<F, Fut>(&self, job_type: impl Into<String>, total: u64, f: F) -> JobId
    where
        F: FnOnce(Arc<JobState>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(JobState::new(id, job_type.into(), total));

        match self.jobs.write() {
            Ok(mut jobs) => {
                prune_finished(&mut jobs);
                jobs.insert(id, Arc::clone(&state));
            }
            Err(e) => tracing::error!("RwLock poisoned writing jobs map: {e}"),
        }

        let (cancel_tx, cancel_rx) = oneshot::channel();
        match self.cancels.lock() {
            Ok(mut cancels) => {
                cancels.insert(id, cancel_tx);
            }
            Err(e) => tracing::error!("Mutex poisoned writing cancel map: {e}"),
        }

        // Forward job progress to the global channel.
        let global_tx = self.global_tx.clone();
        let mut rx = state.subscribe();
        tokio::spawn(async move {
            while let Ok(progress) = rx.recv().await {
                let finished = progress.status.is_finished();
                let _ = global_tx.send(progress);
                if finished {
                    break;
                }
            }
        });

        let cancels = Arc::clone(&self.cancels);
        let state_for_task = Arc::clone(&state);
        tokio::spawn(async move {
            state_for_task.set_running();
            tokio::select! {
                result = f(Arc::clone(&state_for_task)) => match result {
                    Ok(()) => state_for_task.complete(),
                    Err(e) => state_for_task.fail(e),
                },
                Ok(()) = cancel_rx => state_for_task.cancel(),
            }
            if let Ok(mut cancels) = cancels.lock() {
                cancels.remove(&id);
            }
        });

        id
    }

    /// Request cancellation. Returns true if the job was still running.
    pub fn cancel(&self, id: JobId) -> bool {
        let sender = match self.cancels.lock() {
            Ok(mut cancels) => cancels.remove(&id),
            Err(e) => {
                tracing::error!("Mutex poisoned reading cancel map: {e}");
                None
            }
        };
        sender.map(|tx| tx.send(()).is_ok()).unwrap_or(false)
    }

    /// Subscribe to all job progress updates (for SSE streaming).
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgress> {
        self.global_tx.subscribe()
    }

    pub fn get_job(&self, id: JobId) -> Option<JobProgress> {
        match self.jobs.read() {
            Ok(jobs) => jobs.get(&id).map(|s| s.snapshot()),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs map: {e}");
                None
            }
        }
    }

    /// Jobs that have not finished yet, oldest first.
    pub fn active_jobs(&self) -> Vec<JobProgress> {
        let mut jobs: Vec<JobProgress> = self
            .all_jobs()
            .into_iter()
            .filter(|p| !p.status.is_finished())
            .collect();
        jobs.sort_by_key(|p| p.job_id);
        jobs
    }

    /// Every retained job, newest first.
    pub fn all_jobs(&self) -> Vec<JobProgress> {
        let mut jobs: Vec<JobProgress> = match self.jobs.read() {
            Ok(jobs) => jobs.values().map(|s| s.snapshot()).collect(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs: {e}");
                Vec::new()
            }
        };
        jobs.sort_by(|a, b| b.job_id.cmp(&a.job_id));
        jobs
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn prune_finished(jobs: &mut HashMap<JobId, Arc<JobState>>) {
    if jobs.len() < MAX_RETAINED_JOBS {
        return;
    }
    let mut finished: Vec<JobId> = jobs
        .values()
        .filter(|s| s.status().is_finished())
        .map(|s| s.id())
        .collect();
    finished.sort_unstable();
    let excess = jobs.len() + 1 - MAX_RETAINED_JOBS;
    for id in finished.into_iter().take(excess) {
        jobs.remove(&id);
    }
}
