// crates/server/src/state.rs
//! Application state for the Axum server.

use crate::jobs::JobRunner;
use chatroom_reports_db::Database;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    pub db: Database,
    /// Background runner for manually triggered aggregation runs.
    pub jobs: Arc<JobRunner>,
}

impl AppState {
    pub fn new(db: Database) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            db,
            jobs: Arc::new(JobRunner::new()),
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_state() -> Arc<AppState> {
        let db = Database::new_in_memory().await.expect("in-memory DB");
        AppState::new(db)
    }

    #[tokio::test]
    async fn test_app_state_new() {
        let state = test_state().await;
        assert!(state.uptime_secs() < 1);
        assert!(state.jobs.active_jobs().is_empty());
    }

    #[tokio::test]
    async fn test_app_state_clone_shares_runner() {
        let state = test_state().await;
        let cloned = Arc::clone(&state);
        assert!(Arc::ptr_eq(&state.jobs, &cloned.jobs));
    }
}
