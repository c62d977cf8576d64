// crates/server/src/tasks.rs
//! Participants aggregation tasks.
//!
//! One task per period. The scheduler runs all four for yesterday; the API
//! runs any of them as a background job for an explicit reference day.

use std::sync::Arc;
use std::time::Instant;

use chatroom_reports_core::{yesterday, Period};
use chatroom_reports_db::{Database, DbResult, ParticipantsReport};
use chrono::NaiveDate;

use crate::jobs::{JobId, JobRunner, JobState};
use crate::metrics::record_report_run;

/// Job type reported in `JobProgress` for aggregation runs.
pub const PARTICIPANTS_JOB: &str = "participants";

/// Recomputes the running participants report for one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantsTask {
    period: Period,
}

impl ParticipantsTask {
    pub const ALL: [ParticipantsTask; 4] = [
        ParticipantsTask::new(Period::Daily),
        ParticipantsTask::new(Period::Monthly),
        ParticipantsTask::new(Period::Yearly),
        ParticipantsTask::new(Period::All),
    ];

    pub const fn new(period: Period) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    /// Run against `reference`, or yesterday when `None`.
    ///
    /// Returns `None` when the all-time task had no activity to report on.
    pub async fn run(
        &self,
        db: &Database,
        reference: Option<NaiveDate>,
    ) -> DbResult<Option<ParticipantsReport>> {
        let reference = reference.unwrap_or_else(yesterday);
        let start = Instant::now();
        let result = db.aggregate_participants(self.period, reference).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(Some(report)) => {
                record_report_run(self.period.as_str(), "ok", elapsed, Some(report.participants));
                tracing::info!(
                    period = %self.period,
                    reference = %reference,
                    participants = report.participants,
                    duration_ms = elapsed.as_millis() as u64,
                    "Participants report updated"
                );
            }
            Ok(None) => {
                record_report_run(self.period.as_str(), "skipped", elapsed, None);
                tracing::debug!(period = %self.period, "Participants report skipped: no activity");
            }
            Err(e) => {
                record_report_run(self.period.as_str(), "error", elapsed, None);
                tracing::warn!(period = %self.period, error = %e, "Participants report failed");
            }
        }
        result
    }
}

/// Run every participants task in order for `reference` (yesterday if `None`).
///
/// A failing task is logged and does not stop the others. Returns the rows
/// written.
pub async fn run_all_participants_tasks(
    db: &Database,
    reference: Option<NaiveDate>,
) -> Vec<ParticipantsReport> {
    let reference = reference.unwrap_or_else(yesterday);
    let mut written = Vec::with_capacity(ParticipantsTask::ALL.len());
    for task in ParticipantsTask::ALL {
        if let Ok(Some(report)) = task.run(db, Some(reference)).await {
            written.push(report);
        }
    }
    written
}

/// Start a background job running `periods` for `reference`.
///
/// The job fails on the first task error; later periods are not attempted.
pub fn start_participants_job(
    jobs: &JobRunner,
    db: Database,
    periods: Vec<Period>,
    reference: NaiveDate,
) -> JobId {
    let total = periods.len() as u64;
    jobs.start_job(PARTICIPANTS_JOB, total, move |state: Arc<JobState>| async move {
        for period in periods {
            let report = ParticipantsTask::new(period)
                .run(&db, Some(reference))
                .await
                .map_err(|e| format!("{period}: {e}"))?;
            match report {
                Some(r) => state.set_message(format!("{period}: {} participants", r.participants)),
                None => state.set_message(format!("{period}: no activity")),
            }
            state.increment();
        }
        Ok(())
    })
}
