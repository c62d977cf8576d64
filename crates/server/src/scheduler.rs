// crates/server/src/scheduler.rs
//! Periodic participants aggregation.
//!
//! Startup rebuilds recent daily buckets, then runs every task once. After
//! that the loop sleeps for the configured interval, re-read from the
//! database each cycle so changes apply without a restart.

use std::time::{Duration, Instant};

use chatroom_reports_core::{yesterday, Period};
use chatroom_reports_db::Database;
use tokio::task::JoinHandle;

use crate::metrics::record_backfill;
use crate::tasks::run_all_participants_tasks;

const DEFAULT_INTERVAL_SECS: u64 = 3600;

/// Rebuild the last `backfill_days` daily buckets ending yesterday.
///
/// Returns the number of rows written; errors are logged, not propagated.
pub async fn run_startup_backfill(db: &Database) -> u32 {
    let days = match db.get_app_settings().await {
        Ok(settings) => u32::try_from(settings.backfill_days).unwrap_or(0),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read backfill_days; skipping backfill");
            return 0;
        }
    };

    let start = Instant::now();
    match db.backfill_participants(Period::Daily, days, yesterday()).await {
        Ok(rows) => {
            record_backfill(rows);
            tracing::info!(
                days,
                rows,
                duration_secs = start.elapsed().as_secs_f64(),
                "Participants backfill complete"
            );
            rows
        }
        Err(e) => {
            tracing::warn!(error = %e, "Participants backfill failed (non-fatal)");
            0
        }
    }
}

/// One scheduled cycle: every participants task for yesterday.
pub async fn run_cycle(db: &Database, label: &str) {
    let start = Instant::now();
    let written = run_all_participants_tasks(db, None).await;
    tracing::info!(
        cycle = label,
        reports = written.len(),
        duration_secs = start.elapsed().as_secs_f64(),
        "Participants cycle complete"
    );
}

/// Run the startup work, then loop forever.
pub async fn run_scheduler(db: Database) {
    run_startup_backfill(&db).await;
    run_cycle(&db, "initial").await;

    loop {
        let interval_secs = db
            .get_report_interval()
            .await
            .unwrap_or(DEFAULT_INTERVAL_SECS);
        tokio::time::sleep(Duration::from_secs(interval_secs)).await;
        run_cycle(&db, "periodic").await;
    }
}

pub fn spawn_scheduler(db: Database) -> JoinHandle<()> {
    tokio::spawn(run_scheduler(db))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn local_noon(day: chrono::NaiveDate) -> i64 {
        let naive = day.and_hms_opt(12, 0, 0).unwrap();
        Local.from_local_datetime(&naive).unwrap().timestamp()
    }

    #[tokio::test]
    async fn test_startup_backfill_uses_settings() {
        let db = Database::new_in_memory().await.unwrap();
        let room = db.insert_room("general", local_noon(yesterday())).await.unwrap();
        let two_days_ago = yesterday() - chrono::Duration::days(1);
        db.insert_message(room, "ana", "hi", local_noon(yesterday())).await.unwrap();
        db.insert_message(room, "bo", "hi", local_noon(two_days_ago)).await.unwrap();

        db.update_app_settings(None, Some(1)).await.unwrap();
        assert_eq!(run_startup_backfill(&db).await, 1);

        db.update_app_settings(None, Some(2)).await.unwrap();
        assert_eq!(run_startup_backfill(&db).await, 2);
    }

    #[tokio::test]
    async fn test_cycle_writes_yesterday_rows() {
        let db = Database::new_in_memory().await.unwrap();
        run_cycle(&db, "test").await;
        let report = db
            .find_participants_report(Period::Daily, yesterday())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.participants, 0);
    }
}
