//! App settings CRUD queries.

use crate::{Database, DbResult};
use serde::{Deserialize, Serialize};

/// Application settings (single-row table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Seconds between scheduled participants aggregation runs.
    pub report_interval_secs: i64,
    /// Days of daily buckets rebuilt at startup.
    pub backfill_days: i64,
}

impl Database {
    /// Read current app settings.
    pub async fn get_app_settings(&self) -> DbResult<AppSettings> {
        let row: (i64, i64) = sqlx::query_as(
            "SELECT report_interval_secs, backfill_days FROM app_settings WHERE id = 1",
        )
        .fetch_one(self.pool())
        .await?;
        Ok(AppSettings {
            report_interval_secs: row.0,
            backfill_days: row.1,
        })
    }

    /// Partial update: only provided fields change.
    pub async fn update_app_settings(
        &self,
        report_interval_secs: Option<i64>,
        backfill_days: Option<i64>,
    ) -> DbResult<AppSettings> {
        if let Some(secs) = report_interval_secs {
            sqlx::query("UPDATE app_settings SET report_interval_secs = ? WHERE id = 1")
                .bind(secs)
                .execute(self.pool())
                .await?;
        }
        if let Some(days) = backfill_days {
            sqlx::query("UPDATE app_settings SET backfill_days = ? WHERE id = 1")
                .bind(days)
                .execute(self.pool())
                .await?;
        }
        self.get_app_settings().await
    }

    /// Scheduler interval, falling back to one hour when the stored value is unusable.
    pub async fn get_report_interval(&self) -> DbResult<u64> {
        let settings = self.get_app_settings().await?;
        Ok(u64::try_from(settings.report_interval_secs)
            .ok()
            .filter(|s| *s > 0)
            .unwrap_or(3600))
    }
}
