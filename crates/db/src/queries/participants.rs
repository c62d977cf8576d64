//! Participants report rows: strict insert, upsert, aggregation and listing.
//!
//! Participants are the distinct senders with at least one message whose
//! local calendar date falls inside a report window.

use std::fmt;

use crate::{Database, DbError, DbResult};
use chatroom_reports_core::{
    first_day_of_month, first_day_of_year, format_report_date, parse_date, DateWindow,
    ParticipantsBucket, Period,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::debug;

const REPORT_COLUMNS: &str =
    "id, period, start_date, end_date, participants, created_at, updated_at";

type ReportTuple = (i64, String, String, String, i64, i64, i64);

/// One aggregated participants row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsReport {
    pub id: i64,
    pub period: Period,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub participants: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ParticipantsReport {
    fn from_tuple(row: ReportTuple) -> DbResult<Self> {
        let (id, period, start_date, end_date, participants, created_at, updated_at) = row;
        let period = period
            .parse::<Period>()
            .map_err(|e| DbError::CorruptRow(format!("report {id}: {e}")))?;
        let parse = |s: &str| {
            parse_date(s).ok_or_else(|| DbError::CorruptRow(format!("report {id}: bad date {s:?}")))
        };
        Ok(Self {
            id,
            period,
            start_date: parse(&start_date)?,
            end_date: parse(&end_date)?,
            participants,
            created_at,
            updated_at,
        })
    }
}

/// `dd/mm/YYYY - period`, e.g. `01/11/2020 - monthly`.
impl fmt::Display for ParticipantsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", format_report_date(self.start_date), self.period)
    }
}

/// One page of report rows plus the unpaginated total.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsPage {
    pub count: i64,
    pub results: Vec<ParticipantsReport>,
}

fn map_unique_violation(err: sqlx::Error, period: Period, window: &DateWindow) -> DbError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            DbError::UniqueViolation {
                period: period.to_string(),
                start_date: window.start_key(),
            }
        }
        other => other.into(),
    }
}

async fn upsert_with(
    conn: &mut SqliteConnection,
    period: Period,
    window: &DateWindow,
    participants: i64,
) -> DbResult<ParticipantsReport> {
    let row: ReportTuple = sqlx::query_as(&format!(
        r#"INSERT INTO participants_reports (period, start_date, end_date, participants)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(period, start_date) DO UPDATE SET
               end_date = excluded.end_date,
               participants = excluded.participants,
               updated_at = CAST(strftime('%s', 'now') AS INTEGER)
           RETURNING {REPORT_COLUMNS}"#
    ))
    .bind(period.as_str())
    .bind(window.start_key())
    .bind(window.end_key())
    .bind(participants)
    .fetch_one(&mut *conn)
    .await?;
    ParticipantsReport::from_tuple(row)
}

impl Database {
    /// Insert a new report row. Fails with [`DbError::UniqueViolation`] when a
    /// row for the same period and start date already exists.
    pub async fn insert_participants_report(
        &self,
        period: Period,
        window: DateWindow,
        participants: i64,
    ) -> DbResult<ParticipantsReport> {
        let row: ReportTuple = sqlx::query_as(&format!(
            r#"INSERT INTO participants_reports (period, start_date, end_date, participants)
               VALUES (?1, ?2, ?3, ?4)
               RETURNING {REPORT_COLUMNS}"#
        ))
        .bind(period.as_str())
        .bind(window.start_key())
        .bind(window.end_key())
        .bind(participants)
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_unique_violation(e, period, &window))?;
        ParticipantsReport::from_tuple(row)
    }

    /// Insert or refresh the row identified by `(period, window.start)`.
    pub async fn upsert_participants_report(
        &self,
        period: Period,
        window: DateWindow,
        participants: i64,
    ) -> DbResult<ParticipantsReport> {
        let mut conn = self.pool().acquire().await?;
        upsert_with(&mut conn, period, &window, participants).await
    }

    /// Turn one group-by bucket into a stored row covering the bucket's full
    /// calendar range (a `2020-11` bucket becomes 2020-11-01..2020-11-30).
    pub async fn create_participants_report(
        &self,
        bucket: &ParticipantsBucket,
        period: Period,
    ) -> DbResult<ParticipantsReport> {
        let window = period.bucket_window(&bucket.key)?;
        self.upsert_participants_report(period, window, bucket.participants)
            .await
    }

    /// Distinct senders active inside the window.
    pub async fn count_participants(&self, window: DateWindow) -> DbResult<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"SELECT COUNT(DISTINCT sender)
               FROM messages
               WHERE date(created_at, 'unixepoch', 'localtime') BETWEEN ?1 AND ?2"#,
        )
        .bind(window.start_key())
        .bind(window.end_key())
        .fetch_one(self.pool())
        .await?;
        Ok(row.0)
    }

    /// Group messages inside the window by day, month or year.
    ///
    /// Only non-empty buckets are returned, oldest first.
    pub async fn participant_buckets(
        &self,
        period: Period,
        window: DateWindow,
    ) -> DbResult<Vec<ParticipantsBucket>> {
        let format = period.bucket_format()?;
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"SELECT strftime(?1, created_at, 'unixepoch', 'localtime') AS bucket,
                      COUNT(DISTINCT sender)
               FROM messages
               WHERE date(created_at, 'unixepoch', 'localtime') BETWEEN ?2 AND ?3
               GROUP BY bucket
               ORDER BY bucket"#,
        )
        .bind(format)
        .bind(window.start_key())
        .bind(window.end_key())
        .fetch_all(self.pool())
        .await?;
        Ok(rows
            .into_iter()
            .map(|(key, participants)| ParticipantsBucket::new(key, participants))
            .collect())
    }

    /// Recompute the running report for `period` ending on `reference`.
    ///
    /// Returns `None` only for the all-time period when there is no activity
    /// origin yet. The all-time period keeps a single row: rows left behind by
    /// an older origin are removed.
    pub async fn aggregate_participants(
        &self,
        period: Period,
        reference: NaiveDate,
    ) -> DbResult<Option<ParticipantsReport>> {
        let origin = match period {
            Period::All => self.activity_origin().await?,
            _ => None,
        };
        let Some(window) = period.running_window(reference, origin) else {
            debug!(period = %period, "No activity origin; skipping participants report");
            return Ok(None);
        };

        let participants = self.count_participants(window).await?;

        let mut tx = self.pool().begin().await?;
        if period == Period::All {
            sqlx::query(
                "DELETE FROM participants_reports WHERE period = 'all' AND start_date <> ?1",
            )
            .bind(window.start_key())
            .execute(&mut *tx)
            .await?;
        }
        let report = upsert_with(&mut tx, period, &window, participants).await?;
        tx.commit().await?;

        debug!(
            period = %period,
            start = %report.start_date,
            end = %report.end_date,
            participants = report.participants,
            "Participants report upserted"
        );
        Ok(Some(report))
    }

    /// Rebuild closed bucket rows for the `days_back` days ending on `reference`.
    ///
    /// The scan is widened to whole months/years so partial buckets at the
    /// start of the range are counted completely. Bucket rows never extend past
    /// `reference`. Returns the number of rows written.
    pub async fn backfill_participants(
        &self,
        period: Period,
        days_back: u32,
        reference: NaiveDate,
    ) -> DbResult<u32> {
        if days_back == 0 {
            return Ok(0);
        }
        let first = reference - chrono::Duration::days(i64::from(days_back) - 1);
        let scan_start = match period {
            Period::Daily => first,
            Period::Monthly => first_day_of_month(first),
            Period::Yearly => first_day_of_year(first),
            Period::All => {
                let err = chatroom_reports_core::CoreError::UnbucketedPeriod(period.to_string());
                return Err(err.into());
            }
        };

        let buckets = self
            .participant_buckets(period, DateWindow::new(scan_start, reference))
            .await?;

        let mut tx = self.pool().begin().await?;
        let mut count = 0u32;
        for bucket in &buckets {
            let full = period.bucket_window(&bucket.key)?;
            let window = DateWindow::new(full.start, full.end.min(reference));
            upsert_with(&mut tx, period, &window, bucket.participants).await?;
            count += 1;
        }
        tx.commit().await?;
        Ok(count)
    }

    /// Number of report rows, optionally restricted to one period.
    pub async fn count_participants_reports(&self, period: Option<Period>) -> DbResult<i64> {
        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM participants_reports WHERE (?1 IS NULL OR period = ?1)",
        )
        .bind(period.map(|p| p.as_str()))
        .fetch_one(self.pool())
        .await?;
        Ok(total.0)
    }

    /// Page through report rows, newest start date first.
    ///
    /// `page` is 1-based. A page whose offset does not fit in an `i64` is
    /// past every row and comes back empty.
    pub async fn list_participants_reports(
        &self,
        period: Option<Period>,
        page: i64,
        page_size: i64,
    ) -> DbResult<ParticipantsPage> {
        let count = self.count_participants_reports(period).await?;
        let Some(offset) = (page.max(1) - 1).checked_mul(page_size.max(0)) else {
            return Ok(ParticipantsPage {
                count,
                results: Vec::new(),
            });
        };

        let rows: Vec<ReportTuple> = sqlx::query_as(&format!(
            r#"SELECT {REPORT_COLUMNS}
               FROM participants_reports
               WHERE (?1 IS NULL OR period = ?1)
               ORDER BY start_date DESC, period, id DESC
               LIMIT ?2 OFFSET ?3"#
        ))
        .bind(period.map(|p| p.as_str()))
        .bind(page_size)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        let results = rows
            .into_iter()
            .map(ParticipantsReport::from_tuple)
            .collect::<DbResult<Vec<_>>>()?;
        Ok(ParticipantsPage { count, results })
    }

    pub async fn get_participants_report(&self, id: i64) -> DbResult<Option<ParticipantsReport>> {
        let row: Option<ReportTuple> = sqlx::query_as(&format!(
            "SELECT {REPORT_COLUMNS} FROM participants_reports WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(ParticipantsReport::from_tuple).transpose()
    }

    /// Look up the row for one bucket.
    pub async fn find_participants_report(
        &self,
        period: Period,
        start_date: NaiveDate,
    ) -> DbResult<Option<ParticipantsReport>> {
        let row: Option<ReportTuple> = sqlx::query_as(&format!(
            "SELECT {REPORT_COLUMNS} FROM participants_reports WHERE period = ? AND start_date = ?"
        ))
        .bind(period.as_str())
        .bind(DateWindow::single(start_date).start_key())
        .fetch_optional(self.pool())
        .await?;
        row.map(ParticipantsReport::from_tuple).transpose()
    }

    /// Delete a report by id. Returns true if a row was deleted.
    pub async fn delete_participants_report(&self, id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM participants_reports WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
