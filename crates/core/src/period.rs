// crates/core/src/period.rs
//! Report periods and calendar bucketing.
//!
//! A participants report row covers one inclusive date window. Two kinds of
//! window exist:
//! - **bucket windows**: the full calendar range named by a group-by key
//!   (`2020-11` is all of November 2020);
//! - **running windows**: what a scheduled run covers, from the start of the
//!   current bucket up to the reference day (normally yesterday).

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Storage/wire format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Aggregation period of a participants report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Monthly,
    Yearly,
    All,
}

impl Period {
    /// Every period, in the order scheduled runs process them.
    pub const ALL_PERIODS: [Period; 4] =
        [Period::Daily, Period::Monthly, Period::Yearly, Period::All];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Monthly => "monthly",
            Period::Yearly => "yearly",
            Period::All => "all",
        }
    }

    /// SQLite `strftime` pattern that groups a local date into this period's buckets.
    pub fn bucket_format(&self) -> CoreResult<&'static str> {
        match self {
            Period::Daily => Ok("%Y-%m-%d"),
            Period::Monthly => Ok("%Y-%m"),
            Period::Yearly => Ok("%Y"),
            Period::All => Err(CoreError::UnbucketedPeriod(self.to_string())),
        }
    }

    /// Full calendar window for a bucket key.
    ///
    /// `daily` takes `YYYY-MM-DD`, `monthly` takes `YYYY-MM`, `yearly` takes `YYYY`.
    pub fn bucket_window(&self, key: &str) -> CoreResult<DateWindow> {
        let key = key.trim();
        let invalid = || CoreError::invalid_key(self, key);
        let parts: Vec<&str> = key.split('-').collect();
        match (self, parts.as_slice()) {
            (Period::Daily, [y, m, d]) => {
                let day = NaiveDate::from_ymd_opt(
                    fixed_digits(y, 4).ok_or_else(invalid)?,
                    fixed_digits(m, 2).ok_or_else(invalid)?,
                    fixed_digits(d, 2).ok_or_else(invalid)?,
                )
                .ok_or_else(invalid)?;
                Ok(DateWindow::single(day))
            }
            (Period::Monthly, [y, m]) => {
                let first = NaiveDate::from_ymd_opt(
                    fixed_digits(y, 4).ok_or_else(invalid)?,
                    fixed_digits(m, 2).ok_or_else(invalid)?,
                    1,
                )
                .ok_or_else(invalid)?;
                Ok(DateWindow::new(first, last_day_of_month(first)))
            }
            (Period::Yearly, [y]) => {
                let first = NaiveDate::from_ymd_opt(fixed_digits(y, 4).ok_or_else(invalid)?, 1, 1)
                    .ok_or_else(invalid)?;
                Ok(DateWindow::new(first, last_day_of_year(first)))
            }
            (Period::All, _) => Err(CoreError::UnbucketedPeriod(self.to_string())),
            _ => Err(invalid()),
        }
    }

    /// Window covered by a run whose last included day is `reference`.
    ///
    /// `origin` is only consulted for [`Period::All`]; without one, or when the
    /// origin lies after `reference`, there is nothing to report.
    pub fn running_window(
        &self,
        reference: NaiveDate,
        origin: Option<NaiveDate>,
    ) -> Option<DateWindow> {
        match self {
            Period::Daily => Some(DateWindow::single(reference)),
            Period::Monthly => Some(DateWindow::new(first_day_of_month(reference), reference)),
            Period::Yearly => Some(DateWindow::new(first_day_of_year(reference), reference)),
            Period::All => origin
                .filter(|o| *o <= reference)
                .map(|o| DateWindow::new(o, reference)),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Period::Daily),
            "monthly" => Ok(Period::Monthly),
            "yearly" => Ok(Period::Yearly),
            "all" => Ok(Period::All),
            other => Err(CoreError::InvalidPeriod(other.to_string())),
        }
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn single(day: NaiveDate) -> Self {
        Self::new(day, day)
    }

    pub fn start_key(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_key(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

/// One grouped participants count, as returned by a group-by query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantsBucket {
    pub key: String,
    pub participants: i64,
}

impl ParticipantsBucket {
    pub fn new(key: impl Into<String>, participants: i64) -> Self {
        Self {
            key: key.into(),
            participants,
        }
    }
}

/// Parse a zero-padded unsigned field of exactly `width` ASCII digits.
fn fixed_digits<T: FromStr>(part: &str, width: usize) -> Option<T> {
    if part.len() != width || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

pub fn first_day_of_month(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

pub fn last_day_of_month(day: NaiveDate) -> NaiveDate {
    let (year, month) = if day.month() == 12 {
        (day.year() + 1, 1)
    } else {
        (day.year(), day.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(day)
}

pub fn first_day_of_year(day: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(day.year(), 1, 1).unwrap_or(day)
}

pub fn last_day_of_year(day: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(day.year(), 12, 31).unwrap_or(day)
}

/// Yesterday in local time. Scheduled runs report up to and including this day.
pub fn yesterday() -> NaiveDate {
    let today = Local::now().date_naive();
    today.pred_opt().unwrap_or(today)
}

/// Parse a `YYYY-MM-DD` storage date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

/// Human-facing report date: `dd/mm/YYYY`.
pub fn format_report_date(day: NaiveDate) -> String {
    day.format("%d/%m/%Y").to_string()
}
