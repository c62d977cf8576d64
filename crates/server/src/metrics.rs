//! Application metrics for Prometheus monitoring.
//!
//! This module provides:
//! - Prometheus recorder initialization
//! - Metric descriptions
//! - Helpers for recording API requests and report runs

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Call once at startup, before any metrics are recorded.
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();

    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!("api_requests_total", "Total number of API requests");
    describe_histogram!(
        "api_request_duration_seconds",
        "Duration of API requests in seconds"
    );

    describe_counter!(
        "participants_report_runs_total",
        "Participants aggregation runs by period and outcome"
    );
    describe_histogram!(
        "participants_report_duration_seconds",
        "Duration of participants aggregation runs in seconds"
    );
    describe_gauge!(
        "participants_report_last_value",
        "Participants count written by the last run, per period"
    );
    describe_gauge!(
        "participants_backfill_rows",
        "Rows written by the last startup backfill"
    );
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// Record a completed API request.
pub fn record_request(endpoint: &str, status: &str, duration: Duration) {
    counter!(
        "api_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("api_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(duration.as_secs_f64());
}

/// Record one participants aggregation run.
///
/// `outcome` is `"ok"`, `"skipped"` or `"error"`. `participants` is the value
/// written, when a row was written.
pub fn record_report_run(
    period: &str,
    outcome: &str,
    duration: Duration,
    participants: Option<i64>,
) {
    counter!(
        "participants_report_runs_total",
        "period" => period.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!("participants_report_duration_seconds", "period" => period.to_string())
        .record(duration.as_secs_f64());
    if let Some(n) = participants {
        gauge!("participants_report_last_value", "period" => period.to_string()).set(n as f64);
    }
}

pub fn record_backfill(rows: u32) {
    gauge!("participants_backfill_rows").set(f64::from(rows));
}

/// Helper for timing request handlers.
///
/// ```ignore
/// let timer = RequestTimer::new("participants_list");
/// // ... do work ...
/// timer.finish_ok(); // or timer.finish_err(status_code)
/// ```
pub struct RequestTimer {
    endpoint: &'static str,
    start: Instant,
}

impl RequestTimer {
    pub fn new(endpoint: &'static str) -> Self {
        Self {
            endpoint,
            start: Instant::now(),
        }
    }

    pub fn finish_ok(self) {
        record_request(self.endpoint, "200", self.start.elapsed());
    }

    pub fn finish_err(self, status: u16) {
        record_request(self.endpoint, &status.to_string(), self.start.elapsed());
    }

    /// Finish with the status implied by a handler result.
    pub fn finish_result<T>(self, result: &crate::ApiResult<T>) {
        match result {
            Ok(_) => self.finish_ok(),
            Err(e) => self.finish_err(e.status_code().as_u16()),
        }
    }
}
