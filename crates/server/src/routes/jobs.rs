// crates/server/src/routes/jobs.rs
//! API routes for background job management.
//!
//! - GET /jobs: active jobs (`?all=true` includes finished ones)
//! - GET /jobs/{id}: one job
//! - POST /jobs/{id}/cancel: cancel a running job
//! - GET /jobs/stream: SSE stream of job progress updates

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::error::{ApiError, ApiResult};
use crate::jobs::{JobId, JobProgress};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
struct ListJobsParams {
    #[serde(default)]
    all: bool,
}

/// GET /api/jobs
async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListJobsParams>,
) -> Json<Vec<JobProgress>> {
    if params.all {
        Json(state.jobs.all_jobs())
    } else {
        Json(state.jobs.active_jobs())
    }
}

/// GET /api/jobs/{id}
async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> ApiResult<Json<JobProgress>> {
    state
        .jobs
        .get_job(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Job {id}")))
}

/// POST /api/jobs/{id}/cancel
async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> ApiResult<StatusCode> {
    if !state.jobs.cancel(id) {
        return Err(ApiError::NotFound(format!("Running job {id}")));
    }
    tracing::info!(job_id = id, "Job cancellation requested");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/jobs/stream: SSE stream of all job progress updates.
async fn stream_jobs(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.jobs.subscribe();

    let stream = async_stream::stream! {
        let mut rx = rx;
        loop {
            match rx.recv().await {
                Ok(progress) => {
                    let json = serde_json::to_string(&progress).unwrap_or_default();
                    yield Ok(Event::default().event("progress").data(json));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Job stream subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/stream", get(stream_jobs))
        .route("/jobs/{id}", get(get_job))
        .route("/jobs/{id}/cancel", post(cancel_job))
}
