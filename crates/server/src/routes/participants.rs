// crates/server/src/routes/participants.rs
//! Participants report endpoints.
//!
//! - GET    /reports/participants          paginated listing
//! - POST   /reports/participants          store one bucket row (409 if it exists)
//! - GET    /reports/participants/{id}     one row
//! - DELETE /reports/participants/{id}
//! - POST   /reports/participants/run      aggregate in the background

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chatroom_reports_core::{parse_date, yesterday, Period};
use chatroom_reports_db::ParticipantsReport;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::jobs::JobId;
use crate::metrics::RequestTimer;
use crate::state::AppState;
use crate::tasks::start_participants_job;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub period: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// One page of reports. `next`/`previous` are page numbers, absent at the ends.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsListResponse {
    pub count: i64,
    pub page: i64,
    pub page_size: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<ParticipantsReport>,
}

/// A manually recorded bucket, e.g. `{"period": "monthly", "key": "2020-11", "participants": 4}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub period: String,
    /// Bucket key: `YYYY-MM-DD`, `YYYY-MM` or `YYYY`.
    pub key: String,
    pub participants: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    /// One period, or every period when absent.
    pub period: Option<String>,
    /// `YYYY-MM-DD`; yesterday when absent.
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub job_id: JobId,
}

fn parse_period(raw: Option<&str>) -> ApiResult<Option<Period>> {
    raw.filter(|s| !s.is_empty())
        .map(str::parse::<Period>)
        .transpose()
        .map_err(ApiError::from)
}

/// GET /api/reports/participants
async fn list_reports(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ParticipantsListResponse>> {
    let timer = RequestTimer::new("participants_list");
    let result = list_reports_inner(&state, params).await;
    timer.finish_result(&result);
    result.map(Json)
}

async fn list_reports_inner(
    state: &AppState,
    params: ListParams,
) -> ApiResult<ParticipantsListResponse> {
    let period = parse_period(params.period.as_deref())?;
    let page = params.page.unwrap_or(1);
    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page < 1 {
        return Err(ApiError::BadRequest("page must be >= 1".to_string()));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(ApiError::BadRequest(format!(
            "pageSize must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    let count = state.db.count_participants_reports(period).await?;
    let last_page = (count.saturating_add(page_size - 1) / page_size).max(1);
    if page > last_page {
        return Err(ApiError::BadRequest(format!(
            "page {page} is past the last page ({last_page})"
        )));
    }

    let listing = state
        .db
        .list_participants_reports(period, page, page_size)
        .await?;
    Ok(ParticipantsListResponse {
        count: listing.count,
        page,
        page_size,
        next: (page < last_page).then(|| page + 1),
        previous: (page > 1).then(|| page - 1),
        results: listing.results,
    })
}

/// POST /api/reports/participants
async fn create_report(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateReportRequest>,
) -> ApiResult<(StatusCode, Json<ParticipantsReport>)> {
    let period: Period = body.period.parse()?;
    if body.participants < 0 {
        return Err(ApiError::BadRequest("participants must be >= 0".to_string()));
    }
    let window = period.bucket_window(&body.key)?;
    let report = state
        .db
        .insert_participants_report(period, window, body.participants)
        .await?;
    tracing::info!(report_id = report.id, %report, "Participants report created");
    Ok((StatusCode::CREATED, Json(report)))
}

/// GET /api/reports/participants/{id}
async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ParticipantsReport>> {
    let timer = RequestTimer::new("participants_get");
    let result = state
        .db
        .get_participants_report(id)
        .await
        .map_err(ApiError::from)
        .and_then(|row| row.ok_or_else(|| ApiError::NotFound(format!("Report {id}"))));
    timer.finish_result(&result);
    result.map(Json)
}

/// DELETE /api/reports/participants/{id}
async fn delete_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !state.db.delete_participants_report(id).await? {
        return Err(ApiError::NotFound(format!("Report {id}")));
    }
    tracing::info!(report_id = id, "Participants report deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/reports/participants/run
async fn run_reports(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RunRequest>,
) -> ApiResult<(StatusCode, Json<RunResponse>)> {
    let periods = match parse_period(body.period.as_deref())? {
        Some(period) => vec![period],
        None => Period::ALL_PERIODS.to_vec(),
    };
    let reference = match body.date.as_deref() {
        Some(raw) => parse_date(raw).ok_or_else(|| {
            ApiError::BadRequest(format!("Invalid date '{raw}', expected YYYY-MM-DD"))
        })?,
        None => yesterday(),
    };

    let job_id = start_participants_job(&state.jobs, state.db.clone(), periods, reference);
    tracing::info!(job_id, reference = %reference, "Participants run started");
    Ok((StatusCode::ACCEPTED, Json(RunResponse { job_id })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/reports/participants",
            get(list_reports).post(create_report),
        )
        .route("/reports/participants/run", post(run_reports))
        .route(
            "/reports/participants/{id}",
            get(get_report).delete(delete_report),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chatroom_reports_core::DateWindow;
    use chatroom_reports_db::Database;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    async fn test_app() -> (Router, Database) {
        let db = Database::new_in_memory().await.expect("in-memory DB");
        let app = Router::new()
            .nest("/api", router())
            .with_state(AppState::new(db.clone()));
        (app, db)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or_default())
    }

    async fn seed_daily(db: &Database, days: u32) {
        for day in 1..=days {
            let window = DateWindow::single(d(2020, 11, day));
            db.insert_participants_report(Period::Daily, window, i64::from(day))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_list_paginates() {
        let (app, db) = test_app().await;
        seed_daily(&db, 5).await;
        let november = Period::Monthly.bucket_window("2020-11").unwrap();
        db.insert_participants_report(Period::Monthly, november, 9)
            .await
            .unwrap();

        let (status, json) =
            get_json(app.clone(), "/api/reports/participants?period=daily&pageSize=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 5);
        assert_eq!(json["page"], 1);
        assert_eq!(json["next"], 2);
        assert!(json["previous"].is_null());
        assert_eq!(json["results"].as_array().unwrap().len(), 2);
        assert_eq!(json["results"][0]["startDate"], "2020-11-05");

        let (_, json) =
            get_json(app.clone(), "/api/reports/participants?period=daily&pageSize=2&page=3").await;
        assert_eq!(json["results"].as_array().unwrap().len(), 1);
        assert!(json["next"].is_null());
        assert_eq!(json["previous"], 2);

        let (_, json) = get_json(app, "/api/reports/participants").await;
        assert_eq!(json["count"], 6);
    }

    #[tokio::test]
    async fn test_list_rejects_bad_params() {
        let (app, _db) = test_app().await;
        let (status, json) = get_json(app.clone(), "/api/reports/participants?period=weekly").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["details"].as_str().unwrap().contains("weekly"));

        let (status, _) = get_json(app.clone(), "/api/reports/participants?page=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_json(app, "/api/reports/participants?pageSize=101").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_rejects_page_past_end() {
        let (app, db) = test_app().await;

        let (status, json) = get_json(app.clone(), "/api/reports/participants").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 0);
        assert!(json["next"].is_null());

        let (status, _) = get_json(app.clone(), "/api/reports/participants?page=50").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        seed_daily(&db, 5).await;
        let (status, json) =
            get_json(app.clone(), "/api/reports/participants?pageSize=2&page=3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["results"].as_array().unwrap().len(), 1);

        let (status, json) = get_json(app, "/api/reports/participants?pageSize=2&page=4").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["details"].as_str().unwrap().contains("last page (3)"));
    }

    #[tokio::test]
    async fn test_list_rejects_huge_page() {
        let (app, db) = test_app().await;
        seed_daily(&db, 3).await;

        let (status, _) =
            get_json(app.clone(), "/api/reports/participants?page=9223372036854775807").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_json(
            app,
            "/api/reports/participants?page=9223372036854775807&pageSize=100",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_and_delete_report() {
        let (app, db) = test_app().await;
        let year = Period::Yearly.bucket_window("2020").unwrap();
        let report = db
            .insert_participants_report(Period::Yearly, year, 3)
            .await
            .unwrap();

        let (status, json) =
            get_json(app.clone(), &format!("/api/reports/participants/{}", report.id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["period"], "yearly");
        assert_eq!(json["endDate"], "2020-12-31");

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/reports/participants/{}", report.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let (status, _) = get_json(app, &format!("/api/reports/participants/{}", report.id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_report_then_duplicate_is_409() {
        let (app, db) = test_app().await;
        let body = r#"{"period": "monthly", "key": "2020-11", "participants": 4}"#;

        let resp = app
            .clone()
            .oneshot(post_json("/api/reports/participants", body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["startDate"], "2020-11-01");
        assert_eq!(json["endDate"], "2020-11-30");
        assert_eq!(json["participants"], 4);

        let resp = app
            .oneshot(post_json("/api/reports/participants", body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["details"]
            .as_str()
            .unwrap()
            .contains("UNIQUE constraint failed"));

        let stored = db
            .find_participants_report(Period::Monthly, d(2020, 11, 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.participants, 4);
    }

    #[tokio::test]
    async fn test_create_report_rejects_bad_input() {
        let (app, _db) = test_app().await;
        for body in [
            r#"{"period": "all", "key": "2020", "participants": 1}"#,
            r#"{"period": "yearly", "key": "+202", "participants": 1}"#,
            r#"{"period": "weekly", "key": "2020", "participants": 1}"#,
            r#"{"period": "daily", "key": "2020-11-23", "participants": -1}"#,
        ] {
            let resp = app
                .clone()
                .oneshot(post_json("/api/reports/participants", body))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{body}");
        }
    }

    #[tokio::test]
    async fn test_run_returns_job_id() {
        let (app, _db) = test_app().await;
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/reports/participants/run")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"period": "daily", "date": "2020-11-23"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["jobId"].as_u64().is_some());
    }

    #[tokio::test]
    async fn test_run_rejects_bad_date() {
        let (app, _db) = test_app().await;
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/reports/participants/run")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"date": "23/11/2020"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
