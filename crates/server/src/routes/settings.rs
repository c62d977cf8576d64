//! App settings API routes.

use std::ops::RangeInclusive;
use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chatroom_reports_db::AppSettings;
use serde::Deserialize;

use crate::{error::ApiError, state::AppState};

const INTERVAL_RANGE: RangeInclusive<i64> = 60..=86_400;
const BACKFILL_RANGE: RangeInclusive<i64> = 1..=366;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSettingsRequest {
    report_interval_secs: Option<i64>,
    backfill_days: Option<i64>,
}

/// GET /api/settings - Read current app settings.
async fn get_settings(State(state): State<Arc<AppState>>) -> Result<Json<AppSettings>, ApiError> {
    let settings = state.db.get_app_settings().await?;
    Ok(Json(settings))
}

/// PUT /api/settings - Update app settings (partial).
///
/// The scheduler picks up a new interval after its current sleep.
async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<AppSettings>, ApiError> {
    if let Some(secs) = body.report_interval_secs {
        if !INTERVAL_RANGE.contains(&secs) {
            return Err(ApiError::BadRequest(format!(
                "reportIntervalSecs must be between {} and {}",
                INTERVAL_RANGE.start(),
                INTERVAL_RANGE.end()
            )));
        }
    }
    if let Some(days) = body.backfill_days {
        if !BACKFILL_RANGE.contains(&days) {
            return Err(ApiError::BadRequest(format!(
                "backfillDays must be between {} and {}",
                BACKFILL_RANGE.start(),
                BACKFILL_RANGE.end()
            )));
        }
    }

    let settings = state
        .db
        .update_app_settings(body.report_interval_secs, body.backfill_days)
        .await?;
    tracing::info!(
        report_interval_secs = settings.report_interval_secs,
        backfill_days = settings.backfill_days,
        "Settings updated"
    );
    Ok(Json(settings))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/settings", get(get_settings).put(update_settings))
}
