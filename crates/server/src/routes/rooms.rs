// crates/server/src/routes/rooms.rs
//! Chat activity ingestion.
//!
//! - POST /rooms: create a room
//! - POST /rooms/{id}/messages: post a message into a room

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chatroom_reports_db::{MessageRow, RoomRow};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub name: String,
    /// Unix seconds; defaults to now. Used when importing history.
    pub created_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    pub sender: String,
    pub body: String,
    pub created_at: Option<i64>,
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

fn require_non_empty(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

/// POST /api/rooms
async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRoomRequest>,
) -> ApiResult<(StatusCode, Json<RoomRow>)> {
    require_non_empty("name", &body.name)?;
    let created_at = body.created_at.unwrap_or_else(now_secs);
    let id = state.db.insert_room(body.name.trim(), created_at).await?;
    let room = state
        .db
        .get_room(id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("room {id} vanished after insert")))?;
    Ok((StatusCode::CREATED, Json(room)))
}

/// POST /api/rooms/{id}/messages
async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<i64>,
    Json(body): Json<PostMessageRequest>,
) -> ApiResult<(StatusCode, Json<MessageRow>)> {
    require_non_empty("sender", &body.sender)?;
    if state.db.get_room(room_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Room {room_id}")));
    }
    let created_at = body.created_at.unwrap_or_else(now_secs);
    let id = state
        .db
        .insert_message(room_id, body.sender.trim(), &body.body, created_at)
        .await?;
    let message = state
        .db
        .get_message(id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("message {id} vanished after insert")))?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/{id}/messages", post(post_message))
}
