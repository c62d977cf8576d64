//! API route handlers for the chatroom-reports server.

pub mod health;
pub mod jobs;
pub mod metrics;
pub mod participants;
pub mod rooms;
pub mod settings;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined router: everything under `/api`, plus `/metrics`.
///
/// Routes:
/// - GET    /api/health - Health check
/// - GET    /api/reports/participants - Paginated report listing
/// - GET    /api/reports/participants/{id} - One report
/// - DELETE /api/reports/participants/{id} - Delete a report
/// - POST   /api/reports/participants/run - Aggregate in the background
/// - POST   /api/rooms - Create a room
/// - POST   /api/rooms/{id}/messages - Post a message
/// - GET    /api/jobs - Active jobs (`?all=true` for finished ones too)
/// - GET    /api/jobs/{id} - One job
/// - POST   /api/jobs/{id}/cancel - Cancel a running job
/// - GET    /api/jobs/stream - SSE stream of job progress
/// - GET    /api/settings - Read settings
/// - PUT    /api/settings - Update settings
/// - GET    /metrics - Prometheus metrics
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", participants::router())
        .nest("/api", rooms::router())
        .nest("/api", jobs::router())
        .nest("/api", settings::router())
        .merge(metrics::router())
        .with_state(state)
}
