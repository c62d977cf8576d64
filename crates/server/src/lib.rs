// crates/server/src/lib.rs
//! chatroom-reports server library.
//!
//! Axum HTTP API over the participants reports, the background job runner
//! for manual aggregation runs, and the periodic scheduler.

pub mod error;
pub mod jobs;
pub mod metrics;
pub mod routes;
pub mod scheduler;
pub mod state;
pub mod tasks;

pub use error::*;
pub use metrics::{init_metrics, record_report_run, render_metrics, RequestTimer};
pub use routes::api_routes;
pub use scheduler::{run_cycle, run_startup_backfill, spawn_scheduler};
pub use state::AppState;
pub use tasks::{run_all_participants_tasks, ParticipantsTask};

use axum::Router;
use chatroom_reports_db::Database;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
pub fn create_app(db: Database) -> Router {
    create_app_with_state(AppState::new(db))
}

/// Same as [`create_app`], for callers that keep a handle on the state.
pub fn create_app_with_state(state: std::sync::Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api_routes(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
