// crates/server/src/jobs/mod.rs
//! Background job system for aggregation runs triggered over the API.
//!
//! Provides:
//! - `JobRunner`: central manager for spawning, cancelling and tracking jobs
//! - `JobState`: atomic progress tracking per job
//! - `JobProgress`: SSE-compatible progress updates

pub mod runner;
pub mod state;
pub mod types;

pub use runner::JobRunner;
pub use state::JobState;
pub use types::{JobId, JobProgress, JobStatus};
