// crates/server/src/jobs/types.rs
//! Types for the background job system.

use serde::Serialize;

/// Unique identifier for a job.
pub type JobId = u64;

/// Status of a background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending = 0,
    Running = 1,
    Completed = 2,
    Cancelled = 3,
    Failed = 4,
}

impl JobStatus {
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            0 => JobStatus::Pending,
            1 => JobStatus::Running,
            2 => JobStatus::Completed,
            3 => JobStatus::Cancelled,
            _ => JobStatus::Failed,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Cancelled | JobStatus::Failed
        )
    }
}

/// Progress update, also the payload of `/api/jobs/stream` events.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub job_id: JobId,
    pub job_type: String,
    pub status: JobStatus,
    pub current: u64,
    pub total: u64,
    pub message: Option<String>,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_discriminants_roundtrip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Cancelled,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::from_u8(status as u8), status);
        }
        assert_eq!(JobStatus::from_u8(200), JobStatus::Failed);
    }

    #[test]
    fn test_job_status_finished() {
        assert!(!JobStatus::Pending.is_finished());
        assert!(!JobStatus::Running.is_finished());
        assert!(JobStatus::Completed.is_finished());
        assert!(JobStatus::Cancelled.is_finished());
        assert!(JobStatus::Failed.is_finished());
    }

    #[test]
    fn test_job_progress_serialize() {
        let progress = JobProgress {
            job_id: 1,
            job_type: "participants".to_string(),
            status: JobStatus::Running,
            current: 2,
            total: 4,
            message: Some("monthly: 3 participants".to_string()),
            timestamp: "2026-02-05T12:00:00Z".to_string(),
        };
        let json = serde_json::to_string(&progress).unwrap();
        assert!(json.contains("\"jobId\":1"));
        assert!(json.contains("\"jobType\":\"participants\""));
        assert!(json.contains("\"status\":\"running\""));
        assert!(json.contains("\"current\":2"));
    }
}
