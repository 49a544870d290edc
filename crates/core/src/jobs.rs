//! Job records, lifecycle status and the work-queue descriptor.
//!
//! Lifecycle: `pending -> processing -> {completed | failed}`. A failed job
//! is never revived; retrying creates a new job that points back at the
//! original through `retry_of`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{new_job_id, JobId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of an analysis job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Wire and database representation.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(CoreError::Validation(format!(
                "unknown job status '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Job record
// ---------------------------------------------------------------------------

/// A durable job record as kept by the job store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub repo_url: String,
    pub selected_model: String,
    pub status: JobStatus,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    /// The failed job this one retries, if any.
    pub retry_of: Option<JobId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    /// Build a new `pending` job with a freshly minted id.
    pub fn new(repo_url: impl Into<String>, selected_model: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: new_job_id(),
            repo_url: repo_url.into(),
            selected_model: selected_model.into(),
            status: JobStatus::Pending,
            result: None,
            error_message: None,
            retry_of: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build the replacement for a failed job. The new job gets its own id.
    pub fn retry_of(original: &Job) -> Self {
        let mut job = Job::new(original.repo_url.clone(), original.selected_model.clone());
        job.retry_of = Some(original.id.clone());
        job
    }

    /// The payload pushed onto the work list for this job.
    pub fn descriptor(&self) -> JobDescriptor {
        JobDescriptor {
            job_id: self.id.clone(),
            repo_url: self.repo_url.clone(),
            selected_model: self.selected_model.clone(),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Work-queue payload consumed by the external analysis worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub job_id: JobId,
    pub repo_url: String,
    pub selected_model: String,
    pub timestamp: Timestamp,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Body of `POST /api/v1/jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitJob {
    pub repo_url: String,
    /// Catalog model id; the catalog default is used when absent.
    pub model: Option<String>,
}

/// Maximum page size for job listing.
pub const MAX_LIST_LIMIT: i64 = 100;

/// Default page size for job listing.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Query parameters for `GET /api/v1/jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListQuery {
    pub status: Option<JobStatus>,
    /// Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Defaults to 0.
    pub offset: Option<i64>,
}

impl JobListQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("cancelled".parse::<JobStatus>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_value(JobStatus::Processing).unwrap();
        assert_eq!(json, "processing");
    }

    #[test]
    fn retry_gets_a_fresh_id() {
        let mut original = Job::new("https://github.com/a/b", "gpt-4o");
        original.status = JobStatus::Failed;

        let retry = Job::retry_of(&original);
        assert_ne!(retry.id, original.id);
        assert_eq!(retry.retry_of.as_deref(), Some(original.id.as_str()));
        assert_eq!(retry.status, JobStatus::Pending);
        assert_eq!(retry.repo_url, original.repo_url);
    }

    #[test]
    fn descriptor_carries_queue_fields() {
        let job = Job::new("https://github.com/a/b", "gpt-4o");
        let json = serde_json::to_value(job.descriptor()).unwrap();

        assert_eq!(json["job_id"], job.id.as_str());
        assert_eq!(json["repo_url"], "https://github.com/a/b");
        assert_eq!(json["selected_model"], "gpt-4o");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn list_query_clamps_limit_and_offset() {
        let q = JobListQuery {
            status: None,
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(q.limit(), MAX_LIST_LIMIT);
        assert_eq!(q.offset(), 0);
        assert_eq!(JobListQuery::default().limit(), DEFAULT_LIST_LIMIT);
    }
}
