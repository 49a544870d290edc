//! Job lifecycle events exchanged over the bus.
//!
//! The external worker publishes [`StatusEvent`]s zero or more times per job
//! and at most one terminal [`CompletionEvent`]. Both are relayed verbatim
//! to live observers as the `data` of outbound frames.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::jobs::JobStatus;
use crate::types::{JobId, Timestamp};

/// Progress report for a single job. Idempotent; duplicates and reordering
/// are harmless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default = "Utc::now")]
    pub timestamp: Timestamp,
}

impl StatusEvent {
    pub fn new(job_id: impl Into<JobId>, status: JobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            message: None,
            progress: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// Terminal outcome of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub job_id: JobId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: Timestamp,
}

impl CompletionEvent {
    pub fn succeeded(job_id: impl Into<JobId>, result: serde_json::Value) -> Self {
        Self {
            job_id: job_id.into(),
            success: true,
            result: Some(result),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(job_id: impl Into<JobId>, error: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            success: false,
            result: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}
