//! Job store contract and an in-process implementation.
//!
//! The relay never touches the store; only the job routes do. Postgres
//! lives in `jobwire-db`, the in-memory store below backs tests and
//! single-process deployments without `DATABASE_URL`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CoreError;
use crate::jobs::{Job, JobListQuery, JobStatus};

/// Durable record of job identity, status and result payload.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new job record.
    async fn create(&self, job: &Job) -> Result<Job, CoreError>;

    /// Fetch a job by id.
    async fn get(&self, job_id: &str) -> Result<Option<Job>, CoreError>;

    /// List jobs, newest first.
    async fn list(&self, query: &JobListQuery) -> Result<Vec<Job>, CoreError>;

    /// Move a job to `status`, recording its result or error.
    ///
    /// Returns `NotFound` for an unknown id.
    async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        result: Option<&serde_json::Value>,
        error: Option<&str>,
    ) -> Result<Job, CoreError>;
}

/// Job store kept entirely in process memory.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: &Job) -> Result<Job, CoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(CoreError::Conflict(format!("job {} already exists", job.id)));
        }
        jobs.insert(job.id.clone(), job.clone());
        Ok(job.clone())
    }

    async fn get(&self, job_id: &str) -> Result<Option<Job>, CoreError> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn list(&self, query: &JobListQuery) -> Result<Vec<Job>, CoreError> {
        let jobs = self.jobs.read().await;
        let mut matching: Vec<Job> = jobs
            .values()
            .filter(|j| query.status.map_or(true, |s| j.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .collect())
    }

    async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        result: Option<&serde_json::Value>,
        error: Option<&str>,
    ) -> Result<Job, CoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(job_id).ok_or_else(|| CoreError::NotFound {
            entity: "Job",
            id: job_id.to_string(),
        })?;

        job.status = status;
        if let Some(result) = result {
            job.result = Some(result.clone());
        }
        if let Some(error) = error {
            job.error_message = Some(error.to_string());
        }
        job.updated_at = chrono::Utc::now();
        Ok(job.clone())
    }
}
