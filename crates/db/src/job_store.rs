//! Repository for the `jobs` table.

use async_trait::async_trait;
use jobwire_core::error::CoreError;
use jobwire_core::jobs::{Job, JobListQuery, JobStatus};
use jobwire_core::store::JobStore;
use jobwire_core::types::Timestamp;
use sqlx::FromRow;

use crate::DbPool;

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, repo_url, selected_model, status, result, error_message, \
    retry_of, created_at, updated_at";

/// A raw row from the `jobs` table. `status` is stored as text.
#[derive(Debug, FromRow)]
struct JobRow {
    id: String,
    repo_url: String,
    selected_model: String,
    status: String,
    result: Option<serde_json::Value>,
    error_message: Option<String>,
    retry_of: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl TryFrom<JobRow> for Job {
    type Error = CoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            status: row.status.parse::<JobStatus>()?,
            id: row.id,
            repo_url: row.repo_url,
            selected_model: row.selected_model,
            result: row.result,
            error_message: row.error_message,
            retry_of: row.retry_of,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Map a sqlx error onto the store contract.
///
/// Unique violations (Postgres `23505`) become `Conflict`; everything else
/// is logged and surfaced as `Internal`.
fn map_db_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return CoreError::Conflict(db_err.message().to_string());
        }
    }
    tracing::error!(error = %err, "Job store query failed");
    CoreError::Internal(err.to_string())
}

/// [`JobStore`] over Postgres.
#[derive(Clone)]
pub struct PgJobStore {
    pool: DbPool,
}

impl PgJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, job: &Job) -> Result<Job, CoreError> {
        let query = format!(
            "INSERT INTO jobs (id, repo_url, selected_model, status, retry_of, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(&job.id)
            .bind(&job.repo_url)
            .bind(&job.selected_model)
            .bind(job.status.as_str())
            .bind(job.retry_of.as_deref())
            .bind(job.created_at)
            .bind(job.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        row.try_into()
    }

    async fn get(&self, job_id: &str) -> Result<Option<Job>, CoreError> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, JobRow>(&query)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .map(Job::try_from)
            .transpose()
    }

    async fn list(&self, query: &JobListQuery) -> Result<Vec<Job>, CoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE ($1::TEXT IS NULL OR status = $1) \
             ORDER BY created_at DESC \
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, JobRow>(&sql)
            .bind(query.status.map(JobStatus::as_str))
            .bind(query.limit())
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        rows.into_iter().map(Job::try_from).collect()
    }

    async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        result: Option<&serde_json::Value>,
        error: Option<&str>,
    ) -> Result<Job, CoreError> {
        let query = format!(
            "UPDATE jobs \
             SET status = $2, \
                 result = COALESCE($3, result), \
                 error_message = COALESCE($4, error_message), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(job_id)
            .bind(status.as_str())
            .bind(result)
            .bind(error)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| CoreError::NotFound {
                entity: "Job",
                id: job_id.to_string(),
            })?;
        row.try_into()
    }
}
