//! Handlers for the `/jobs` resource.
//!
//! Submission and retry both create a `pending` job and then hand its
//! descriptor to the work queue. If the queue is unreachable the job is
//! moved to `failed` before the error is returned, so nothing is lost
//! silently.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use jobwire_core::error::CoreError;
use jobwire_core::jobs::{Job, JobListQuery, JobStatus, SubmitJob};
use jobwire_core::validation::{resolve_model, validate_repo_url};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_job(state: &AppState, job_id: &str) -> AppResult<Job> {
    state
        .jobs
        .get(job_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Job",
                id: job_id.to_string(),
            })
        })
}

/// Persist `job`, then enqueue it. On queue failure the stored job is
/// marked failed and [`AppError::Enqueue`] is returned.
async fn create_and_enqueue(state: &AppState, job: Job) -> AppResult<Job> {
    let job = state.jobs.create(&job).await?;

    if let Err(e) = state.queue.enqueue(&job.descriptor()).await {
        let message = format!("Failed to enqueue job: {e}");
        tracing::warn!(job_id = %job.id, error = %e, "Enqueue failed, marking job failed");

        if let Err(store_err) = state
            .jobs
            .update_status(&job.id, JobStatus::Failed, None, Some(&message))
            .await
        {
            tracing::error!(job_id = %job.id, error = %store_err, "Failed to mark job failed");
        }

        return Err(AppError::Enqueue {
            job_id: job.id,
            source: e,
        });
    }

    Ok(job)
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Validates the repository URL and model, stores a `pending` job and
/// queues it for analysis. Returns 201 with the job.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(input): Json<SubmitJob>,
) -> AppResult<impl IntoResponse> {
    let repo_url = input.repo_url.trim();
    validate_repo_url(repo_url)?;
    let model = resolve_model(input.model.as_deref())?;

    let job = create_and_enqueue(&state, Job::new(repo_url, model.id)).await?;

    tracing::info!(job_id = %job.id, model = %job.selected_model, "Job submitted");
    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs
///
/// Newest first. Supports `status`, `limit` and `offset` query parameters.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    let jobs = state.jobs.list(&params).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state, &job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/{id}/retry
///
/// Only failed jobs can be retried. The retry is a new job with its own id
/// that points back at the original through `retry_of`.
pub async fn retry_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let original = find_job(&state, &job_id).await?;

    if original.status != JobStatus::Failed {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Cannot retry job in '{}' status; only failed jobs can be retried",
            original.status
        ))));
    }

    let job = create_and_enqueue(&state, Job::retry_of(&original)).await?;

    tracing::info!(job_id = %job.id, retry_of = %original.id, "Job retried");
    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}
