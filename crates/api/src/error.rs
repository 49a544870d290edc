use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jobwire_core::error::CoreError;
use jobwire_core::types::JobId;
use jobwire_events::QueueError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `jobwire_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The job was stored but could not be handed to the work queue.
    /// The job has already been marked failed.
    #[error("Job {job_id} could not be enqueued: {source}")]
    Enqueue {
        job_id: JobId,
        #[source]
        source: QueueError,
    },
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Queue errors ---
            AppError::Enqueue { job_id, source } => match source {
                QueueError::Unavailable(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "QUEUE_UNAVAILABLE",
                    format!("Job {job_id} was saved but could not be queued; retry it later"),
                ),
                QueueError::Serialize(e) => {
                    tracing::error!(job_id = %job_id, error = %e, "Unencodable job descriptor");
                    internal()
                }
            },
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
