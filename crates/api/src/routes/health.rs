use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while live updates are unavailable.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the relay's bus subscription is live.
    pub relay_connected: bool,
    /// Open WebSocket connections.
    pub connections: usize,
}

/// GET /health -- returns service and relay health.
///
/// A degraded relay does not fail the check: jobs can still be submitted.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let relay_connected = state.bus.is_subscribed();
    let status = if relay_connected { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        relay_connected,
        connections: state.ws_manager.connection_count().await,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
