//! Aggregate view of the live WebSocket layer.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ConnectionStats {
    pub total_connections: usize,
    pub distinct_subscribed_jobs: usize,
}

/// GET /api/v1/ws/stats
pub async fn connection_stats(State(state): State<AppState>) -> Json<ConnectionStats> {
    Json(ConnectionStats {
        total_connections: state.ws_manager.connection_count().await,
        distinct_subscribed_jobs: state.registry.job_count().await,
    })
}
