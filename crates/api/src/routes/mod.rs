pub mod health;
pub mod jobs;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                     WebSocket (subscribe / unsubscribe / ping)
/// /ws/stats               live connection and subscription counts
///
/// /jobs                   list, submit
/// /jobs/{id}              get
/// /jobs/{id}/retry        retry a failed job (POST)
///
/// /models                 selectable analysis models
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/ws/stats", get(handlers::connections::connection_stats))
        .nest("/jobs", jobs::router())
        .route("/models", get(handlers::models::list_models))
}
