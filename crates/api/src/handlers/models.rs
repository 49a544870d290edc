use axum::Json;
use jobwire_core::catalog::{ModelInfo, MODELS};

use crate::response::DataResponse;

/// GET /api/v1/models
pub async fn list_models() -> Json<DataResponse<&'static [ModelInfo]>> {
    Json(DataResponse { data: MODELS })
}
