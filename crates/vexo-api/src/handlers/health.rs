use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;

use crate::state::AppState;

/// Service identity and endpoint map.
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "service": "vexo",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /health",
            "validate": "POST /validate",
            "validate_multiple": "POST /validate_multiple",
            "validate_zip": "POST /validate_zip",
            "validate_sheet": "POST /validate_sheet",
            "validate_drive": "POST /validate_drive",
            "validate_drive_batch": "POST /validate_drive_batch"
        }
    }))
}

/// Healthy only once model warm-up has completed.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let models_loaded = state.models.is_ready();
    let status = if models_loaded {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = json!({
        "status": if models_loaded { "ok" } else { "degraded" },
        "models_loaded": models_loaded,
    });
    (status, Json(body))
}
