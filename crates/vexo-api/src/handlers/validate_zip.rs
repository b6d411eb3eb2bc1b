use std::sync::Arc;

use axum::{extract::Multipart, extract::State, Json};

use vexo_core::models::BatchResponse;
use vexo_core::AppError;
use vexo_processing::{extract_zip_images, run_batch};

use crate::error::HttpAppError;
use crate::handlers::read_single_part;
use crate::state::AppState;

/// Validate every image inside an uploaded zip archive.
///
/// Member names are the item labels. Nested directories are skipped unless
/// `ZIP_RECURSE_NESTED` is enabled.
#[tracing::instrument(
    skip(state, multipart),
    fields(operation = "validate_zip", request_id = %uuid::Uuid::new_v4())
)]
pub async fn validate_zip(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<BatchResponse>, HttpAppError> {
    let part = read_single_part(&mut multipart).await?;
    let recurse = state.config.zip_recurse_nested;

    // Archive expansion reads and inflates members; keep it off the runtime.
    let items = tokio::task::spawn_blocking(move || extract_zip_images(&part.bytes, recurse))
        .await
        .map_err(|err| AppError::Internal(format!("Archive task failed: {}", err)))??;

    let response = run_batch(&state.pipeline, items).await?;
    Ok(Json(response))
}
