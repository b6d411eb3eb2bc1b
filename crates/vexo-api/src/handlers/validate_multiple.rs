use std::sync::Arc;

use axum::{extract::Multipart, extract::State, Json};

use vexo_core::models::BatchResponse;
use vexo_processing::{run_batch, BatchItem};

use crate::error::HttpAppError;
use crate::handlers::{is_image_part, read_part};
use crate::state::AppState;

/// Validate a batch of uploaded images with per-file failure isolation.
///
/// Files that fail an upfront check (wrong content type, oversized) keep
/// their slot in the response as failure entries; the whole call fails only
/// for an oversized batch or unready models.
#[tracing::instrument(
    skip(state, multipart),
    fields(operation = "validate_multiple", request_id = %uuid::Uuid::new_v4())
)]
pub async fn validate_multiple(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<BatchResponse>, HttpAppError> {
    let max_file_size = state.config.max_file_size_bytes;

    let mut items = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let part = read_part(field).await?;
        let item = if !is_image_part(&part) {
            BatchItem::rejected(
                part.label,
                format!(
                    "File must be an image (got content type: {})",
                    part.content_type.as_deref().unwrap_or("none")
                ),
            )
        } else if part.bytes.len() > max_file_size {
            BatchItem::rejected(
                part.label,
                format!(
                    "{} bytes exceeds maximum of {} bytes",
                    part.bytes.len(),
                    max_file_size
                ),
            )
        } else {
            BatchItem::bytes(part.label, part.bytes)
        };
        items.push(item);
    }

    let response = run_batch(&state.pipeline, items).await?;
    Ok(Json(response))
}
