use std::sync::Arc;

use axum::{extract::Multipart, extract::State, Json};

use vexo_core::models::ValidationReport;
use vexo_core::AppError;

use crate::error::HttpAppError;
use crate::handlers::{decode_image, is_image_part, read_single_part};
use crate::state::AppState;

/// Validate a single uploaded image.
///
/// # Errors
/// - `AppError::BadRequest` - No file in the multipart body
/// - `AppError::WrongContentType` - Part is not `image/*`
/// - `AppError::PayloadTooLarge` - File exceeds the configured limit
/// - `AppError::InvalidImage` - Bytes do not decode as an image
/// - `AppError::ModelNotReady` - Warm-up has not completed
#[tracing::instrument(
    skip(state, multipart),
    fields(operation = "validate", request_id = %uuid::Uuid::new_v4())
)]
pub async fn validate(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ValidationReport>, HttpAppError> {
    let part = read_single_part(&mut multipart).await?;

    if !is_image_part(&part) {
        return Err(AppError::WrongContentType(format!(
            "File must be an image (got content type: {})",
            part.content_type.as_deref().unwrap_or("none")
        ))
        .into());
    }
    if part.bytes.len() > state.config.max_file_size_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "{} bytes exceeds maximum of {} bytes",
            part.bytes.len(),
            state.config.max_file_size_bytes
        ))
        .into());
    }

    let image = decode_image(part.bytes).await?;
    let report = state.pipeline.score(&image, part.label).await?;
    Ok(Json(report))
}
