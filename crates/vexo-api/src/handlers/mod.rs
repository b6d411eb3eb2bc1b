//! Request handlers.

mod health;
mod validate;
mod validate_drive;
mod validate_multiple;
mod validate_sheet;
mod validate_zip;

pub use health::{health, root};
pub use validate::validate;
pub use validate_drive::{validate_drive, validate_drive_batch};
pub use validate_multiple::validate_multiple;
pub use validate_sheet::validate_sheet;
pub use validate_zip::validate_zip;

use axum::extract::multipart::Field;
use axum::extract::Multipart;

use vexo_core::AppError;
use vexo_processing::CanonicalImage;

use crate::error::HttpAppError;

/// One uploaded part, with its filename kept as the item label.
pub(crate) struct UploadedPart {
    pub label: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

pub(crate) async fn read_part(field: Field<'_>) -> Result<UploadedPart, HttpAppError> {
    let label = field
        .file_name()
        .map(str::to_string)
        .unwrap_or_else(|| "upload".to_string());
    let content_type = field.content_type().map(str::to_string);
    let bytes = field.bytes().await?.to_vec();
    Ok(UploadedPart {
        label,
        content_type,
        bytes,
    })
}

/// First part of a multipart request, required.
pub(crate) async fn read_single_part(
    multipart: &mut Multipart,
) -> Result<UploadedPart, HttpAppError> {
    match multipart.next_field().await? {
        Some(field) => read_part(field).await,
        None => Err(AppError::BadRequest("No file provided".to_string()).into()),
    }
}

pub(crate) fn is_image_part(part: &UploadedPart) -> bool {
    part.content_type
        .as_deref()
        .map(|ct| ct.starts_with("image/"))
        .unwrap_or(false)
}

/// Decode image bytes off the async runtime.
pub(crate) async fn decode_image(bytes: Vec<u8>) -> Result<CanonicalImage, HttpAppError> {
    let decoded = tokio::task::spawn_blocking(move || CanonicalImage::decode(&bytes))
        .await
        .map_err(|err| AppError::Internal(format!("Decode task failed: {}", err)))?;
    decoded.map_err(HttpAppError::from)
}
