use std::sync::Arc;

use axum::{extract::Multipart, extract::State, Json};

use vexo_core::models::BatchResponse;
use vexo_core::AppError;
use vexo_processing::{extract_sheet_cells, run_batch};

use crate::error::HttpAppError;
use crate::handlers::read_single_part;
use crate::state::AppState;

/// Validate base64-encoded images from the first column of an uploaded
/// spreadsheet. Entries are labelled `row N` so results correlate
/// positionally with the sheet; empty rows become failure entries without
/// affecting their siblings.
#[tracing::instrument(
    skip(state, multipart),
    fields(operation = "validate_sheet", request_id = %uuid::Uuid::new_v4())
)]
pub async fn validate_sheet(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<BatchResponse>, HttpAppError> {
    let part = read_single_part(&mut multipart).await?;

    let items = tokio::task::spawn_blocking(move || extract_sheet_cells(&part.bytes))
        .await
        .map_err(|err| AppError::Internal(format!("Worksheet task failed: {}", err)))??;

    let response = run_batch(&state.pipeline, items).await?;
    Ok(Json(response))
}
