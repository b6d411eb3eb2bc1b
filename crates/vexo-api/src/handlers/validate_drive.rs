use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;

use vexo_core::models::{BatchEntry, BatchResponse, ValidationReport};
use vexo_core::{AppError, ErrorMetadata};
use vexo_drive::locator;
use vexo_processing::ensure_batch_size;

use crate::error::{HttpAppError, ValidatedJson};
use crate::handlers::decode_image;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DriveRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct DriveBatchRequest {
    pub urls: Vec<String>,
}

/// Validate one image fetched from a Drive sharing URL.
///
/// The report carries `file_id` and `drive_url` alongside the usual fields,
/// labelled with the file's name from its metadata.
#[tracing::instrument(skip(state, request), fields(operation = "validate_drive"))]
pub async fn validate_drive(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<DriveRequest>,
) -> Result<Json<ValidationReport>, HttpAppError> {
    let report = validate_one_url(&state, &request.url).await?;
    Ok(Json(report))
}

/// Validate a list of Drive sharing URLs with per-URL failure isolation.
#[tracing::instrument(
    skip(state, request),
    fields(operation = "validate_drive_batch", urls = request.urls.len())
)]
pub async fn validate_drive_batch(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<DriveBatchRequest>,
) -> Result<Json<BatchResponse>, HttpAppError> {
    ensure_batch_size(request.urls.len())?;

    let mut results = Vec::with_capacity(request.urls.len());
    for url in &request.urls {
        match validate_one_url(&state, url).await {
            Ok(report) => results.push(BatchEntry::Report(report)),
            // Unready models would fail every remaining URL identically
            Err(HttpAppError(err @ AppError::ModelNotReady(_))) => {
                return Err(HttpAppError(err));
            }
            Err(HttpAppError(err)) => {
                tracing::debug!(url = %url, error = %err, "Drive batch item failed");
                results.push(BatchEntry::failure(url, err.client_message()));
            }
        }
    }
    Ok(Json(BatchResponse { results }))
}

async fn validate_one_url(
    state: &AppState,
    url: &str,
) -> Result<ValidationReport, HttpAppError> {
    let id = locator::resolve(url).ok_or_else(|| {
        HttpAppError(AppError::BadRequest(format!(
            "Unrecognized sharing URL: {}",
            url
        )))
    })?;

    let client = state.auth.get_authorized_client().await?;
    let (metadata, bytes) = state.fetcher.download(&client, &id).await?;
    let image = decode_image(bytes).await?;
    let report = state.pipeline.score(&image, metadata.name).await?;
    Ok(report.with_drive_source(id.as_str(), url))
}
