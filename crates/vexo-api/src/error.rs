//! HTTP error response conversion
//!
//! **Preferred handler pattern:** Return `Result<impl IntoResponse, HttpAppError>`.
//! Use `AppError` (or types that implement `Into<HttpAppError>`) for errors so
//! they render consistently (status, body, logging).

use axum::{
    extract::multipart::MultipartError,
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

use vexo_core::{AppError, ErrorMetadata, LogLevel};
use vexo_drive::DriveError;
use vexo_processing::{ArchiveError, BatchError, NormalizeError, ScoringError, SheetError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from vexo-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

/// Convert JSON body deserialization failures into a 400 with our ErrorResponse format.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl From<MultipartError> for HttpAppError {
    fn from(err: MultipartError) -> Self {
        HttpAppError(AppError::BadRequest(format!(
            "Invalid multipart request: {}",
            err.body_text()
        )))
    }
}

/// JSON body extractor that returns our ErrorResponse format (400 + JSON) on
/// deserialization failure, instead of axum's plain-text rejection.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;
        let is_production = is_production_env();

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Always hide details in production; in non-production, only show
        // details for non-sensitive errors.
        let body = if is_production || app_error.is_sensitive() {
            Json(ErrorResponse {
                error: app_error.client_message(),
                details: None,
                error_type: None,
                code: app_error.error_code().to_string(),
                recoverable: app_error.is_recoverable(),
                suggested_action: app_error.suggested_action().map(String::from),
            })
        } else {
            Json(ErrorResponse {
                error: app_error.client_message(),
                details: Some(app_error.detailed_message()),
                error_type: Some(app_error.error_type().to_string()),
                code: app_error.error_code().to_string(),
                recoverable: app_error.is_recoverable(),
                suggested_action: app_error.suggested_action().map(String::from),
            })
        };

        (status, body).into_response()
    }
}

// Convert domain errors to HttpAppError (avoids orphan rule: we impl for local HttpAppError)

impl From<DriveError> for HttpAppError {
    fn from(err: DriveError) -> Self {
        let app = match err {
            DriveError::ConfigurationMissing(msg) => AppError::ConfigurationMissing(msg),
            DriveError::AuthenticationFailed(msg) => AppError::AuthenticationFailed(msg),
            DriveError::NotFound(id) => AppError::NotFound(format!("File not found: {}", id)),
            DriveError::AccessDenied(id) => {
                AppError::AccessDenied(format!("Access denied to file: {}", id))
            }
            DriveError::WrongContentType { id, mime_type } => AppError::WrongContentType(format!(
                "File {} is not an image (content type: {})",
                id, mime_type
            )),
            DriveError::Provider { status, message } => {
                AppError::Internal(format!("Storage provider error ({}): {}", status, message))
            }
            DriveError::Request(err) => AppError::Internal(format!("HTTP error: {}", err)),
            DriveError::Io(err) => AppError::Internal(format!("IO error: {}", err)),
            DriveError::Serialization(err) => {
                AppError::Internal(format!("Credential serialization error: {}", err))
            }
        };
        HttpAppError(app)
    }
}

impl From<NormalizeError> for HttpAppError {
    fn from(err: NormalizeError) -> Self {
        HttpAppError(AppError::InvalidImage(err.to_string()))
    }
}

impl From<ScoringError> for HttpAppError {
    fn from(err: ScoringError) -> Self {
        let app = match err {
            ScoringError::ModelNotReady(msg) => AppError::ModelNotReady(msg),
            other => AppError::Internal(other.to_string()),
        };
        HttpAppError(app)
    }
}

impl From<BatchError> for HttpAppError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::TooManyItems { count, max } => {
                HttpAppError(AppError::TooManyItems { count, max })
            }
            BatchError::Scoring(err) => err.into(),
        }
    }
}

impl From<ArchiveError> for HttpAppError {
    fn from(err: ArchiveError) -> Self {
        HttpAppError(AppError::InvalidInput(err.to_string()))
    }
}

impl From<SheetError> for HttpAppError {
    fn from(err: SheetError) -> Self {
        HttpAppError(AppError::InvalidInput(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_drive_error_not_found() {
        let HttpAppError(app) = DriveError::NotFound("abc123".to_string()).into();
        match app {
            AppError::NotFound(msg) => assert!(msg.contains("abc123")),
            _ => panic!("Expected NotFound variant"),
        }
    }

    #[test]
    fn test_from_drive_error_access_denied() {
        let HttpAppError(app) = DriveError::AccessDenied("abc123".to_string()).into();
        match app {
            AppError::AccessDenied(msg) => assert!(msg.contains("abc123")),
            _ => panic!("Expected AccessDenied variant"),
        }
    }

    #[test]
    fn test_from_drive_error_configuration_missing() {
        let HttpAppError(app) =
            DriveError::ConfigurationMissing("credentials.json".to_string()).into();
        assert!(matches!(app, AppError::ConfigurationMissing(_)));
        assert_eq!(app.http_status_code(), 500);
    }

    #[test]
    fn test_from_scoring_error_model_not_ready() {
        let HttpAppError(app) =
            ScoringError::ModelNotReady("warming up".to_string()).into();
        assert!(matches!(app, AppError::ModelNotReady(_)));
        assert_eq!(app.http_status_code(), 503);
        assert!(app.is_recoverable());
    }

    #[test]
    fn test_from_batch_error_too_many_items() {
        let HttpAppError(app) = BatchError::TooManyItems {
            count: 101,
            max: 100,
        }
        .into();
        assert!(matches!(app, AppError::TooManyItems { count: 101, max: 100 }));
    }

    #[test]
    fn test_from_normalize_error_is_invalid_image() {
        let HttpAppError(app) =
            NormalizeError::UnsupportedFormat("bad magic".to_string()).into();
        assert!(matches!(app, AppError::InvalidImage(_)));
        assert_eq!(app.http_status_code(), 400);
    }

    /// The public error response contract: "error", "code", "recoverable"
    /// always present; "details" / "error_type" / "suggested_action" optional.
    #[test]
    fn test_error_response_shape() {
        let response = ErrorResponse {
            error: "Not found".to_string(),
            details: None,
            error_type: None,
            code: "NOT_FOUND".to_string(),
            recoverable: false,
            suggested_action: Some("Verify the file ID".to_string()),
        };
        let json = serde_json::to_value(&response).expect("serialize");
        assert!(json.get("error").and_then(|v| v.as_str()).is_some());
        assert_eq!(json.get("code").and_then(|v| v.as_str()), Some("NOT_FOUND"));
        assert!(json.get("recoverable").and_then(|v| v.as_bool()).is_some());
        assert!(json.get("details").is_none());
    }
}
