//! Drive operation errors

use thiserror::Error;

/// Errors from the Drive locator/auth/fetch path.
#[derive(Debug, Error)]
pub enum DriveError {
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("File {id} is not an image (content type: {mime_type})")]
    WrongContentType { id: String, mime_type: String },

    #[error("Provider returned status {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
