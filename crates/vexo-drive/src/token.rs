//! Durable credential slot.
//!
//! One serialized credential for one principal. Absence of the file is the
//! normal "no credential yet" state. The slot is rewritten on every
//! successful refresh or consent.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DriveError;

/// Margin subtracted from the stored expiry so a token that is about to
/// expire mid-request is treated as already expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A persisted OAuth2 credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredCredential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub scopes: Vec<String>,
}

impl StoredCredential {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

/// File-backed store for the single credential slot.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the slot. A missing file is `Ok(None)`; a corrupt file is
    /// treated the same way (the credential is re-acquired via consent)
    /// after logging a warning.
    pub async fn load(&self) -> Result<Option<StoredCredential>, DriveError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(credential) => Ok(Some(credential)),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "Stored credential is not parseable, discarding it"
                );
                Ok(None)
            }
        }
    }

    pub async fn save(&self, credential: &StoredCredential) -> Result<(), DriveError> {
        let bytes = serde_json::to_vec_pretty(credential)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}
