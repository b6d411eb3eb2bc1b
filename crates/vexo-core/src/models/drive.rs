//! Remote file metadata as returned by the Drive v3 `files.get` call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one remote file. Fetched fresh per request; never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    /// The API serializes int64 sizes as strings.
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
}

impl DriveFile {
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}
