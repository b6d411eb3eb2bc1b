//! Remote file retrieval.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;

use vexo_core::models::DriveFile;

use crate::auth::AuthorizedClient;
use crate::error::DriveError;
use crate::locator::FileId;

const METADATA_FIELDS: &str = "id,name,mimeType,size,createdTime,modifiedTime";

/// Capability seam over the remote storage provider.
#[async_trait]
pub trait DriveFetcher: Send + Sync {
    /// Descriptive metadata for one file.
    async fn get_metadata(
        &self,
        client: &AuthorizedClient,
        id: &FileId,
    ) -> Result<DriveFile, DriveError>;

    /// Full file content. Implementations must reject non-image files
    /// before transferring any content.
    async fn download(
        &self,
        client: &AuthorizedClient,
        id: &FileId,
    ) -> Result<(DriveFile, Vec<u8>), DriveError>;
}

/// Fetcher backed by the Drive v3 REST API.
pub struct GoogleDriveFetcher {
    http: reqwest::Client,
    base_url: String,
}

impl GoogleDriveFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn file_url(&self, id: &FileId) -> String {
        format!("{}/files/{}", self.base_url.trim_end_matches('/'), id)
    }

    fn map_status(status: StatusCode, id: &FileId) -> Option<DriveError> {
        match status {
            StatusCode::NOT_FOUND => Some(DriveError::NotFound(id.to_string())),
            StatusCode::FORBIDDEN => Some(DriveError::AccessDenied(id.to_string())),
            s if !s.is_success() => Some(DriveError::Provider {
                status: s.as_u16(),
                message: format!("Unexpected response for file {}", id),
            }),
            _ => None,
        }
    }
}

#[async_trait]
impl DriveFetcher for GoogleDriveFetcher {
    async fn get_metadata(
        &self,
        client: &AuthorizedClient,
        id: &FileId,
    ) -> Result<DriveFile, DriveError> {
        let response = self
            .http
            .get(self.file_url(id))
            .query(&[("fields", METADATA_FIELDS)])
            .bearer_auth(client.bearer_token())
            .send()
            .await?;

        if let Some(err) = Self::map_status(response.status(), id) {
            return Err(err);
        }

        Ok(response.json().await?)
    }

    async fn download(
        &self,
        client: &AuthorizedClient,
        id: &FileId,
    ) -> Result<(DriveFile, Vec<u8>), DriveError> {
        let metadata = self.get_metadata(client, id).await?;
        if !metadata.is_image() {
            return Err(DriveError::WrongContentType {
                id: id.to_string(),
                mime_type: metadata.mime_type.clone(),
            });
        }

        let response = self
            .http
            .get(self.file_url(id))
            .query(&[("alt", "media")])
            .bearer_auth(client.bearer_token())
            .send()
            .await?;

        if let Some(err) = Self::map_status(response.status(), id) {
            return Err(err);
        }

        let mut content = match metadata.size_bytes() {
            Some(size) => Vec::with_capacity(size as usize),
            None => Vec::new(),
        };
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            content.extend_from_slice(&chunk?);
        }

        tracing::debug!(
            file_id = %id,
            name = %metadata.name,
            bytes = content.len(),
            "Downloaded file content"
        );

        Ok((metadata, content))
    }
}
