//! HTTP client for the inference sidecar.
//!
//! The sidecar exposes three endpoints: `POST /embed` takes a PNG body and
//! returns the feature embedding, `POST /classify` takes an embedding and
//! returns the validity score, and `GET /health` answers once the models are
//! loaded. One client implements both pipeline traits.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use vexo_processing::{CanonicalImage, FeatureExtractor, ValidityClassifier};

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    embedding: &'a [f32],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    score: f32,
}

#[derive(Clone)]
pub struct ModelServerClient {
    http: reqwest::Client,
    base_url: String,
}

impl ModelServerClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build model server HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn probe_health(&self) -> anyhow::Result<()> {
        self.http
            .get(self.endpoint("/health"))
            .send()
            .await
            .context("Model server is unreachable")?
            .error_for_status()
            .context("Model server reported unhealthy")?;
        Ok(())
    }
}

#[async_trait]
impl FeatureExtractor for ModelServerClient {
    async fn extract(&self, image: &CanonicalImage) -> anyhow::Result<Vec<f32>> {
        let png = image.to_png_bytes().context("Failed to encode image")?;
        let response: EmbedResponse = self
            .http
            .post(self.endpoint("/embed"))
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(png)
            .send()
            .await
            .context("Embed request failed")?
            .error_for_status()
            .context("Embed request rejected")?
            .json()
            .await
            .context("Embed response was not valid JSON")?;
        Ok(response.embedding)
    }

    async fn warm_up(&self) -> anyhow::Result<()> {
        self.probe_health().await
    }
}

#[async_trait]
impl ValidityClassifier for ModelServerClient {
    async fn classify(&self, embedding: &[f32]) -> anyhow::Result<f32> {
        let response: ClassifyResponse = self
            .http
            .post(self.endpoint("/classify"))
            .json(&ClassifyRequest { embedding })
            .send()
            .await
            .context("Classify request failed")?
            .error_for_status()
            .context("Classify request rejected")?
            .json()
            .await
            .context("Classify response was not valid JSON")?;
        Ok(response.score)
    }

    async fn warm_up(&self) -> anyhow::Result<()> {
        self.probe_health().await
    }
}
