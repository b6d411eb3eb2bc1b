//! Feature extraction and validity classification.
//!
//! The two model stages sit behind object-safe async traits so the HTTP
//! inference client and test fakes plug into the same pipeline. The
//! registry gates scoring on a completed warm-up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use vexo_core::models::ValidationReport;

use crate::normalize::CanonicalImage;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Models are not loaded: {0}")]
    ModelNotReady(String),

    #[error("Feature extraction failed: {0}")]
    Extraction(#[source] anyhow::Error),

    #[error("Classification failed: {0}")]
    Classification(#[source] anyhow::Error),
}

/// Produces a fixed-size embedding for one canonical image.
#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    async fn extract(&self, image: &CanonicalImage) -> anyhow::Result<Vec<f32>>;

    /// Verify the backing model is reachable and loaded.
    async fn warm_up(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Maps an embedding to a validity score in `[0, 1]`.
#[async_trait]
pub trait ValidityClassifier: Send + Sync {
    async fn classify(&self, embedding: &[f32]) -> anyhow::Result<f32>;

    async fn warm_up(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Owns both model stages and their readiness state.
pub struct ModelRegistry {
    extractor: Arc<dyn FeatureExtractor>,
    classifier: Arc<dyn ValidityClassifier>,
    ready: AtomicBool,
}

impl ModelRegistry {
    pub fn new(extractor: Arc<dyn FeatureExtractor>, classifier: Arc<dyn ValidityClassifier>) -> Self {
        Self {
            extractor,
            classifier,
            ready: AtomicBool::new(false),
        }
    }

    /// Probe both stages. Scoring is refused until this has succeeded once.
    pub async fn warm_up(&self) -> anyhow::Result<()> {
        self.extractor.warm_up().await?;
        self.classifier.warm_up().await?;
        self.ready.store(true, Ordering::SeqCst);
        tracing::info!("Models warmed up and ready");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn ensure_ready(&self) -> Result<(), ScoringError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(ScoringError::ModelNotReady(
                "model warm-up has not completed".to_string(),
            ))
        }
    }
}

/// Extraction followed by classification, reported against the fixed
/// validity threshold.
#[derive(Clone)]
pub struct ScoringPipeline {
    models: Arc<ModelRegistry>,
}

impl ScoringPipeline {
    pub fn new(models: Arc<ModelRegistry>) -> Self {
        Self { models }
    }

    pub async fn score(
        &self,
        image: &CanonicalImage,
        label: impl Into<String>,
    ) -> Result<ValidationReport, ScoringError> {
        self.models.ensure_ready()?;

        let embedding = self
            .models
            .extractor
            .extract(image)
            .await
            .map_err(ScoringError::Extraction)?;
        let score = self
            .models
            .classifier
            .classify(&embedding)
            .await
            .map_err(ScoringError::Classification)?;

        let report = ValidationReport::from_score(label, score);
        tracing::debug!(
            label = %report.label,
            score = report.validity_score,
            is_valid = report.is_valid,
            "Scored image"
        );
        Ok(report)
    }
}
