//! Batch orchestration.
//!
//! One limit and one loop shared by every multi-item channel. Items run
//! sequentially in input order; a failing item becomes a failure entry and
//! its siblings are untouched. The output always has the input's length and
//! order.

use thiserror::Error;

use vexo_core::models::{BatchEntry, BatchResponse};

use crate::normalize::{image_from_cell, CanonicalImage, CellOutcome};
use crate::scoring::{ScoringError, ScoringPipeline};

/// Upper bound on items per batch call, shared by files, zip members,
/// spreadsheet rows and URL lists.
pub const MAX_BATCH_ITEMS: usize = 100;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Too many items: {count} (maximum {max})")]
    TooManyItems { count: usize, max: usize },

    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

/// Reject oversized batches before any item is touched.
pub fn ensure_batch_size(count: usize) -> Result<(), BatchError> {
    if count > MAX_BATCH_ITEMS {
        return Err(BatchError::TooManyItems {
            count,
            max: MAX_BATCH_ITEMS,
        });
    }
    Ok(())
}

/// Raw image bytes, a spreadsheet cell still awaiting base64 decoding, or
/// an item already rejected by an upstream check (it keeps its slot in the
/// output as a failure entry).
#[derive(Debug)]
pub enum ItemPayload {
    Bytes(Vec<u8>),
    Cell(String),
    Rejected(String),
}

#[derive(Debug)]
pub struct BatchItem {
    pub label: String,
    pub payload: ItemPayload,
}

impl BatchItem {
    pub fn bytes(label: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            payload: ItemPayload::Bytes(bytes),
        }
    }

    pub fn cell(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: ItemPayload::Cell(value.into()),
        }
    }

    pub fn rejected(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: ItemPayload::Rejected(reason.into()),
        }
    }
}

/// Score a batch with per-item failure isolation.
///
/// `ModelNotReady` aborts the whole call since every remaining item would
/// fail the same way. Everything else is confined to its entry.
pub async fn run_batch(
    pipeline: &ScoringPipeline,
    items: Vec<BatchItem>,
) -> Result<BatchResponse, BatchError> {
    ensure_batch_size(items.len())?;

    let mut results = Vec::with_capacity(items.len());
    for item in items {
        let entry = score_item(pipeline, item).await?;
        results.push(entry);
    }
    Ok(BatchResponse { results })
}

async fn score_item(pipeline: &ScoringPipeline, item: BatchItem) -> Result<BatchEntry, BatchError> {
    let bytes = match item.payload {
        ItemPayload::Bytes(bytes) => bytes,
        ItemPayload::Rejected(reason) => {
            return Ok(BatchEntry::failure(item.label, reason));
        }
        ItemPayload::Cell(value) => match image_from_cell(&value) {
            CellOutcome::Image(bytes) => bytes,
            CellOutcome::NoImage => {
                return Ok(BatchEntry::failure(item.label, "No image provided"));
            }
            CellOutcome::Invalid(message) => {
                return Ok(BatchEntry::failure(item.label, message));
            }
        },
    };

    // Decode off the async runtime; one image in memory at a time.
    let decoded = tokio::task::spawn_blocking(move || CanonicalImage::decode(&bytes)).await;
    let image = match decoded {
        Ok(Ok(image)) => image,
        Ok(Err(err)) => {
            tracing::warn!(label = %item.label, error = %err, "Batch item failed to decode");
            return Ok(BatchEntry::failure(item.label, err.to_string()));
        }
        Err(join_err) => {
            tracing::error!(label = %item.label, error = %join_err, "Decode task panicked");
            return Ok(BatchEntry::failure(item.label, "Internal decoding failure"));
        }
    };

    match pipeline.score(&image, item.label.clone()).await {
        Ok(report) => Ok(BatchEntry::Report(report)),
        Err(err @ ScoringError::ModelNotReady(_)) => Err(err.into()),
        Err(err) => Ok(BatchEntry::failure(item.label, err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{FeatureExtractor, ModelRegistry, ValidityClassifier};
    use async_trait::async_trait;
    use image::RgbImage;
    use std::sync::Arc;

    struct FixedExtractor;

    #[async_trait]
    impl FeatureExtractor for FixedExtractor {
        async fn extract(&self, _image: &CanonicalImage) -> anyhow::Result<Vec<f32>> {
            Ok(vec![0.0; 4])
        }
    }

    struct FixedClassifier;

    #[async_trait]
    impl ValidityClassifier for FixedClassifier {
        async fn classify(&self, _embedding: &[f32]) -> anyhow::Result<f32> {
            Ok(0.9)
        }
    }

    async fn ready_pipeline() -> ScoringPipeline {
        let registry = Arc::new(ModelRegistry::new(
            Arc::new(FixedExtractor),
            Arc::new(FixedClassifier),
        ));
        registry.warm_up().await.unwrap();
        ScoringPipeline::new(registry)
    }

    fn png_fixture() -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, image::Rgb([90, 0, 0])))
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_batch_size_limit_edges() {
        assert!(ensure_batch_size(MAX_BATCH_ITEMS).is_ok());
        let err = ensure_batch_size(MAX_BATCH_ITEMS + 1).unwrap_err();
        assert!(matches!(
            err,
            BatchError::TooManyItems { count: 101, max: 100 }
        ));
    }

    #[tokio::test]
    async fn test_oversized_batch_fails_before_any_work() {
        let pipeline = ready_pipeline().await;
        let items: Vec<BatchItem> = (0..MAX_BATCH_ITEMS + 1)
            .map(|i| BatchItem::bytes(format!("f{}.png", i), vec![]))
            .collect();
        let err = run_batch(&pipeline, items).await.unwrap_err();
        assert!(matches!(err, BatchError::TooManyItems { .. }));
    }

    #[tokio::test]
    async fn test_failure_isolation_preserves_order() {
        let pipeline = ready_pipeline().await;
        let items = vec![
            BatchItem::bytes("good.png", png_fixture()),
            BatchItem::bytes("broken.png", b"not an image".to_vec()),
            BatchItem::bytes("also-good.png", png_fixture()),
        ];

        let response = run_batch(&pipeline, items).await.unwrap();
        assert_eq!(response.results.len(), 3);
        assert!(!response.results[0].is_failure());
        assert!(response.results[1].is_failure());
        assert!(!response.results[2].is_failure());
        assert_eq!(response.results[1].label(), "broken.png");
    }

    #[tokio::test]
    async fn test_empty_cell_becomes_failure_entry_without_aborting() {
        let pipeline = ready_pipeline().await;
        let encoded = {
            use base64::Engine;
            base64::engine::general_purpose::STANDARD.encode(png_fixture())
        };
        let items = vec![
            BatchItem::cell("row 1", ""),
            BatchItem::cell("row 2", format!("data:image/png;base64,{}", encoded)),
            BatchItem::cell("row 3", "%%bad%%"),
        ];

        let response = run_batch(&pipeline, items).await.unwrap();
        assert_eq!(response.results.len(), 3);
        assert!(response.results[0].is_failure());
        assert!(!response.results[1].is_failure());
        assert!(response.results[2].is_failure());
    }

    #[tokio::test]
    async fn test_unready_models_abort_the_batch() {
        let registry = Arc::new(ModelRegistry::new(
            Arc::new(FixedExtractor),
            Arc::new(FixedClassifier),
        ));
        let pipeline = ScoringPipeline::new(registry);
        let items = vec![BatchItem::bytes("a.png", png_fixture())];
        let err = run_batch(&pipeline, items).await.unwrap_err();
        assert!(matches!(err, BatchError::Scoring(ScoringError::ModelNotReady(_))));
    }
}
