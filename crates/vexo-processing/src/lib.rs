//! Ingestion and scoring.
//!
//! Every input channel (raw bytes, zip members, spreadsheet cells) is
//! normalized into a [`normalize::CanonicalImage`] and scored through one
//! [`scoring::ScoringPipeline`]. The [`batch`] module runs many items
//! through that pipeline with per-item failure isolation.

pub mod archive;
pub mod batch;
pub mod normalize;
pub mod scoring;
pub mod sheet;

pub use archive::{extract_zip_images, ArchiveError};
pub use batch::{ensure_batch_size, run_batch, BatchError, BatchItem, ItemPayload, MAX_BATCH_ITEMS};
pub use normalize::{classify_cell, image_from_cell, CanonicalImage, CellOutcome, CellValue, NormalizeError};
pub use scoring::{FeatureExtractor, ModelRegistry, ScoringError, ScoringPipeline, ValidityClassifier};
pub use sheet::{extract_sheet_cells, SheetError};
