//! Shared application state.

use std::sync::Arc;

use vexo_core::Config;
use vexo_drive::{DriveAuthManager, DriveFetcher};
use vexo_processing::{ModelRegistry, ScoringPipeline};

/// Everything handlers need, built once at startup and shared behind `Arc`.
pub struct AppState {
    pub config: Config,
    pub models: Arc<ModelRegistry>,
    pub pipeline: ScoringPipeline,
    pub auth: Arc<DriveAuthManager>,
    pub fetcher: Arc<dyn DriveFetcher>,
}
