//! Application setup and initialization
//!
//! All startup wiring lives here instead of main.rs so the pieces stay
//! testable: model client construction, warm-up, Drive auth wiring, and the
//! router.

pub mod routes;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use vexo_core::Config;
use vexo_drive::{DriveAuthManager, DriveFetcher, GoogleDriveFetcher, LocalServerConsent};
use vexo_processing::{ModelRegistry, ScoringPipeline};

use crate::model_client::ModelServerClient;
use crate::state::AppState;

const WARM_UP_RETRY_SECS: u64 = 10;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry();
    tracing::info!("Configuration loaded and validated successfully");

    let model_client = Arc::new(ModelServerClient::new(
        config.model_server_url.clone(),
        config.model_request_timeout_secs,
    )?);
    let models = Arc::new(ModelRegistry::new(model_client.clone(), model_client));

    // A down model server must not prevent startup; the service reports
    // unhealthy and keeps retrying until the sidecar answers.
    if let Err(err) = models.warm_up().await {
        tracing::warn!(
            error = %err,
            model_server_url = %config.model_server_url,
            "Model warm-up failed; serving degraded until the model server is reachable"
        );
        spawn_warm_up_retry(models.clone());
    }

    let consent = Arc::new(LocalServerConsent::new(config.oauth_callback_port));
    let auth = Arc::new(DriveAuthManager::new(
        &config.credentials_path,
        &config.token_path,
        consent,
    ));
    let fetcher: Arc<dyn DriveFetcher> =
        Arc::new(GoogleDriveFetcher::new(config.drive_api_base_url.clone()));

    let state = Arc::new(AppState {
        pipeline: ScoringPipeline::new(models.clone()),
        config: config.clone(),
        models,
        auth,
        fetcher,
    });

    let router = routes::setup_routes(&config, state.clone())?;
    Ok((state, router))
}

fn spawn_warm_up_retry(models: Arc<ModelRegistry>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(WARM_UP_RETRY_SECS)).await;
            match models.warm_up().await {
                Ok(()) => break,
                Err(err) => {
                    tracing::debug!(error = %err, "Model warm-up retry failed");
                }
            }
        }
    });
}
