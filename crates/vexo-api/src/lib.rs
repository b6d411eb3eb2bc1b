//! HTTP surface for the image validation service.

pub mod error;
pub mod handlers;
pub mod model_client;
pub mod setup;
pub mod state;
pub mod telemetry;
