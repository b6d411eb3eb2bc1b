//! Core types for the vexo image-validation service.
//!
//! Shared between the ingestion, remote-drive, and API crates: the unified
//! error type, environment configuration, and the result/metadata models
//! that cross crate boundaries.

pub mod config;
pub mod error;
pub mod models;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
