//! Shared data models crossing crate boundaries.

mod drive;
mod report;

pub use drive::DriveFile;
pub use report::{BatchEntry, BatchResponse, ValidationReport, VALIDITY_THRESHOLD};
