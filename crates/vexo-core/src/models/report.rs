//! Validation result models.
//!
//! `ValidationReport` is the unit of output for both single and batch
//! operations; `BatchEntry` preserves per-item failure records so one bad
//! item never hides the rest of a batch.

use serde::{Deserialize, Serialize};

/// Fixed pass/fail decision threshold. Not configurable.
pub const VALIDITY_THRESHOLD: f32 = 0.5;

/// Outcome of scoring one image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationReport {
    /// Original item label: filename, `row N`, or URL.
    pub label: String,
    pub validity_score: f32,
    /// Score as a percentage, rounded to one decimal place.
    pub percentage: f32,
    pub is_valid: bool,
    pub message: String,
    /// Set for Drive-sourced items only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive_url: Option<String>,
}

impl ValidationReport {
    /// Build a report from a raw classifier score. The decision rule is
    /// `score >= VALIDITY_THRESHOLD`; the message is selected solely by the
    /// decision.
    pub fn from_score(label: impl Into<String>, score: f32) -> Self {
        let is_valid = score >= VALIDITY_THRESHOLD;
        Self {
            label: label.into(),
            validity_score: score,
            percentage: (score * 1000.0).round() / 10.0,
            is_valid,
            message: if is_valid {
                "Image is valid".to_string()
            } else {
                "Image is not valid".to_string()
            },
            file_id: None,
            drive_url: None,
        }
    }

    pub fn with_drive_source(mut self, file_id: impl Into<String>, url: impl Into<String>) -> Self {
        self.file_id = Some(file_id.into());
        self.drive_url = Some(url.into());
        self
    }
}

/// One entry of a batch response: either a full report or a failure record
/// carrying only the item label and a human-readable error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum BatchEntry {
    Report(ValidationReport),
    Failure { label: String, error: String },
}

impl BatchEntry {
    pub fn failure(label: impl Into<String>, error: impl Into<String>) -> Self {
        BatchEntry::Failure {
            label: label.into(),
            error: error.into(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            BatchEntry::Report(report) => &report.label,
            BatchEntry::Failure { label, .. } => label,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, BatchEntry::Failure { .. })
    }
}

/// Batch response wrapper: entries in input order, length equals input count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub results: Vec<BatchEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_score_valid() {
        let report = ValidationReport::from_score("photo.jpg", 0.9);
        assert!(report.is_valid);
        assert_eq!(report.validity_score, 0.9);
        assert_eq!(report.percentage, 90.0);
        assert_eq!(report.message, "Image is valid");
        assert!(report.file_id.is_none());
    }

    #[test]
    fn test_from_score_threshold_boundary() {
        // The decision rule is >=, so exactly 0.5 passes
        assert!(ValidationReport::from_score("a", 0.5).is_valid);
        assert!(!ValidationReport::from_score("b", 0.4999).is_valid);
    }

    #[test]
    fn test_percentage_one_decimal() {
        let report = ValidationReport::from_score("a", 0.12345);
        assert_eq!(report.percentage, 12.3);
        let report = ValidationReport::from_score("b", 0.9999);
        assert_eq!(report.percentage, 100.0);
    }

    #[test]
    fn test_batch_entry_serialization_shape() {
        let report = BatchEntry::Report(ValidationReport::from_score("a.png", 0.7));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["label"], "a.png");
        assert!(json.get("error").is_none());

        let failure = BatchEntry::failure("b.png", "Invalid image format");
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["label"], "b.png");
        assert_eq!(json["error"], "Invalid image format");
        assert!(json.get("validity_score").is_none());
    }

    #[test]
    fn test_drive_source_fields() {
        let report =
            ValidationReport::from_score("scan.png", 0.8).with_drive_source("abc123", "https://drive.google.com/file/d/abc123/view");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["file_id"], "abc123");
        assert_eq!(json["drive_url"], "https://drive.google.com/file/d/abc123/view");
    }
}
