//! Validation result shapes.

use serde::{Deserialize, Serialize};

/// A single validation failure, positioned within the file it was found in.
///
/// `line` is `Some` for JSONL records (1-indexed); `None` for single-document
/// JSON artifacts, mirroring the original's "Line N: ..." message prefixing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ValidationError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), line: None, path: None }
    }

    #[must_use]
    pub fn at_line(line: usize, message: impl Into<String>) -> Self {
        Self { message: message.into(), line: Some(line), path: None }
    }

    #[must_use]
    pub fn at_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { message: message.into(), line: None, path: Some(path.into()) }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line, &self.path) {
            (Some(line), _) => write!(f, "Line {line}: {}", self.message),
            (None, Some(path)) => write!(f, "{path}: {}", self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

/// Outcome of validating one artifact file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub artifact_type: String,
    pub records_checked: usize,
    pub schema_version_found: Option<String>,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    #[must_use]
    pub fn ok(artifact_type: impl Into<String>, records_checked: usize, schema_version: Option<String>) -> Self {
        Self {
            valid: true,
            artifact_type: artifact_type.into(),
            records_checked,
            schema_version_found: schema_version,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn failed(artifact_type: impl Into<String>, errors: Vec<ValidationError>) -> Self {
        Self {
            valid: false,
            artifact_type: artifact_type.into(),
            records_checked: 0,
            schema_version_found: None,
            errors,
        }
    }
}
