//! Bundle manifest data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const BUNDLE_SCHEMA_VERSION: &str = "1.0.0";
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Artifact type priority for manifest sort order: unknowns
/// sort last, via `artifact_type_order_index`.
pub const ARTIFACT_TYPE_ORDER: &[&str] =
    &["apparatus", "citations", "dossier", "lockfile", "quote", "schema", "snapshot", "translation"];

/// Index of `artifact_type` in [`ARTIFACT_TYPE_ORDER`], or `usize::MAX` if
/// unrecognized (sorts after every known type).
#[must_use]
pub fn artifact_type_order_index(artifact_type: &str) -> usize {
    ARTIFACT_TYPE_ORDER.iter().position(|&t| t == artifact_type).unwrap_or(usize::MAX)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub path: String,
    pub artifact_type: String,
    pub sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
}

/// Bundle manifest. `content_hash` is
/// SHA-256 over the concatenation of `artifacts`' `sha256` fields, sorted
/// by `(artifact_type_order_index, path)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleManifest {
    pub schema_version: String,
    pub tool_version: String,
    pub created_utc: DateTime<Utc>,
    pub lockfile_hash: String,
    pub snapshot_hash: String,
    pub artifacts: Vec<ArtifactEntry>,
    pub content_hash: String,
    pub schemas_included: bool,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub notes: String,
}

impl BundleManifest {
    /// SHA-256 over the concatenation of `sha256` fields, sorted by
    /// `(artifact_type_order_index, path)`.
    #[must_use]
    pub fn compute_content_hash(&self) -> String {
        let mut sorted: Vec<&ArtifactEntry> = self.artifacts.iter().collect();
        sorted.sort_by(|a, b| {
            (artifact_type_order_index(&a.artifact_type), &a.path)
                .cmp(&(artifact_type_order_index(&b.artifact_type), &b.path))
        });
        let concatenated: String = sorted.iter().map(|a| a.sha256.as_str()).collect();
        redletters_utils::content_hash_str(&concatenated)
    }

    /// Sort `artifacts` in place by `(artifact_type_order_index, path)`.
    pub fn sort_artifacts(&mut self) {
        self.artifacts.sort_by(|a, b| {
            (artifact_type_order_index(&a.artifact_type), &a.path)
                .cmp(&(artifact_type_order_index(&b.artifact_type), &b.path))
        });
    }
}
