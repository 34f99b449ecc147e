//! Receipt and artifact data model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use redletters_utils::PackId;
use serde::{Deserialize, Serialize};

pub const RECEIPT_SCHEMA_VERSION: &str = "1.0.0";

/// One file the engine is tracking as part of a job's output, plus its
/// integrity state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub path: String,
    pub artifact_type: ArtifactKind,
    pub size_bytes: u64,
    pub sha256: String,
    pub status: ArtifactStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Output,
    Receipt,
    Log,
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Pending,
    Writing,
    Complete,
    Failed,
    Quarantined,
}

/// Per-pack provenance pin recorded on a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePin {
    pub version: String,
    pub content_hash: String,
}

/// Final completion/failure record for a job.
/// Written atomically, then `chmod 0444` — immutable from the moment the
/// filesystem commits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub schema_version: String,
    pub job_id: String,
    pub run_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub timestamps: ReceiptTimestamps,
    pub config_snapshot: serde_json::Value,
    pub source_pins: BTreeMap<PackId, SourcePin>,
    pub inputs_summary: serde_json::Value,
    pub outputs: Vec<Artifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ReceiptError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptTimestamps {
    pub created: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
