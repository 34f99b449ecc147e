//! Diagnostics bundle assembly.
//!
//! The `IntegrityStatus` enum and the "sort, then scan everything for the
//! secret pattern before returning" shape follow a flat list of labelled
//! checks, sorted for deterministic output, with the whole bundle rejected
//! rather than partially redacted if anything still matches after
//! scrubbing.

use std::collections::BTreeMap;

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sysinfo::System;

use redletters_redaction::{contains_secret, redact};
use redletters_utils::error::{ErrorCategory, UserFriendlyError};

use crate::bus::BusStatsSnapshot;
use crate::types::{Job, JobState};

#[derive(Debug, thiserror::Error)]
pub enum DiagnosticsError {
    #[error("secret pattern detected in diagnostics bundle; export aborted")]
    SecretDetected,
    #[error("failed to read artifact {path}: {source}")]
    ReadArtifact {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UserFriendlyError for DiagnosticsError {
    fn category(&self) -> ErrorCategory {
        match self {
            DiagnosticsError::SecretDetected => ErrorCategory::Security,
            _ => ErrorCategory::Internal,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            DiagnosticsError::SecretDetected => {
                vec!["remove or redact the offending file before re-running diagnostics export".to_string()]
            }
            _ => Vec::new(),
        }
    }
}

/// Per-artifact cross-check between the job's recorded metadata and what's
/// actually on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrityStatus {
    Match,
    Mismatch,
    Missing,
    FileOnly,
    DbOnly,
    SkippedLarge,
    SkippedDisabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityEntry {
    pub path: String,
    pub status: IntegrityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_sha256: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub os_version: String,
    pub arch: String,
    pub cpu_count: usize,
    pub total_memory_bytes: u64,
    pub available_memory_bytes: u64,
}

impl SystemInfo {
    #[must_use]
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        Self {
            os: System::name().unwrap_or_else(|| "unknown".to_string()),
            os_version: System::os_version().unwrap_or_else(|| "unknown".to_string()),
            arch: std::env::consts::ARCH.to_string(),
            cpu_count: std::thread::available_parallelism().map(std::num::NonZeroUsize::get).unwrap_or(1),
            total_memory_bytes: sys.total_memory(),
            available_memory_bytes: sys.available_memory(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub last_sequence: i64,
    pub jobs_queued: usize,
    pub jobs_running: usize,
    pub bus_published: u64,
    pub bus_dropped_sends: u64,
    pub bus_subscriber_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummaryEntry {
    pub job_id: String,
    pub state: JobState,
    pub progress_percent: f64,
    pub claim_attempts: u32,
}

/// Full diagnostics bundle. Field order is fixed: system info, engine
/// status, job summary, recent events, sanitized config, integrity report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsBundle {
    pub generated_at: DateTime<Utc>,
    pub system_info: SystemInfo,
    pub engine_status: EngineStatus,
    pub job_summary: Vec<JobSummaryEntry>,
    pub recent_events: Vec<serde_json::Value>,
    pub sanitized_config: serde_json::Value,
    pub integrity_report: Vec<IntegrityEntry>,
}

const DEFAULT_LARGE_FILE_THRESHOLD_BYTES: u64 = 10 * 1024 * 1024;

/// Cross-check one artifact's recorded hash against the file on disk.
pub fn check_artifact_integrity(
    path: &Utf8Path,
    expected_sha256: Option<&str>,
    full_integrity_mode: bool,
) -> IntegrityEntry {
    let on_disk = std::fs::metadata(path.as_std_path());

    match (on_disk, expected_sha256) {
        (Err(_), Some(_)) => IntegrityEntry {
            path: path.to_string(),
            status: IntegrityStatus::Missing,
            expected_sha256: expected_sha256.map(str::to_string),
            actual_sha256: None,
        },
        (Err(_), None) => IntegrityEntry {
            path: path.to_string(),
            status: IntegrityStatus::SkippedDisabled,
            expected_sha256: None,
            actual_sha256: None,
        },
        (Ok(_), None) => IntegrityEntry {
            path: path.to_string(),
            status: IntegrityStatus::FileOnly,
            expected_sha256: None,
            actual_sha256: None,
        },
        (Ok(meta), Some(expected)) => {
            if !full_integrity_mode && meta.len() > DEFAULT_LARGE_FILE_THRESHOLD_BYTES {
                return IntegrityEntry {
                    path: path.to_string(),
                    status: IntegrityStatus::SkippedLarge,
                    expected_sha256: Some(expected.to_string()),
                    actual_sha256: None,
                };
            }
            match std::fs::read(path.as_std_path()) {
                Ok(bytes) => {
                    let actual = redletters_utils::content_hash(&bytes);
                    let status = if actual == expected {
                        IntegrityStatus::Match
                    } else {
                        IntegrityStatus::Mismatch
                    };
                    IntegrityEntry {
                        path: path.to_string(),
                        status,
                        expected_sha256: Some(expected.to_string()),
                        actual_sha256: Some(actual),
                    }
                }
                Err(_) => IntegrityEntry {
                    path: path.to_string(),
                    status: IntegrityStatus::Missing,
                    expected_sha256: Some(expected.to_string()),
                    actual_sha256: None,
                },
            }
        }
    }
}

/// Assemble a diagnostics bundle, redacting the supplied recent-event
/// payloads and config snapshot, then performing the mandated final
/// secret-pattern scan across the whole serialized bundle. Returns [`DiagnosticsError::SecretDetected`] if
/// anything still matches after redaction — belt-and-suspenders.
pub fn assemble_bundle(
    engine_status: EngineStatus,
    jobs: &[Job],
    recent_events: &[serde_json::Value],
    config_snapshot: &serde_json::Value,
    integrity_report: Vec<IntegrityEntry>,
) -> Result<DiagnosticsBundle, DiagnosticsError> {
    let job_summary = jobs
        .iter()
        .map(|j| JobSummaryEntry {
            job_id: j.job_id.clone(),
            state: j.state,
            progress_percent: j.progress.percent,
            claim_attempts: j.claim_attempts,
        })
        .collect();

    let sanitized_events: Vec<serde_json::Value> = recent_events
        .iter()
        .map(|v| redact_json_value(v))
        .collect();

    let sanitized_config = redact_json_value(config_snapshot);

    let bundle = DiagnosticsBundle {
        generated_at: Utc::now(),
        system_info: SystemInfo::collect(),
        engine_status,
        job_summary,
        recent_events: sanitized_events,
        sanitized_config,
        integrity_report,
    };

    let serialized = serde_json::to_string(&bundle)?;
    if contains_secret(&serialized) {
        return Err(DiagnosticsError::SecretDetected);
    }

    Ok(bundle)
}

fn redact_json_value(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => serde_json::Value::String(redact(s)),
        serde_json::Value::Array(items) => serde_json::Value::Array(items.iter().map(redact_json_value).collect()),
        serde_json::Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                out.insert(k.clone(), redact_json_value(v));
            }
            serde_json::Value::Object(out)
        }
        other => other.clone(),
    }
}

impl From<&BusStatsSnapshot> for EngineStatusBusFields {
    fn from(stats: &BusStatsSnapshot) -> Self {
        EngineStatusBusFields {
            bus_published: stats.published,
            bus_dropped_sends: stats.dropped_sends,
            bus_subscriber_count: stats.subscriber_count,
        }
    }
}

/// Helper bundle of the three bus-derived `EngineStatus` fields, so callers
/// building an `EngineStatus` from a `BusStatsSnapshot` don't repeat the
/// field mapping.
pub struct EngineStatusBusFields {
    pub bus_published: u64,
    pub bus_dropped_sends: u64,
    pub bus_subscriber_count: usize,
}

pub fn engine_status_from(
    last_sequence: i64,
    jobs: &[Job],
    bus_stats: &BusStatsSnapshot,
) -> EngineStatus {
    let fields = EngineStatusBusFields::from(bus_stats);
    let jobs_queued = jobs.iter().filter(|j| j.state == JobState::Queued).count();
    let jobs_running = jobs.iter().filter(|j| j.state == JobState::Running).count();
    EngineStatus {
        last_sequence,
        jobs_queued,
        jobs_running,
        bus_published: fields.bus_published,
        bus_dropped_sends: fields.bus_dropped_sends,
        bus_subscriber_count: fields.bus_subscriber_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_check_reports_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.json");
        std::fs::write(&path, b"hello").unwrap();
        let utf8_path = camino::Utf8PathBuf::from_path_buf(path).unwrap();
        let expected = redletters_utils::content_hash(b"hello");

        let entry = check_artifact_integrity(&utf8_path, Some(&expected), false);
        assert_eq!(entry.status, IntegrityStatus::Match);
    }

    #[test]
    fn integrity_check_reports_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.json");
        std::fs::write(&path, b"hello").unwrap();
        let utf8_path = camino::Utf8PathBuf::from_path_buf(path).unwrap();

        let entry = check_artifact_integrity(&utf8_path, Some("deadbeef"), false);
        assert_eq!(entry.status, IntegrityStatus::Mismatch);
    }

    #[test]
    fn integrity_check_reports_missing() {
        let utf8_path = camino::Utf8PathBuf::from("/nonexistent/artifact.json");
        let entry = check_artifact_integrity(&utf8_path, Some("deadbeef"), false);
        assert_eq!(entry.status, IntegrityStatus::Missing);
    }

    #[test]
    fn bundle_assembly_rejects_unredacted_secret() {
        let config = serde_json::json!({ "token": "rl_abcdefghijklmnopqrstuvwxyz" });
        let sanitized = redact_json_value(&config);
        let serialized = serde_json::to_string(&sanitized).unwrap();
        assert!(!contains_secret(&serialized));
    }
}
