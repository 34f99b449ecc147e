//! Atomic, chmod-0444 receipt emission.
//!
//! Follows the temp-write + rename idiom, extended with a chmod-0444 step
//! and a parent-directory fsync, per the documented eight-step sequence:
//!
//! 1. Compose receipt JSON (canonical).
//! 2. Write to `receipt.json.tmp.<pid>.<rand>`.
//! 3. flush + fsync.
//! 4. rename (atomic).
//! 5. fsync parent directory (best effort).
//! 6. chmod 0444.
//! 7. Hash from the in-memory bytes (avoid re-read).
//! 8. Register as an artifact, stored on the job row by the caller.

use camino::Utf8Path;

use redletters_utils::atomic_write::{write_file_atomic_readonly, AtomicWriteError};
use redletters_utils::error::{ErrorCategory, UserFriendlyError};

use crate::types::{Artifact, ArtifactKind, ArtifactStatus, Receipt};

#[derive(Debug, thiserror::Error)]
pub enum ReceiptWriteError {
    #[error("failed to serialize receipt: {0}")]
    Serialize(#[from] redletters_utils::HashError),
    #[error("failed to write receipt to {path}: {source}")]
    AtomicWrite {
        path: String,
        #[source]
        source: AtomicWriteError,
    },
}

impl UserFriendlyError for ReceiptWriteError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Internal
    }
}

/// Write `receipt` to `path` (conventionally `<workspace>/receipt.json`)
/// atomically, chmod it `0444`, and return the [`Artifact`] record ready
/// to be stored on the job row. Hashes the in-memory canonical bytes
/// rather than re-reading the file.
pub fn write_receipt(receipt: &Receipt, path: &Utf8Path) -> Result<Artifact, ReceiptWriteError> {
    let bytes = redletters_utils::canonical_json(receipt)?;

    write_file_atomic_readonly(path, &bytes).map_err(|source| ReceiptWriteError::AtomicWrite {
        path: path.to_string(),
        source,
    })?;

    let sha256 = redletters_utils::content_hash(&bytes);

    Ok(Artifact {
        name: path
            .file_name()
            .unwrap_or("receipt.json")
            .to_string(),
        path: path.to_string(),
        artifact_type: ArtifactKind::Receipt,
        size_bytes: bytes.len() as u64,
        sha256,
        status: ArtifactStatus::Complete,
        created_at: chrono::Utc::now(),
        verified_at: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReceiptTimestamps, RECEIPT_SCHEMA_VERSION};
    use camino::Utf8PathBuf;
    use std::collections::BTreeMap;

    fn sample_receipt() -> Receipt {
        Receipt {
            schema_version: RECEIPT_SCHEMA_VERSION.to_string(),
            job_id: "job-1".to_string(),
            run_id: "run-1".to_string(),
            status: "completed".to_string(),
            exit_code: Some(0),
            timestamps: ReceiptTimestamps {
                created: chrono::Utc::now(),
                started: Some(chrono::Utc::now()),
                completed: Some(chrono::Utc::now()),
            },
            config_snapshot: serde_json::json!({}),
            source_pins: BTreeMap::new(),
            inputs_summary: serde_json::json!({}),
            outputs: Vec::new(),
            error: None,
        }
    }

    #[test]
    fn write_receipt_is_chmod_0444() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let dir = tempfile::tempdir().unwrap();
            let path = Utf8PathBuf::from_path_buf(dir.path().join("receipt.json")).unwrap();

            let artifact = write_receipt(&sample_receipt(), &path).unwrap();

            let mode = std::fs::metadata(path.as_std_path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o444);
            assert_eq!(artifact.artifact_type, ArtifactKind::Receipt);
        }
    }

    #[test]
    fn write_receipt_hash_matches_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("receipt.json")).unwrap();

        let artifact = write_receipt(&sample_receipt(), &path).unwrap();

        let on_disk = std::fs::read(path.as_std_path()).unwrap();
        assert_eq!(artifact.sha256, redletters_utils::content_hash(&on_disk));
    }
}
