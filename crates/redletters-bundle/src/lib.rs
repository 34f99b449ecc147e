//! Deterministic bundle producer/verifier.
//!
//! Copy lockfile/snapshot/inputs into a bundle directory, detect each
//! artifact's type, sort by `(artifact_type_order_index, path)`, and hash
//! the sorted concatenation into a single `content_hash`. Verification
//! re-hashes everything and classifies drift into the four documented
//! failure modes rather than a single opaque "invalid" result.

pub mod detect;
pub mod producer;
pub mod types;
pub mod verify;

pub use detect::{detect_artifact_type, schema_version_of};
pub use producer::{produce, BundleOptions};
pub use types::{artifact_type_order_index, ArtifactEntry, BundleManifest, ARTIFACT_TYPE_ORDER, BUNDLE_SCHEMA_VERSION};
pub use verify::{verify, FailureKind, VerifyFailure, VerifyResult};

use redletters_utils::error::{ErrorCategory, UserFriendlyError};

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("{0} is not supported: no zip-archive crate is part of this project's dependency stack")]
    Unsupported(&'static str),
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read input {path}: {source}")]
    ReadInput {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Write(#[from] redletters_utils::atomic_write::AtomicWriteError),
    #[error(transparent)]
    Hash(#[from] redletters_utils::HashError),
    #[error("failed to parse manifest: {0}")]
    Json(#[from] serde_json::Error),
}

impl UserFriendlyError for BundleError {
    fn category(&self) -> ErrorCategory {
        match self {
            BundleError::Unsupported(_) => ErrorCategory::UserInput,
            BundleError::ReadInput { .. } => ErrorCategory::DataAvailability,
            _ => ErrorCategory::Internal,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            BundleError::Unsupported(_) => {
                vec!["produce a directory bundle instead, or add a zip crate to the workspace before requesting one".to_string()]
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;

    fn write(dir: &Utf8PathBuf, name: &str, content: &str) -> Utf8PathBuf {
        let path = dir.join(name);
        std::fs::write(path.as_std_path(), content).unwrap();
        path
    }

    fn utf8_dir(temp: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap()
    }

    #[test]
    fn produce_then_verify_round_trips_clean() {
        let source_temp = tempfile::tempdir().unwrap();
        let source_dir = utf8_dir(&source_temp);
        let lockfile = write(&source_dir, "lockfile.json", r#"{"schema_version":"1.0.0","packs":[]}"#);
        let snapshot = write(
            &source_dir,
            "snapshot.json",
            r#"{"schema_version":"1.0.0","tool_version":"1.0.0","export_hashes":{}}"#,
        );
        let apparatus = write(
            &source_dir,
            "apparatus.jsonl",
            "{\"ref\":\"John.1.18\",\"classification\":\"substitution\",\"schema_version\":\"1.0.0\"}\n",
        );

        let bundle_temp = tempfile::tempdir().unwrap();
        let bundle_dir = utf8_dir(&bundle_temp);
        let manifest = produce(&bundle_dir, &lockfile, &snapshot, &[apparatus], &BundleOptions::default()).unwrap();

        assert_eq!(manifest.artifacts.len(), 3);
        assert!(manifest.artifacts.iter().any(|a| a.artifact_type == "apparatus"));

        let result = verify(&bundle_dir).unwrap();
        assert!(result.valid, "unexpected failures: {:?}", result.failures);
    }

    #[test]
    fn verify_detects_tampered_artifact() {
        let source_temp = tempfile::tempdir().unwrap();
        let source_dir = utf8_dir(&source_temp);
        let lockfile = write(&source_dir, "lockfile.json", r#"{"schema_version":"1.0.0","packs":[]}"#);
        let snapshot = write(
            &source_dir,
            "snapshot.json",
            r#"{"schema_version":"1.0.0","tool_version":"1.0.0","export_hashes":{}}"#,
        );

        let bundle_temp = tempfile::tempdir().unwrap();
        let bundle_dir = utf8_dir(&bundle_temp);
        produce(&bundle_dir, &lockfile, &snapshot, &[], &BundleOptions::default()).unwrap();

        std::fs::write(bundle_dir.join("lockfile.json").as_std_path(), r#"{"tampered":true}"#).unwrap();

        let result = verify(&bundle_dir).unwrap();
        assert!(!result.valid);
        assert!(result.failures.iter().any(|f| f.kind == FailureKind::LockfileHashMismatch));
    }

    #[test]
    fn zip_option_is_rejected_not_ignored() {
        let source_temp = tempfile::tempdir().unwrap();
        let source_dir = utf8_dir(&source_temp);
        let lockfile = write(&source_dir, "lockfile.json", "{}");
        let snapshot = write(&source_dir, "snapshot.json", "{}");
        let bundle_temp = tempfile::tempdir().unwrap();
        let bundle_dir = utf8_dir(&bundle_temp);

        let options = BundleOptions { zip: true, ..Default::default() };
        let err = produce(&bundle_dir, &lockfile, &snapshot, &[], &options).unwrap_err();
        assert!(matches!(err, BundleError::Unsupported(_)));
    }

    #[test]
    fn missing_artifact_is_reported() {
        let source_temp = tempfile::tempdir().unwrap();
        let source_dir = utf8_dir(&source_temp);
        let lockfile = write(&source_dir, "lockfile.json", "{}");
        let snapshot = write(&source_dir, "snapshot.json", "{}");
        let bundle_temp = tempfile::tempdir().unwrap();
        let bundle_dir = utf8_dir(&bundle_temp);
        produce(&bundle_dir, &lockfile, &snapshot, &[], &BundleOptions::default()).unwrap();

        std::fs::remove_file(bundle_dir.join("snapshot.json").as_std_path()).unwrap();

        let result = verify(&bundle_dir).unwrap();
        assert!(!result.valid);
        assert!(result.failures.iter().any(|f| f.kind == FailureKind::MissingArtifact));
    }
}
