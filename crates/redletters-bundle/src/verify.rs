//! Bundle verification: re-hash every artifact a
//! manifest claims and classify any drift into one of the four documented
//! tamper-detection failure modes.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::types::BundleManifest;
use crate::BundleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingArtifact,
    HashMismatch,
    ContentHashMismatch,
    LockfileHashMismatch,
    SnapshotHashMismatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyFailure {
    pub kind: FailureKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResult {
    pub valid: bool,
    pub failures: Vec<VerifyFailure>,
}

/// Load `bundle_dir/manifest.json`, re-hash every listed artifact plus the
/// lockfile/snapshot, and classify any divergence.
pub fn verify(bundle_dir: &Utf8Path) -> Result<VerifyResult, BundleError> {
    let manifest_path = bundle_dir.join("manifest.json");
    let manifest_bytes = std::fs::read(manifest_path.as_std_path()).map_err(|source| BundleError::ReadInput {
        path: manifest_path.to_string(),
        source,
    })?;
    let manifest: BundleManifest = serde_json::from_slice(&manifest_bytes)?;

    let mut failures = Vec::new();

    for artifact in &manifest.artifacts {
        let artifact_path = bundle_dir.join(&artifact.path);
        match std::fs::read(artifact_path.as_std_path()) {
            Err(_) => failures.push(VerifyFailure {
                kind: FailureKind::MissingArtifact,
                path: artifact.path.clone(),
                expected: Some(artifact.sha256.clone()),
                actual: None,
            }),
            Ok(bytes) => {
                let actual = redletters_utils::content_hash(&bytes);
                if actual != artifact.sha256 {
                    failures.push(VerifyFailure {
                        kind: FailureKind::HashMismatch,
                        path: artifact.path.clone(),
                        expected: Some(artifact.sha256.clone()),
                        actual: Some(actual),
                    });
                }
            }
        }
    }

    let recomputed_content_hash = manifest.compute_content_hash();
    if recomputed_content_hash != manifest.content_hash {
        failures.push(VerifyFailure {
            kind: FailureKind::ContentHashMismatch,
            path: "manifest.json".to_string(),
            expected: Some(manifest.content_hash.clone()),
            actual: Some(recomputed_content_hash),
        });
    }

    check_named_hash(
        bundle_dir,
        "lockfile.json",
        &manifest.lockfile_hash,
        FailureKind::LockfileHashMismatch,
        &mut failures,
    );
    check_named_hash(
        bundle_dir,
        "snapshot.json",
        &manifest.snapshot_hash,
        FailureKind::SnapshotHashMismatch,
        &mut failures,
    );

    Ok(VerifyResult { valid: failures.is_empty(), failures })
}

fn check_named_hash(
    bundle_dir: &Utf8Path,
    file_name: &str,
    expected_hash: &str,
    kind: FailureKind,
    failures: &mut Vec<VerifyFailure>,
) {
    let path = bundle_dir.join(file_name);
    match std::fs::read(path.as_std_path()) {
        Err(_) => failures.push(VerifyFailure {
            kind: FailureKind::MissingArtifact,
            path: file_name.to_string(),
            expected: Some(expected_hash.to_string()),
            actual: None,
        }),
        Ok(bytes) => {
            let actual = redletters_utils::content_hash(&bytes);
            if actual != expected_hash {
                failures.push(VerifyFailure {
                    kind,
                    path: file_name.to_string(),
                    expected: Some(expected_hash.to_string()),
                    actual: Some(actual),
                });
            }
        }
    }
}
