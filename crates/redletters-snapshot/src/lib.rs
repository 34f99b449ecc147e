//! Reproducibility snapshot generator.
//!
//! Given an ordered set of export files, hash each one, pin the installed
//! pack set, record the tool version and an optional git commit, and fold
//! in the lockfile hash — all as canonical JSON so the snapshot itself is
//! reproducible.

use std::process::Command;

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use redletters_catalog::InstalledManifest;
use redletters_utils::error::{ErrorCategory, UserFriendlyError};

pub const SNAPSHOT_SCHEMA_VERSION: &str = "1.0.0";
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to hash export file {path}: {source}")]
    FileHash {
        path: String,
        #[source]
        source: redletters_utils::HashError,
    },
    #[error(transparent)]
    Hash(#[from] redletters_utils::HashError),
    #[error(transparent)]
    Write(#[from] redletters_utils::atomic_write::AtomicWriteError),
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse snapshot {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl UserFriendlyError for SnapshotError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Internal
    }

    fn suggestions(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Pack pin: identity, version/license, and content hash, enriched with
/// the citation-grade fields `snapshot.py`'s `PackInfo` carries for
/// scholarly reproducibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackPin {
    pub pack_id: String,
    pub version: String,
    pub license: String,
    pub content_hash: String,
    pub role: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub source_title: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub edition: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub publisher: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub year: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub license_url: String,
}

/// Reproducibility snapshot over a fixed set of export files. `tool_version` + `export_hashes` together are the autodetection
/// signature the output validator keys on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: String,
    pub tool_version: String,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
    pub packs: Vec<PackPin>,
    pub export_hashes: std::collections::BTreeMap<String, String>,
    pub schema_versions: std::collections::BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lockfile_hash: Option<String>,
}

impl Snapshot {
    pub fn load(path: &Utf8Path) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path.as_std_path()).map_err(|source| SnapshotError::Read {
            path: path.to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SnapshotError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn save(&self, path: &Utf8Path) -> Result<(), SnapshotError> {
        let bytes = redletters_utils::canonical_json(self)?;
        redletters_utils::atomic_write::write_file_atomic(path, &bytes)?;
        Ok(())
    }

    #[must_use]
    pub fn compute_hash(&self) -> Result<String, SnapshotError> {
        Ok(redletters_utils::hash_canonical_json(self)?)
    }
}

/// Best-effort `git rev-parse HEAD`, mirroring `snapshot.py`'s
/// `get_git_commit`. A missing `git` binary, a non-repo working directory,
/// or any spawn failure all resolve to `None` rather than an error: the git
/// commit is diagnostic metadata, not a correctness requirement.
#[must_use]
pub fn get_git_commit() -> Option<String> {
    get_git_commit_in(None)
}

fn get_git_commit_in(cwd: Option<&Utf8Path>) -> Option<String> {
    let mut command = Command::new("git");
    command.args(["rev-parse", "HEAD"]);
    if let Some(dir) = cwd {
        command.current_dir(dir.as_std_path());
    }
    let output = command.output().ok()?;
    if !output.status.success() {
        return None;
    }
    let commit = String::from_utf8(output.stdout).ok()?;
    let trimmed = commit.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Build the pack-pin list from the installed manifest, sorted by
/// `pack_id` for determinism (mirrors the lockfile's own sort).
#[must_use]
pub fn pack_pins_from_manifest(manifest: &InstalledManifest) -> Vec<PackPin> {
    let mut pins: Vec<PackPin> = manifest
        .packs
        .values()
        .map(|installed| PackPin {
            pack_id: installed.pack.pack_id.to_string(),
            version: installed.pack.version.clone(),
            license: installed.pack.license.clone(),
            content_hash: installed.content_hash.clone(),
            role: installed.pack.role.to_string(),
            source_title: installed.pack.citation.source_title.clone(),
            edition: installed.pack.citation.edition.clone(),
            publisher: installed.pack.citation.publisher.clone(),
            year: installed.pack.citation.year.clone(),
            license_url: installed.pack.citation.license_url.clone(),
        })
        .collect();
    pins.sort_by(|a, b| a.pack_id.cmp(&b.pack_id));
    pins
}

/// Hash every export file in `export_files`, keyed by file name.
pub fn hash_export_files(export_files: &[&Utf8Path]) -> Result<std::collections::BTreeMap<String, String>, SnapshotError> {
    let mut hashes = std::collections::BTreeMap::new();
    for path in export_files {
        let hash = redletters_utils::file_hash(path.as_std_path()).map_err(|source| SnapshotError::FileHash {
            path: path.to_string(),
            source,
        })?;
        let name = path.file_name().unwrap_or_else(|| path.as_str()).to_string();
        hashes.insert(name, hash);
    }
    Ok(hashes)
}

/// Generate a snapshot over `export_files`, pinning `manifest`'s packs and
/// folding in `lockfile_hash`.
pub fn generate(
    export_files: &[&Utf8Path],
    manifest: &InstalledManifest,
    schema_versions: std::collections::BTreeMap<String, String>,
    lockfile_hash: Option<String>,
) -> Result<Snapshot, SnapshotError> {
    Ok(Snapshot {
        schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
        tool_version: TOOL_VERSION.to_string(),
        generated_at: Utc::now(),
        git_commit: get_git_commit(),
        packs: pack_pins_from_manifest(manifest),
        export_hashes: hash_export_files(export_files)?,
        schema_versions,
        lockfile_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn snapshot_round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("snapshot.json")).unwrap();

        let snapshot = Snapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            tool_version: TOOL_VERSION.to_string(),
            generated_at: Utc::now(),
            git_commit: None,
            packs: Vec::new(),
            export_hashes: std::collections::BTreeMap::new(),
            schema_versions: std::collections::BTreeMap::new(),
            lockfile_hash: None,
        };
        snapshot.save(&path).unwrap();
        let loaded = Snapshot::load(&path).unwrap();
        assert_eq!(loaded.tool_version, snapshot.tool_version);
    }

    #[test]
    fn hash_export_files_keys_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("apparatus.jsonl");
        let mut f = std::fs::File::create(&file_path).unwrap();
        f.write_all(b"{}\n").unwrap();
        let utf8_path = camino::Utf8PathBuf::from_path_buf(file_path).unwrap();

        let hashes = hash_export_files(&[&utf8_path]).unwrap();
        assert!(hashes.contains_key("apparatus.jsonl"));
    }

    #[test]
    fn snapshot_hash_is_deterministic() {
        let snapshot = Snapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            tool_version: TOOL_VERSION.to_string(),
            generated_at: DateTime::from_timestamp(0, 0).unwrap(),
            git_commit: Some("abc123".to_string()),
            packs: Vec::new(),
            export_hashes: std::collections::BTreeMap::new(),
            schema_versions: std::collections::BTreeMap::new(),
            lockfile_hash: Some("deadbeef".to_string()),
        };
        assert_eq!(snapshot.compute_hash().unwrap(), snapshot.compute_hash().unwrap());
    }

    #[test]
    fn get_git_commit_in_non_repo_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let utf8_dir = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        assert_eq!(get_git_commit_in(Some(&utf8_dir)), None);
    }
}
