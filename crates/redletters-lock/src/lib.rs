//! Lockfile generator/syncer.
//!
//! Pins the installed-pack set with per-pack content hashes so a scholarly
//! run can be reproduced later, or so a changed environment can be detected.
//! `lockfile_hash` is computed over the object's canonical JSON with the
//! hash field elided — the one recursive bit of determinism
//! this crate has to get right.

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use redletters_catalog::{InstallSource, InstalledManifest};
use redletters_utils::error::{ErrorCategory, UserFriendlyError};
use redletters_utils::PackId;
use serde::{Deserialize, Serialize};

pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const LOCKFILE_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("failed to read lockfile {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse lockfile {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("atomic write failed for {path}: {source}")]
    AtomicWrite {
        path: String,
        #[source]
        source: redletters_utils::atomic_write::AtomicWriteError,
    },
    #[error("hashing error: {0}")]
    Hash(#[from] redletters_utils::HashError),
    #[error("sync requires --force: {mismatched:?} packs differ from lockfile")]
    DriftRequiresForce { mismatched: Vec<String> },
}

impl UserFriendlyError for LockError {
    fn category(&self) -> ErrorCategory {
        match self {
            LockError::DriftRequiresForce { .. } => ErrorCategory::Integrity,
            _ => ErrorCategory::Internal,
        }
    }
}

/// Where a locked pack can be re-fetched from; mirrors
/// [`redletters_catalog::InstallSource`] but keeps empty fields out of the
/// serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LockInstallSource {
    Git { url: String, revision: String },
    Zip { url: String },
    Local { path: Utf8PathBuf },
    Manual,
}

impl From<&InstallSource> for LockInstallSource {
    fn from(value: &InstallSource) -> Self {
        match value {
            InstallSource::Git { url, revision } => LockInstallSource::Git {
                url: url.clone(),
                revision: revision.clone(),
            },
            InstallSource::Zip { url } => LockInstallSource::Zip { url: url.clone() },
            InstallSource::Local { path } => LockInstallSource::Local { path: path.clone() },
            InstallSource::Manual => LockInstallSource::Manual,
        }
    }
}

/// One pinned pack entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedPack {
    pub pack_id: PackId,
    pub version: String,
    pub role: String,
    pub license: String,
    pub content_hash: String,
    pub install_source: LockInstallSource,
}

/// The lockfile itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lockfile {
    pub schema_version: String,
    pub tool_version: String,
    pub generated_at: DateTime<Utc>,
    pub packs: Vec<LockedPack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lockfile_hash: Option<String>,
}

impl Lockfile {
    /// Canonical JSON with `lockfile_hash` elided, for hash computation.
    fn hashable_copy(&self) -> Self {
        Lockfile {
            lockfile_hash: None,
            ..self.clone()
        }
    }

    pub fn compute_hash(&self) -> Result<String, LockError> {
        Ok(redletters_utils::hash_canonical_json(&self.hashable_copy())?)
    }

    /// Load a lockfile from `path`.
    pub fn load(path: &camino::Utf8Path) -> Result<Self, LockError> {
        let content = std::fs::read_to_string(path.as_std_path()).map_err(|source| LockError::Read {
            path: path.to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| LockError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Write canonical JSON, pretty-printed with sorted keys, to `path`.
    pub fn save(&self, path: &camino::Utf8Path) -> Result<(), LockError> {
        let pretty = serde_json::to_string_pretty(self).map_err(|e| LockError::Parse {
            path: path.to_string(),
            source: e,
        })?;
        redletters_utils::atomic_write::write_file_atomic(path, pretty.as_bytes()).map_err(|source| {
            LockError::AtomicWrite {
                path: path.to_string(),
                source,
            }
        })?;
        Ok(())
    }
}

/// Generates a [`Lockfile`] from the installed-pack manifest.
pub struct LockfileGenerator;

impl LockfileGenerator {
    /// Build a lockfile from the currently installed packs, sorted by
    /// `pack_id` for determinism.
    pub fn generate(manifest: &InstalledManifest) -> Result<Lockfile, LockError> {
        let mut packs: Vec<LockedPack> = manifest
            .packs
            .values()
            .map(|installed| LockedPack {
                pack_id: installed.pack.pack_id.clone(),
                version: installed.pack.version.clone(),
                role: installed.pack.role.to_string(),
                license: installed.pack.license.clone(),
                content_hash: installed.content_hash.clone(),
                install_source: LockInstallSource::from(&installed.pack.install_source),
            })
            .collect();
        packs.sort_by(|a, b| a.pack_id.cmp(&b.pack_id));

        let mut lockfile = Lockfile {
            schema_version: LOCKFILE_SCHEMA_VERSION.to_string(),
            tool_version: TOOL_VERSION.to_string(),
            generated_at: Utc::now(),
            packs,
            lockfile_hash: None,
        };
        lockfile.lockfile_hash = Some(lockfile.compute_hash()?);
        tracing::info!(
            target: "redletters::lock",
            pack_count = lockfile.packs.len(),
            lockfile_hash = %lockfile.lockfile_hash.as_deref().unwrap_or_default(),
            "Generated lockfile"
        );
        Ok(lockfile)
    }

    /// Generate and save in one call.
    pub fn save(manifest: &InstalledManifest, path: &camino::Utf8Path) -> Result<Lockfile, LockError> {
        let lockfile = Self::generate(manifest)?;
        lockfile.save(path)?;
        Ok(lockfile)
    }
}

/// Per-pack drift classification from [`verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackDrift {
    Ok,
    Missing,
    HashMismatch,
    Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackVerifyStatus {
    pub pack_id: PackId,
    pub status: PackDrift,
    pub expected_hash: Option<String>,
    pub actual_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResult {
    pub valid: bool,
    pub packs: Vec<PackVerifyStatus>,
}

impl VerifyResult {
    #[must_use]
    pub fn ok_count(&self) -> usize {
        self.packs.iter().filter(|p| p.status == PackDrift::Ok).count()
    }

    #[must_use]
    pub fn missing(&self) -> Vec<&PackId> {
        self.packs
            .iter()
            .filter(|p| p.status == PackDrift::Missing)
            .map(|p| &p.pack_id)
            .collect()
    }

    #[must_use]
    pub fn mismatched(&self) -> Vec<&PackId> {
        self.packs
            .iter()
            .filter(|p| p.status == PackDrift::HashMismatch)
            .map(|p| &p.pack_id)
            .collect()
    }
}

/// Verify `lockfile` against the current `manifest` of installed packs.
/// Invariant: `verify(generate())` is always all-`ok` on an unchanged
/// environment.
pub fn verify(lockfile: &Lockfile, manifest: &InstalledManifest) -> VerifyResult {
    let mut statuses = Vec::new();

    for locked in &lockfile.packs {
        match manifest.packs.get(&locked.pack_id) {
            None => statuses.push(PackVerifyStatus {
                pack_id: locked.pack_id.clone(),
                status: PackDrift::Missing,
                expected_hash: Some(locked.content_hash.clone()),
                actual_hash: None,
            }),
            Some(installed) if installed.content_hash == locked.content_hash => {
                statuses.push(PackVerifyStatus {
                    pack_id: locked.pack_id.clone(),
                    status: PackDrift::Ok,
                    expected_hash: Some(locked.content_hash.clone()),
                    actual_hash: Some(installed.content_hash.clone()),
                });
            }
            Some(installed) => statuses.push(PackVerifyStatus {
                pack_id: locked.pack_id.clone(),
                status: PackDrift::HashMismatch,
                expected_hash: Some(locked.content_hash.clone()),
                actual_hash: Some(installed.content_hash.clone()),
            }),
        }
    }

    let locked_ids: std::collections::HashSet<&PackId> = lockfile.packs.iter().map(|p| &p.pack_id).collect();
    for (pack_id, installed) in &manifest.packs {
        if !locked_ids.contains(pack_id) {
            statuses.push(PackVerifyStatus {
                pack_id: pack_id.clone(),
                status: PackDrift::Extra,
                expected_hash: None,
                actual_hash: Some(installed.content_hash.clone()),
            });
        }
    }

    let valid = statuses.iter().all(|s| s.status == PackDrift::Ok);
    if valid {
        tracing::info!(target: "redletters::lock", pack_count = statuses.len(), "Lockfile verify: all packs ok");
    } else {
        tracing::warn!(
            target: "redletters::lock",
            missing = statuses.iter().filter(|s| s.status == PackDrift::Missing).count(),
            hash_mismatch = statuses.iter().filter(|s| s.status == PackDrift::HashMismatch).count(),
            extra = statuses.iter().filter(|s| s.status == PackDrift::Extra).count(),
            "Lockfile verify detected drift"
        );
    }
    VerifyResult { valid, packs: statuses }
}

/// Result of a sync attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub verify: VerifyResult,
    pub forced: bool,
    pub forced_at: Option<DateTime<Utc>>,
}

/// Reconcile a manifest against a lockfile. Mismatches other than a clean
/// `Missing` (which the caller's installer can re-fetch) are only accepted
/// when `force` is true, in which case the result records
/// `forced=true, forced_at=<ts>`.
pub fn sync(lockfile: &Lockfile, manifest: &InstalledManifest, force: bool) -> Result<SyncResult, LockError> {
    let result = verify(lockfile, manifest);
    if result.valid || force {
        let forced = !result.valid && force;
        if forced {
            tracing::warn!(
                target: "redletters::lock",
                mismatched = ?result.mismatched().into_iter().map(|p| p.0.clone()).collect::<Vec<_>>(),
                "Sync forced over hash mismatch"
            );
        }
        Ok(SyncResult {
            forced,
            forced_at: if forced { Some(Utc::now()) } else { None },
            verify: result,
        })
    } else {
        let mismatched: Vec<String> = result.mismatched().into_iter().map(|p| p.0.clone()).collect();
        if mismatched.is_empty() {
            // Only "missing" packs — that's the installer's job, not a force-gated drift.
            Ok(SyncResult {
                forced: false,
                forced_at: None,
                verify: result,
            })
        } else {
            tracing::error!(
                target: "redletters::lock",
                mismatched = ?mismatched,
                "Sync refused: hash-mismatched packs require --force"
            );
            Err(LockError::DriftRequiresForce { mismatched })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redletters_catalog::{CitationMetadata, InstalledPack, SourcePack};
    use redletters_utils::PackRole;
    use std::collections::BTreeMap;

    fn manifest_with_one_pack(hash: &str) -> InstalledManifest {
        let mut packs = BTreeMap::new();
        let pack = SourcePack::new(
            "sblgnt",
            "SBLGNT",
            "1.0",
            "CC-BY-4.0",
            PackRole::Spine,
            InstallSource::Local {
                path: Utf8PathBuf::from("/data/sblgnt"),
            },
            CitationMetadata::default(),
        );
        packs.insert(
            PackId::from("sblgnt"),
            InstalledPack {
                schema_version: "1.0",
                pack,
                install_path: Utf8PathBuf::from("/data/sblgnt"),
                installed_at: Utc::now(),
                file_count: 1,
                content_hash: hash.to_string(),
                eula_accepted_at: None,
            },
        );
        InstalledManifest {
            schema_version: "1.0".to_string(),
            packs,
        }
    }

    #[test]
    fn generate_sorts_by_pack_id_and_computes_hash() {
        let manifest = manifest_with_one_pack("abc123");
        let lockfile = LockfileGenerator::generate(&manifest).unwrap();
        assert_eq!(lockfile.packs.len(), 1);
        assert!(lockfile.lockfile_hash.is_some());
    }

    #[test]
    fn verify_unchanged_environment_is_ok() {
        let manifest = manifest_with_one_pack("abc123");
        let lockfile = LockfileGenerator::generate(&manifest).unwrap();
        let result = verify(&lockfile, &manifest);
        assert!(result.valid);
        assert_eq!(result.ok_count(), 1);
    }

    #[test]
    fn verify_detects_missing_pack() {
        let manifest = manifest_with_one_pack("abc123");
        let lockfile = LockfileGenerator::generate(&manifest).unwrap();
        let empty_manifest = InstalledManifest {
            schema_version: "1.0".to_string(),
            packs: BTreeMap::new(),
        };
        let result = verify(&lockfile, &empty_manifest);
        assert!(!result.valid);
        assert_eq!(result.missing(), vec![&PackId::from("sblgnt")]);
    }

    #[test]
    fn verify_detects_hash_mismatch() {
        let manifest = manifest_with_one_pack("abc123");
        let lockfile = LockfileGenerator::generate(&manifest).unwrap();
        let drifted = manifest_with_one_pack("different-hash");
        let result = verify(&lockfile, &drifted);
        assert!(!result.valid);
        assert_eq!(result.mismatched(), vec![&PackId::from("sblgnt")]);
    }

    #[test]
    fn sync_rejects_mismatch_without_force() {
        let manifest = manifest_with_one_pack("abc123");
        let lockfile = LockfileGenerator::generate(&manifest).unwrap();
        let drifted = manifest_with_one_pack("different-hash");
        let err = sync(&lockfile, &drifted, false).unwrap_err();
        assert!(matches!(err, LockError::DriftRequiresForce { .. }));
    }

    #[test]
    fn sync_accepts_mismatch_with_force_and_records_forced_at() {
        let manifest = manifest_with_one_pack("abc123");
        let lockfile = LockfileGenerator::generate(&manifest).unwrap();
        let drifted = manifest_with_one_pack("different-hash");
        let result = sync(&lockfile, &drifted, true).unwrap();
        assert!(result.forced);
        assert!(result.forced_at.is_some());
    }

    #[test]
    fn lockfile_hash_elides_the_hash_field_itself() {
        let manifest = manifest_with_one_pack("abc123");
        let lockfile = LockfileGenerator::generate(&manifest).unwrap();
        let recomputed = lockfile.compute_hash().unwrap();
        assert_eq!(lockfile.lockfile_hash, Some(recomputed));
    }
}
