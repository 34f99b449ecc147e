//! Source catalog & installer.
//!
//! A declarative [`SourceCatalog`] lists the [`SourcePack`]s known to the
//! system. [`Installer`] copies a pack's files under the data root,
//! enforcing the EULA gate before anything touches disk, and keeps
//! `installed_sources.json` as a single atomically-rewritten manifest.
//!
//! Concurrent installers are assumed absent: we don't take a
//! file lock, only atomic-rewrite the manifest so a reader never observes a
//! torn file.

pub mod types;

use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use redletters_utils::error::{ErrorCategory, UserFriendlyError};
use redletters_utils::{content_hash_of_tree, file_hash, PackId, PackRole};
use serde::{Deserialize, Serialize};

pub use types::{CitationMetadata, InstallSource, InstalledPack, PackStatus, SourcePack};

/// SPDX/alias licenses considered permissive enough to skip the EULA gate.
/// Anything not on this list is treated as EULA-required, fail-closed.
const PERMISSIVE_LICENSES: &[&str] = &[
    "CC0-1.0",
    "CC0",
    "MIT",
    "BSD-2-Clause",
    "BSD-3-Clause",
    "Apache-2.0",
    "Public Domain",
    "PUBLIC-DOMAIN",
];

fn is_permissive(license: &str) -> bool {
    if PERMISSIVE_LICENSES.iter().any(|l| l.eq_ignore_ascii_case(license)) {
        return true;
    }
    let upper = license.to_ascii_uppercase();
    upper.starts_with("CC-BY-SA") || upper.starts_with("CC-BY")
}

/// Whether `pack` requires explicit EULA acceptance before install.
/// Fail-closed: unknown licenses require EULA.
#[must_use]
pub fn requires_eula(pack: &SourcePack) -> bool {
    !is_permissive(&pack.license)
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("source not found in catalog: {0}")]
    SourceNotFound(String),
    #[error("source '{0}' requires EULA acceptance; license: {1}")]
    EulaRequired(String, String),
    #[error("source '{0}' requires manual installation")]
    ManualInstallRequired(String),
    #[error("source not installed: {0}")]
    NotInstalled(String),
    #[error("network error installing {pack_id}: {message}")]
    NetworkError { pack_id: String, message: String },
    #[error("failed to read manifest {path}: {source}")]
    ManifestRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest {path}: {source}")]
    ManifestParse {
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
    #[error("io error installing {pack_id}: {source}")]
    Io {
        pack_id: String,
        #[source]
        source: std::io::Error,
    },
    #[error("hashing error: {0}")]
    Hash(#[from] redletters_utils::HashError),
}

impl UserFriendlyError for CatalogError {
    fn category(&self) -> ErrorCategory {
        match self {
            CatalogError::SourceNotFound(_) => ErrorCategory::DataAvailability,
            CatalogError::EulaRequired(..) => ErrorCategory::Consent,
            CatalogError::ManualInstallRequired(_) => ErrorCategory::DataAvailability,
            CatalogError::NotInstalled(_) => ErrorCategory::DataAvailability,
            CatalogError::NetworkError { .. } => ErrorCategory::Network,
            CatalogError::ManifestRead { .. }
            | CatalogError::ManifestParse { .. }
            | CatalogError::AtomicWrite { .. }
            | CatalogError::Io { .. }
            | CatalogError::Hash(_) => ErrorCategory::Internal,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            CatalogError::EulaRequired(pack_id, _) => {
                vec![format!("run `redletters source install {pack_id} --accept-eula`")]
            }
            CatalogError::ManualInstallRequired(pack_id) => {
                vec![format!("see catalog notes for '{pack_id}' for manual install instructions")]
            }
            _ => Vec::new(),
        }
    }
}

/// A declarative, in-memory list of known [`SourcePack`]s. Loaded once at
/// construction; the installer never mutates catalog entries, only the
/// installed-pack manifest.
#[derive(Debug, Clone, Default)]
pub struct SourceCatalog {
    packs: BTreeMap<PackId, SourcePack>,
}

impl SourceCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_packs(packs: impl IntoIterator<Item = SourcePack>) -> Self {
        Self {
            packs: packs.into_iter().map(|p| (p.pack_id.clone(), p)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, pack_id: &PackId) -> Option<&SourcePack> {
        self.packs.get(pack_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourcePack> {
        self.packs.values()
    }

    pub fn insert(&mut self, pack: SourcePack) {
        self.packs.insert(pack.pack_id.clone(), pack);
    }
}

/// Manifest of installed packs, persisted as `installed_sources.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstalledManifest {
    pub schema_version: String,
    pub packs: BTreeMap<PackId, InstalledPack>,
}

impl InstalledManifest {
    fn load(path: &Utf8Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            return Ok(Self {
                schema_version: "1.0".to_string(),
                packs: BTreeMap::new(),
            });
        }
        let content = fs::read_to_string(path.as_std_path()).map_err(|source| CatalogError::ManifestRead {
            path: path.to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| CatalogError::ManifestParse {
            path: path.to_string(),
            source,
        })
    }
}

/// Installer exposing `install`/`uninstall`/`is_installed`/`status`.
pub struct Installer {
    catalog: SourceCatalog,
    data_root: Utf8PathBuf,
}

impl Installer {
    #[must_use]
    pub fn new(catalog: SourceCatalog, data_root: Utf8PathBuf) -> Self {
        Self { catalog, data_root }
    }

    #[must_use]
    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.data_root.join("installed_sources.json")
    }

    pub fn manifest(&self) -> Result<InstalledManifest, CatalogError> {
        InstalledManifest::load(&self.manifest_path())
    }

    fn save_manifest(&self, manifest: &InstalledManifest) -> Result<(), CatalogError> {
        let bytes = redletters_utils::canonical_json(manifest)?;
        redletters_utils::atomic_write::write_file_atomic(&self.manifest_path(), &bytes).map_err(|source| {
            CatalogError::AtomicWrite {
                path: self.manifest_path().to_string(),
                source,
            }
        })?;
        Ok(())
    }

    #[must_use]
    pub fn is_installed(&self, pack_id: &PackId) -> bool {
        self.manifest()
            .map(|m| m.packs.contains_key(pack_id))
            .unwrap_or(false)
    }

    #[must_use]
    pub fn install_path(&self, pack_id: &PackId) -> Utf8PathBuf {
        self.data_root.join(&pack_id.0)
    }

    /// Install `pack_id`. Idempotent when already installed and `force` is
    /// false. Fails closed on EULA if `accept_eula` is false.
    pub fn install(
        &self,
        pack_id: &PackId,
        accept_eula: bool,
        force: bool,
    ) -> Result<InstalledPack, CatalogError> {
        let pack = self
            .catalog
            .get(pack_id)
            .ok_or_else(|| CatalogError::SourceNotFound(pack_id.0.clone()))?
            .clone();

        let mut manifest = self.manifest()?;
        if let Some(existing) = manifest.packs.get(pack_id) {
            if !force {
                return Ok(existing.clone());
            }
        }

        let needs_eula = requires_eula(&pack);
        if needs_eula && !accept_eula {
            tracing::warn!(
                target: "redletters::catalog",
                pack_id = %pack_id.0,
                license = %pack.license,
                "Install blocked: license requires explicit EULA acceptance"
            );
            return Err(CatalogError::EulaRequired(pack_id.0.clone(), pack.license.clone()));
        }
        if matches!(pack.install_source, InstallSource::Manual) {
            return Err(CatalogError::ManualInstallRequired(pack_id.0.clone()));
        }

        let install_path = self.install_path(pack_id);
        if install_path.exists() {
            fs::remove_dir_all(install_path.as_std_path()).map_err(|source| CatalogError::Io {
                pack_id: pack_id.0.clone(),
                source,
            })?;
        }
        fs::create_dir_all(install_path.as_std_path()).map_err(|source| CatalogError::Io {
            pack_id: pack_id.0.clone(),
            source,
        })?;

        self.materialize(&pack, &install_path)?;

        let (file_count, content_hash) = hash_tree(&install_path)?;

        let installed = InstalledPack {
            schema_version: "1.0",
            pack: pack.clone(),
            install_path: install_path.clone(),
            installed_at: Utc::now(),
            file_count,
            content_hash,
            eula_accepted_at: if needs_eula { Some(Utc::now()) } else { None },
        };

        manifest.packs.insert(pack_id.clone(), installed.clone());
        self.save_manifest(&manifest)?;

        tracing::info!(
            target: "redletters::catalog",
            pack_id = %pack_id.0,
            role = ?installed.pack.role,
            file_count = installed.file_count,
            content_hash = %installed.content_hash,
            "Installed source pack"
        );

        Ok(installed)
    }

    /// Materializes pack files under `install_path`. `Local` copies a
    /// directory tree; `Git`/`Zip` are network fetches left for the
    /// deployment's transport layer to wire in (the core only requires
    /// the content-addressed result, not a particular fetch client) —
    /// both return `NetworkError` here since no network access is
    /// available to this abstract core.
    fn materialize(&self, pack: &SourcePack, install_path: &Utf8Path) -> Result<(), CatalogError> {
        match &pack.install_source {
            InstallSource::Local { path } => {
                copy_dir_recursive(path, install_path).map_err(|source| CatalogError::Io {
                    pack_id: pack.pack_id.0.clone(),
                    source,
                })
            }
            InstallSource::Git { url, .. } | InstallSource::Zip { url } => Err(CatalogError::NetworkError {
                pack_id: pack.pack_id.0.clone(),
                message: format!("fetch transport not wired into this core; url={url}"),
            }),
            InstallSource::Manual => unreachable!("handled by caller"),
        }
    }

    pub fn uninstall(&self, pack_id: &PackId) -> Result<(), CatalogError> {
        let mut manifest = self.manifest()?;
        let installed = manifest
            .packs
            .remove(pack_id)
            .ok_or_else(|| CatalogError::NotInstalled(pack_id.0.clone()))?;
        if installed.install_path.exists() {
            fs::remove_dir_all(installed.install_path.as_std_path()).map_err(|source| CatalogError::Io {
                pack_id: pack_id.0.clone(),
                source,
            })?;
        }
        self.save_manifest(&manifest)?;
        tracing::info!(target: "redletters::catalog", pack_id = %pack_id.0, "Uninstalled source pack");
        Ok(())
    }

    pub fn status(&self) -> Result<BTreeMap<PackId, PackStatus>, CatalogError> {
        let manifest = self.manifest()?;
        let mut out = BTreeMap::new();
        for pack in self.catalog.iter() {
            out.insert(
                pack.pack_id.clone(),
                PackStatus {
                    installed: manifest.packs.contains_key(&pack.pack_id),
                    requires_eula: requires_eula(pack),
                    role: pack.role,
                    license: pack.license.clone(),
                },
            );
        }
        Ok(out)
    }

    #[must_use]
    pub fn catalog(&self) -> &SourceCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn data_root(&self) -> &Utf8Path {
        &self.data_root
    }

    /// Packs installed with a given [`PackRole`], e.g. the spine pack.
    pub fn installed_with_role(&self, role: PackRole) -> Result<Vec<InstalledPack>, CatalogError> {
        let manifest = self.manifest()?;
        Ok(manifest
            .packs
            .into_values()
            .filter(|p| p.pack.role == role)
            .collect())
    }
}

fn hash_tree(root: &Utf8Path) -> Result<(u64, String), CatalogError> {
    let mut entries = Vec::new();
    let mut count = 0u64;
    for entry in walkdir(root) {
        count += 1;
        let rel = entry
            .strip_prefix(root.as_std_path())
            .unwrap_or(entry.as_path())
            .to_string_lossy()
            .replace('\\', "/");
        let hash = file_hash(&entry)?;
        entries.push((rel, hash));
    }
    Ok((count, content_hash_of_tree(&entries)))
}

fn walkdir(root: &Utf8Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.as_std_path().to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(read_dir) = fs::read_dir(&dir) else { continue };
        for entry in read_dir.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}

fn copy_dir_recursive(src: &Utf8Path, dst: &Utf8Path) -> std::io::Result<()> {
    fs::create_dir_all(dst.as_std_path())?;
    for entry in fs::read_dir(src.as_std_path())? {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name() else { continue };
        let dst_path = dst.as_std_path().join(name);
        if path.is_dir() {
            copy_dir_recursive(
                Utf8Path::from_path(&path).expect("utf8 path"),
                Utf8Path::from_path(&dst_path).expect("utf8 path"),
            )?;
        } else {
            fs::copy(&path, &dst_path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use types::CitationMetadata;

    fn sample_pack(id: &str, license: &str, source_path: &Utf8Path) -> SourcePack {
        SourcePack::new(
            id,
            format!("{id} pack"),
            "1.0",
            license,
            PackRole::Comparative,
            InstallSource::Local {
                path: source_path.to_path_buf(),
            },
            CitationMetadata::default(),
        )
    }

    #[test]
    fn permissive_licenses_skip_eula() {
        assert!(!requires_eula(&sample_pack("p1", "MIT", Utf8Path::new("/tmp"))));
        assert!(!requires_eula(&sample_pack("p2", "CC-BY-SA-4.0", Utf8Path::new("/tmp"))));
    }

    #[test]
    fn unknown_license_requires_eula_fail_closed() {
        assert!(requires_eula(&sample_pack("p3", "SomeWeirdLicense", Utf8Path::new("/tmp"))));
    }

    #[test]
    fn install_copies_local_pack_and_computes_hash() {
        let src_dir = TempDir::new().unwrap();
        let src_path = Utf8PathBuf::from_path_buf(src_dir.path().to_path_buf()).unwrap();
        fs::write(src_path.join("verse.txt"), b"hello").unwrap();

        let data_dir = TempDir::new().unwrap();
        let data_root = Utf8PathBuf::from_path_buf(data_dir.path().to_path_buf()).unwrap();

        let pack = sample_pack("mit-pack", "MIT", &src_path);
        let catalog = SourceCatalog::from_packs([pack]);
        let installer = Installer::new(catalog, data_root);

        let installed = installer.install(&PackId::from("mit-pack"), false, false).unwrap();
        assert_eq!(installed.file_count, 1);
        assert!(installed.eula_accepted_at.is_none());
        assert!(installer.is_installed(&PackId::from("mit-pack")));
    }

    #[test]
    fn install_requires_eula_for_restrictive_license() {
        let src_dir = TempDir::new().unwrap();
        let src_path = Utf8PathBuf::from_path_buf(src_dir.path().to_path_buf()).unwrap();
        let data_dir = TempDir::new().unwrap();
        let data_root = Utf8PathBuf::from_path_buf(data_dir.path().to_path_buf()).unwrap();

        let pack = sample_pack("eula-pack", "EULA", &src_path);
        let catalog = SourceCatalog::from_packs([pack]);
        let installer = Installer::new(catalog, data_root);

        let err = installer.install(&PackId::from("eula-pack"), false, false).unwrap_err();
        assert!(matches!(err, CatalogError::EulaRequired(..)));
    }

    #[test]
    fn uninstall_removes_manifest_entry_and_files() {
        let src_dir = TempDir::new().unwrap();
        let src_path = Utf8PathBuf::from_path_buf(src_dir.path().to_path_buf()).unwrap();
        fs::write(src_path.join("a.txt"), b"a").unwrap();
        let data_dir = TempDir::new().unwrap();
        let data_root = Utf8PathBuf::from_path_buf(data_dir.path().to_path_buf()).unwrap();

        let pack = sample_pack("tmp-pack", "MIT", &src_path);
        let catalog = SourceCatalog::from_packs([pack]);
        let installer = Installer::new(catalog, data_root);
        installer.install(&PackId::from("tmp-pack"), false, false).unwrap();

        installer.uninstall(&PackId::from("tmp-pack")).unwrap();
        assert!(!installer.is_installed(&PackId::from("tmp-pack")));
    }

    #[test]
    fn install_is_idempotent_without_force() {
        let src_dir = TempDir::new().unwrap();
        let src_path = Utf8PathBuf::from_path_buf(src_dir.path().to_path_buf()).unwrap();
        fs::write(src_path.join("a.txt"), b"a").unwrap();
        let data_dir = TempDir::new().unwrap();
        let data_root = Utf8PathBuf::from_path_buf(data_dir.path().to_path_buf()).unwrap();

        let pack = sample_pack("idempotent-pack", "MIT", &src_path);
        let catalog = SourceCatalog::from_packs([pack]);
        let installer = Installer::new(catalog, data_root);

        let first = installer.install(&PackId::from("idempotent-pack"), false, false).unwrap();
        let second = installer.install(&PackId::from("idempotent-pack"), false, false).unwrap();
        assert_eq!(first.content_hash, second.content_hash);
        assert_eq!(first.installed_at, second.installed_at);
    }
}
