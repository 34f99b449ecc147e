//! Data model for the source catalog and installer.

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use redletters_utils::{PackId, PackRole};
use serde::{Deserialize, Serialize};

/// Where a pack's files originate from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstallSource {
    Git { url: String, revision: String },
    Zip { url: String },
    Local { path: Utf8PathBuf },
    Manual,
}

impl InstallSource {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            InstallSource::Git { .. } => "git",
            InstallSource::Zip { .. } => "zip",
            InstallSource::Local { .. } => "local",
            InstallSource::Manual => "manual",
        }
    }
}

/// Citation metadata recorded for scholarly attribution in exports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationMetadata {
    pub source_title: String,
    pub edition: String,
    pub publisher: String,
    pub year: String,
    pub license_url: String,
}

/// An entry in the declarative source catalog (immutable once installed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePack {
    pub schema_version: &'static str,
    pub pack_id: PackId,
    pub name: String,
    pub version: String,
    /// SPDX identifier, or the literal string `"EULA"` for non-SPDX
    /// licensed content.
    pub license: String,
    pub role: PackRole,
    pub install_source: InstallSource,
    pub citation: CitationMetadata,
}

fn schema_version() -> &'static str {
    "1.0"
}

impl SourcePack {
    #[must_use]
    pub fn new(
        pack_id: impl Into<PackId>,
        name: impl Into<String>,
        version: impl Into<String>,
        license: impl Into<String>,
        role: PackRole,
        install_source: InstallSource,
        citation: CitationMetadata,
    ) -> Self {
        Self {
            schema_version: schema_version(),
            pack_id: pack_id.into(),
            name: name.into(),
            version: version.into(),
            license: license.into(),
            role,
            install_source,
            citation,
        }
    }
}

/// A pack once installed: the catalog entry plus install-time facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPack {
    pub schema_version: &'static str,
    #[serde(flatten)]
    pub pack: SourcePack,
    pub install_path: Utf8PathBuf,
    pub installed_at: DateTime<Utc>,
    pub file_count: u64,
    /// SHA-256 over the sorted list of `(relative_path, file_bytes)` pairs.
    pub content_hash: String,
    /// Only ever set when `requires_eula == true`.
    pub eula_accepted_at: Option<DateTime<Utc>>,
}

/// Summary returned by `status()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackStatus {
    pub installed: bool,
    pub requires_eula: bool,
    pub role: PackRole,
    pub license: String,
}
