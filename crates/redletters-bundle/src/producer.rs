//! Bundle production: copy lockfile, snapshot,
//! and input artifacts into a bundle directory, detect each artifact's
//! type, sort deterministically, and emit a canonical-JSON manifest.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;

use crate::detect::{detect_artifact_type, schema_version_of};
use crate::types::{ArtifactEntry, BundleManifest, BUNDLE_SCHEMA_VERSION, TOOL_VERSION};
use crate::BundleError;

/// Options controlling bundle production. `zip` exists as a typed field
/// rather than being silently dropped: no example repo in the pack pulls
/// in a zip crate, so rather than fabricate that dependency, setting it
/// fails loudly with [`BundleError::Unsupported`] instead of pretending to
/// honor the request.
#[derive(Debug, Clone, Default)]
pub struct BundleOptions {
    pub include_schemas: bool,
    pub schema_dir: Option<Utf8PathBuf>,
    pub zip: bool,
    pub notes: String,
}

fn copy_and_hash(
    source: &Utf8Path,
    dest_dir: &Utf8Path,
    dest_name: &str,
) -> Result<(Vec<u8>, String), BundleError> {
    let bytes = std::fs::read(source.as_std_path()).map_err(|source_err| BundleError::ReadInput {
        path: source.to_string(),
        source: source_err,
    })?;
    let dest_path = dest_dir.join(dest_name);
    redletters_utils::atomic_write::write_file_atomic(&dest_path, &bytes)?;
    let hash = redletters_utils::content_hash(&bytes);
    Ok((bytes, hash))
}

/// Produce a bundle directory containing `lockfile.json`, `snapshot.json`,
/// every file in `input_paths`, optionally JSON Schema files, and a
/// `manifest.json` tying it all together.
pub fn produce(
    bundle_dir: &Utf8Path,
    lockfile_path: &Utf8Path,
    snapshot_path: &Utf8Path,
    input_paths: &[Utf8PathBuf],
    options: &BundleOptions,
) -> Result<BundleManifest, BundleError> {
    if options.zip {
        return Err(BundleError::Unsupported("zip archive output"));
    }

    std::fs::create_dir_all(bundle_dir.as_std_path()).map_err(|source| BundleError::CreateDir {
        path: bundle_dir.to_string(),
        source,
    })?;

    let mut artifacts = Vec::new();

    let (_lockfile_bytes, lockfile_hash) = copy_and_hash(lockfile_path, bundle_dir, "lockfile.json")?;
    artifacts.push(ArtifactEntry {
        path: "lockfile.json".to_string(),
        artifact_type: "lockfile".to_string(),
        sha256: lockfile_hash.clone(),
        schema_version: Some("1.0.0".to_string()),
    });

    let (snapshot_bytes, snapshot_hash) = copy_and_hash(snapshot_path, bundle_dir, "snapshot.json")?;
    artifacts.push(ArtifactEntry {
        path: "snapshot.json".to_string(),
        artifact_type: "snapshot".to_string(),
        sha256: snapshot_hash.clone(),
        schema_version: schema_version_of(&snapshot_bytes),
    });

    for input_path in input_paths {
        let file_name = input_path
            .file_name()
            .ok_or_else(|| BundleError::ReadInput {
                path: input_path.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"),
            })?
            .to_string();
        let (bytes, hash) = copy_and_hash(input_path, bundle_dir, &file_name)?;
        let dest_path = bundle_dir.join(&file_name);
        let artifact_type = detect_artifact_type(&dest_path, &bytes);
        artifacts.push(ArtifactEntry {
            path: file_name,
            artifact_type,
            sha256: hash,
            schema_version: schema_version_of(&bytes),
        });
    }

    if options.include_schemas {
        if let Some(schema_dir) = &options.schema_dir {
            if schema_dir.exists() {
                let schemas_dest = bundle_dir.join("schemas");
                std::fs::create_dir_all(schemas_dest.as_std_path()).map_err(|source| BundleError::CreateDir {
                    path: schemas_dest.to_string(),
                    source,
                })?;
                let mut schema_files: Vec<Utf8PathBuf> = std::fs::read_dir(schema_dir.as_std_path())
                    .map_err(|source| BundleError::ReadInput { path: schema_dir.to_string(), source })?
                    .filter_map(|entry| entry.ok())
                    .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.path()).ok())
                    .filter(|p| p.file_name().is_some_and(|n| n.ends_with(".schema.json")))
                    .collect();
                schema_files.sort();

                for schema_file in schema_files {
                    let name = schema_file.file_name().unwrap().to_string();
                    let (bytes, _) = copy_and_hash(&schema_file, &schemas_dest, &name)?;
                    artifacts.push(ArtifactEntry {
                        path: format!("schemas/{name}"),
                        artifact_type: "schema".to_string(),
                        sha256: redletters_utils::content_hash(&bytes),
                        schema_version: None,
                    });
                }
            }
        }
    }

    let mut manifest = BundleManifest {
        schema_version: BUNDLE_SCHEMA_VERSION.to_string(),
        tool_version: TOOL_VERSION.to_string(),
        created_utc: Utc::now(),
        lockfile_hash,
        snapshot_hash,
        artifacts,
        content_hash: String::new(),
        schemas_included: options.include_schemas,
        notes: options.notes.clone(),
    };
    manifest.sort_artifacts();
    manifest.content_hash = manifest.compute_content_hash();

    let manifest_bytes = redletters_utils::canonical_json(&manifest)?;
    redletters_utils::atomic_write::write_file_atomic(&bundle_dir.join("manifest.json"), &manifest_bytes)?;

    Ok(manifest)
}
