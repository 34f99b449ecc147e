//! Atomic file writes with cross-platform support.
//!
//! Every on-disk artifact in the system (manifests, lockfiles, receipts,
//! bundles) is written via temp-file + fsync + atomic rename so a crash
//! mid-write never leaves a torn file behind. Receipts additionally get
//! `chmod 0444` after the rename (§4.9): immutability is part of their
//! contract, not an afterthought.

use std::fs;
use std::io::Write;
use std::path::Path;

use camino::Utf8Path;
use tempfile::NamedTempFile;

#[cfg(target_os = "windows")]
use std::{thread, time::Duration};

/// Errors from atomic write operations.
#[derive(Debug, thiserror::Error)]
pub enum AtomicWriteError {
    #[error("failed to create parent directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create temp file in {dir}: {source}")]
    TempFile {
        dir: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write temp file contents: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to fsync temp file: {0}")]
    Fsync(#[source] std::io::Error),
    #[error("failed to atomically rename into {path}: {source}")]
    Rename {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to set permissions on {path}: {source}")]
    Chmod {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of an atomic write, surfaced for diagnostics/logging.
#[derive(Debug, Clone, Default)]
pub struct AtomicWriteResult {
    /// Number of rename retries that occurred (Windows only).
    pub rename_retry_count: u32,
    /// Whether cross-filesystem copy fallback was used.
    pub used_cross_filesystem_fallback: bool,
    pub warnings: Vec<String>,
}

/// Atomically write `content` to `path`: temp file in the same directory,
/// `write_all` + `sync_all`, then an atomic rename. Falls back to
/// copy→fsync→replace if the rename crosses a filesystem boundary (`EXDEV`).
pub fn write_file_atomic(path: &Utf8Path, content: &[u8]) -> Result<AtomicWriteResult, AtomicWriteError> {
    let mut result = AtomicWriteResult::default();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| AtomicWriteError::CreateDir {
            path: parent.to_string(),
            source,
        })?;
    }

    let temp_dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let mut temp_file = NamedTempFile::new_in(temp_dir).map_err(|source| AtomicWriteError::TempFile {
        dir: temp_dir.to_string(),
        source,
    })?;

    temp_file.write_all(content).map_err(AtomicWriteError::Write)?;
    temp_file.as_file().sync_all().map_err(AtomicWriteError::Fsync)?;

    let temp_path = temp_file.path().to_path_buf();

    match atomic_rename(temp_file, path.as_std_path()) {
        Ok(retry_count) => {
            result.rename_retry_count = retry_count;
            if retry_count > 0 {
                result.warnings.push(format!(
                    "rename required {retry_count} retries due to transient filesystem locks"
                ));
            }
        }
        Err(e) if is_cross_filesystem_error(&e) => {
            result.used_cross_filesystem_fallback = true;
            result
                .warnings
                .push("used cross-filesystem fallback (copy->fsync->replace)".to_string());
            cross_filesystem_copy_from_path(&temp_path, path)?;
        }
        Err(source) => {
            return Err(AtomicWriteError::Rename {
                path: path.to_string(),
                source,
            });
        }
    }

    fsync_parent_dir(path);

    Ok(result)
}

/// Like [`write_file_atomic`] but also `chmod`s the final file to `0444`
/// (read-only for all) once the rename has committed, per the receipt
/// immutability contract (§4.9, §8 "Receipt immutability").
#[cfg(unix)]
pub fn write_file_atomic_readonly(
    path: &Utf8Path,
    content: &[u8],
) -> Result<AtomicWriteResult, AtomicWriteError> {
    use std::os::unix::fs::PermissionsExt;

    let result = write_file_atomic(path, content)?;
    let perms = fs::Permissions::from_mode(0o444);
    fs::set_permissions(path.as_std_path(), perms).map_err(|source| AtomicWriteError::Chmod {
        path: path.to_string(),
        source,
    })?;
    Ok(result)
}

#[cfg(not(unix))]
pub fn write_file_atomic_readonly(
    path: &Utf8Path,
    content: &[u8],
) -> Result<AtomicWriteResult, AtomicWriteError> {
    let result = write_file_atomic(path, content)?;
    let mut perms = fs::metadata(path.as_std_path())
        .map_err(|source| AtomicWriteError::Chmod {
            path: path.to_string(),
            source,
        })?
        .permissions();
    perms.set_readonly(true);
    fs::set_permissions(path.as_std_path(), perms).map_err(|source| AtomicWriteError::Chmod {
        path: path.to_string(),
        source,
    })?;
    Ok(result)
}

/// Best-effort fsync of the parent directory, to make the rename durable
/// against a crash (§4.9 step 5). Not all platforms/filesystems support
/// this; failures are silently ignored since it is advisory hardening, not
/// a correctness requirement the rest of the system depends on.
fn fsync_parent_dir(path: &Utf8Path) {
    #[cfg(unix)]
    {
        if let Some(parent) = path.parent() {
            if let Ok(dir) = fs::File::open(parent.as_std_path()) {
                let _ = dir.sync_all();
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

#[cfg(target_os = "windows")]
fn atomic_rename(mut temp_file: NamedTempFile, target: &Path) -> Result<u32, std::io::Error> {
    const MAX_RETRIES: u32 = 5;
    const INITIAL_DELAY_MS: u64 = 10;
    const MAX_TOTAL_DELAY_MS: u64 = 250;

    let mut retry_count = 0;
    let mut total_delay_ms = 0;

    loop {
        match temp_file.persist(target) {
            Ok(_) => return Ok(retry_count),
            Err(persist_error) => {
                if retry_count >= MAX_RETRIES {
                    return Err(persist_error.error);
                }
                let is_retryable = matches!(
                    persist_error.error.kind(),
                    std::io::ErrorKind::PermissionDenied | std::io::ErrorKind::Other
                );
                if !is_retryable {
                    return Err(persist_error.error);
                }
                let delay_ms = INITIAL_DELAY_MS * 2_u64.pow(retry_count);
                if total_delay_ms + delay_ms > MAX_TOTAL_DELAY_MS {
                    let remaining = MAX_TOTAL_DELAY_MS.saturating_sub(total_delay_ms);
                    if remaining > 0 {
                        thread::sleep(Duration::from_millis(remaining));
                    }
                    return persist_error
                        .file
                        .persist(target)
                        .map(|_| retry_count + 1)
                        .map_err(|e| e.error);
                }
                thread::sleep(Duration::from_millis(delay_ms));
                total_delay_ms += delay_ms;
                retry_count += 1;
                temp_file = persist_error.file;
            }
        }
    }
}

#[cfg(not(target_os = "windows"))]
fn atomic_rename(temp_file: NamedTempFile, target: &Path) -> Result<u32, std::io::Error> {
    temp_file.persist(target).map(|_| 0).map_err(|e| e.error)
}

#[cfg(unix)]
fn is_cross_filesystem_error(err: &std::io::Error) -> bool {
    matches!(err.raw_os_error(), Some(18)) // EXDEV
}

#[cfg(not(unix))]
fn is_cross_filesystem_error(_err: &std::io::Error) -> bool {
    false
}

fn cross_filesystem_copy_from_path(temp_path: &Path, target: &Utf8Path) -> Result<(), AtomicWriteError> {
    let content = fs::read(temp_path).map_err(|source| AtomicWriteError::Write(source))?;

    let target_dir = target.parent().unwrap_or_else(|| Utf8Path::new("."));
    let mut target_temp = NamedTempFile::new_in(target_dir).map_err(|source| AtomicWriteError::TempFile {
        dir: target_dir.to_string(),
        source,
    })?;
    target_temp.write_all(&content).map_err(AtomicWriteError::Write)?;
    target_temp.as_file().sync_all().map_err(AtomicWriteError::Fsync)?;
    target_temp
        .persist(target.as_std_path())
        .map_err(|e| AtomicWriteError::Rename {
            path: target.to_string(),
            source: e.error,
        })?;
    let _ = fs::remove_file(temp_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_round_trips_content() {
        let dir = TempDir::new().unwrap();
        let path_buf = dir.path().join("artifact.json");
        let path = Utf8Path::from_path(&path_buf).unwrap();

        write_file_atomic(path, b"{\"a\":1}").unwrap();
        let read_back = fs::read(path.as_std_path()).unwrap();
        assert_eq!(read_back, b"{\"a\":1}");
    }

    #[test]
    fn atomic_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path_buf = dir.path().join("nested").join("deep").join("receipt.json");
        let path = Utf8Path::from_path(&path_buf).unwrap();

        write_file_atomic(path, b"{}").unwrap();
        assert!(path.exists());
    }

    #[test]
    #[cfg(unix)]
    fn readonly_write_is_chmod_0444() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path_buf = dir.path().join("receipt.json");
        let path = Utf8Path::from_path(&path_buf).unwrap();

        write_file_atomic_readonly(path, b"{\"status\":\"completed\"}").unwrap();
        let mode = fs::metadata(path.as_std_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o444);
    }

    #[test]
    fn atomic_write_overwrites_existing() {
        let dir = TempDir::new().unwrap();
        let path_buf = dir.path().join("f.json");
        let path = Utf8Path::from_path(&path_buf).unwrap();

        write_file_atomic(path, b"old").unwrap();
        write_file_atomic(path, b"new").unwrap();
        assert_eq!(fs::read(path.as_std_path()).unwrap(), b"new");
    }
}
