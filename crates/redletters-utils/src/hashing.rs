//! Canonical JSON and SHA-256 hashing primitives.
//!
//! This module is the one place determinism lives in the system: every
//! artifact, lockfile, bundle manifest, and run log flows through
//! [`canonical_json`] and [`content_hash`]. Keep it small and forbid any
//! formatting dependence on locale, platform, float representation, or
//! map-iteration order.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Errors from the hashing/canonicalization primitives.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("failed to serialize value to canonical JSON: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to canonicalize JSON: {0}")]
    Canonicalize(#[from] serde_json_canonicalizer::CanonicalJSONError),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Serialize `value` to canonical JSON bytes: UTF-8, object keys sorted
/// lexicographically, no insignificant whitespace, no non-ASCII escaping,
/// and stable float formatting (RFC 8785 / JCS).
pub fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, HashError> {
    let value = serde_json::to_value(value)?;
    Ok(serde_json_canonicalizer::to_vec(&value)?)
}

/// SHA-256 of raw bytes, as lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// SHA-256 of a UTF-8 string, as lowercase hex. Convenience wrapper around
/// [`content_hash`] for callers holding a `&str`.
pub fn content_hash_str(s: &str) -> String {
    content_hash(s.as_bytes())
}

/// SHA-256 of `value`'s canonical JSON encoding.
pub fn hash_canonical_json<T: Serialize>(value: &T) -> Result<String, HashError> {
    Ok(content_hash(&canonical_json(value)?))
}

/// Streaming SHA-256 of a file's contents, reading in fixed-size chunks so
/// memory use stays bounded regardless of file size.
pub fn file_hash(path: &Path) -> Result<String, HashError> {
    let file = File::open(path).map_err(|source| HashError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(|source| HashError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 over the sorted list of `(relative_path, file_bytes)` pairs
/// under `root`. Used for `InstalledPack::content_hash` (§3): determinism
/// requires the walk order and the hashed representation of each pair to be
/// fixed, so we hash a colon-joined `path\0hash` line per entry, sorted by
/// path, then hash the concatenation.
pub fn content_hash_of_tree(entries: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = entries.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    let mut buf = String::new();
    for (path, file_hash_hex) in sorted {
        buf.push_str(path);
        buf.push('\0');
        buf.push_str(file_hash_hex);
        buf.push('\n');
    }
    content_hash_str(&buf)
}

/// Colon-joined stable identifier built from an arbitrary tuple of parts.
/// Used anywhere the system needs a deterministic composite key (e.g.
/// `(session_id, variant_ref)` in the acknowledgement ledger).
pub fn stable_id<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .map(|p| p.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn canonical_json_sorts_keys() {
        let value = json!({"b": 1, "a": 2});
        let bytes = canonical_json(&value).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn content_hash_is_deterministic() {
        let v1 = json!({"ref": "John.1.18", "position": 0});
        let v2 = json!({"position": 0, "ref": "John.1.18"});
        assert_eq!(
            hash_canonical_json(&v1).unwrap(),
            hash_canonical_json(&v2).unwrap()
        );
    }

    #[test]
    fn content_hash_matches_known_vector() {
        // SHA-256 of the empty string, per FIPS 180-4 test vectors.
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn file_hash_streams_large_files() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        let data = vec![7u8; 5 * 1024 * 1024];
        tmp.write_all(&data).unwrap();
        tmp.flush().unwrap();
        let hash = file_hash(tmp.path()).unwrap();
        assert_eq!(hash, content_hash(&data));
    }

    #[test]
    fn stable_id_colon_joins() {
        assert_eq!(stable_id(["s1", "John.1.18"]), "s1:John.1.18");
    }

    #[test]
    fn content_hash_of_tree_is_order_independent() {
        let a = vec![
            ("b.json".to_string(), content_hash_str("b")),
            ("a.json".to_string(), content_hash_str("a")),
        ];
        let b = vec![
            ("a.json".to_string(), content_hash_str("a")),
            ("b.json".to_string(), content_hash_str("b")),
        ];
        assert_eq!(content_hash_of_tree(&a), content_hash_of_tree(&b));
    }
}
