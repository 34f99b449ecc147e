//! Artifact-type autodetection by filename and by characteristic content
//! keys, mirroring `redletters-bundle::detect` but kept
//! independent so the validator has no dependency on the bundle crate.

use camino::Utf8Path;
use serde_json::Value;

const KNOWN_TYPES: &[&str] =
    &["apparatus", "translation", "citations", "quote", "dossier", "snapshot", "lockfile", "manifest"];

/// Detect from the file name alone: exact stems first (`lockfile.json`,
/// `snapshot.json`, `manifest.json`), then a substring match against any
/// known artifact-type name (so `my_dossier.json` still resolves to
/// `dossier`, matching the original validator's filename-pattern fallback).
pub fn detect_from_filename(path: &Utf8Path) -> Option<String> {
    let stem = path.file_stem()?.to_lowercase();
    if stem == "lockfile" {
        return Some("lockfile".to_string());
    }
    if stem == "snapshot" {
        return Some("snapshot".to_string());
    }
    if stem == "manifest" {
        return Some("manifest".to_string());
    }
    KNOWN_TYPES.iter().find(|t| stem.contains(*t)).map(|t| (*t).to_string())
}

/// Detect from characteristic keys on a parsed JSON value.
pub fn detect_from_content(value: &Value) -> Option<String> {
    let object = value.as_object()?;

    if object.contains_key("gate_status") {
        return Some("quote".to_string());
    }
    if object.contains_key("tool_version") && object.contains_key("export_hashes") {
        return Some("snapshot".to_string());
    }
    if object.contains_key("artifacts") && object.contains_key("content_hash") {
        return Some("manifest".to_string());
    }
    if object.contains_key("spine") && object.contains_key("variants") && object.contains_key("provenance") {
        return Some("dossier".to_string());
    }
    if object.contains_key("packs") && object.contains_key("generated_at") {
        return Some("citations".to_string());
    }
    if object.contains_key("verse_id") && object.contains_key("confidence") {
        return Some("translation".to_string());
    }
    if object.contains_key("ref") && object.contains_key("classification") {
        return Some("apparatus".to_string());
    }
    if object.contains_key("packs") && object.contains_key("lockfile_hash") {
        return Some("lockfile".to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_substring_resolves_dossier() {
        let path = Utf8Path::new("my_dossier.json");
        assert_eq!(detect_from_filename(path), Some("dossier".to_string()));
    }

    #[test]
    fn content_key_resolves_quote_over_filename() {
        let value: Value = serde_json::from_str(r#"{"gate_status":"satisfied"}"#).unwrap();
        assert_eq!(detect_from_content(&value), Some("quote".to_string()));
    }

    #[test]
    fn content_key_resolves_snapshot() {
        let value: Value =
            serde_json::from_str(r#"{"tool_version":"1.0.0","export_hashes":{}}"#).unwrap();
        assert_eq!(detect_from_content(&value), Some("snapshot".to_string()));
    }

    #[test]
    fn unrecognized_content_returns_none() {
        let value: Value = serde_json::from_str(r#"{"hello":"world"}"#).unwrap();
        assert_eq!(detect_from_content(&value), None);
    }
}
