//! Artifact-type autodetection by filename and content, ported from
//! `bundle.py`'s `_detect_type_from_path`.

use camino::Utf8Path;

/// Detect an artifact's type from its file name, falling back to the
/// first JSON value in its content (first line for `.jsonl`, whole file
/// for `.json`). Returns `"unknown"` if nothing matches.
#[must_use]
pub fn detect_artifact_type(path: &Utf8Path, content: &[u8]) -> String {
    let name = path.file_name().unwrap_or("").to_lowercase();

    if name == "lockfile.json" {
        return "lockfile".to_string();
    }
    if name == "snapshot.json" {
        return "snapshot".to_string();
    }
    if name == "manifest.json" {
        return "manifest".to_string();
    }
    if name.ends_with(".schema.json") {
        return "schema".to_string();
    }

    if let Some(first_value) = first_json_value(content) {
        if let Some(detected) = detect_from_value(&first_value) {
            return detected;
        }
    }

    "unknown".to_string()
}

fn first_json_value(content: &[u8]) -> Option<serde_json::Value> {
    let text = std::str::from_utf8(content).ok()?;
    let first_line = text.lines().next()?;
    serde_json::from_str(first_line).ok()
}

fn detect_from_value(value: &serde_json::Value) -> Option<String> {
    let object = value.as_object()?;

    // §4.13: `gate_status` is the quote artifact's characteristic key.
    if object.contains_key("gate_status") {
        return Some("quote".to_string());
    }
    // §4.13: `tool_version` + `export_hashes` together identify a snapshot.
    if object.contains_key("tool_version") && object.contains_key("export_hashes") {
        return Some("snapshot".to_string());
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

    None
}

/// Extract `schema_version` from the first JSON value in `content`, if
/// present, mirroring `bundle.py`'s `_get_schema_version_from_file`.
#[must_use]
pub fn schema_version_of(content: &[u8]) -> Option<String> {
    let value = first_json_value(content)?;
    value.get("schema_version")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_lockfile_by_name() {
        let path = Utf8Path::new("lockfile.json");
        assert_eq!(detect_artifact_type(path, b"{}"), "lockfile");
    }

    #[test]
    fn detects_quote_by_content_key() {
        let path = Utf8Path::new("quote.json");
        let content = br#"{"gate_status":"satisfied"}"#;
        assert_eq!(detect_artifact_type(path, content), "quote");
    }

    #[test]
    fn detects_apparatus_jsonl_from_first_line() {
        let path = Utf8Path::new("apparatus.jsonl");
        let content = b"{\"ref\":\"John.1.18\",\"classification\":\"substitution\"}\n{\"ref\":\"John.1.19\"}";
        assert_eq!(detect_artifact_type(path, content), "apparatus");
    }

    #[test]
    fn unknown_when_nothing_matches() {
        let path = Utf8Path::new("notes.json");
        assert_eq!(detect_artifact_type(path, b"{\"hello\":\"world\"}"), "unknown");
    }

    #[test]
    fn schema_version_extracted_from_content() {
        let content = br#"{"schema_version":"1.0.0","ref":"John.1.18"}"#;
        assert_eq!(schema_version_of(content), Some("1.0.0".to_string()));
    }
}
