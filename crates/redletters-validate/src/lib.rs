//! Schema-versioned output validator.
//!
//! Autodetect an artifact's type from its filename or
//! characteristic content keys, then check required keys, a semver-shaped
//! `schema_version`, typed constraints (non-empty arrays where the data
//! model requires them), and — for JSONL files — per-line validity with
//! 1-indexed error positions.

pub mod autodetect;
pub mod schemas;
pub mod types;

pub use types::{ValidationError, ValidationResult};

use camino::Utf8Path;
use serde_json::Value;
use std::sync::LazyLock;

static SEMVER_RE: LazyLock<regex::Regex> = LazyLock::new(|| regex::Regex::new(r"^\d+\.\d+\.\d+$").unwrap());

/// Validate a single artifact file, autodetecting its type unless
/// `artifact_type` is given.
pub fn validate_output(path: &Utf8Path, artifact_type: Option<&str>) -> ValidationResult {
    let bytes = match std::fs::read(path.as_std_path()) {
        Ok(bytes) => bytes,
        Err(_) => {
            return ValidationResult::failed(
                artifact_type.unwrap_or("unknown").to_string(),
                vec![ValidationError::new(format!("File not found: {path}"))],
            )
        }
    };

    let is_jsonl = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl"));

    if is_jsonl {
        validate_jsonl(path, &bytes, artifact_type)
    } else {
        validate_json(path, &bytes, artifact_type)
    }
}

fn validate_json(path: &Utf8Path, bytes: &[u8], artifact_type: Option<&str>) -> ValidationResult {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(source) => {
            return ValidationResult::failed(
                artifact_type.unwrap_or("unknown").to_string(),
                vec![ValidationError::new(format!("Invalid UTF-8: {source}"))],
            )
        }
    };

    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(source) => {
            return ValidationResult::failed(
                artifact_type.unwrap_or("unknown").to_string(),
                vec![ValidationError::new(format!("Invalid JSON: {source}"))],
            )
        }
    };

    let resolved_type = artifact_type
        .map(str::to_string)
        .or_else(|| autodetect::detect_from_filename(path))
        .or_else(|| autodetect::detect_from_content(&value))
        .unwrap_or_else(|| "unknown".to_string());

    let mut errors = validate_record(&resolved_type, &value, None);
    let schema_version_found = value.get("schema_version").and_then(Value::as_str).map(str::to_string);

    if errors.is_empty() {
        ValidationResult::ok(resolved_type, 1, schema_version_found)
    } else {
        errors.sort_by_key(|e| e.line);
        ValidationResult { valid: false, artifact_type: resolved_type, records_checked: 1, schema_version_found, errors }
    }
}

fn validate_jsonl(path: &Utf8Path, bytes: &[u8], artifact_type: Option<&str>) -> ValidationResult {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(source) => {
            return ValidationResult::failed(
                artifact_type.unwrap_or("unknown").to_string(),
                vec![ValidationError::new(format!("Invalid UTF-8: {source}"))],
            )
        }
    };

    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();

    let mut resolved_type = artifact_type.map(str::to_string).or_else(|| autodetect::detect_from_filename(path));
    let mut errors = Vec::new();
    let mut schema_version_found = None;

    for (index, line) in lines.iter().enumerate() {
        let line_number = index + 1;
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(source) => {
                errors.push(ValidationError::at_line(line_number, format!("Invalid JSON: {source}")));
                continue;
            }
        };

        if resolved_type.is_none() {
            resolved_type = autodetect::detect_from_content(&value);
        }
        let record_type = resolved_type.clone().unwrap_or_else(|| "unknown".to_string());

        if schema_version_found.is_none() {
            schema_version_found = value.get("schema_version").and_then(Value::as_str).map(str::to_string);
        }

        errors.extend(validate_record(&record_type, &value, Some(line_number)));
    }

    let resolved_type = resolved_type.unwrap_or_else(|| "unknown".to_string());
    if errors.is_empty() {
        ValidationResult::ok(resolved_type, lines.len(), schema_version_found)
    } else {
        errors.sort_by_key(|e| e.line);
        ValidationResult {
            valid: false,
            artifact_type: resolved_type,
            records_checked: lines.len(),
            schema_version_found,
            errors,
        }
    }
}

/// Validate one parsed record against its type's schema plus the manual
/// checks `jsonschema`'s generic diagnostics wouldn't phrase the way the
/// contract requires (semver format, non-empty arrays).
fn validate_record(artifact_type: &str, value: &Value, line: Option<usize>) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    match value.get("schema_version").and_then(Value::as_str) {
        None => errors.push(with_line(line, "schema_version is required".to_string())),
        Some(version) if !SEMVER_RE.is_match(version) => {
            errors.push(with_line(line, format!("schema_version {version:?} is not semver (expected X.Y.Z)")))
        }
        Some(_) => {}
    }

    if let Some(schema) = schemas::schema_for(artifact_type) {
        match jsonschema::validator_for(&schema) {
            Ok(validator) => {
                for error in validator.iter_errors(value) {
                    errors.push(with_line(line, error.to_string()));
                }
            }
            Err(source) => errors.push(with_line(line, format!("internal schema error: {source}"))),
        }
    }

    for field in schemas::required_non_empty_arrays(artifact_type) {
        if let Some(array) = value.get(field).and_then(Value::as_array) {
            if array.is_empty() {
                errors.push(with_line(line, format!("{field} must be non-empty")));
            }
        }
    }

    errors
}

fn with_line(line: Option<usize>, message: String) -> ValidationError {
    match line {
        Some(line) => ValidationError::at_line(line, message),
        None => ValidationError::new(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> camino::Utf8PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        camino::Utf8PathBuf::from_path_buf(path).unwrap()
    }

    #[test]
    fn valid_quote_passes() {
        let dir = tempfile::tempdir().unwrap();
        let quote = json!({
            "schema_version": "1.0.0",
            "reference": "John 1:18",
            "mode": "readable",
            "gate_status": "satisfied",
            "generated_at": "2026-02-02T00:00:00Z",
        });
        let path = write(&dir, "quote.json", &quote.to_string());

        let result = validate_output(&path, Some("quote"));
        assert!(result.valid, "{:?}", result.errors);
        assert_eq!(result.artifact_type, "quote");
        assert_eq!(result.records_checked, 1);
        assert_eq!(result.schema_version_found, Some("1.0.0".to_string()));
    }

    #[test]
    fn missing_required_field_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let quote = json!({
            "schema_version": "1.0.0",
            "reference": "John 1:18",
            "mode": "readable",
            "generated_at": "2026-02-02T00:00:00Z",
        });
        let path = write(&dir, "quote.json", &quote.to_string());

        let result = validate_output(&path, Some("quote"));
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.message.contains("gate_status")));
    }

    #[test]
    fn invalid_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "broken.json", "{ not valid json");

        let result = validate_output(&path, Some("quote"));
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.message.contains("Invalid JSON")));
    }

    #[test]
    fn file_not_found_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("missing.json")).unwrap();

        let result = validate_output(&path, Some("quote"));
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.message.contains("not found")));
    }

    #[test]
    fn valid_jsonl_counts_every_line() {
        let dir = tempfile::tempdir().unwrap();
        let line1 = json!({
            "schema_version": "1.0.0", "ref": "John.1.1", "position": 0,
            "classification": "substitution", "significance": "minor",
            "readings": [{"surface_text": "a", "normalized_text": "a", "notes": "", "support_set": []}],
        });
        let line2 = json!({
            "schema_version": "1.0.0", "ref": "John.1.2", "position": 0,
            "classification": "omission", "significance": "significant",
            "readings": [{"surface_text": "b", "normalized_text": "b", "notes": "", "support_set": []}],
        });
        let content = format!("{}\n{}\n", line1, line2);
        let path = write(&dir, "apparatus.jsonl", &content);

        let result = validate_output(&path, Some("apparatus"));
        assert!(result.valid, "{:?}", result.errors);
        assert_eq!(result.records_checked, 2);
    }

    #[test]
    fn jsonl_error_reports_correct_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let line1 = json!({
            "schema_version": "1.0.0", "ref": "John.1.1", "position": 0,
            "classification": "substitution", "significance": "minor",
            "readings": [{"surface_text": "a"}],
        });
        let line2 = json!({ "schema_version": "1.0.0" });
        let content = format!("{}\n{}\n", line1, line2);
        let path = write(&dir, "apparatus.jsonl", &content);

        let result = validate_output(&path, Some("apparatus"));
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.line == Some(2)));
    }

    #[test]
    fn autodetect_from_content_without_artifact_type() {
        let dir = tempfile::tempdir().unwrap();
        let quote = json!({
            "schema_version": "1.0.0",
            "reference": "John 1:18",
            "mode": "readable",
            "gate_status": "satisfied",
            "generated_at": "2026-02-02T00:00:00Z",
        });
        let path = write(&dir, "output.json", &quote.to_string());

        let result = validate_output(&path, None);
        assert!(result.valid, "{:?}", result.errors);
        assert_eq!(result.artifact_type, "quote");
    }

    #[test]
    fn autodetect_from_filename_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let dossier = json!({
            "schema_version": "1.0.0",
            "reference": "John.1.1",
            "scope": "verse",
            "generated_at": "2026-02-02T00:00:00Z",
            "spine": {"source_id": "test", "is_default": true},
            "variants": [],
            "provenance": {"spine_source": "test", "comparative_packs": [], "build_timestamp": "2026-02-02T00:00:00Z"},
        });
        let path = write(&dir, "my_dossier.json", &dossier.to_string());

        let result = validate_output(&path, None);
        assert!(result.valid, "{:?}", result.errors);
        assert_eq!(result.artifact_type, "dossier");
    }

    #[test]
    fn missing_schema_version_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let quote = json!({
            "reference": "John 1:18",
            "mode": "readable",
            "gate_status": "satisfied",
            "generated_at": "2026-02-02T00:00:00Z",
        });
        let path = write(&dir, "quote.json", &quote.to_string());

        let result = validate_output(&path, Some("quote"));
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.message.contains("schema_version")));
    }

    #[test]
    fn non_semver_schema_version_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let quote = json!({
            "schema_version": "not-semver",
            "reference": "John 1:18",
            "mode": "readable",
            "gate_status": "satisfied",
            "generated_at": "2026-02-02T00:00:00Z",
        });
        let path = write(&dir, "quote.json", &quote.to_string());

        let result = validate_output(&path, Some("quote"));
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.message.contains("semver")));
    }

    #[test]
    fn empty_readings_array_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let apparatus = json!({
            "schema_version": "1.0.0", "ref": "John.1.1", "position": 0,
            "classification": "substitution", "significance": "minor",
            "readings": [],
        });
        let path = write(&dir, "apparatus.jsonl", &apparatus.to_string());

        let result = validate_output(&path, Some("apparatus"));
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.message.contains("non-empty")));
    }
}
