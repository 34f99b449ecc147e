//! JSON Schema documents for each artifact type, matched
//! against the record/document shapes `redletters-export`, `redletters-lock`,
//! `redletters-snapshot`, and `redletters-bundle` actually emit.
//!
//! Kept as inline `serde_json::Value` literals rather than `.schema.json`
//! files on disk: there is no schema-authoring workflow elsewhere in this
//! project, and the values here are exactly the contract the sibling crates
//! already hard-code in their `types.rs` structs.

use serde_json::{json, Value};

/// Fields whose emptiness is itself a contract violation, keyed by
/// artifact type. `jsonschema`'s own `minItems` diagnostics don't mention
/// "non-empty", so these are checked and reported separately.
pub fn required_non_empty_arrays(artifact_type: &str) -> &'static [&'static str] {
    match artifact_type {
        "apparatus" => &["readings"],
        _ => &[],
    }
}

pub fn schema_for(artifact_type: &str) -> Option<Value> {
    Some(match artifact_type {
        "apparatus" => apparatus_schema(),
        "translation" => translation_schema(),
        "citations" => citations_schema(),
        "quote" => quote_schema(),
        "dossier" => dossier_schema(),
        "snapshot" => snapshot_schema(),
        "lockfile" => lockfile_schema(),
        "manifest" => manifest_schema(),
        _ => return None,
    })
}

fn apparatus_schema() -> Value {
    json!({
        "type": "object",
        "required": ["schema_version", "ref", "position", "classification", "significance", "readings"],
        "properties": {
            "schema_version": { "type": "string" },
            "ref": { "type": "string" },
            "position": { "type": "integer" },
            "classification": { "type": "string" },
            "significance": { "type": "string" },
            "readings": { "type": "array", "minItems": 1 },
            "acknowledged": { "type": "boolean" }
        }
    })
}

fn translation_schema() -> Value {
    json!({
        "type": "object",
        "required": ["schema_version", "reference", "verse_id", "mode", "spine_text", "confidence"],
        "properties": {
            "schema_version": { "type": "string" },
            "reference": { "type": "string" },
            "verse_id": { "type": "string" },
            "mode": { "type": "string" },
            "spine_text": { "type": "string" },
            "variant_count": { "type": "integer" },
            "claims": { "type": "array" },
            "confidence": { "type": "object" },
            "provenance": { "type": "object" }
        }
    })
}

fn citations_schema() -> Value {
    json!({
        "type": "object",
        "required": ["schema_version", "generated_at", "packs"],
        "properties": {
            "schema_version": { "type": "string" },
            "generated_at": { "type": "string" },
            "packs": { "type": "array" }
        }
    })
}

fn quote_schema() -> Value {
    json!({
        "type": "object",
        "required": ["schema_version", "reference", "mode", "gate_status", "generated_at"],
        "properties": {
            "schema_version": { "type": "string" },
            "reference": { "type": "string" },
            "mode": { "type": "string" },
            "gate_status": { "type": "string" },
            "generated_at": { "type": "string" },
            "translation_text": { "type": ["string", "null"] },
            "required_acks": { "type": "array" },
            "escalation_target_mode": { "type": ["string", "null"] }
        }
    })
}

fn dossier_schema() -> Value {
    json!({
        "type": "object",
        "required": ["schema_version", "reference", "scope", "generated_at", "spine", "variants", "provenance"],
        "properties": {
            "schema_version": { "type": "string" },
            "reference": { "type": "string" },
            "scope": { "type": "string" },
            "generated_at": { "type": "string" },
            "spine": { "type": "object" },
            "variants": { "type": "array" },
            "provenance": { "type": "object" }
        }
    })
}

fn snapshot_schema() -> Value {
    json!({
        "type": "object",
        "required": ["schema_version", "tool_version", "generated_at", "packs", "export_hashes", "schema_versions"],
        "properties": {
            "schema_version": { "type": "string" },
            "tool_version": { "type": "string" },
            "generated_at": { "type": "string" },
            "git_commit": { "type": ["string", "null"] },
            "packs": { "type": "array" },
            "export_hashes": { "type": "object" },
            "schema_versions": { "type": "object" },
            "lockfile_hash": { "type": ["string", "null"] }
        }
    })
}

fn lockfile_schema() -> Value {
    json!({
        "type": "object",
        "required": ["schema_version", "tool_version", "generated_at", "packs"],
        "properties": {
            "schema_version": { "type": "string" },
            "tool_version": { "type": "string" },
            "generated_at": { "type": "string" },
            "packs": { "type": "array" },
            "lockfile_hash": { "type": ["string", "null"] }
        }
    })
}

fn manifest_schema() -> Value {
    json!({
        "type": "object",
        "required": ["schema_version", "tool_version", "created_utc", "lockfile_hash", "snapshot_hash", "artifacts", "content_hash"],
        "properties": {
            "schema_version": { "type": "string" },
            "tool_version": { "type": "string" },
            "created_utc": { "type": "string" },
            "lockfile_hash": { "type": "string" },
            "snapshot_hash": { "type": "string" },
            "artifacts": { "type": "array" },
            "content_hash": { "type": "string" },
            "schemas_included": { "type": "boolean" }
        }
    })
}
