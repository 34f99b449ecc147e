//! File writers: one function per artifact type, each returning a
//! [`redletters_receipt::Artifact`] describing what landed on disk. All writes go through
//! `redletters_utils::atomic_write` so a crash mid-export never leaves a
//! torn file; determinism (same input → same `sha256`) comes entirely from
//! `canonical_json`.

use camino::Utf8Path;
use chrono::Utc;

use redletters_catalog::InstalledPack;
use redletters_orchestrator::{GateKind, GateResponse, Mode, Response, TranslateResponse, VerseBlock};
use redletters_utils::atomic_write::write_file_atomic;
use redletters_utils::{canonical_json, content_hash};
use redletters_receipt::{Artifact, ArtifactKind, ArtifactStatus};

use crate::dossier::build_dossier;
use crate::types::{
    ApparatusRecord, CitationEntry, CitationsDocument, Dossier, GateStatus, QuoteDocument,
    TranslationRecord, CITATIONS_SCHEMA_VERSION, QUOTE_SCHEMA_VERSION, TRANSLATION_SCHEMA_VERSION,
};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Hash(#[from] redletters_utils::HashError),
    #[error(transparent)]
    Write(#[from] redletters_utils::atomic_write::AtomicWriteError),
}

fn artifact_for(name: &str, path: &Utf8Path, bytes: &[u8]) -> Artifact {
    Artifact {
        name: name.to_string(),
        path: path.to_string(),
        artifact_type: ArtifactKind::Output,
        size_bytes: bytes.len() as u64,
        sha256: content_hash(bytes),
        status: ArtifactStatus::Complete,
        created_at: Utc::now(),
        verified_at: None,
    }
}

/// Serialize `lines` as one canonical-JSON object per line (JSONL), write
/// atomically, and return the resulting artifact.
fn write_jsonl<T: serde::Serialize>(
    name: &str,
    path: &Utf8Path,
    lines: &[T],
) -> Result<Artifact, ExportError> {
    let mut buf = Vec::new();
    for line in lines {
        buf.extend_from_slice(&canonical_json(line)?);
        buf.push(b'\n');
    }
    write_file_atomic(path, &buf)?;
    Ok(artifact_for(name, path, &buf))
}

fn write_json<T: serde::Serialize>(name: &str, path: &Utf8Path, value: &T) -> Result<Artifact, ExportError> {
    let buf = canonical_json(value)?;
    write_file_atomic(path, &buf)?;
    Ok(artifact_for(name, path, &buf))
}

/// `apparatus.jsonl`: one line per variant unit across every verse in the
/// response, sorted by `(ref, position)` for determinism.
pub fn write_apparatus(path: &Utf8Path, verses: &[VerseBlock]) -> Result<Artifact, ExportError> {
    let mut records: Vec<ApparatusRecord> = verses
        .iter()
        .flat_map(|block| block.variants.iter().map(ApparatusRecord::from_variant_view))
        .collect();
    records.sort_by(|a, b| (&a.ref_, a.position).cmp(&(&b.ref_, b.position)));
    write_jsonl("apparatus.jsonl", path, &records)
}

/// `translation.jsonl`: one line per verse, each carrying the claims,
/// confidence, and provenance that apply to the whole passage response.
pub fn write_translation(path: &Utf8Path, response: &TranslateResponse) -> Result<Artifact, ExportError> {
    let records: Vec<TranslationRecord> = response
        .verses
        .iter()
        .map(|block| TranslationRecord {
            schema_version: TRANSLATION_SCHEMA_VERSION.to_string(),
            reference: response.reference.clone(),
            verse_id: block.verse_id.clone(),
            mode: response.mode,
            spine_text: block.spine_text.clone(),
            variant_count: block.variants.len(),
            claims: response.claims.clone(),
            confidence: response.confidence,
            provenance: response.provenance.clone(),
        })
        .collect();
    write_jsonl("translation.jsonl", path, &records)
}

/// `citations.json`: bibliography of every installed pack consulted.
pub fn write_citations(path: &Utf8Path, packs: &[InstalledPack]) -> Result<Artifact, ExportError> {
    let mut entries: Vec<CitationEntry> = packs
        .iter()
        .map(|installed| CitationEntry {
            pack_id: installed.pack.pack_id.to_string(),
            name: installed.pack.name.clone(),
            version: installed.pack.version.clone(),
            license: installed.pack.license.clone(),
            source_title: installed.pack.citation.source_title.clone(),
            edition: installed.pack.citation.edition.clone(),
            publisher: installed.pack.citation.publisher.clone(),
            year: installed.pack.citation.year.clone(),
            license_url: installed.pack.citation.license_url.clone(),
        })
        .collect();
    entries.sort_by(|a, b| a.pack_id.cmp(&b.pack_id));

    let document = CitationsDocument {
        schema_version: CITATIONS_SCHEMA_VERSION.to_string(),
        generated_at: Utc::now(),
        packs: entries,
    };
    write_json("citations.json", path, &document)
}

/// `quote.json`: a short-form citable excerpt, or the gate disposition if
/// the pipeline never reached a translation.
pub fn write_quote(path: &Utf8Path, response: &Response, mode: Mode) -> Result<Artifact, ExportError> {
    let document = match response {
        Response::Translation(t) => QuoteDocument {
            schema_version: QUOTE_SCHEMA_VERSION.to_string(),
            reference: t.reference.clone(),
            mode: t.mode,
            gate_status: GateStatus::Satisfied,
            generated_at: Utc::now(),
            translation_text: Some(t.combined_spine_text.clone()),
            required_acks: Vec::new(),
            escalation_target_mode: None,
        },
        Response::Gate(GateResponse { kind: GateKind::Variant, reference, required_acks, .. }) => QuoteDocument {
            schema_version: QUOTE_SCHEMA_VERSION.to_string(),
            reference: reference.clone(),
            mode,
            gate_status: GateStatus::VariantBlocked,
            generated_at: Utc::now(),
            translation_text: None,
            required_acks: required_acks.clone(),
            escalation_target_mode: None,
        },
        Response::Gate(GateResponse { kind: GateKind::Escalation, reference, escalation_target_mode, .. }) => {
            QuoteDocument {
                schema_version: QUOTE_SCHEMA_VERSION.to_string(),
                reference: reference.clone(),
                mode,
                gate_status: GateStatus::EscalationBlocked,
                generated_at: Utc::now(),
                translation_text: None,
                required_acks: Vec::new(),
                escalation_target_mode: *escalation_target_mode,
            }
        }
    };
    write_json("quote.json", path, &document)
}

/// `dossier.json`: per-reference variant aggregation with witness support
/// and evidence-class labelling.
pub fn write_dossier(
    path: &Utf8Path,
    reference: &str,
    scope: &str,
    spine_source_id: &str,
    verses: &[VerseBlock],
    session_id: &str,
) -> Result<(Dossier, Artifact), ExportError> {
    let dossier = build_dossier(reference, scope, spine_source_id, verses, session_id);
    let artifact = write_json("dossier.json", path, &dossier)?;
    Ok((dossier, artifact))
}
