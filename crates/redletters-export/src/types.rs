//! Artifact shapes emitted by the exporters. Every record/document carries its own `schema_version`; cardinality
//! (JSON vs JSONL) is fixed by file type, not by caller choice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use redletters_orchestrator::{Claim, Confidence, Mode, Provenance, VariantView};
use redletters_utils::VerseId;
use redletters_variants::VariantUnit;

pub const APPARATUS_SCHEMA_VERSION: &str = "1.0.0";
pub const TRANSLATION_SCHEMA_VERSION: &str = "1.0.0";
pub const CITATIONS_SCHEMA_VERSION: &str = "1.0.0";
pub const QUOTE_SCHEMA_VERSION: &str = "1.0.0";
pub const DOSSIER_SCHEMA_VERSION: &str = "1.0.0";

/// One line of `apparatus.jsonl`: a single variant unit, spine-relative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApparatusRecord {
    pub schema_version: String,
    #[serde(rename = "ref")]
    pub ref_: VerseId,
    pub position: i32,
    pub classification: String,
    pub significance: String,
    pub reason: redletters_variants::Reason,
    pub readings: Vec<redletters_variants::WitnessReading>,
    pub acknowledged: bool,
}

impl ApparatusRecord {
    #[must_use]
    pub fn from_variant_view(view: &VariantView) -> Self {
        let v: &VariantUnit = &view.variant;
        Self {
            schema_version: APPARATUS_SCHEMA_VERSION.to_string(),
            ref_: v.ref_.clone(),
            position: v.position,
            classification: v.classification.as_str().to_string(),
            significance: v.significance.as_str().to_string(),
            reason: v.reason.clone(),
            readings: v.readings.clone(),
            acknowledged: view.is_acknowledged(),
        }
    }
}

/// One line of `translation.jsonl`: one verse's translated text plus the
/// claims/confidence/provenance that apply to the whole response
/// (repeated per line, mirroring `apparatus.jsonl`'s one-row-per-variant
/// shape rather than nesting verses under a single document).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub schema_version: String,
    pub reference: String,
    pub verse_id: VerseId,
    pub mode: Mode,
    pub spine_text: String,
    pub variant_count: usize,
    pub claims: Vec<Claim>,
    pub confidence: Confidence,
    pub provenance: Provenance,
}

/// `citations.json`: the bibliography of every pack consulted for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationsDocument {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub packs: Vec<CitationEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationEntry {
    pub pack_id: String,
    pub name: String,
    pub version: String,
    pub license: String,
    pub source_title: String,
    pub edition: String,
    pub publisher: String,
    pub year: String,
    pub license_url: String,
}

/// `quote.json`: a short-form citable excerpt, with the `gate_status` key
/// the output validator uses for autodetection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteDocument {
    pub schema_version: String,
    pub reference: String,
    pub mode: Mode,
    pub gate_status: GateStatus,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation_text: Option<String>,
    #[serde(default)]
    pub required_acks: Vec<VerseId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_target_mode: Option<Mode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Satisfied,
    VariantBlocked,
    EscalationBlocked,
}

/// Per-witness-type rollup inside a variant's `support_summary`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeSummary {
    pub count: usize,
    pub sigla: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub century_range: Option<(i32, i32)>,
}

/// `support_summary` for one variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupportSummary {
    pub total_count: usize,
    pub by_type: std::collections::BTreeMap<String, TypeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earliest_century: Option<i32>,
    pub provenance_packs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DossierWitness {
    pub siglum: String,
    pub witness_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub century_range: Option<(i32, i32)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DossierReading {
    pub index: usize,
    pub text: String,
    pub is_spine: bool,
    pub witnesses: Vec<DossierWitness>,
    pub source_packs: Vec<String>,
    pub support_summary: SupportSummary,
    pub evidence_class: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DossierReason {
    pub code: String,
    pub summary: String,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DossierAcknowledgement {
    pub required: bool,
    pub acknowledged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_reading: Option<usize>,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DossierVariant {
    #[serde(rename = "ref")]
    pub ref_: VerseId,
    pub position: i32,
    pub classification: String,
    pub significance: String,
    pub reason: DossierReason,
    pub readings: Vec<DossierReading>,
    pub acknowledgement: DossierAcknowledgement,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DossierSpine {
    pub source_id: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DossierProvenance {
    pub spine_source: String,
    pub comparative_packs: Vec<String>,
    pub build_timestamp: DateTime<Utc>,
}

/// `dossier.json`: per-reference aggregation of the variant apparatus with
/// witness support and evidence-class labelling attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dossier {
    pub schema_version: String,
    pub reference: String,
    pub scope: String,
    pub generated_at: DateTime<Utc>,
    pub spine: DossierSpine,
    pub variants: Vec<DossierVariant>,
    pub provenance: DossierProvenance,
}
