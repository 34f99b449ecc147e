//! Exporters and dossier aggregation.
//!
//! Each function here writes exactly one artifact type — `apparatus.jsonl`,
//! `translation.jsonl`, `citations.json`, `quote.json`, `dossier.json` — and
//! returns a [`redletters_receipt::Artifact`] for the caller to fold into a
//! receipt, snapshot, or bundle manifest. All of it flows through canonical
//! JSON, so the same input always produces the same `sha256`.

pub mod dossier;
pub mod support;
pub mod types;
pub mod writers;

pub use dossier::build_dossier;
pub use support::{compute_support_summary, determine_evidence_class};
pub use types::{
    ApparatusRecord, CitationEntry, CitationsDocument, Dossier, DossierAcknowledgement,
    DossierProvenance, DossierReading, DossierReason, DossierSpine, DossierVariant, DossierWitness,
    GateStatus, QuoteDocument, SupportSummary, TranslationRecord, TypeSummary,
    APPARATUS_SCHEMA_VERSION, CITATIONS_SCHEMA_VERSION, DOSSIER_SCHEMA_VERSION,
    QUOTE_SCHEMA_VERSION, TRANSLATION_SCHEMA_VERSION,
};
pub use writers::{
    write_apparatus, write_citations, write_dossier, write_quote, write_translation, ExportError,
};
