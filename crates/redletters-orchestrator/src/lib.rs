//! Pipeline orchestrator: `translate_passage`.
//!
//! Wires together the spine, variant store, and gate ledger behind a
//! single entry point that returns a `Response` sum type — `Translation |
//! Gate` — rather than raising to signal a gate. Gate checks always
//! precede the translator invocation; claim-type mode enforcement always
//! precedes response construction.

pub mod reference;
pub mod types;

pub use reference::{parse_reference, BadReference, ParsedReference};
pub use types::{
    Claim, Confidence, ConfidenceStrategy, GateKind, GateResponse, Mode, Provenance,
    ReceiptsSummary, Response, TranslateResponse, TranslationContext, TranslationDraft,
    Translator, VariantView, VerseBlock, ESCALATION_CLAIM_TYPE,
};

use chrono::Utc;

use redletters_gate::GateLedger;
use redletters_spine::SpineProvider;
use redletters_utils::error::{ErrorCategory, UserFriendlyError};
use redletters_utils::VerseId;
use redletters_variants::{Significance, StoreError, VariantStore, VariantUnit};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    BadReference(#[from] BadReference),
    #[error(
        "verse not found in spine: {0}\n\nThe installed spine does not contain this verse; check the reference."
    )]
    VerseNotFound(VerseId),
    #[error(transparent)]
    Spine(#[from] redletters_spine::SpineError),
    #[error(transparent)]
    Variant(#[from] StoreError),
    #[error(transparent)]
    Gate(#[from] redletters_gate::GateStoreError),
}

impl UserFriendlyError for OrchestratorError {
    fn category(&self) -> ErrorCategory {
        match self {
            OrchestratorError::BadReference(_) => ErrorCategory::UserInput,
            OrchestratorError::VerseNotFound(_) => ErrorCategory::DataAvailability,
            OrchestratorError::Spine(redletters_spine::SpineError::NotInstalled { .. }) => {
                ErrorCategory::DataAvailability
            }
            OrchestratorError::Spine(_) | OrchestratorError::Variant(_) | OrchestratorError::Gate(_) => {
                ErrorCategory::Internal
            }
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            OrchestratorError::BadReference(_) => {
                vec!["use `Book C:V`, `Book C:V-V2`, or canonical `Book.Chapter.Verse` form".to_string()]
            }
            _ => Vec::new(),
        }
    }
}

/// `translate_passage(reference, mode, session_id, options, translator) →
/// TranslateResponse | GateResponse`.
#[allow(clippy::too_many_arguments)]
pub fn translate_passage(
    reference: &str,
    mode: Mode,
    session_id: &str,
    options: serde_json::Map<String, serde_json::Value>,
    lexicon_packs: &[String],
    spine: &dyn SpineProvider,
    variant_store: &VariantStore,
    gate_ledger: &GateLedger,
    translator: &dyn Translator,
    confidence_strategy: &dyn ConfidenceStrategy,
) -> Result<Response, OrchestratorError> {
    // Step 1: parse the reference.
    let parsed = parse_reference(reference)?;

    // Step 2: load spine text/tokens per verse.
    let mut verse_texts = Vec::with_capacity(parsed.verse_ids.len());
    for verse_id in &parsed.verse_ids {
        let text = spine
            .get_verse_text(verse_id)?
            .ok_or_else(|| OrchestratorError::VerseNotFound(verse_id.clone()))?;
        verse_texts.push(text);
    }

    // Step 3: collect variants and required acknowledgements.
    let session_state = gate_ledger.load_session_state(session_id)?;
    let mut per_verse_variants: Vec<(VerseId, Vec<VariantUnit>)> = Vec::with_capacity(parsed.verse_ids.len());
    let mut required_acks = Vec::new();
    let mut gating_readings = Vec::new();
    let mut options_list = Vec::new();

    for verse_id in &parsed.verse_ids {
        let variants = variant_store.list_by_verse(verse_id)?;
        for variant in &variants {
            if variant.significance.requires_ack() && !session_state.is_acked(verse_id) {
                required_acks.push(verse_id.clone());
                gating_readings.push(variant.clone());
                for (idx, _) in variant.readings.iter().enumerate() {
                    options_list.push(format!("{verse_id}:{idx}"));
                }
            }
        }
        per_verse_variants.push((verse_id.clone(), variants));
    }
    required_acks.sort();
    required_acks.dedup();
    gating_readings.sort_by(|a, b| (&a.ref_, a.position).cmp(&(&b.ref_, b.position)));

    // Step 4: gate on pending significant/major acknowledgements.
    if !required_acks.is_empty() {
        return Ok(Response::Gate(GateResponse {
            kind: GateKind::Variant,
            reference: parsed.normalized_ref.clone(),
            required_acks,
            readings: gating_readings,
            options: options_list,
            escalation_target_mode: None,
        }));
    }

    // Step 5: invoke the translator.
    let combined_spine_text = verse_texts.iter().map(|v| v.text.as_str()).collect::<Vec<_>>().join(" ");
    let all_tokens: Vec<_> = verse_texts.iter().flat_map(|v| v.tokens.clone()).collect();
    let all_variants: Vec<VariantUnit> = per_verse_variants.iter().flat_map(|(_, vs)| vs.clone()).collect();

    let context = TranslationContext {
        reference: parsed.normalized_ref.clone(),
        mode,
        tokens: all_tokens,
        variants: all_variants.clone(),
        session_id: session_id.to_string(),
        options,
    };
    let draft = translator.translate(&combined_spine_text, &context);

    // Step 6: mode-enforcement on claim types — gate ordering precedes
    // response construction.
    if mode == Mode::Readable {
        if let Some(claim) = draft.claims.iter().find(|c| c.claim_type >= ESCALATION_CLAIM_TYPE) {
            let _ = claim;
            return Ok(Response::Gate(GateResponse {
                kind: GateKind::Escalation,
                reference: parsed.normalized_ref.clone(),
                required_acks: Vec::new(),
                readings: Vec::new(),
                options: Vec::new(),
                escalation_target_mode: Some(Mode::Traceable),
            }));
        }
    }

    // Step 7: layered confidence.
    let confidence = confidence_strategy.score(&draft, &context);

    // Step 8: compose the response.
    let verses = per_verse_variants
        .into_iter()
        .zip(verse_texts.iter())
        .map(|((verse_id, variants), verse_text)| VerseBlock {
            verse_id: verse_id.clone(),
            spine_text: verse_text.text.clone(),
            variants: variants
                .into_iter()
                .map(|variant| {
                    let acknowledged_reading = session_state.acked_variants.get(&verse_id).copied();
                    VariantView { variant, acknowledged_reading }
                })
                .collect(),
        })
        .collect();

    let gates_satisfied: Vec<String> = parsed
        .verse_ids
        .iter()
        .filter(|v| session_state.is_acked(v))
        .map(|v| v.to_string())
        .collect();

    Ok(Response::Translation(TranslateResponse {
        reference: parsed.normalized_ref,
        mode,
        verses,
        combined_spine_text,
        claims: draft.claims,
        confidence,
        provenance: Provenance { spine_source: spine.source_key().to_string(), lexicon_packs: lexicon_packs.to_vec() },
        receipts: ReceiptsSummary {
            checks_run: vec!["gate_check".to_string(), "mode_enforcement".to_string()],
            gates_satisfied,
            gates_pending: Vec::new(),
            timestamp: Utc::now(),
        },
    }))
}

/// A deterministic [`Translator`] for tests: emits one descriptive claim
/// (type 0) plus one claim per requested type in `claim_types`, in order.
/// Mirrors `FakeTranslator`'s scenario-selection role in the reference
/// implementation without depending on any real translation logic.
pub struct FixtureTranslator {
    pub claim_types: Vec<u8>,
}

impl FixtureTranslator {
    #[must_use]
    pub fn new(claim_types: Vec<u8>) -> Self {
        Self { claim_types }
    }
}

impl Translator for FixtureTranslator {
    fn translate(&self, spine_text: &str, _context: &TranslationContext) -> TranslationDraft {
        let claims = self
            .claim_types
            .iter()
            .map(|&claim_type| Claim {
                content: format!("claim of type {claim_type}"),
                claim_type,
                dependencies: Vec::new(),
            })
            .collect();
        TranslationDraft {
            translation_text: format!("[gloss of: {spine_text}]"),
            claims,
            notes: vec!["FixtureTranslator".to_string()],
        }
    }
}

/// A fixed-score [`ConfidenceStrategy`] for tests and as a safe default.
pub struct FixedConfidenceStrategy(pub Confidence);

impl ConfidenceStrategy for FixedConfidenceStrategy {
    fn score(&self, _draft: &TranslationDraft, _context: &TranslationContext) -> Confidence {
        self.0
    }
}

impl Default for FixedConfidenceStrategy {
    fn default() -> Self {
        Self(Confidence { textual: 1.0, grammatical: 0.8, lexical: 0.8, interpretive: 0.6 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redletters_spine::FixtureSpineProvider;
    use redletters_variants::{Classification, Reason, WitnessReading, WitnessSupport, WitnessType};

    fn john_1_18() -> VerseId {
        "John.1.18".parse().unwrap()
    }

    fn spine() -> FixtureSpineProvider {
        FixtureSpineProvider::new("sblgnt").with_verse(john_1_18(), "ὁ μονογενὴς θεός")
    }

    fn major_variant() -> VariantUnit {
        VariantUnit {
            ref_: john_1_18(),
            position: 0,
            classification: Classification::Substitution,
            significance: Significance::Major,
            sblgnt_reading_index: 0,
            readings: vec![
                WitnessReading {
                    surface_text: "ὁ μονογενὴς θεός".to_string(),
                    normalized_text: "ο μονογενης θεος".to_string(),
                    notes: "spine".to_string(),
                    source_pack_id: None,
                    support_set: vec![WitnessSupport {
                        siglum: "SBLGNT".to_string(),
                        witness_type: WitnessType::Edition,
                        source_pack_id: "sblgnt".to_string(),
                        century_range: Some((21, 21)),
                    }],
                },
                WitnessReading {
                    surface_text: "ὁ μονογενὴς υἱός".to_string(),
                    normalized_text: "ο μονογενης υιος".to_string(),
                    notes: "From WH".to_string(),
                    source_pack_id: Some("wh".to_string()),
                    support_set: vec![WitnessSupport {
                        siglum: "WH".to_string(),
                        witness_type: WitnessType::Edition,
                        source_pack_id: "wh".to_string(),
                        century_range: Some((19, 19)),
                    }],
                },
            ],
            reason: Reason {
                code: "theological_keyword".to_string(),
                summary: "Theological term change (Son)".to_string(),
                detail: String::new(),
            },
            source_pack_id: None,
        }
    }

    #[test]
    fn gates_on_unacknowledged_major_variant() {
        let spine = spine();
        let mut store = VariantStore::open_in_memory().unwrap();
        store.save_variant(&major_variant()).unwrap();
        let gate = GateLedger::open_in_memory().unwrap();
        let translator = FixtureTranslator::new(vec![0]);
        let confidence = FixedConfidenceStrategy::default();

        let response = translate_passage(
            "John 1:18",
            Mode::Readable,
            "s1",
            serde_json::Map::new(),
            &[],
            &spine,
            &store,
            &gate,
            &translator,
            &confidence,
        )
        .unwrap();

        match response {
            Response::Gate(g) => {
                assert_eq!(g.kind, GateKind::Variant);
                assert_eq!(g.required_acks, vec![john_1_18()]);
            }
            Response::Translation(_) => panic!("expected a gate response"),
        }
    }

    #[test]
    fn acknowledged_variant_unblocks_translation() {
        let spine = spine();
        let mut store = VariantStore::open_in_memory().unwrap();
        store.save_variant(&major_variant()).unwrap();
        let gate = GateLedger::open_in_memory().unwrap();
        gate.acknowledge_variant("s1", &john_1_18(), 0, "cli-ack").unwrap();
        let translator = FixtureTranslator::new(vec![0]);
        let confidence = FixedConfidenceStrategy::default();

        let response = translate_passage(
            "John 1:18",
            Mode::Readable,
            "s1",
            serde_json::Map::new(),
            &[],
            &spine,
            &store,
            &gate,
            &translator,
            &confidence,
        )
        .unwrap();

        match response {
            Response::Translation(t) => {
                assert_eq!(t.verses[0].variants[0].acknowledged_reading, Some(0));
            }
            Response::Gate(_) => panic!("expected a translation response"),
        }
    }

    #[test]
    fn readable_mode_escalates_on_high_claim_type() {
        let spine = spine();
        let store = VariantStore::open_in_memory().unwrap();
        let gate = GateLedger::open_in_memory().unwrap();
        let translator = FixtureTranslator::new(vec![0, 6]);
        let confidence = FixedConfidenceStrategy::default();

        let response = translate_passage(
            "John 1:18",
            Mode::Readable,
            "s1",
            serde_json::Map::new(),
            &[],
            &spine,
            &store,
            &gate,
            &translator,
            &confidence,
        )
        .unwrap();

        match response {
            Response::Gate(g) => {
                assert_eq!(g.kind, GateKind::Escalation);
                assert_eq!(g.escalation_target_mode, Some(Mode::Traceable));
            }
            Response::Translation(_) => panic!("expected an escalation gate"),
        }
    }

    #[test]
    fn traceable_mode_allows_all_claim_types() {
        let spine = spine();
        let store = VariantStore::open_in_memory().unwrap();
        let gate = GateLedger::open_in_memory().unwrap();
        let translator = FixtureTranslator::new(vec![0, 6]);
        let confidence = FixedConfidenceStrategy::default();

        let response = translate_passage(
            "John 1:18",
            Mode::Traceable,
            "s1",
            serde_json::Map::new(),
            &[],
            &spine,
            &store,
            &gate,
            &translator,
            &confidence,
        )
        .unwrap();

        assert!(matches!(response, Response::Translation(_)));
    }

    #[test]
    fn multi_verse_range_lists_both_verse_ids() {
        let spine = FixtureSpineProvider::new("sblgnt")
            .with_verse(john_1_18(), "ὁ μονογενὴς θεός")
            .with_verse("John.1.19".parse().unwrap(), "καὶ αὕτη ἐστὶν ἡ μαρτυρία");
        let store = VariantStore::open_in_memory().unwrap();
        let gate = GateLedger::open_in_memory().unwrap();
        let translator = FixtureTranslator::new(vec![0]);
        let confidence = FixedConfidenceStrategy::default();

        let response = translate_passage(
            "John 1:18-19",
            Mode::Readable,
            "s2",
            serde_json::Map::new(),
            &[],
            &spine,
            &store,
            &gate,
            &translator,
            &confidence,
        )
        .unwrap();

        match response {
            Response::Translation(t) => assert_eq!(t.verses.len(), 2),
            Response::Gate(_) => panic!("expected a translation response"),
        }
    }

    #[test]
    fn bad_reference_is_rejected() {
        let spine = spine();
        let store = VariantStore::open_in_memory().unwrap();
        let gate = GateLedger::open_in_memory().unwrap();
        let translator = FixtureTranslator::new(vec![0]);
        let confidence = FixedConfidenceStrategy::default();

        let err = translate_passage(
            "not a reference",
            Mode::Readable,
            "s1",
            serde_json::Map::new(),
            &[],
            &spine,
            &store,
            &gate,
            &translator,
            &confidence,
        )
        .unwrap_err();
        assert!(matches!(err, OrchestratorError::BadReference(_)));
    }
}
