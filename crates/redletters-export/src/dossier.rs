//! Dossier assembly: flatten every variant across the requested verses, attach a
//! `support_summary`/`evidence_class` to each reading, and record the
//! acknowledgement state the gate ledger already resolved into `VariantView`.

use chrono::Utc;

use redletters_orchestrator::VerseBlock;

use crate::support::{compute_support_summary, determine_evidence_class};
use crate::types::{
    Dossier, DossierAcknowledgement, DossierProvenance, DossierReading, DossierReason,
    DossierSpine, DossierVariant, DossierWitness, DOSSIER_SCHEMA_VERSION,
};

#[must_use]
pub fn build_dossier(
    reference: &str,
    scope: &str,
    spine_source_id: &str,
    verses: &[VerseBlock],
    session_id: &str,
) -> Dossier {
    let mut comparative_packs: Vec<String> = Vec::new();
    let mut variants: Vec<DossierVariant> = Vec::new();

    for block in verses {
        for view in &block.variants {
            let variant = &view.variant;
            let readings: Vec<DossierReading> = variant
                .readings
                .iter()
                .enumerate()
                .map(|(index, reading)| {
                    let support_summary = compute_support_summary(&reading.support_set);
                    let evidence_class = determine_evidence_class(&support_summary).to_string();

                    let mut source_packs: Vec<String> = reading.source_pack_id.iter().cloned().collect();
                    for support in &reading.support_set {
                        if !source_packs.contains(&support.source_pack_id) {
                            source_packs.push(support.source_pack_id.clone());
                        }
                        if !comparative_packs.contains(&support.source_pack_id) {
                            comparative_packs.push(support.source_pack_id.clone());
                        }
                    }
                    source_packs.sort();

                    DossierReading {
                        index,
                        text: reading.surface_text.clone(),
                        is_spine: index == variant.sblgnt_reading_index,
                        witnesses: reading
                            .support_set
                            .iter()
                            .map(|support| DossierWitness {
                                siglum: support.siglum.clone(),
                                witness_type: support.witness_type.as_str().to_string(),
                                century_range: support.century_range,
                            })
                            .collect(),
                        source_packs,
                        support_summary,
                        evidence_class,
                    }
                })
                .collect();

            variants.push(DossierVariant {
                ref_: variant.ref_.clone(),
                position: variant.position,
                classification: variant.classification.as_str().to_string(),
                significance: variant.significance.as_str().to_string(),
                reason: DossierReason {
                    code: variant.reason.code.clone(),
                    summary: variant.reason.summary.clone(),
                    detail: variant.reason.detail.clone(),
                },
                readings,
                acknowledgement: DossierAcknowledgement {
                    required: variant.significance.requires_ack(),
                    acknowledged: view.is_acknowledged(),
                    acknowledged_reading: view.acknowledged_reading,
                    session_id: session_id.to_string(),
                },
            });
        }
    }

    variants.sort_by(|a, b| (&a.ref_, a.position).cmp(&(&b.ref_, b.position)));
    comparative_packs.sort();

    Dossier {
        schema_version: DOSSIER_SCHEMA_VERSION.to_string(),
        reference: reference.to_string(),
        scope: scope.to_string(),
        generated_at: Utc::now(),
        spine: DossierSpine { source_id: spine_source_id.to_string(), is_default: true },
        variants,
        provenance: DossierProvenance {
            spine_source: spine_source_id.to_string(),
            comparative_packs,
            build_timestamp: Utc::now(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redletters_orchestrator::VariantView;
    use redletters_variants::{Classification, Reason, Significance, VariantUnit, WitnessReading, WitnessSupport, WitnessType};

    fn verse_id() -> redletters_utils::VerseId {
        "John.1.18".parse().unwrap()
    }

    fn sample_variant() -> VariantUnit {
        VariantUnit {
            ref_: verse_id(),
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
                        siglum: "P66".to_string(),
                        witness_type: WitnessType::Manuscript,
                        source_pack_id: "p66".to_string(),
                        century_range: Some((2, 2)),
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
    fn dossier_labels_spine_reading_and_evidence_class() {
        let block = VerseBlock {
            verse_id: verse_id(),
            spine_text: "ὁ μονογενὴς θεός".to_string(),
            variants: vec![VariantView { variant: sample_variant(), acknowledged_reading: None }],
        };
        let dossier = build_dossier("John 1:18", "John.1.18", "sblgnt", &[block], "s1");

        assert_eq!(dossier.variants.len(), 1);
        let variant = &dossier.variants[0];
        assert!(variant.readings[0].is_spine);
        assert_eq!(variant.readings[0].evidence_class, "edition-level evidence");
        assert_eq!(variant.readings[1].evidence_class, "manuscript-level evidence");
        assert!(variant.acknowledgement.required);
        assert!(!variant.acknowledgement.acknowledged);
        assert_eq!(variant.acknowledgement.acknowledged_reading, None);
    }

    #[test]
    fn comparative_packs_collect_every_support_pack() {
        let block = VerseBlock {
            verse_id: verse_id(),
            spine_text: "ὁ μονογενὴς θεός".to_string(),
            variants: vec![VariantView { variant: sample_variant(), acknowledged_reading: Some(1) }],
        };
        let dossier = build_dossier("John 1:18", "John.1.18", "sblgnt", &[block], "s1");
        assert_eq!(dossier.provenance.comparative_packs, vec!["p66".to_string(), "sblgnt".to_string()]);
        assert_eq!(dossier.variants[0].acknowledgement.acknowledged_reading, Some(1));
    }
}
