//! `support_summary` / `evidence_class` computation.
//!
//! `determine_evidence_class`: manuscript support always wins the label
//! even when mixed with other types, editions/tradition/other only produce
//! their own label when they are the *sole* type present, and an empty
//! support set is its own case rather than falling into "mixed". These are
//! descriptive labels — never an implicit epistemic ranking.

use std::collections::BTreeMap;

use redletters_variants::{WitnessSupport, WitnessType};

use crate::types::{SupportSummary, TypeSummary};

/// Build the `support_summary` for one reading from its witness set.
#[must_use]
pub fn compute_support_summary(support_set: &[WitnessSupport]) -> SupportSummary {
    let mut by_type: BTreeMap<String, TypeSummary> = BTreeMap::new();
    let mut earliest_century: Option<i32> = None;
    let mut packs: Vec<String> = Vec::new();

    for support in support_set {
        let entry = by_type.entry(support.witness_type.as_str().to_string()).or_default();
        entry.count += 1;
        entry.sigla.push(support.siglum.clone());
        if let Some((start, _end)) = support.century_range {
            entry.century_range = Some(merge_range(entry.century_range, support.century_range));
            earliest_century = Some(earliest_century.map_or(start, |e| e.min(start)));
        }
        if !packs.contains(&support.source_pack_id) {
            packs.push(support.source_pack_id.clone());
        }
    }

    for summary in by_type.values_mut() {
        summary.sigla.sort();
        summary.sigla.dedup();
    }
    packs.sort();

    SupportSummary {
        total_count: support_set.len(),
        by_type,
        earliest_century,
        provenance_packs: packs,
    }
}

fn merge_range(existing: Option<(i32, i32)>, new: Option<(i32, i32)>) -> (i32, i32) {
    match (existing, new) {
        (Some((a_start, a_end)), Some((b_start, b_end))) => (a_start.min(b_start), a_end.max(b_end)),
        (Some(r), None) | (None, Some(r)) => r,
        (None, None) => (0, 0),
    }
}

/// Descriptive evidence-class label for a `support_summary`.
#[must_use]
pub fn determine_evidence_class(summary: &SupportSummary) -> &'static str {
    if summary.by_type.is_empty() {
        return "no recorded support";
    }

    let manuscript = WitnessType::Manuscript.as_str();
    let edition = WitnessType::Edition.as_str();
    let tradition = WitnessType::Tradition.as_str();
    let other = WitnessType::Other.as_str();

    if summary.by_type.contains_key(manuscript) {
        return "manuscript-level evidence";
    }

    let types_present: Vec<&str> = summary.by_type.keys().map(String::as_str).collect();
    match types_present.as_slice() {
        [single] if *single == edition => "edition-level evidence",
        [single] if *single == tradition => "tradition aggregate",
        [single] if *single == other => "secondary evidence",
        _ => "mixed evidence",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn support(witness_type: WitnessType, siglum: &str, pack: &str, century: Option<(i32, i32)>) -> WitnessSupport {
        WitnessSupport {
            siglum: siglum.to_string(),
            witness_type,
            source_pack_id: pack.to_string(),
            century_range: century,
        }
    }

    #[test]
    fn empty_support_is_no_recorded_support() {
        let summary = compute_support_summary(&[]);
        assert_eq!(determine_evidence_class(&summary), "no recorded support");
    }

    #[test]
    fn editions_only_is_edition_level() {
        let support_set = vec![support(WitnessType::Edition, "SBLGNT", "sblgnt", Some((21, 21)))];
        let summary = compute_support_summary(&support_set);
        assert_eq!(determine_evidence_class(&summary), "edition-level evidence");
        assert_eq!(summary.earliest_century, Some(21));
    }

    #[test]
    fn manuscripts_only_is_manuscript_level() {
        let support_set = vec![support(WitnessType::Manuscript, "P66", "p66", Some((2, 2)))];
        let summary = compute_support_summary(&support_set);
        assert_eq!(determine_evidence_class(&summary), "manuscript-level evidence");
    }

    #[test]
    fn manuscript_mixed_with_edition_still_manuscript_level() {
        let support_set = vec![
            support(WitnessType::Manuscript, "P66", "p66", Some((2, 2))),
            support(WitnessType::Edition, "SBLGNT", "sblgnt", Some((21, 21))),
        ];
        let summary = compute_support_summary(&support_set);
        assert_eq!(determine_evidence_class(&summary), "manuscript-level evidence");
        assert_eq!(summary.earliest_century, Some(2));
    }

    #[test]
    fn tradition_only_is_tradition_aggregate() {
        let support_set = vec![support(WitnessType::Tradition, "Byz", "byz", None)];
        let summary = compute_support_summary(&support_set);
        assert_eq!(determine_evidence_class(&summary), "tradition aggregate");
    }

    #[test]
    fn other_only_is_secondary_evidence() {
        let support_set = vec![support(WitnessType::Other, "Patristic", "fathers", None)];
        let summary = compute_support_summary(&support_set);
        assert_eq!(determine_evidence_class(&summary), "secondary evidence");
    }

    #[test]
    fn edition_and_tradition_is_mixed_evidence() {
        let support_set = vec![
            support(WitnessType::Edition, "SBLGNT", "sblgnt", None),
            support(WitnessType::Tradition, "Byz", "byz", None),
        ];
        let summary = compute_support_summary(&support_set);
        assert_eq!(determine_evidence_class(&summary), "mixed evidence");
    }

    #[test]
    fn provenance_packs_are_deduplicated_and_sorted() {
        let support_set = vec![
            support(WitnessType::Edition, "A", "zeta", None),
            support(WitnessType::Edition, "B", "alpha", None),
            support(WitnessType::Edition, "C", "alpha", None),
        ];
        let summary = compute_support_summary(&support_set);
        assert_eq!(summary.provenance_packs, vec!["alpha".to_string(), "zeta".to_string()]);
    }
}
