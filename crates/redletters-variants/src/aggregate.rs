//! Multi-pack variant aggregation.
//!
//! Diffs comparative editions against the spine and folds the differences
//! into the variant store. Classification/significance/reason-code rules
//! here follow a fixed rule set (word-count-delta thresholds, a fixed
//! theological-keyword list, a function-word list); see `DESIGN.md` for
//! the note on where this diverges from a richer common-word-ratio
//! heuristic.

use std::collections::{BTreeMap, HashSet};

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use redletters_spine::SpineProvider;
use redletters_utils::VerseId;

use crate::store::{StoreError, VariantStore};
use crate::types::{
    Classification, Reason, Significance, VariantUnit, WitnessReading, WitnessSupport, WitnessType,
};

/// NFD-decompose, drop combining marks, lowercase, collapse whitespace,
/// strip punctuation. Used both to decide whether a reading differs from
/// the spine and to key merge-vs-create reading lookups.
#[must_use]
pub fn normalize_for_aggregation(text: &str) -> String {
    let decomposed: String = text.nfd().filter(|c| !is_combining_mark(*c)).collect();
    let lowered = decomposed.to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect()
}

/// Strip accents only, keep case and spacing, for keyword lookups that
/// must not also collapse whitespace/punctuation.
fn strip_accents(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

const THEOLOGICAL_TERMS: &[(&str, &str)] = &[
    ("θεος", "God"),
    ("θεου", "God"),
    ("θεον", "God"),
    ("θεω", "God"),
    ("χριστος", "Christ"),
    ("χριστου", "Christ"),
    ("χριστον", "Christ"),
    ("ιησους", "Jesus"),
    ("ιησου", "Jesus"),
    ("ιησουν", "Jesus"),
    ("κυριος", "Lord"),
    ("κυριου", "Lord"),
    ("κυριον", "Lord"),
    ("πνευμα", "Spirit"),
    ("πνευματος", "Spirit"),
    ("υιος", "Son"),
    ("υιου", "Son"),
    ("υιον", "Son"),
    ("πατηρ", "Father"),
    ("πατρος", "Father"),
    ("μονογενης", "only-begotten"),
    ("αμαρτια", "Sin"),
    ("αμαρτιας", "Sin"),
    ("πιστις", "Faith"),
    ("πιστεως", "Faith"),
];

const FUNCTION_WORDS: &[&str] = &[
    "ο", "η", "το", "τον", "την", "του", "της", "τω", "τη", "και", "δε", "γαρ", "αλλα", "ουν", "τε",
];

/// A registered comparative edition: a spine-shaped provider plus the
/// apparatus metadata attached to any reading it contributes.
pub struct Edition {
    pub key: String,
    pub provider: Box<dyn SpineProvider>,
    pub siglum: String,
    pub witness_type: WitnessType,
    pub century_range: Option<(i32, i32)>,
    pub source_pack_id: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub verses_processed: u32,
    pub variants_created: u32,
    pub variants_updated: u32,
    pub variants_unchanged: u32,
    pub errors: Vec<String>,
}

impl BuildResult {
    pub fn merge(&mut self, other: BuildResult) {
        self.verses_processed += other.verses_processed;
        self.variants_created += other.variants_created;
        self.variants_updated += other.variants_updated;
        self.variants_unchanged += other.variants_unchanged;
        self.errors.extend(other.errors);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("spine error: {0}")]
    Spine(#[from] redletters_spine::SpineError),
    #[error("cross-book ranges not supported: {start} to {end}")]
    CrossBookRange { start: String, end: String },
}

struct DifferingReading<'a> {
    edition: &'a Edition,
    text: String,
    normalized_text: String,
}

/// Builds and merges [`VariantUnit`]s by comparing registered editions
/// against the canonical spine.
pub struct VariantAggregator {
    spine: Box<dyn SpineProvider>,
    editions: Vec<Edition>,
}

impl VariantAggregator {
    #[must_use]
    pub fn new(spine: Box<dyn SpineProvider>) -> Self {
        Self { spine, editions: Vec::new() }
    }

    pub fn add_edition(&mut self, edition: Edition) {
        self.editions.push(edition);
    }

    /// Build (or merge into) the variant for a single verse, position 0.
    pub fn build_verse(&self, store: &mut VariantStore, verse_id: &VerseId) -> Result<BuildResult, AggregateError> {
        let mut result = BuildResult { verses_processed: 1, ..Default::default() };

        let Some(spine_verse) = self.spine.get_verse_text(verse_id)? else {
            result.errors.push(format!("Verse not found in spine: {verse_id}"));
            return Ok(result);
        };
        let spine_normalized = normalize_for_aggregation(&spine_verse.text);

        let mut differing = Vec::new();
        for edition in &self.editions {
            let Some(edition_verse) = edition.provider.get_verse_text(verse_id)? else {
                continue;
            };
            let normalized_text = normalize_for_aggregation(&edition_verse.text);
            if normalized_text != spine_normalized {
                differing.push(DifferingReading { edition, text: edition_verse.text, normalized_text });
            }
        }

        if differing.is_empty() {
            result.variants_unchanged = 1;
            return Ok(result);
        }

        let existing_id = store.get_id(verse_id, 0)?;

        if let Some(variant_id) = existing_id {
            let (readings_added, supports_added) =
                self.merge_into_existing(store, variant_id, &differing)?;
            if readings_added > 0 || supports_added > 0 {
                result.variants_updated = 1;
                tracing::debug!(
                    target: "redletters::variants",
                    verse = %verse_id,
                    readings_added,
                    supports_added,
                    "Merged new readings/supports into existing variant"
                );
            } else {
                result.variants_unchanged = 1;
            }
        } else {
            let variant = self.build_variant_unit(verse_id, &spine_verse.text, &spine_normalized, &differing);
            tracing::info!(
                target: "redletters::variants",
                verse = %verse_id,
                classification = ?variant.classification,
                significance = ?variant.significance,
                "Created variant unit"
            );
            store.save_variant(&variant)?;
            result.variants_created = 1;
        }

        Ok(result)
    }

    /// Build variants across an inclusive verse range within one book.
    pub fn build_range(
        &self,
        store: &mut VariantStore,
        start: &VerseId,
        end: &VerseId,
    ) -> Result<BuildResult, AggregateError> {
        if start.book != end.book {
            return Err(AggregateError::CrossBookRange { start: start.to_string(), end: end.to_string() });
        }

        let mut result = BuildResult::default();
        for chapter in start.chapter..=end.chapter {
            let v_start = if chapter == start.chapter { start.verse } else { 1 };
            let v_end = if chapter == end.chapter { end.verse } else { 200 };
            for verse in v_start..=v_end {
                let verse_id = VerseId::new(start.book.clone(), chapter, verse);
                if !self.spine.has_verse(&verse_id) {
                    continue;
                }
                let verse_result = self.build_verse(store, &verse_id)?;
                result.merge(verse_result);
            }
        }
        Ok(result)
    }

    /// Return existing variants for a verse, building them on demand if
    /// none exist yet and editions are registered.
    pub fn ensure_variants(
        &self,
        store: &mut VariantStore,
        verse_id: &VerseId,
    ) -> Result<Vec<VariantUnit>, AggregateError> {
        let existing = store.list_by_verse(verse_id)?;
        if !existing.is_empty() {
            return Ok(existing);
        }
        if !self.editions.is_empty() {
            self.build_verse(store, verse_id)?;
        }
        Ok(store.list_by_verse(verse_id)?)
    }

    fn merge_into_existing(
        &self,
        store: &mut VariantStore,
        variant_id: i64,
        differing: &[DifferingReading<'_>],
    ) -> Result<(u32, u32), AggregateError> {
        let mut readings_added = 0u32;
        let mut supports_added = 0u32;

        for reading in differing {
            let support = to_witness_support(reading.edition);
            match store.find_reading_by_normalized(variant_id, &reading.normalized_text)? {
                Some(reading_id) => {
                    if store.add_support(reading_id, &support)? {
                        supports_added += 1;
                    }
                }
                None => {
                    let new_reading = WitnessReading {
                        surface_text: reading.text.clone(),
                        normalized_text: reading.normalized_text.clone(),
                        notes: format!("From {}", reading.edition.key),
                        source_pack_id: Some(reading.edition.source_pack_id.clone()),
                        support_set: vec![support],
                    };
                    store.add_reading(variant_id, &new_reading)?;
                    readings_added += 1;
                }
            }
        }

        Ok((readings_added, supports_added))
    }

    fn build_variant_unit(
        &self,
        verse_id: &VerseId,
        spine_text: &str,
        spine_normalized: &str,
        differing: &[DifferingReading<'_>],
    ) -> VariantUnit {
        let spine_support = WitnessSupport {
            siglum: "SBLGNT".to_string(),
            witness_type: WitnessType::Edition,
            source_pack_id: "sblgnt-canonical".to_string(),
            century_range: Some((21, 21)),
        };
        let mut readings = vec![WitnessReading {
            surface_text: spine_text.to_string(),
            normalized_text: spine_normalized.to_string(),
            notes: "SBLGNT (canonical spine)".to_string(),
            source_pack_id: None,
            support_set: vec![spine_support],
        }];

        // Group differing readings by normalized text so editions sharing an
        // identical reading contribute one WitnessReading with a merged
        // support set, preserving first-seen order (BTreeMap on the
        // normalized key keeps this deterministic independent of edition
        // registration order).
        let mut grouped: BTreeMap<&str, Vec<&DifferingReading<'_>>> = BTreeMap::new();
        for reading in differing {
            grouped.entry(reading.normalized_text.as_str()).or_default().push(reading);
        }

        for (norm_text, group) in grouped {
            let mut supports = Vec::new();
            let mut seen_keys = HashSet::new();
            for r in &group {
                let key = (r.edition.siglum.clone(), r.edition.source_pack_id.clone());
                if seen_keys.insert(key) {
                    supports.push(to_witness_support(r.edition));
                }
            }

            let first = group[0];
            let mut edition_keys: Vec<&str> = group.iter().map(|r| r.edition.key.as_str()).collect();
            edition_keys.dedup();
            let notes = format!("From {}", edition_keys.join(", "));

            readings.push(WitnessReading {
                surface_text: first.text.clone(),
                normalized_text: norm_text.to_string(),
                notes,
                source_pack_id: Some(first.edition.source_pack_id.clone()),
                support_set: supports,
            });
        }

        let classification = classify_variant(spine_normalized, differing);
        let significance = determine_significance(spine_normalized, differing, classification);
        let reason = classify_reason(spine_normalized, differing, classification);

        VariantUnit {
            ref_: verse_id.clone(),
            position: 0,
            classification,
            significance,
            sblgnt_reading_index: 0,
            readings,
            reason,
            source_pack_id: None,
        }
    }
}

fn to_witness_support(edition: &Edition) -> WitnessSupport {
    WitnessSupport {
        siglum: edition.siglum.clone(),
        witness_type: edition.witness_type,
        source_pack_id: edition.source_pack_id.clone(),
        century_range: edition.century_range,
    }
}

/// Longest-common-subsequence ratio, `2*lcs / (len_a + len_b)`. Stands in
/// for `difflib.SequenceMatcher.ratio()`: not identical output, but the
/// same "how similar are these two strings" signal the 0.9 threshold below
/// relies on.
fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ai in &a {
        for (j, bj) in b.iter().enumerate() {
            curr[j + 1] = if ai == bj { prev[j] + 1 } else { prev[j + 1].max(curr[j]) };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let lcs = prev[b.len()];
    (2 * lcs) as f64 / (a.len() + b.len()) as f64
}

fn is_spelling_difference(a: &str, b: &str) -> bool {
    similarity_ratio(a, b) > 0.9
}

fn classify_variant(spine_normalized: &str, readings: &[DifferingReading<'_>]) -> Classification {
    let spine_words: Vec<&str> = spine_normalized.split_whitespace().collect();

    for reading in readings {
        let reading_words: Vec<&str> = reading.normalized_text.split_whitespace().collect();
        let word_diff = spine_words.len() as i64 - reading_words.len() as i64;

        if word_diff > 2 {
            return Classification::Omission;
        } else if word_diff < -2 {
            return Classification::Addition;
        } else if word_diff != 0 {
            let spine_set: HashSet<&str> = spine_words.iter().copied().collect();
            let reading_set: HashSet<&str> = reading_words.iter().copied().collect();
            let common = spine_set.intersection(&reading_set).count();
            if common as f64 > spine_words.len() as f64 * 0.7 {
                return if word_diff > 0 { Classification::Omission } else { Classification::Addition };
            }
            return Classification::Substitution;
        } else {
            let spine_set: HashSet<&str> = spine_words.iter().copied().collect();
            let reading_set: HashSet<&str> = reading_words.iter().copied().collect();
            if spine_set == reading_set {
                return Classification::WordOrder;
            } else if is_spelling_difference(spine_normalized, &reading.normalized_text) {
                return Classification::Spelling;
            }
            return Classification::Substitution;
        }
    }

    Classification::Substitution
}

fn theological_term_shift(spine_normalized: &str, readings: &[DifferingReading<'_>]) -> Option<(&'static str, &'static str, bool)> {
    let spine_stripped = strip_accents(spine_normalized);
    for reading in readings {
        let reading_stripped = strip_accents(&reading.normalized_text);
        for (term, meaning) in THEOLOGICAL_TERMS {
            let in_spine = spine_stripped.contains(term);
            let in_reading = reading_stripped.contains(term);
            if in_spine != in_reading {
                return Some((term, meaning, in_spine));
            }
        }
    }
    None
}

fn determine_significance(
    spine_normalized: &str,
    readings: &[DifferingReading<'_>],
    classification: Classification,
) -> Significance {
    if theological_term_shift(spine_normalized, readings).is_some() {
        return Significance::Major;
    }

    if classification == Classification::Spelling {
        return Significance::Trivial;
    }
    if classification == Classification::WordOrder {
        return Significance::Minor;
    }

    let spine_words: Vec<&str> = spine_normalized.split_whitespace().collect();
    let max_diff = readings
        .iter()
        .map(|r| {
            let reading_words: Vec<&str> = r.normalized_text.split_whitespace().collect();
            (spine_words.len() as i64 - reading_words.len() as i64).unsigned_abs()
        })
        .max()
        .unwrap_or(0);

    if max_diff >= 3 {
        return Significance::Significant;
    }

    if matches!(classification, Classification::Omission | Classification::Addition) {
        return if max_diff >= 2 { Significance::Significant } else { Significance::Minor };
    }

    Significance::Minor
}

fn classify_reason(spine_normalized: &str, readings: &[DifferingReading<'_>], classification: Classification) -> Reason {
    if let Some((term, meaning, in_spine)) = theological_term_shift(spine_normalized, readings) {
        let detail = if in_spine {
            format!("Spine has '{term}' ({meaning}), alternate does not")
        } else {
            format!("Alternate has '{term}' ({meaning}), spine does not")
        };
        return Reason {
            code: "theological_keyword".to_string(),
            summary: format!("Theological term change ({meaning})"),
            detail,
        };
    }

    let spine_words: HashSet<String> = strip_accents(spine_normalized).split_whitespace().map(str::to_string).collect();
    for reading in readings {
        let reading_words: HashSet<String> =
            strip_accents(&reading.normalized_text).split_whitespace().map(str::to_string).collect();
        let diff: HashSet<&String> = spine_words.symmetric_difference(&reading_words).collect();
        if !diff.is_empty() && diff.iter().all(|w| FUNCTION_WORDS.contains(&w.as_str())) {
            let mut words: Vec<&str> = diff.iter().map(|s| s.as_str()).collect();
            words.sort_unstable();
            return Reason {
                code: "article_particle".to_string(),
                summary: "Function word variation".to_string(),
                detail: format!("Difference in: {}", words.join(", ")),
            };
        }
    }

    match classification {
        Classification::WordOrder => Reason {
            code: "word_order".to_string(),
            summary: "Word order difference".to_string(),
            detail: "Same words in different order".to_string(),
        },
        Classification::Spelling => Reason {
            code: "spelling".to_string(),
            summary: "Spelling variation".to_string(),
            detail: "Orthographic difference only".to_string(),
        },
        Classification::Omission => Reason {
            code: "omission".to_string(),
            summary: "Text omission".to_string(),
            detail: "Words present in one reading but not the other".to_string(),
        },
        Classification::Addition => Reason {
            code: "addition".to_string(),
            summary: "Text addition".to_string(),
            detail: "Additional words in one reading".to_string(),
        },
        Classification::Substitution => Reason {
            code: "lexical".to_string(),
            summary: "Lexical variation".to_string(),
            detail: "Different word choice".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redletters_spine::FixtureSpineProvider;

    fn john_1_18() -> VerseId {
        "John.1.18".parse().unwrap()
    }

    fn edition(key: &str, siglum: &str, pack: &str, text: &str) -> Edition {
        Edition {
            key: key.to_string(),
            provider: Box::new(FixtureSpineProvider::new(pack).with_verse(john_1_18(), text)),
            siglum: siglum.to_string(),
            witness_type: WitnessType::Edition,
            century_range: Some((19, 19)),
            source_pack_id: pack.to_string(),
        }
    }

    #[test]
    fn normalize_strips_accents_case_and_punctuation() {
        let a = normalize_for_aggregation("Θεὸν οὐδεὶς ἑώρακεν πώποτε·");
        let b = normalize_for_aggregation("θεον ουδεις εωρακεν πωποτε");
        assert_eq!(a, b);
    }

    #[test]
    fn build_verse_creates_variant_for_theological_substitution() {
        let spine = FixtureSpineProvider::new("sblgnt").with_verse(john_1_18(), "ὁ μονογενὴς θεός");
        let mut aggregator = VariantAggregator::new(Box::new(spine));
        aggregator.add_edition(edition("westcott-hort", "WH", "wh", "ὁ μονογενὴς υἱός"));

        let mut store = VariantStore::open_in_memory().unwrap();
        let result = aggregator.build_verse(&mut store, &john_1_18()).unwrap();

        assert_eq!(result.variants_created, 1);
        let variant = store.get(&john_1_18(), 0).unwrap().unwrap();
        assert_eq!(variant.significance, Significance::Major);
        assert_eq!(variant.reason.code, "theological_keyword");
        assert_eq!(variant.readings.len(), 2);
    }

    #[test]
    fn build_verse_is_idempotent_across_runs() {
        let spine = FixtureSpineProvider::new("sblgnt").with_verse(john_1_18(), "ὁ μονογενὴς θεός");
        let mut aggregator = VariantAggregator::new(Box::new(spine));
        aggregator.add_edition(edition("westcott-hort", "WH", "wh", "ὁ μονογενὴς υἱός"));

        let mut store = VariantStore::open_in_memory().unwrap();
        aggregator.build_verse(&mut store, &john_1_18()).unwrap();
        let second = aggregator.build_verse(&mut store, &john_1_18()).unwrap();

        assert_eq!(second.variants_created, 0);
        assert_eq!(second.variants_unchanged, 1);
        let variant = store.get(&john_1_18(), 0).unwrap().unwrap();
        assert_eq!(variant.readings[1].support_set.len(), 1);
    }

    #[test]
    fn build_verse_merges_second_pack_supporting_same_reading() {
        let spine = FixtureSpineProvider::new("sblgnt").with_verse(john_1_18(), "ὁ μονογενὴς θεός");
        let mut aggregator = VariantAggregator::new(Box::new(spine));
        aggregator.add_edition(edition("westcott-hort", "WH", "wh", "ὁ μονογενὴς υἱός"));

        let mut store = VariantStore::open_in_memory().unwrap();
        aggregator.build_verse(&mut store, &john_1_18()).unwrap();

        let mut aggregator2 = VariantAggregator::new(Box::new(
            FixtureSpineProvider::new("sblgnt").with_verse(john_1_18(), "ὁ μονογενὴς θεός"),
        ));
        aggregator2.add_edition(edition("nestle-aland", "NA28", "na28", "ὁ μονογενὴς υἱός"));
        let result = aggregator2.build_verse(&mut store, &john_1_18()).unwrap();

        assert_eq!(result.variants_updated, 1);
        let variant = store.get(&john_1_18(), 0).unwrap().unwrap();
        assert_eq!(variant.readings.len(), 2);
        assert_eq!(variant.readings[1].support_set.len(), 2);
    }

    #[test]
    fn no_difference_marks_unchanged() {
        let spine = FixtureSpineProvider::new("sblgnt").with_verse(john_1_18(), "ὁ μονογενὴς θεός");
        let mut aggregator = VariantAggregator::new(Box::new(spine));
        aggregator.add_edition(edition("identical", "X", "x", "ὁ μονογενὴς θεός"));

        let mut store = VariantStore::open_in_memory().unwrap();
        let result = aggregator.build_verse(&mut store, &john_1_18()).unwrap();
        assert_eq!(result.variants_unchanged, 1);
        assert!(store.get(&john_1_18(), 0).unwrap().is_none());
    }

    #[test]
    fn sin_term_shift_is_major() {
        let spine_norm = normalize_for_aggregation("πας ο γεγεννημενος εκ του θεου αμαρτιαν ου ποιει");
        let reading_norm = normalize_for_aggregation("πας ο γεγεννημενος εκ του θεου αμαρτιας ουκ εχει");
        let the_edition = edition("x", "X", "x", "");
        let readings =
            vec![DifferingReading { edition: &the_edition, text: String::new(), normalized_text: reading_norm }];
        let classification = classify_variant(&spine_norm, &readings);
        assert_eq!(
            determine_significance(&spine_norm, &readings, classification),
            Significance::Major
        );
    }

    #[test]
    fn faith_term_shift_is_major() {
        let spine_norm = normalize_for_aggregation("ο δικαιος εκ πιστεως ζησεται");
        let reading_norm = normalize_for_aggregation("ο δικαιος εκ εργων ζησεται");
        let the_edition = edition("x", "X", "x", "");
        let readings =
            vec![DifferingReading { edition: &the_edition, text: String::new(), normalized_text: reading_norm }];
        let classification = classify_variant(&spine_norm, &readings);
        assert_eq!(
            determine_significance(&spine_norm, &readings, classification),
            Significance::Major
        );
    }

    #[test]
    fn word_order_classified_as_minor() {
        let spine_norm = normalize_for_aggregation("ο λογος ην προς τον θεον");
        let reading_norm = normalize_for_aggregation("προς τον θεον ην ο λογος");
        let the_edition = edition("x", "X", "x", "");
        let readings = vec![DifferingReading {
            edition: &the_edition,
            text: String::new(),
            normalized_text: reading_norm,
        }];
        let classification = classify_variant(&spine_norm, &readings);
        assert_eq!(classification, Classification::WordOrder);
        assert_eq!(determine_significance(&spine_norm, &readings, classification), Significance::Minor);
    }
}
