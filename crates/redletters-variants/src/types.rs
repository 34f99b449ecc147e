//! Data model for the variant store.

use redletters_utils::VerseId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Substitution,
    Omission,
    Addition,
    WordOrder,
    Spelling,
}

impl Classification {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Substitution => "substitution",
            Classification::Omission => "omission",
            Classification::Addition => "addition",
            Classification::WordOrder => "word_order",
            Classification::Spelling => "spelling",
        }
    }

    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        Some(match s {
            "substitution" => Classification::Substitution,
            "omission" => Classification::Omission,
            "addition" => Classification::Addition,
            "word_order" => Classification::WordOrder,
            "spelling" => Classification::Spelling,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    Trivial,
    Minor,
    Significant,
    Major,
}

impl Significance {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Significance::Trivial => "trivial",
            Significance::Minor => "minor",
            Significance::Significant => "significant",
            Significance::Major => "major",
        }
    }

    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        Some(match s {
            "trivial" => Significance::Trivial,
            "minor" => Significance::Minor,
            "significant" => Significance::Significant,
            "major" => Significance::Major,
            _ => return None,
        })
    }

    /// Whether this significance level requires a gate acknowledgement.
    #[must_use]
    pub fn requires_ack(self) -> bool {
        matches!(self, Significance::Significant | Significance::Major)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WitnessType {
    Manuscript,
    Edition,
    Tradition,
    Other,
}

impl WitnessType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WitnessType::Manuscript => "manuscript",
            WitnessType::Edition => "edition",
            WitnessType::Tradition => "tradition",
            WitnessType::Other => "other",
        }
    }

    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        Some(match s {
            "manuscript" => WitnessType::Manuscript,
            "edition" => WitnessType::Edition,
            "tradition" => WitnessType::Tradition,
            "other" => WitnessType::Other,
            _ => return None,
        })
    }
}

/// A short machine+human reason for why a variant exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
    pub code: String,
    pub summary: String,
    pub detail: String,
}

/// A single witness backing a reading.
/// Uniqueness invariant: at most one support entry per
/// `(reading, siglum, source_pack_id)` tuple, enforced at the store layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessSupport {
    pub siglum: String,
    pub witness_type: WitnessType,
    pub source_pack_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub century_range: Option<(i32, i32)>,
}

/// A reading of the text plus the witnesses backing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessReading {
    pub surface_text: String,
    pub normalized_text: String,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_pack_id: Option<String>,
    pub support_set: Vec<WitnessSupport>,
}

/// A point of textual variation anchored to `(ref, position)`. Unique by `(ref, position)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantUnit {
    pub ref_: VerseId,
    pub position: i32,
    pub classification: Classification,
    pub significance: Significance,
    pub sblgnt_reading_index: usize,
    pub readings: Vec<WitnessReading>,
    pub reason: Reason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_pack_id: Option<String>,
}

impl VariantUnit {
    /// The spine's own reading, per the `readings[sblgnt_reading_index]`
    /// invariant.
    #[must_use]
    pub fn spine_reading(&self) -> &WitnessReading {
        &self.readings[self.sblgnt_reading_index]
    }
}
