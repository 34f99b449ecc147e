//! Response and plug-in-seam types for `translate_passage`.
//!
//! Translation heuristics, claim-type taxonomy, and confidence-scoring
//! formulas are explicitly out of scope: this module declares
//! only the typed seams a real strategy plugs into — [`Translator`] and
//! [`ConfidenceStrategy`] — plus the fixed-shape responses the core
//! constructs around their output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use redletters_utils::VerseId;
use redletters_variants::VariantUnit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Readable,
    Traceable,
}

impl Mode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Readable => "readable",
            Mode::Traceable => "traceable",
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "readable" => Ok(Mode::Readable),
            "traceable" => Ok(Mode::Traceable),
            other => Err(format!("unknown mode {other:?}, expected readable|traceable")),
        }
    }
}

/// The minimum claim type that triggers escalation out of `readable` mode.
pub const ESCALATION_CLAIM_TYPE: u8 = 5;

/// Context handed to a [`Translator`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationContext {
    pub reference: String,
    pub mode: Mode,
    pub tokens: Vec<redletters_spine::Token>,
    pub variants: Vec<VariantUnit>,
    pub session_id: String,
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// A single claim produced by translation. `claim_type` is in `0..=7`; the
/// concrete taxonomy behind the numbers is a plug-in concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub content: String,
    pub claim_type: u8,
    #[serde(default)]
    pub dependencies: Vec<serde_json::Value>,
}

/// Raw output from a [`Translator`], before the orchestrator attaches
/// provenance/confidence/receipts framing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationDraft {
    pub translation_text: String,
    pub claims: Vec<Claim>,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// The translation-strategy seam.
pub trait Translator: Send + Sync {
    fn translate(&self, spine_text: &str, context: &TranslationContext) -> TranslationDraft;
}

/// Layered confidence scores. Each field is in
/// `0.0..=1.0`; the scoring formula itself is a plug-in concern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    pub textual: f64,
    pub grammatical: f64,
    pub lexical: f64,
    pub interpretive: f64,
}

/// The confidence-scoring seam.
pub trait ConfidenceStrategy: Send + Sync {
    fn score(&self, draft: &TranslationDraft, context: &TranslationContext) -> Confidence;
}

/// A view of a [`VariantUnit`] annotated with the reading index the current
/// session acknowledged, if any (`None` means not yet acknowledged).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantView {
    #[serde(flatten)]
    pub variant: VariantUnit,
    pub acknowledged_reading: Option<usize>,
}

impl VariantView {
    #[must_use]
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged_reading.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerseBlock {
    pub verse_id: VerseId,
    pub spine_text: String,
    pub variants: Vec<VariantView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub spine_source: String,
    pub lexicon_packs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptsSummary {
    pub checks_run: Vec<String>,
    pub gates_satisfied: Vec<String>,
    pub gates_pending: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// The success-path response when no gate blocks and mode enforcement
/// passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub reference: String,
    pub mode: Mode,
    pub verses: Vec<VerseBlock>,
    pub combined_spine_text: String,
    pub claims: Vec<Claim>,
    pub confidence: Confidence,
    pub provenance: Provenance,
    pub receipts: ReceiptsSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    Variant,
    Escalation,
}

/// A suspended pipeline: either a pending variant acknowledgement or a
/// readable→traceable escalation requirement. This is a structured value,
/// not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResponse {
    pub kind: GateKind,
    pub reference: String,
    #[serde(default)]
    pub required_acks: Vec<VerseId>,
    #[serde(default)]
    pub readings: Vec<VariantUnit>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_target_mode: Option<Mode>,
}

/// `Response = Translation | Gate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Translation(TranslateResponse),
    Gate(GateResponse),
}
