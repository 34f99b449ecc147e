//! Gate data model.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use redletters_utils::VerseId;
use serde::{Deserialize, Serialize};

/// One recorded variant acknowledgement: a session chose `reading_chosen`
/// for the variant at `variant_ref`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantAck {
    pub session_id: String,
    pub variant_ref: VerseId,
    pub reading_chosen: usize,
    pub ts: DateTime<Utc>,
    pub context: String,
}

/// One recorded mode-escalation acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationAck {
    pub session_id: String,
    pub from_mode: String,
    pub to_mode: String,
    pub ts: DateTime<Utc>,
}

/// The full acked state for a session, as consumed by the orchestrator's
/// gate-satisfaction check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub acked_variants: HashMap<VerseId, usize>,
    /// Target mode -> acknowledgement timestamp.
    pub escalations: HashMap<String, DateTime<Utc>>,
}

impl SessionState {
    /// Whether `variant_ref` has been acknowledged at all, independent of
    /// which reading was chosen.
    #[must_use]
    pub fn is_acked(&self, variant_ref: &VerseId) -> bool {
        self.acked_variants.contains_key(variant_ref)
    }

    #[must_use]
    pub fn has_escalation(&self, to_mode: &str) -> bool {
        self.escalations.contains_key(to_mode)
    }
}
