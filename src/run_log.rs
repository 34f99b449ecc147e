//! Scholarly run log.
//!
//! Deterministic record of one `redletters run` invocation: command,
//! timestamps, resolved verse IDs, pack summary, the files it produced,
//! validation outcomes, gate disposition, and a `content_hash` folding
//! every `files_created` hash together, mirroring how `redletters-bundle`
//! derives its own `content_hash` from a sorted artifact list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use redletters_receipt::Artifact;
use redletters_validate::ValidationResult;

pub const RUN_LOG_SCHEMA_VERSION: &str = "1.0.0";

/// Disposition of the gate check for one run: whether pending
/// acknowledgements were satisfied, bypassed with `--force`, or blocked
/// the run outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDisposition {
    pub required_acks: Vec<String>,
    pub gates_satisfied: Vec<String>,
    /// Set when `--force` bypassed pending acknowledgements; records who
    /// accepted responsibility and why, for audit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forced_responsibility: Option<String>,
}

impl GateDisposition {
    #[must_use]
    pub fn clean(gates_satisfied: Vec<String>) -> Self {
        Self { required_acks: Vec::new(), gates_satisfied, forced_responsibility: None }
    }

    #[must_use]
    pub fn forced(required_acks: Vec<String>, gates_satisfied: Vec<String>, responsibility: String) -> Self {
        Self { required_acks, gates_satisfied, forced_responsibility: Some(responsibility) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLog {
    pub schema_version: String,
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub reference: String,
    pub verse_ids: Vec<String>,
    pub packs: Vec<String>,
    pub files_created: Vec<Artifact>,
    pub validation_outcomes: Vec<ValidationResult>,
    pub gate_disposition: GateDisposition,
    pub success: bool,
    pub errors: Vec<String>,
    pub content_hash: String,
}

impl RunLog {
    /// Build a run log, computing `content_hash` over the concatenated
    /// `sha256` of every entry in `files_created`, sorted by path so the
    /// hash doesn't depend on write order (same determinism rule as
    /// `redletters-bundle`'s manifest hash).
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        command: String,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        reference: String,
        verse_ids: Vec<String>,
        packs: Vec<String>,
        mut files_created: Vec<Artifact>,
        validation_outcomes: Vec<ValidationResult>,
        gate_disposition: GateDisposition,
        success: bool,
        errors: Vec<String>,
    ) -> Self {
        files_created.sort_by(|a, b| a.path.cmp(&b.path));
        let concatenated: String = files_created.iter().map(|a| a.sha256.as_str()).collect();
        let content_hash = redletters_utils::content_hash_str(&concatenated);

        Self {
            schema_version: RUN_LOG_SCHEMA_VERSION.to_string(),
            command,
            started_at,
            completed_at,
            reference,
            verse_ids,
            packs,
            files_created,
            validation_outcomes,
            gate_disposition,
            success,
            errors,
            content_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use redletters_receipt::{ArtifactKind, ArtifactStatus};

    fn artifact(path: &str, sha256: &str) -> Artifact {
        Artifact {
            name: path.to_string(),
            path: path.to_string(),
            artifact_type: ArtifactKind::Output,
            size_bytes: 0,
            sha256: sha256.to_string(),
            status: ArtifactStatus::Complete,
            created_at: Utc::now(),
            verified_at: None,
        }
    }

    #[test]
    fn content_hash_is_independent_of_input_order() {
        let now = Utc::now();
        let a = RunLog::new(
            "run".to_string(),
            now,
            now,
            "John 1:18".to_string(),
            vec!["John.1.18".to_string()],
            vec!["na28".to_string()],
            vec![artifact("a.json", "hash-a"), artifact("b.json", "hash-b")],
            Vec::new(),
            GateDisposition::clean(Vec::new()),
            true,
            Vec::new(),
        );
        let b = RunLog::new(
            "run".to_string(),
            now,
            now,
            "John 1:18".to_string(),
            vec!["John.1.18".to_string()],
            vec!["na28".to_string()],
            vec![artifact("b.json", "hash-b"), artifact("a.json", "hash-a")],
            Vec::new(),
            GateDisposition::clean(Vec::new()),
            true,
            Vec::new(),
        );
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn forced_responsibility_records_the_bypass() {
        let disposition = GateDisposition::forced(
            vec!["John.1.1".to_string()],
            Vec::new(),
            "operator bypassed pending significant variant per --force".to_string(),
        );
        assert!(disposition.forced_responsibility.is_some());
    }
}
