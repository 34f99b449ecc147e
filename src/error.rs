//! Root error taxonomy.
//!
//! One [`RedlettersError`] variant per component crate's own error enum.
//! `GateBlocked` / `EscalationRequired` are deliberately absent: those are
//! structured success-path payloads (`Response::Gate`), surfaced to the
//! CLI as ordinary output, not as errors.

use redletters_utils::error::{ErrorCategory, ExitCode, UserFriendlyError};

#[derive(Debug, thiserror::Error)]
pub enum RedlettersError {
    #[error("{0}")]
    Config(String),
    #[error(transparent)]
    Catalog(#[from] redletters_catalog::CatalogError),
    #[error(transparent)]
    Lock(#[from] redletters_lock::LockError),
    #[error(transparent)]
    Spine(#[from] redletters_spine::SpineError),
    #[error(transparent)]
    Variant(#[from] redletters_variants::VariantError),
    #[error(transparent)]
    VariantStore(#[from] redletters_variants::StoreError),
    #[error(transparent)]
    Gate(#[from] redletters_gate::GateError),
    #[error(transparent)]
    GateStore(#[from] redletters_gate::GateStoreError),
    #[error(transparent)]
    Orchestrator(#[from] redletters_orchestrator::OrchestratorError),
    #[error(transparent)]
    Engine(#[from] redletters_engine::EngineError),
    #[error(transparent)]
    Export(#[from] redletters_export::ExportError),
    #[error(transparent)]
    Snapshot(#[from] redletters_snapshot::SnapshotError),
    #[error(transparent)]
    Bundle(#[from] redletters_bundle::BundleError),
    #[error(transparent)]
    Receipt(#[from] redletters_receipt::ReceiptWriteError),
    #[error(transparent)]
    Hash(#[from] redletters_utils::HashError),
    #[error(transparent)]
    AtomicWrite(#[from] redletters_utils::atomic_write::AtomicWriteError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("gate pending: {0} acknowledgement(s) required; rerun with --force or `redletters ack`")]
    GateBlocked(usize),
    #[error("{0}")]
    UserInput(String),
}

impl From<redletters_config::ConfigError> for RedlettersError {
    fn from(err: redletters_config::ConfigError) -> Self {
        RedlettersError::Config(err.to_string())
    }
}

impl UserFriendlyError for RedlettersError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        match self {
            RedlettersError::Catalog(e) => e.context(),
            RedlettersError::Lock(e) => e.context(),
            RedlettersError::Spine(e) => e.context(),
            RedlettersError::Orchestrator(e) => e.context(),
            RedlettersError::Engine(e) => e.context(),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            RedlettersError::Catalog(e) => e.suggestions(),
            RedlettersError::Lock(e) => e.suggestions(),
            RedlettersError::Spine(e) => e.suggestions(),
            RedlettersError::Orchestrator(e) => e.suggestions(),
            RedlettersError::Engine(e) => e.suggestions(),
            RedlettersError::GateBlocked(_) => {
                vec!["run `redletters ack <session> <ref> <reading>` for each pending variant".to_string()]
            }
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            RedlettersError::Config(_) => ErrorCategory::Internal,
            RedlettersError::Catalog(e) => e.category(),
            RedlettersError::Lock(e) => e.category(),
            RedlettersError::Spine(e) => e.category(),
            RedlettersError::Variant(e) => e.category(),
            RedlettersError::VariantStore(_) => ErrorCategory::Internal,
            RedlettersError::Gate(e) => e.category(),
            RedlettersError::GateStore(_) => ErrorCategory::Internal,
            RedlettersError::Orchestrator(e) => e.category(),
            RedlettersError::Engine(e) => e.category(),
            RedlettersError::Export(_) => ErrorCategory::Internal,
            RedlettersError::Snapshot(e) => e.category(),
            RedlettersError::Bundle(e) => e.category(),
            RedlettersError::Receipt(_) => ErrorCategory::Internal,
            RedlettersError::Hash(_) | RedlettersError::AtomicWrite(_) | RedlettersError::Io(_) => {
                ErrorCategory::Internal
            }
            RedlettersError::GateBlocked(_) => ErrorCategory::Consent,
            RedlettersError::UserInput(_) => ErrorCategory::UserInput,
        }
    }
}

impl RedlettersError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from_category(self.category())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_blocked_maps_to_consent_exit_code() {
        let err = RedlettersError::GateBlocked(2);
        assert_eq!(err.exit_code().as_i32(), ExitCode::CONSENT_REQUIRED.as_i32());
    }

    #[test]
    fn user_input_maps_to_cli_args_exit_code() {
        let err = RedlettersError::UserInput("bad reference".to_string());
        assert_eq!(err.exit_code().as_i32(), ExitCode::CLI_ARGS.as_i32());
    }
}
