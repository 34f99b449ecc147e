//! Session-keyed acknowledgement ledger.
//!
//! `GateBlocked` is deliberately not modeled here as an error: it's a
//! structured success-path response the orchestrator constructs from
//! [`store::GateLedger::load_session_state`], not a failure this crate
//! raises.

pub mod store;
pub mod types;

pub use store::{GateLedger, GateStoreError};
pub use types::{EscalationAck, SessionState, VariantAck};

use redletters_utils::error::{ErrorCategory, UserFriendlyError};

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error(transparent)]
    Store(#[from] GateStoreError),
}

impl UserFriendlyError for GateError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Internal
    }
}
