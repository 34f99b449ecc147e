//! Variant store and multi-pack aggregator.
//!
//! [`store::VariantStore`] is the sqlite-backed persistence layer;
//! [`aggregate::VariantAggregator`] diffs comparative editions against a
//! spine and folds the results into it, idempotently across repeated runs
//! and across packs installed at different times.

pub mod aggregate;
pub mod store;
pub mod types;

pub use aggregate::{AggregateError, BuildResult, Edition, VariantAggregator};
pub use store::{StoreError, VariantStore};
pub use types::{
    Classification, Reason, Significance, VariantUnit, WitnessReading, WitnessSupport, WitnessType,
};

use redletters_utils::error::{ErrorCategory, UserFriendlyError};

/// Umbrella error for callers that need one type across store and
/// aggregation failures (the CLI and the orchestrator do; the two
/// sub-crates keep their own narrower errors for library use).
#[derive(Debug, thiserror::Error)]
pub enum VariantError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl UserFriendlyError for VariantError {
    fn category(&self) -> ErrorCategory {
        match self {
            VariantError::Store(_) => ErrorCategory::Internal,
            VariantError::Aggregate(AggregateError::Spine(_)) => ErrorCategory::DataAvailability,
            VariantError::Aggregate(_) => ErrorCategory::Internal,
        }
    }
}
