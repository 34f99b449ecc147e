//! Shared error-reporting scaffolding.
//!
//! Each component crate defines its own `thiserror` enum for its slice of
//! the error taxonomy (`CatalogError`, `LockError`, `SpineError`, ...). They
//! all implement [`UserFriendlyError`] so the CLI boundary can render a
//! consistent, actionable message regardless of which layer failed, and map
//! to a stable [`ErrorCategory`] / exit code.
//!
//! `GateBlocked` and `EscalationRequired` are intentionally NOT part of this
//! taxonomy: they are structured, caller-visible responses on the success
//! path, not errors.

use std::fmt;

/// A coarse category used for grouping/metrics and for exit-code mapping.
/// Stable identifiers; do not renumber, only append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed input from the caller (bad passage reference, bad CLI args).
    UserInput,
    /// A precondition about installed data wasn't met (missing spine, pack).
    DataAvailability,
    /// Licensing/consent gate not satisfied.
    Consent,
    /// Integrity check failed (hash mismatch, tamper detection).
    Integrity,
    /// Schema/contract violation on an artifact.
    Contract,
    /// Secret/token leakage detected.
    Security,
    /// Background job engine failure (crash recovery, execution error).
    Engine,
    /// Network/transport failure talking to a pack source.
    Network,
    /// Anything else / programmer error.
    Internal,
}

/// A trait every domain error enum implements so the CLI/UI layer can
/// render a consistent, actionable message without knowing the concrete
/// error type.
pub trait UserFriendlyError: std::error::Error {
    /// A short, human-readable explanation beyond the `Display` message.
    fn user_message(&self) -> String {
        self.to_string()
    }

    /// Optional extra context (e.g. which file, which pack).
    fn context(&self) -> Option<String> {
        None
    }

    /// Actionable next steps, if any (e.g. "run `redletters source install
    /// sblgnt --accept-eula`").
    fn suggestions(&self) -> Vec<String> {
        Vec::new()
    }

    fn category(&self) -> ErrorCategory;
}

/// Process exit codes, matching the documented exit-code table.
///
/// This is a stable, public surface: values will not change within a
/// major version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const INTERNAL: ExitCode = ExitCode(1);
    pub const CLI_ARGS: ExitCode = ExitCode(2);
    pub const CONSENT_REQUIRED: ExitCode = ExitCode(3);
    pub const DATA_UNAVAILABLE: ExitCode = ExitCode(4);
    pub const INTEGRITY_FAILURE: ExitCode = ExitCode(5);
    pub const CONTRACT_VIOLATION: ExitCode = ExitCode(6);
    pub const NETWORK_ERROR: ExitCode = ExitCode(7);
    pub const SECRET_DETECTED: ExitCode = ExitCode(8);
    pub const ENGINE_CRASH: ExitCode = ExitCode(9);

    #[must_use]
    pub fn as_i32(self) -> i32 {
        self.0
    }

    /// Map a category to its documented exit code.
    #[must_use]
    pub fn from_category(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::UserInput => Self::CLI_ARGS,
            ErrorCategory::Consent => Self::CONSENT_REQUIRED,
            ErrorCategory::DataAvailability => Self::DATA_UNAVAILABLE,
            ErrorCategory::Integrity => Self::INTEGRITY_FAILURE,
            ErrorCategory::Contract => Self::CONTRACT_VIOLATION,
            ErrorCategory::Network => Self::NETWORK_ERROR,
            ErrorCategory::Security => Self::SECRET_DETECTED,
            ErrorCategory::Engine => Self::ENGINE_CRASH,
            ErrorCategory::Internal => Self::INTERNAL,
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_mapping_is_stable() {
        assert_eq!(ExitCode::from_category(ErrorCategory::Security).as_i32(), 8);
        assert_eq!(ExitCode::from_category(ErrorCategory::Engine).as_i32(), 9);
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
    }
}
