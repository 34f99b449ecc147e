//! Identifier and hash primitives, atomic file writes, and the shared
//! error-reporting scaffolding used by every other `redletters-*` crate.
//!
//! All determinism in the system reduces to [`hashing`]. Keep it tiny.

pub mod atomic_write;
pub mod error;
pub mod hashing;
pub mod types;

pub use error::{ErrorCategory, ExitCode, UserFriendlyError};
pub use hashing::{canonical_json, content_hash, content_hash_of_tree, content_hash_str, file_hash, hash_canonical_json, stable_id, HashError};
pub use types::{PackId, PackRole, VerseId, VerseIdParseError};
