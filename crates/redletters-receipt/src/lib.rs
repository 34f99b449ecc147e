//! Receipt model and atomic emission.
//!
//! Split out of `redletters-engine` because the receipt shape is also
//! consumed by the bundle producer and the scholarly run orchestrator
//!, neither of which otherwise needs the job engine's sqlite store.

pub mod types;
pub mod writer;

pub use types::{
    Artifact, ArtifactKind, ArtifactStatus, Receipt, ReceiptError, ReceiptTimestamps, SourcePin,
    RECEIPT_SCHEMA_VERSION,
};
pub use writer::{write_receipt, ReceiptWriteError};
