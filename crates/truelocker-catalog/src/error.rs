//! Error types for the catalog module.

use thiserror::Error;

use truelocker_core::{CoreError, SequenceId};
use truelocker_store::StoreError;

/// Errors that can occur while refreshing or querying the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Ledger read failed.
    #[error("ledger error: {0}")]
    Store(#[from] StoreError),

    /// The ledger returned a record at the wrong position.
    #[error("inconsistent ledger: expected record {expected}, got {got}")]
    InconsistentLedger { expected: SequenceId, got: SequenceId },

    /// Record encoding failed.
    #[error("encoding error: {0}")]
    Encoding(#[from] CoreError),

    /// Local content could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The catalog is known to predate an expected update.
///
/// Advisory: verification results are still valid for the snapshot they
/// were computed against, but records the caller knows about are missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("catalog is stale: holds {observed} records, expected at least {expected}")]
pub struct StaleCatalogError {
    pub observed: u64,
    pub expected: u64,
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
