//! Error types for the store module.

use thiserror::Error;

use truelocker_core::{ContentLocator, CoreError, Fingerprint};

/// Errors raised by content stores and ledgers.
///
/// The variants split along the recovery policy each one implies:
/// uploads are retryable, submissions are either rejected outright or
/// indeterminate, and reads can always be repeated.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Content store unreachable or refused the upload. Retryable, but a
    /// retry may yield a different locator.
    #[error("upload failed: {0}")]
    Upload(String),

    /// Ledger refused the write. Nothing was recorded.
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    /// Ledger write outcome unknown: it may or may not have committed.
    #[error("submission indeterminate: {0}")]
    SubmissionIndeterminate(String),

    /// Read-side failure (network drop, service unavailable).
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Record or content not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Content read back from a store does not match its fingerprint.
    #[error("content at {locator} has fingerprint {actual}, expected {expected}")]
    IntegrityMismatch {
        locator: ContentLocator,
        expected: Fingerprint,
        actual: Fingerprint,
    },

    /// Stored data failed validation.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock guarding shared state was poisoned, or a blocking task died.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Whether repeating the same call is safe.
    ///
    /// Submissions are never reported as retryable: even a rejection should
    /// be inspected by the caller before resubmitting.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Upload(_) | StoreError::Unavailable(_) | StoreError::Io(_)
        )
    }
}

impl From<CoreError> for StoreError {
    fn from(e: CoreError) -> Self {
        StoreError::InvalidData(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
