//! Error types for TrueLocker Core.

use thiserror::Error;

/// Errors raised while parsing or encoding core values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("invalid locator: {0}")]
    InvalidLocator(String),

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("encoding error: {0}")]
    EncodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
