//! Error types for the vault.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use truelocker_catalog::CatalogError;
use truelocker_core::{ContentLocator, Fingerprint};
use truelocker_store::StoreError;

/// Workflow stage at which a registration failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Hashing,
    Uploading,
    Submitting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Hashing => "hashing",
            Stage::Uploading => "uploading",
            Stage::Submitting => "submitting",
        })
    }
}

/// Why a registration stage failed.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Local content could not be read. Re-select the content and restart.
    #[error("content unreadable: {0}")]
    Io(#[from] std::io::Error),

    /// The content store refused or dropped the upload. Retryable.
    #[error("upload failed: {0}")]
    Upload(StoreError),

    /// The upload did not finish in time. The store may still hold an
    /// orphaned copy; retrying uploads again.
    #[error("upload timed out after {0:?}")]
    UploadTimeout(Duration),

    /// The stored copy does not hash to the fingerprint computed before
    /// upload.
    #[error("content at {locator} has fingerprint {actual}, expected {expected}")]
    IntegrityMismatch {
        locator: ContentLocator,
        expected: Fingerprint,
        actual: Fingerprint,
    },

    /// The ledger could not be read before submitting. Nothing was sent.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(StoreError),

    /// The ledger refused the write. Reconcile before resubmitting, since
    /// a rejecting ledger may still have recorded an earlier attempt.
    #[error("submission rejected: {0}")]
    SubmissionRejected(StoreError),

    /// The write may or may not have been recorded. Reconcile against the
    /// ledger before resubmitting.
    #[error("submission outcome unknown: {0}")]
    SubmissionIndeterminate(String),
}

impl RegistrationError {
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, RegistrationError::SubmissionIndeterminate(_))
    }

    /// Whether an append was sent to the ledger.
    pub fn reached_ledger(&self) -> bool {
        matches!(
            self,
            RegistrationError::SubmissionRejected(_) | RegistrationError::SubmissionIndeterminate(_)
        )
    }
}

/// A registration that stopped at `stage`.
#[derive(Debug, Clone, Error)]
#[error("registration failed while {stage}: {cause}")]
pub struct RegistrationFailed {
    pub stage: Stage,
    pub cause: Arc<RegistrationError>,
}

impl RegistrationFailed {
    pub(crate) fn new(stage: Stage, cause: RegistrationError) -> Self {
        Self {
            stage,
            cause: Arc::new(cause),
        }
    }

    /// Whether the ledger may hold the record despite the failure.
    pub fn is_indeterminate(&self) -> bool {
        self.cause.is_indeterminate()
    }

    /// Whether the ledger must be inspected before any retry.
    pub fn needs_reconcile(&self) -> bool {
        self.stage == Stage::Submitting && self.cause.reached_ledger()
    }
}

/// Misuse of a workflow's retry operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// Only a failed workflow can be resumed or restarted.
    #[error("workflow has not failed")]
    NotFailed,

    /// The last submission reached the ledger and has not been reconciled.
    #[error("submission reached the ledger; reconcile with the ledger first")]
    ReconcileRequired,

    /// Reconcile only applies to a failed submission that reached the ledger.
    #[error("no failed submission to reconcile")]
    NothingToReconcile,
}

/// Errors that can occur during vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Catalog error.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Registration stopped before confirmation.
    #[error(transparent)]
    Registration(#[from] RegistrationFailed),

    /// Invalid retry request.
    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Local content could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Fingerprint text was malformed.
    #[error("invalid input: {0}")]
    Core(#[from] truelocker_core::CoreError),
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
