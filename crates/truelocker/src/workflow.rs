//! The registration workflow.
//!
//! One workflow registers one piece of content:
//!
//! ```text
//! Idle -> Hashing -> Uploading -> Submitting -> Confirmed
//!            \           \            \
//!             +-----------+------------+--> Failed(stage, cause)
//! ```
//!
//! Each state names the work the next [`step`](RegistrationWorkflow::step)
//! performs. Side effects are strictly ordered: nothing is submitted before
//! its upload succeeds, and the catalog is refreshed only after the ledger
//! confirms. Nothing is retried automatically.

use std::fmt;
use std::sync::Arc;

use truelocker_catalog::{CatalogError, EvidenceCatalog, RefreshReport};
use truelocker_core::{ContentLocator, Fingerprint, Identity, SequenceId};
use truelocker_store::{fetch_verified, ContentStore, Ledger, StoreError};

use crate::config::VaultConfig;
use crate::error::{RegistrationError, RegistrationFailed, Result, Stage, WorkflowError};
use crate::hashing::{fingerprint_content, Content};

/// Where a registration stands.
#[derive(Debug, Clone)]
pub enum RegistrationState {
    Idle,
    Hashing,
    Uploading {
        fingerprint: Fingerprint,
    },
    Submitting {
        fingerprint: Fingerprint,
        locator: ContentLocator,
    },
    Confirmed {
        fingerprint: Fingerprint,
        locator: ContentLocator,
        sequence_id: SequenceId,
    },
    Failed(RegistrationFailed),
}

impl RegistrationState {
    pub fn name(&self) -> &'static str {
        match self {
            RegistrationState::Idle => "idle",
            RegistrationState::Hashing => "hashing",
            RegistrationState::Uploading { .. } => "uploading",
            RegistrationState::Submitting { .. } => "submitting",
            RegistrationState::Confirmed { .. } => "confirmed",
            RegistrationState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RegistrationState::Confirmed { .. } | RegistrationState::Failed(_)
        )
    }
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationState::Failed(failed) => write!(f, "failed({})", failed.stage),
            other => f.write_str(other.name()),
        }
    }
}

/// Proof of a confirmed registration.
#[derive(Debug, Clone)]
pub struct RegistrationReceipt {
    /// Fingerprint computed before upload and published to the ledger.
    pub fingerprint: Fingerprint,
    pub locator: ContentLocator,
    pub sequence_id: SequenceId,
    pub submitter: Identity,
    /// Outcome of the catalog refresh that followed confirmation. A failure
    /// here does not affect the registration itself.
    pub catalog_refresh: std::result::Result<RefreshReport, Arc<CatalogError>>,
}

/// What [`reconcile`](RegistrationWorkflow::reconcile) found on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The submission was recorded; the workflow is now confirmed.
    Committed(SequenceId),
    /// No matching record is visible; resubmitting is allowed.
    NotCommitted,
}

/// A single registration, owned by the caller.
///
/// Workflows share only the catalog. Dropping one before it reaches
/// `Submitting` leaves at most an orphaned upload behind.
pub struct RegistrationWorkflow<L: ?Sized, C: ?Sized> {
    content: Content,
    ledger: Arc<L>,
    store: Arc<C>,
    catalog: Arc<EvidenceCatalog>,
    config: VaultConfig,

    state: RegistrationState,
    history: Vec<RegistrationState>,

    // Last known results, kept across failures for resume.
    fingerprint: Option<Fingerprint>,
    locator: Option<ContentLocator>,
    /// Ledger count observed just before the last append.
    submitted_from: Option<u64>,
    reconciled: bool,
    receipt: Option<RegistrationReceipt>,
}

impl<L, C> RegistrationWorkflow<L, C>
where
    L: Ledger + ?Sized,
    C: ContentStore + ?Sized,
{
    pub fn new(
        content: impl Into<Content>,
        ledger: Arc<L>,
        store: Arc<C>,
        catalog: Arc<EvidenceCatalog>,
        config: VaultConfig,
    ) -> Self {
        Self {
            content: content.into(),
            ledger,
            store,
            catalog,
            config,
            state: RegistrationState::Idle,
            history: vec![RegistrationState::Idle],
            fingerprint: None,
            locator: None,
            submitted_from: None,
            reconciled: false,
            receipt: None,
        }
    }

    pub fn state(&self) -> &RegistrationState {
        &self.state
    }

    /// Every state entered, in order, starting with `Idle`.
    pub fn history(&self) -> &[RegistrationState] {
        &self.history
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    pub fn locator(&self) -> Option<&ContentLocator> {
        self.locator.as_ref()
    }

    /// Set once the workflow is confirmed and the catalog refresh has run.
    pub fn receipt(&self) -> Option<&RegistrationReceipt> {
        self.receipt.as_ref()
    }

    /// Perform one transition.
    pub async fn step(&mut self) -> &RegistrationState {
        match self.state.clone() {
            RegistrationState::Idle => self.transition(RegistrationState::Hashing),
            RegistrationState::Hashing => self.hash().await,
            RegistrationState::Uploading { fingerprint } => self.upload(fingerprint).await,
            RegistrationState::Submitting {
                fingerprint,
                locator,
            } => self.submit(fingerprint, locator).await,
            RegistrationState::Confirmed {
                fingerprint,
                locator,
                sequence_id,
            } if self.receipt.is_none() => self.settle(fingerprint, locator, sequence_id).await,
            RegistrationState::Confirmed { .. } | RegistrationState::Failed(_) => {}
        }
        &self.state
    }

    /// Step until the registration is confirmed or fails.
    pub async fn run(&mut self) -> std::result::Result<RegistrationReceipt, RegistrationFailed> {
        loop {
            if let Some(receipt) = &self.receipt {
                return Ok(receipt.clone());
            }
            if let RegistrationState::Failed(failed) = &self.state {
                return Err(failed.clone());
            }
            self.step().await;
        }
    }

    /// Retry from the stage that failed.
    ///
    /// Hashing starts over. Uploading keeps the fingerprint and uploads
    /// again, discarding any earlier locator. Submitting resubmits the same
    /// locator and fingerprint. A submission that reached the ledger,
    /// rejected or indeterminate, must be reconciled first.
    pub fn resume(&mut self) -> std::result::Result<(), WorkflowError> {
        let failed = self.failure()?;

        let next = match (failed.stage, self.fingerprint, self.locator.clone()) {
            (Stage::Uploading, Some(fingerprint), _) => {
                self.locator = None;
                RegistrationState::Uploading { fingerprint }
            }
            (Stage::Submitting, Some(fingerprint), Some(locator)) => {
                RegistrationState::Submitting {
                    fingerprint,
                    locator,
                }
            }
            _ => {
                self.fingerprint = None;
                self.locator = None;
                RegistrationState::Hashing
            }
        };

        tracing::info!(stage = %failed.stage, resume_at = %next, "resuming registration");
        self.transition(next);
        Ok(())
    }

    /// Start over from hashing, for when the content may have changed.
    pub fn restart(&mut self) -> std::result::Result<(), WorkflowError> {
        self.failure()?;
        self.fingerprint = None;
        self.locator = None;
        self.transition(RegistrationState::Hashing);
        Ok(())
    }

    /// Look for a failed submission on the ledger.
    ///
    /// Scans records appended since the submission for one matching this
    /// workflow's submitter, locator and fingerprint. A match confirms the
    /// workflow. No match allows [`resume`](Self::resume); since the ledger
    /// may lag, a caller that can wait should reconcile again later before
    /// concluding the write was lost.
    pub async fn reconcile(&mut self) -> Result<ReconcileOutcome> {
        let pending = matches!(
            &self.state,
            RegistrationState::Failed(f) if f.needs_reconcile()
        );
        let (fingerprint, locator, from) =
            match (pending, self.fingerprint, self.locator.clone(), self.submitted_from) {
                (true, Some(fingerprint), Some(locator), Some(from)) => (fingerprint, locator, from),
                _ => return Err(WorkflowError::NothingToReconcile.into()),
            };

        let count = self.ledger.count().await?;
        for i in from..count {
            let record = self.ledger.get(SequenceId::new(i)).await?;
            if record.submitter == *self.ledger.submitter()
                && record.locator == locator
                && record.attests(&fingerprint)
            {
                tracing::info!(sequence_id = %record.sequence_id, "submission found on ledger");
                self.transition(RegistrationState::Confirmed {
                    fingerprint,
                    locator: locator.clone(),
                    sequence_id: record.sequence_id,
                });
                self.settle(fingerprint, locator, record.sequence_id).await;
                return Ok(ReconcileOutcome::Committed(record.sequence_id));
            }
        }

        tracing::info!(scanned = count.saturating_sub(from), "submission not found on ledger");
        self.reconciled = true;
        Ok(ReconcileOutcome::NotCommitted)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stages
    // ─────────────────────────────────────────────────────────────────────────

    async fn hash(&mut self) {
        let engine = self.config.fingerprint_engine();
        match fingerprint_content(&self.content, engine, self.config.background_hash_threshold).await
        {
            Ok(fingerprint) => {
                self.fingerprint = Some(fingerprint);
                self.transition(RegistrationState::Uploading { fingerprint });
            }
            Err(e) => self.fail(Stage::Hashing, RegistrationError::Io(e)),
        }
    }

    async fn upload(&mut self, fingerprint: Fingerprint) {
        let result = match self.put_content().await {
            Ok(locator) if self.config.verify_uploads => {
                self.check_upload(locator, fingerprint).await
            }
            other => other,
        };

        match result {
            Ok(locator) => {
                self.locator = Some(locator.clone());
                self.transition(RegistrationState::Submitting {
                    fingerprint,
                    locator,
                });
            }
            Err(cause) => {
                self.locator = None;
                self.fail(Stage::Uploading, cause);
            }
        }
    }

    async fn put_content(&self) -> std::result::Result<ContentLocator, RegistrationError> {
        let mut reader = self.content.open().await?;
        let put = self.store.put(&mut *reader);
        let result = match self.config.upload_timeout() {
            Some(limit) => tokio::time::timeout(limit, put)
                .await
                .map_err(|_| RegistrationError::UploadTimeout(limit))?,
            None => put.await,
        };
        result.map_err(RegistrationError::Upload)
    }

    async fn check_upload(
        &self,
        locator: ContentLocator,
        fingerprint: Fingerprint,
    ) -> std::result::Result<ContentLocator, RegistrationError> {
        match fetch_verified(self.store.as_ref(), &locator, &fingerprint, self.config.chunk_size).await
        {
            Ok(()) => Ok(locator),
            Err(StoreError::IntegrityMismatch {
                locator,
                expected,
                actual,
            }) => Err(RegistrationError::IntegrityMismatch {
                locator,
                expected,
                actual,
            }),
            Err(e) => Err(RegistrationError::Upload(e)),
        }
    }

    async fn submit(&mut self, fingerprint: Fingerprint, locator: ContentLocator) {
        let before = match self.ledger.count().await {
            Ok(n) => n,
            Err(e) => return self.fail(Stage::Submitting, RegistrationError::LedgerUnavailable(e)),
        };
        self.submitted_from = Some(before);
        self.reconciled = false;

        let append = self.ledger.append(&locator, &fingerprint);
        let outcome = match self.config.submit_timeout() {
            Some(limit) => tokio::time::timeout(limit, append).await.unwrap_or_else(|_| {
                Err(StoreError::SubmissionIndeterminate(format!(
                    "no confirmation within {:?}",
                    limit
                )))
            }),
            None => append.await,
        };

        match outcome {
            Ok(sequence_id) => {
                self.transition(RegistrationState::Confirmed {
                    fingerprint,
                    locator,
                    sequence_id,
                });
            }
            Err(e @ StoreError::SubmissionRejected(_)) => {
                self.fail(Stage::Submitting, RegistrationError::SubmissionRejected(e))
            }
            Err(e) => self.fail(
                Stage::Submitting,
                RegistrationError::SubmissionIndeterminate(e.to_string()),
            ),
        }
    }

    /// Refresh the shared catalog after confirmation and issue the receipt.
    async fn settle(&mut self, fingerprint: Fingerprint, locator: ContentLocator, sequence_id: SequenceId) {
        self.catalog.expect_at_least(sequence_id.next().value());

        let catalog_refresh = self.catalog.refresh(self.ledger.as_ref()).await.map_err(Arc::new);
        if let Err(e) = &catalog_refresh {
            tracing::warn!(%sequence_id, error = %e, "catalog refresh after confirmation failed");
        }

        self.receipt = Some(RegistrationReceipt {
            fingerprint,
            locator,
            sequence_id,
            submitter: self.ledger.submitter().clone(),
            catalog_refresh,
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bookkeeping
    // ─────────────────────────────────────────────────────────────────────────

    fn failure(&self) -> std::result::Result<RegistrationFailed, WorkflowError> {
        match &self.state {
            RegistrationState::Failed(failed) => {
                if failed.needs_reconcile() && !self.reconciled {
                    return Err(WorkflowError::ReconcileRequired);
                }
                Ok(failed.clone())
            }
            _ => Err(WorkflowError::NotFailed),
        }
    }

    fn fail(&mut self, stage: Stage, cause: RegistrationError) {
        if cause.is_indeterminate() {
            tracing::warn!(%stage, %cause, "registration outcome unknown");
        }
        self.transition(RegistrationState::Failed(RegistrationFailed::new(stage, cause)));
    }

    fn transition(&mut self, next: RegistrationState) {
        tracing::info!(from = %self.state, to = %next, "registration transition");
        self.state = next.clone();
        self.history.push(next);
    }
}
