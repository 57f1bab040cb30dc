//! The Vault: unified API for registering and verifying evidence.
//!
//! The Vault ties a ledger handle, a content store and one shared catalog
//! together, and hands out registration workflows that use all three.

use std::sync::Arc;

use truelocker_catalog::{
    compare_with_ledger, CatalogSnapshot, Convergence, EvidenceCatalog, RefreshReport,
    StaleCatalogError, StoredContent, VerificationEngine, VerificationOutcome,
};
use truelocker_core::{EvidenceRecord, Fingerprint, Identity};
use truelocker_store::{ContentStore, Ledger};

use crate::config::VaultConfig;
use crate::error::Result;
use crate::hashing::{fingerprint_content, Content};
use crate::workflow::{RegistrationReceipt, RegistrationWorkflow};

/// Result of verifying content through the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    /// Fingerprint of the content that was checked.
    pub fingerprint: Fingerprint,
    pub outcome: VerificationOutcome,
    /// Catalog generation the outcome was computed against.
    pub generation: u64,
    /// Set when the catalog is known to be missing confirmed records.
    pub stale: Option<StaleCatalogError>,
}

impl VerificationReport {
    pub fn is_match(&self) -> bool {
        self.outcome.is_match()
    }
}

/// An evidence vault bound to one submitter identity.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use truelocker::{Vault, VaultConfig};
/// use truelocker::store::{MemoryContentStore, MemoryLedger};
/// use truelocker::core::Identity;
///
/// async fn example() -> truelocker::Result<()> {
///     let ledger = Arc::new(MemoryLedger::new(Identity::new("0xabc")?));
///     let store = Arc::new(MemoryContentStore::new());
///     let vault = Vault::connect(ledger, store, VaultConfig::default()).await?;
///
///     let receipt = vault.register("photo bytes").await?;
///     let report = vault.verify("photo bytes").await?;
///     assert_eq!(report.outcome.record().map(|r| r.sequence_id), Some(receipt.sequence_id));
///     Ok(())
/// }
/// ```
pub struct Vault<L: ?Sized, C: ?Sized> {
    ledger: Arc<L>,
    store: Arc<C>,
    catalog: Arc<EvidenceCatalog>,
    config: VaultConfig,
    verifier: VerificationEngine,
}

impl<L, C> Vault<L, C>
where
    L: Ledger + ?Sized,
    C: ContentStore + ?Sized,
{
    /// Create a vault and load the catalog for its identity.
    pub async fn connect(ledger: Arc<L>, store: Arc<C>, config: VaultConfig) -> Result<Self> {
        let vault = Self::new(ledger, store, config);
        let report = vault.refresh().await?;
        tracing::info!(
            submitter = %vault.submitter(),
            records = report.records,
            "vault connected"
        );
        Ok(vault)
    }

    /// Create a vault with an empty catalog. Call [`refresh`](Self::refresh)
    /// before relying on verification results.
    pub fn new(ledger: Arc<L>, store: Arc<C>, config: VaultConfig) -> Self {
        let catalog = Arc::new(EvidenceCatalog::with_policy(config.refresh_policy));
        let verifier = VerificationEngine::new(config.fingerprint_engine());
        Self {
            ledger,
            store,
            catalog,
            config,
            verifier,
        }
    }

    /// The identity this vault submits as.
    pub fn submitter(&self) -> &Identity {
        self.ledger.submitter()
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<EvidenceCatalog> {
        &self.catalog
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn store(&self) -> &Arc<C> {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────────

    /// A new workflow for `content`, sharing this vault's catalog.
    pub fn workflow(&self, content: impl Into<Content>) -> RegistrationWorkflow<L, C> {
        RegistrationWorkflow::new(
            content,
            Arc::clone(&self.ledger),
            Arc::clone(&self.store),
            Arc::clone(&self.catalog),
            self.config.clone(),
        )
    }

    /// Register content in one go.
    ///
    /// On failure the workflow is dropped. Use [`workflow`](Self::workflow)
    /// to keep it for resume or reconcile.
    pub async fn register(&self, content: impl Into<Content>) -> Result<RegistrationReceipt> {
        Ok(self.workflow(content).run().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Catalog
    // ─────────────────────────────────────────────────────────────────────────

    /// Rebuild the catalog from the ledger.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        Ok(self.catalog.refresh(self.ledger.as_ref()).await?)
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.catalog.snapshot()
    }

    /// All known records, ordered by sequence id.
    pub fn records(&self) -> Vec<EvidenceRecord> {
        self.catalog.all()
    }

    /// Records this vault's identity submitted.
    pub fn own_records(&self) -> Vec<EvidenceRecord> {
        self.snapshot()
            .by_submitter(self.submitter())
            .cloned()
            .collect()
    }

    /// Compare the catalog with the ledger's current contents.
    pub async fn convergence(&self) -> Result<Convergence> {
        Ok(compare_with_ledger(&self.snapshot(), self.ledger.as_ref()).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Verification
    // ─────────────────────────────────────────────────────────────────────────

    /// Fingerprint content and look it up in the current catalog.
    pub async fn verify(&self, content: impl Into<Content>) -> Result<VerificationReport> {
        let content = content.into();
        let fingerprint = fingerprint_content(
            &content,
            self.config.fingerprint_engine(),
            self.config.background_hash_threshold,
        )
        .await?;
        Ok(self.verify_fingerprint(fingerprint))
    }

    /// Look up a fingerprint given as hex text.
    pub fn verify_hex(&self, hex: &str) -> Result<VerificationReport> {
        Ok(self.verify_fingerprint(Fingerprint::from_hex(hex)?))
    }

    pub fn verify_fingerprint(&self, fingerprint: Fingerprint) -> VerificationReport {
        self.report(fingerprint, &self.snapshot())
    }

    /// Outcome and staleness both judged against `snapshot`.
    fn report(&self, fingerprint: Fingerprint, snapshot: &CatalogSnapshot) -> VerificationReport {
        let outcome = self.verifier.verify_fingerprint(&fingerprint, snapshot);
        let stale = self.catalog.check_fresh_for(snapshot).err();
        if let Some(stale) = &stale {
            tracing::debug!(%stale, "verified against stale catalog");
        }
        VerificationReport {
            fingerprint,
            outcome,
            generation: snapshot.generation(),
            stale,
        }
    }

    /// Check that the store still holds an intact original for `record`.
    pub async fn verify_stored(&self, record: &EvidenceRecord) -> Result<StoredContent> {
        Ok(self.verifier.verify_stored(record, self.store.as_ref()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use truelocker_store::{MemoryContentStore, MemoryLedger};

    async fn vault(name: &str) -> Vault<MemoryLedger, MemoryContentStore> {
        Vault::connect(
            Arc::new(MemoryLedger::new(Identity::new(name).unwrap())),
            Arc::new(MemoryContentStore::new()),
            VaultConfig::default(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_register_then_verify() {
        let vault = vault("alice").await;
        let receipt = vault.register("exhibit A").await.unwrap();

        let report = vault.verify("exhibit A").await.unwrap();
        assert!(report.is_match());
        assert_eq!(report.outcome.record().unwrap().locator, receipt.locator);
        assert_eq!(report.stale, None);

        let hex = receipt.fingerprint.to_hex().to_uppercase();
        assert!(vault.verify_hex(&hex).unwrap().is_match());
        assert!(vault.verify_hex("xyz").is_err());

        assert!(!vault.verify("exhibit B").await.unwrap().is_match());
        assert_eq!(vault.own_records().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_flag_matches_the_snapshot_searched() {
        let vault = vault("alice").await;
        let before = vault.snapshot();
        let receipt = vault.register("exhibit C").await.unwrap();

        // A newer generation is installed, but the older one was searched.
        let report = vault.report(receipt.fingerprint, &before);
        assert!(!report.is_match());
        assert_eq!(report.generation, before.generation());
        let stale = report.stale.unwrap();
        assert_eq!((stale.observed, stale.expected), (0, 1));

        assert_eq!(vault.verify_fingerprint(receipt.fingerprint).stale, None);
    }

    #[tokio::test]
    async fn test_verify_stored_original() {
        let vault = vault("alice").await;
        vault.register("signed contract").await.unwrap();
        let record = vault.records().remove(0);

        assert_eq!(vault.verify_stored(&record).await.unwrap(), StoredContent::Intact);

        vault.store().corrupt(&record.locator).unwrap();
        assert!(matches!(
            vault.verify_stored(&record).await.unwrap(),
            StoredContent::Corrupted { .. }
        ));
    }

    #[tokio::test]
    async fn test_stale_flag_after_failed_refresh() {
        let vault = vault("alice").await;
        vault.ledger().set_unavailable_at(Some(truelocker_core::SequenceId::FIRST)).unwrap();

        let receipt = vault.register("late photo").await.unwrap();
        assert!(receipt.catalog_refresh.is_err());

        let report = vault.verify("late photo").await.unwrap();
        assert!(!report.is_match());
        assert_eq!(
            report.stale,
            Some(StaleCatalogError {
                observed: 0,
                expected: 1
            })
        );

        vault.ledger().set_unavailable_at(None).unwrap();
        vault.refresh().await.unwrap();
        let report = vault.verify("late photo").await.unwrap();
        assert!(report.is_match());
        assert_eq!(report.stale, None);
        assert!(vault.convergence().await.unwrap().is_converged());
    }
}
