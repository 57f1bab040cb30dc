//! The evidence catalog: a local, rebuilt-on-refresh view of the ledger.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use truelocker_core::{EvidenceRecord, Fingerprint, Identity, SequenceId};
use truelocker_store::Ledger;

use crate::convergence::{compute_digest, CatalogDigest};
use crate::error::{CatalogError, Result, StaleCatalogError};

/// Upper bound on records reserved ahead of fetching.
const MAX_PREALLOC: u64 = 4096;

/// How a refresh treats records appended while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Fetch exactly the records counted when the refresh started.
    #[default]
    Snapshot,
    /// After fetching, re-count and keep extending the new snapshot until
    /// the count stops moving or `max_rounds` extra rounds have run.
    UntilStable { max_rounds: u32 },
}

/// Outcome of a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    /// Generation of the snapshot now in place.
    pub generation: u64,
    /// Records in the snapshot now in place.
    pub records: usize,
    /// Records gained relative to the previous snapshot.
    pub added: usize,
    /// Whether the refreshed snapshot was installed. False when a
    /// concurrent refresh had already installed a longer one.
    pub applied: bool,
}

/// One complete, immutable generation of the catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    records: Vec<EvidenceRecord>,
    /// Fingerprint -> index of its earliest record.
    by_fingerprint: HashMap<Fingerprint, usize>,
    generation: u64,
}

impl CatalogSnapshot {
    /// An empty generation-zero snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from records in ledger order.
    ///
    /// Fails unless record `i` carries sequence id `i`.
    pub fn from_records(records: Vec<EvidenceRecord>) -> Result<Self> {
        let mut by_fingerprint = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let expected = SequenceId::new(i as u64);
            if record.sequence_id != expected {
                return Err(CatalogError::InconsistentLedger {
                    expected,
                    got: record.sequence_id,
                });
            }
            by_fingerprint.entry(record.fingerprint).or_insert(i);
        }
        Ok(Self {
            records,
            by_fingerprint,
            generation: 0,
        })
    }

    /// Refresh generation this snapshot was installed as.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, ordered by sequence id.
    pub fn all(&self) -> &[EvidenceRecord] {
        &self.records
    }

    /// Record at a given sequence id.
    pub fn get(&self, id: SequenceId) -> Option<&EvidenceRecord> {
        usize::try_from(id.value())
            .ok()
            .and_then(|i| self.records.get(i))
    }

    /// Earliest record carrying the fingerprint.
    pub fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> Option<&EvidenceRecord> {
        self.by_fingerprint
            .get(fingerprint)
            .map(|&i| &self.records[i])
    }

    /// Every record carrying the fingerprint, earliest first.
    pub fn all_by_fingerprint<'a>(
        &'a self,
        fingerprint: &'a Fingerprint,
    ) -> impl Iterator<Item = &'a EvidenceRecord> + 'a {
        let start = self.by_fingerprint.get(fingerprint).copied();
        start
            .into_iter()
            .flat_map(move |i| self.records[i..].iter())
            .filter(move |r| r.fingerprint == *fingerprint)
    }

    /// Records submitted by an identity, in ledger order.
    pub fn by_submitter<'a>(
        &'a self,
        submitter: &'a Identity,
    ) -> impl Iterator<Item = &'a EvidenceRecord> + 'a {
        self.records.iter().filter(move |r| r.submitter == *submitter)
    }

    /// Digest over every record, for convergence checks.
    pub fn digest(&self) -> Result<CatalogDigest> {
        compute_digest(&self.records)
    }
}

/// The local read model of the ledger.
///
/// Owned by the caller for the duration of a session; nothing is persisted.
/// Readers get an `Arc` to the current snapshot and can hold it for as long
/// as they like without blocking refreshes.
#[derive(Debug)]
pub struct EvidenceCatalog {
    current: RwLock<Arc<CatalogSnapshot>>,
    /// Lower bound on the ledger length, learned from confirmed appends.
    expected_len: AtomicU64,
    policy: RefreshPolicy,
}

impl EvidenceCatalog {
    /// Create an empty catalog with the default refresh policy.
    pub fn new() -> Self {
        Self::with_policy(RefreshPolicy::default())
    }

    /// Create an empty catalog.
    pub fn with_policy(policy: RefreshPolicy) -> Self {
        Self {
            current: RwLock::new(Arc::new(CatalogSnapshot::empty())),
            expected_len: AtomicU64::new(0),
            policy,
        }
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// The current generation.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        // The lock only guards an Arc swap, which cannot be left half-done.
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// All records of the current generation.
    pub fn all(&self) -> Vec<EvidenceRecord> {
        self.snapshot().all().to_vec()
    }

    /// Earliest record carrying the fingerprint in the current generation.
    pub fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> Option<EvidenceRecord> {
        self.snapshot().find_by_fingerprint(fingerprint).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Note that the ledger is known to hold at least `len` records.
    pub fn expect_at_least(&self, len: u64) {
        self.expected_len.fetch_max(len, Ordering::SeqCst);
    }

    /// Check the current generation against what the caller expects.
    pub fn check_fresh(&self) -> std::result::Result<(), StaleCatalogError> {
        self.check_fresh_for(&self.snapshot())
    }

    /// Check a snapshot previously taken from this catalog.
    pub fn check_fresh_for(
        &self,
        snapshot: &CatalogSnapshot,
    ) -> std::result::Result<(), StaleCatalogError> {
        let observed = snapshot.len() as u64;
        let expected = self.expected_len.load(Ordering::SeqCst);
        if observed < expected {
            return Err(StaleCatalogError { observed, expected });
        }
        Ok(())
    }

    /// Rebuild the catalog from the ledger.
    ///
    /// The new generation is assembled off to the side. Any ledger error
    /// aborts the refresh and leaves the current generation in place.
    pub async fn refresh<L>(&self, ledger: &L) -> Result<RefreshReport>
    where
        L: Ledger + ?Sized,
    {
        let mut target = ledger.count().await?;
        let mut records = Vec::with_capacity(target.min(MAX_PREALLOC) as usize);
        fetch_range(ledger, &mut records, 0, target).await?;

        if let RefreshPolicy::UntilStable { max_rounds } = self.policy {
            for _ in 0..max_rounds {
                let now = ledger.count().await?;
                if now <= target {
                    break;
                }
                tracing::debug!(from = target, to = now, "ledger grew during refresh");
                fetch_range(ledger, &mut records, target, now).await?;
                target = now;
            }
        }

        let snapshot = CatalogSnapshot::from_records(records)?;
        Ok(self.install(snapshot))
    }

    fn install(&self, mut snapshot: CatalogSnapshot) -> RefreshReport {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);

        if snapshot.len() < current.len() {
            tracing::warn!(
                fetched = snapshot.len(),
                installed = current.len(),
                "discarding refresh older than installed generation"
            );
            return RefreshReport {
                generation: current.generation,
                records: current.len(),
                added: 0,
                applied: false,
            };
        }

        let added = snapshot.len() - current.len();
        snapshot.generation = current.generation + 1;
        let report = RefreshReport {
            generation: snapshot.generation,
            records: snapshot.len(),
            added,
            applied: true,
        };
        *current = Arc::new(snapshot);

        tracing::debug!(
            generation = report.generation,
            records = report.records,
            added = report.added,
            "catalog refreshed"
        );
        report
    }
}

impl Default for EvidenceCatalog {
    fn default() -> Self {
        Self::new()
    }
}

async fn fetch_range<L>(
    ledger: &L,
    records: &mut Vec<EvidenceRecord>,
    start: u64,
    end: u64,
) -> Result<()>
where
    L: Ledger + ?Sized,
{
    for i in start..end {
        records.push(ledger.get(SequenceId::new(i)).await?);
    }
    Ok(())
}
