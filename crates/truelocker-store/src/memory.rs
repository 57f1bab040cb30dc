//! In-memory implementations of the store traits.
//!
//! These are primarily for testing. They keep the semantics of the real
//! services (ledger-assigned ids and times, dense ids, indeterminate
//! submissions) and add fault injection so failure paths can be exercised.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;

use truelocker_core::{ContentLocator, EvidenceRecord, Fingerprint, Identity, SequenceId};

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, StoreError};
use crate::locator::locator_for;
use crate::traits::{ContentReader, ContentStore, ContentStream, Ledger};

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Internal(format!("lock poisoned: {}", e))
}

// ─────────────────────────────────────────────────────────────────────────────
// Content store
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory content store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryContentStore {
    blobs: RwLock<HashMap<ContentLocator, Bytes>>,
    faults: Mutex<ContentFaults>,
}

#[derive(Debug, Default)]
struct ContentFaults {
    failing_puts: u32,
    put_delay: Option<Duration>,
}

impl MemoryContentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            faults: Mutex::new(ContentFaults::default()),
        }
    }

    /// Make the next `n` uploads fail with `StoreError::Upload`.
    pub fn fail_next_puts(&self, n: u32) -> Result<()> {
        self.faults.lock().map_err(poisoned)?.failing_puts = n;
        Ok(())
    }

    /// Delay every upload by `delay` before it stores anything.
    pub fn set_put_delay(&self, delay: Option<Duration>) -> Result<()> {
        self.faults.lock().map_err(poisoned)?.put_delay = delay;
        Ok(())
    }

    /// Flip the stored bytes for a locator, simulating silent corruption.
    pub fn corrupt(&self, locator: &ContentLocator) -> Result<()> {
        let mut blobs = self.blobs.write().map_err(poisoned)?;
        let blob = blobs
            .get_mut(locator)
            .ok_or_else(|| StoreError::NotFound(locator.to_string()))?;
        let mut bytes = blob.to_vec();
        match bytes.first_mut() {
            Some(first) => *first ^= 0xff,
            None => bytes.push(0),
        }
        *blob = Bytes::from(bytes);
        Ok(())
    }

    /// Drop content, simulating an unpinned blob.
    pub fn evict(&self, locator: &ContentLocator) -> Result<bool> {
        Ok(self.blobs.write().map_err(poisoned)?.remove(locator).is_some())
    }

    /// Number of stored blobs.
    pub fn len(&self) -> Result<usize> {
        Ok(self.blobs.read().map_err(poisoned)?.len())
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, content: ContentReader<'_>) -> Result<ContentLocator> {
        let delay = {
            let mut faults = self.faults.lock().map_err(poisoned)?;
            if faults.failing_puts > 0 {
                faults.failing_puts -= 1;
                return Err(StoreError::Upload("injected upload failure".into()));
            }
            faults.put_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut buf = Vec::new();
        content.read_to_end(&mut buf).await?;
        let locator = locator_for(&buf);

        self.blobs
            .write()
            .map_err(poisoned)?
            .insert(locator.clone(), Bytes::from(buf));
        Ok(locator)
    }

    async fn get(&self, locator: &ContentLocator) -> Result<ContentStream> {
        let blobs = self.blobs.read().map_err(poisoned)?;
        let blob = blobs
            .get(locator)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(locator.to_string()))?;
        Ok(Box::new(std::io::Cursor::new(blob)))
    }

    async fn contains(&self, locator: &ContentLocator) -> Result<bool> {
        Ok(self.blobs.read().map_err(poisoned)?.contains_key(locator))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ledger
// ─────────────────────────────────────────────────────────────────────────────

/// Faults to inject into the next ledger operations.
#[derive(Debug, Default)]
struct LedgerFaults {
    /// Appends to reject before committing.
    reject_appends: u32,
    /// Appends to commit but report as indeterminate.
    lose_confirmations: u32,
    /// Counts to fail with `Unavailable`.
    failing_counts: u32,
    /// Fail reads of this id with `Unavailable`.
    unavailable_at: Option<u64>,
    /// Sleep before committing each append.
    append_delay: Option<Duration>,
}

struct SharedLedger {
    records: RwLock<Vec<EvidenceRecord>>,
    faults: Mutex<LedgerFaults>,
    clock: Arc<dyn Clock>,
}

/// In-memory append-only ledger.
///
/// Handles created with [`with_submitter`](Self::with_submitter) share the
/// same record log, so several identities can write to one ledger.
#[derive(Clone)]
pub struct MemoryLedger {
    shared: Arc<SharedLedger>,
    submitter: Identity,
}

impl MemoryLedger {
    /// Create an empty ledger using wall-clock commit times.
    pub fn new(submitter: Identity) -> Self {
        Self::with_clock(submitter, Arc::new(SystemClock))
    }

    /// Create an empty ledger with a custom clock.
    pub fn with_clock(submitter: Identity, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(SharedLedger {
                records: RwLock::new(Vec::new()),
                faults: Mutex::new(LedgerFaults::default()),
                clock,
            }),
            submitter,
        }
    }

    /// Another handle onto the same ledger, writing as a different identity.
    pub fn with_submitter(&self, submitter: Identity) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            submitter,
        }
    }

    /// Reject the next `n` appends without committing them.
    pub fn reject_next_appends(&self, n: u32) -> Result<()> {
        self.faults()?.reject_appends = n;
        Ok(())
    }

    /// Commit the next `n` appends but report them as indeterminate.
    pub fn lose_next_confirmations(&self, n: u32) -> Result<()> {
        self.faults()?.lose_confirmations = n;
        Ok(())
    }

    /// Make the next `n` calls to `count` fail with `Unavailable`.
    pub fn fail_next_counts(&self, n: u32) -> Result<()> {
        self.faults()?.failing_counts = n;
        Ok(())
    }

    /// Make reads of `id` fail until cleared with `None`.
    pub fn set_unavailable_at(&self, id: Option<SequenceId>) -> Result<()> {
        self.faults()?.unavailable_at = id.map(|id| id.value());
        Ok(())
    }

    /// Delay every append by `delay` before it commits.
    pub fn set_append_delay(&self, delay: Option<Duration>) -> Result<()> {
        self.faults()?.append_delay = delay;
        Ok(())
    }

    /// Snapshot of every committed record.
    pub fn records(&self) -> Result<Vec<EvidenceRecord>> {
        Ok(self.shared.records.read().map_err(poisoned)?.clone())
    }

    fn faults(&self) -> Result<std::sync::MutexGuard<'_, LedgerFaults>> {
        self.shared.faults.lock().map_err(poisoned)
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    fn submitter(&self) -> &Identity {
        &self.submitter
    }

    async fn append(
        &self,
        locator: &ContentLocator,
        fingerprint: &Fingerprint,
    ) -> Result<SequenceId> {
        let (delay, lose_confirmation) = {
            let mut faults = self.faults()?;
            if faults.reject_appends > 0 {
                faults.reject_appends -= 1;
                return Err(StoreError::SubmissionRejected("injected rejection".into()));
            }
            let lose = faults.lose_confirmations > 0;
            if lose {
                faults.lose_confirmations -= 1;
            }
            (faults.append_delay, lose)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let id = {
            let mut records = self.shared.records.write().map_err(poisoned)?;
            let id = SequenceId::new(records.len() as u64);
            records.push(EvidenceRecord {
                locator: locator.clone(),
                fingerprint: *fingerprint,
                submitter: self.submitter.clone(),
                recorded_at: self.shared.clock.now_secs(),
                sequence_id: id,
            });
            id
        };

        if lose_confirmation {
            return Err(StoreError::SubmissionIndeterminate(format!(
                "confirmation for {} lost",
                id
            )));
        }
        Ok(id)
    }

    async fn count(&self) -> Result<u64> {
        {
            let mut faults = self.faults()?;
            if faults.failing_counts > 0 {
                faults.failing_counts -= 1;
                return Err(StoreError::Unavailable("injected count failure".into()));
            }
        }
        Ok(self.shared.records.read().map_err(poisoned)?.len() as u64)
    }

    async fn get(&self, id: SequenceId) -> Result<EvidenceRecord> {
        if self.faults()?.unavailable_at == Some(id.value()) {
            return Err(StoreError::Unavailable(format!("read of {} failed", id)));
        }
        let records = self.shared.records.read().map_err(poisoned)?;
        usize::try_from(id.value())
            .ok()
            .and_then(|i| records.get(i))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("record {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn identity(s: &str) -> Identity {
        Identity::new(s).unwrap()
    }

    fn locator(s: &str) -> ContentLocator {
        ContentLocator::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_ledger_assigns_dense_ids_and_times() {
        let clock = Arc::new(ManualClock::new(1_000));
        let ledger = MemoryLedger::with_clock(identity("0xaaa"), clock.clone());

        let a = ledger.append(&locator("loc-a"), &Fingerprint::of(b"a")).await.unwrap();
        clock.advance(10);
        let b = ledger.append(&locator("loc-b"), &Fingerprint::of(b"b")).await.unwrap();

        assert_eq!(a, SequenceId::new(0));
        assert_eq!(b, SequenceId::new(1));
        assert_eq!(ledger.count().await.unwrap(), 2);

        let rb = ledger.get(b).await.unwrap();
        assert_eq!(rb.recorded_at, 1_010);
        assert_eq!(rb.submitter, identity("0xaaa"));
        assert!(matches!(
            ledger.get(SequenceId::new(2)).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_handles_share_one_log() {
        let alice = MemoryLedger::new(identity("alice"));
        let bob = alice.with_submitter(identity("bob"));

        alice.append(&locator("l1"), &Fingerprint::of(b"x")).await.unwrap();
        let id = bob.append(&locator("l2"), &Fingerprint::of(b"x")).await.unwrap();

        assert_eq!(alice.count().await.unwrap(), 2);
        assert_eq!(alice.get(id).await.unwrap().submitter, identity("bob"));
    }

    #[tokio::test]
    async fn test_rejected_append_commits_nothing() {
        let ledger = MemoryLedger::new(identity("alice"));
        ledger.reject_next_appends(1).unwrap();

        let err = ledger
            .append(&locator("l1"), &Fingerprint::of(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SubmissionRejected(_)));
        assert_eq!(ledger.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lost_confirmation_still_commits() {
        let ledger = MemoryLedger::new(identity("alice"));
        ledger.lose_next_confirmations(1).unwrap();

        let err = ledger
            .append(&locator("l1"), &Fingerprint::of(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SubmissionIndeterminate(_)));
        assert!(!err.is_retryable());
        assert_eq!(ledger.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_read() {
        let ledger = MemoryLedger::new(identity("alice"));
        let id = ledger.append(&locator("l1"), &Fingerprint::of(b"x")).await.unwrap();
        ledger.set_unavailable_at(Some(id)).unwrap();
        assert!(matches!(ledger.get(id).await, Err(StoreError::Unavailable(_))));
        ledger.set_unavailable_at(None).unwrap();
        assert!(ledger.get(id).await.is_ok());
    }

    #[tokio::test]
    async fn test_content_store_roundtrip_and_faults() {
        let store = MemoryContentStore::new();
        store.fail_next_puts(1).unwrap();

        let mut data: &[u8] = b"photo.jpg bytes";
        let err = store.put(&mut data).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(store.is_empty().unwrap());

        let mut data: &[u8] = b"photo.jpg bytes";
        let locator = store.put(&mut data).await.unwrap();
        assert!(store.contains(&locator).await.unwrap());

        let mut out = Vec::new();
        store
            .get(&locator)
            .await
            .unwrap()
            .read_to_end(&mut out)
            .await
            .unwrap();
        assert_eq!(out, b"photo.jpg bytes");

        assert!(store.evict(&locator).unwrap());
        assert!(matches!(store.get(&locator).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_count_is_transient() {
        let ledger = MemoryLedger::new(identity("alice"));
        ledger.fail_next_counts(1).unwrap();
        assert!(matches!(ledger.count().await, Err(StoreError::Unavailable(_))));
        assert_eq!(ledger.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_delay_holds_upload() {
        let store = MemoryContentStore::new();
        store.set_put_delay(Some(Duration::from_millis(200))).unwrap();

        let mut data: &[u8] = b"slow";
        let put = store.put(&mut data);
        assert!(tokio::time::timeout(Duration::from_millis(10), put).await.is_err());
        assert!(store.is_empty().unwrap());

        store.set_put_delay(None).unwrap();
        let mut data: &[u8] = b"slow";
        store.put(&mut data).await.unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }
}
