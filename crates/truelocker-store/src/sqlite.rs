//! SQLite implementation of the Ledger trait.
//!
//! A persistent local ledger for development and offline use. It uses
//! rusqlite with bundled SQLite, wrapped in async via tokio::spawn_blocking.
//! Immutability of committed rows is enforced by triggers (see
//! [`migration`](crate::migration)).

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use truelocker_core::{
    ContentLocator, EvidenceRecord, Fingerprint, Identity, LedgerRecord, SequenceId,
};

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::Ledger;

/// SQLite-backed ledger.
///
/// Thread-safe via internal Mutex. Handles made with
/// [`with_submitter`](Self::with_submitter) share one connection.
#[derive(Clone)]
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
    submitter: Identity,
    clock: Arc<dyn Clock>,
}

impl SqliteLedger {
    /// Open a ledger database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>, submitter: Identity) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn, submitter))
    }

    /// Open an in-memory ledger database.
    ///
    /// Useful for testing.
    pub fn open_memory(submitter: Identity) -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn, submitter))
    }

    fn from_connection(conn: Connection, submitter: Identity) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            submitter,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the commit clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Another handle onto the same database, writing as a different identity.
    pub fn with_submitter(&self, submitter: Identity) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            submitter,
            clock: Arc::clone(&self.clock),
        }
    }

    /// Run a closure against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Internal(format!("connection mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Internal(format!("spawn_blocking failed: {}", e)))?
    }
}

fn row_to_wire(row: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerRecord> {
    Ok(LedgerRecord {
        locator: row.get("locator")?,
        fingerprint: row.get("fingerprint")?,
        submitter: row.get("submitter")?,
        recorded_at: row.get::<_, i64>("recorded_at")? as u64,
        sequence_id: row.get::<_, i64>("sequence_id")? as u64,
    })
}

#[async_trait]
impl Ledger for SqliteLedger {
    fn submitter(&self) -> &Identity {
        &self.submitter
    }

    async fn append(
        &self,
        locator: &ContentLocator,
        fingerprint: &Fingerprint,
    ) -> Result<SequenceId> {
        let locator = locator.as_str().to_string();
        let fingerprint = fingerprint.to_hex();
        let submitter = self.submitter.as_str().to_string();
        let clock = Arc::clone(&self.clock);

        self.blocking(move |conn| {
            let tx = conn
                .transaction()
                .map_err(|e| StoreError::SubmissionRejected(e.to_string()))?;

            let next: i64 = tx
                .query_row("SELECT COUNT(*) FROM evidence", [], |row| row.get(0))
                .map_err(|e| StoreError::SubmissionRejected(e.to_string()))?;

            tx.execute(
                "INSERT INTO evidence (sequence_id, locator, fingerprint, submitter, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![next, locator, fingerprint, submitter, clock.now_secs() as i64],
            )
            .map_err(|e| StoreError::SubmissionRejected(e.to_string()))?;

            // A failed commit may or may not have reached disk.
            tx.commit()
                .map_err(|e| StoreError::SubmissionIndeterminate(e.to_string()))?;

            Ok(SequenceId::new(next as u64))
        })
        .await
    }

    async fn count(&self) -> Result<u64> {
        self.blocking(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM evidence", [], |row| row.get(0))?;
            Ok(n as u64)
        })
        .await
    }

    async fn get(&self, id: SequenceId) -> Result<EvidenceRecord> {
        let wire = self
            .blocking(move |conn| {
                conn.query_row(
                    "SELECT locator, fingerprint, submitter, recorded_at, sequence_id
                     FROM evidence WHERE sequence_id = ?1",
                    params![id.value() as i64],
                    row_to_wire,
                )
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("record {}", id)))
            })
            .await?;

        Ok(EvidenceRecord::try_from(wire)?)
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
    async fn test_sqlite_append_and_read() {
        let clock = Arc::new(ManualClock::new(1_736_870_400));
        let ledger = SqliteLedger::open_memory(identity("0xabc"))
            .unwrap()
            .with_clock(clock);

        let fp = Fingerprint::of(b"alice");
        let id = ledger.append(&locator("bafy-1"), &fp).await.unwrap();
        assert_eq!(id, SequenceId::FIRST);
        assert_eq!(ledger.count().await.unwrap(), 1);

        let record = ledger.get(id).await.unwrap();
        assert_eq!(record.fingerprint, fp);
        assert_eq!(record.locator, locator("bafy-1"));
        assert_eq!(record.submitter, identity("0xabc"));
        assert_eq!(record.recorded_at, 1_736_870_400);
    }

    #[tokio::test]
    async fn test_sqlite_missing_record() {
        let ledger = SqliteLedger::open_memory(identity("0xabc")).unwrap();
        assert!(matches!(
            ledger.get(SequenceId::new(3)).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        {
            let ledger = SqliteLedger::open(&path, identity("alice")).unwrap();
            ledger.append(&locator("l0"), &Fingerprint::of(b"0")).await.unwrap();
            ledger.append(&locator("l1"), &Fingerprint::of(b"1")).await.unwrap();
        }

        let reopened = SqliteLedger::open(&path, identity("bob")).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);
        let id = reopened
            .append(&locator("l2"), &Fingerprint::of(b"2"))
            .await
            .unwrap();
        assert_eq!(id, SequenceId::new(2));
        assert_eq!(reopened.get(SequenceId::new(0)).await.unwrap().submitter, identity("alice"));
    }

    #[tokio::test]
    async fn test_sqlite_shared_handles() {
        let alice = SqliteLedger::open_memory(identity("alice")).unwrap();
        let bob = alice.with_submitter(identity("bob"));

        alice.append(&locator("l0"), &Fingerprint::of(b"same")).await.unwrap();
        let id = bob.append(&locator("l1"), &Fingerprint::of(b"same")).await.unwrap();

        let record = alice.get(id).await.unwrap();
        assert_eq!(record.submitter, identity("bob"));
        assert_eq!(record.fingerprint, Fingerprint::of(b"same"));
    }
}
