//! Matching content against the catalog.

use std::io::Read;

use tokio::io::AsyncRead;

use truelocker_core::{EvidenceRecord, Fingerprint, FingerprintEngine};
use truelocker_store::{fingerprint_stored, fingerprint_stream, ContentStore, StoreError};

use crate::catalog::CatalogSnapshot;
use crate::error::Result;

/// Result of checking content against a catalog snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The earliest record registered with the same fingerprint.
    Matched(EvidenceRecord),
    NoMatch,
}

impl VerificationOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, VerificationOutcome::Matched(_))
    }

    pub fn record(&self) -> Option<&EvidenceRecord> {
        match self {
            VerificationOutcome::Matched(record) => Some(record),
            VerificationOutcome::NoMatch => None,
        }
    }
}

/// State of the original held in the content store for a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredContent {
    /// Stored bytes hash to the registered fingerprint.
    Intact,
    /// Stored bytes hash to something else.
    Corrupted { actual: Fingerprint },
    /// The store no longer holds the locator.
    Missing,
}

/// Fingerprints content and looks it up in a catalog snapshot.
///
/// The result is only as fresh as the snapshot passed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerificationEngine {
    engine: FingerprintEngine,
}

impl VerificationEngine {
    pub fn new(engine: FingerprintEngine) -> Self {
        Self { engine }
    }

    pub fn fingerprint_engine(&self) -> &FingerprintEngine {
        &self.engine
    }

    /// Verify everything a reader yields.
    pub fn verify<R: Read>(&self, reader: R, catalog: &CatalogSnapshot) -> Result<VerificationOutcome> {
        let fingerprint = self.engine.fingerprint_reader(reader)?;
        Ok(self.verify_fingerprint(&fingerprint, catalog))
    }

    /// Verify everything an async reader yields.
    pub async fn verify_stream<R>(
        &self,
        reader: &mut R,
        catalog: &CatalogSnapshot,
    ) -> Result<VerificationOutcome>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let fingerprint = fingerprint_stream(reader, self.engine.chunk_size()).await?;
        Ok(self.verify_fingerprint(&fingerprint, catalog))
    }

    pub fn verify_bytes(&self, data: &[u8], catalog: &CatalogSnapshot) -> VerificationOutcome {
        self.verify_fingerprint(&self.engine.fingerprint_bytes(data), catalog)
    }

    /// Look up an already computed fingerprint.
    pub fn verify_fingerprint(
        &self,
        fingerprint: &Fingerprint,
        catalog: &CatalogSnapshot,
    ) -> VerificationOutcome {
        match catalog.find_by_fingerprint(fingerprint) {
            Some(record) => VerificationOutcome::Matched(record.clone()),
            None => VerificationOutcome::NoMatch,
        }
    }

    /// Look up a fingerprint given as hex text, in either case.
    pub fn verify_hex(&self, hex: &str, catalog: &CatalogSnapshot) -> Result<VerificationOutcome> {
        let fingerprint = Fingerprint::from_hex(hex)?;
        Ok(self.verify_fingerprint(&fingerprint, catalog))
    }

    /// Re-fingerprint the stored original of a record.
    pub async fn verify_stored<C>(&self, record: &EvidenceRecord, store: &C) -> Result<StoredContent>
    where
        C: ContentStore + ?Sized,
    {
        match fingerprint_stored(store, &record.locator, self.engine.chunk_size()).await {
            Ok(actual) if actual == record.fingerprint => Ok(StoredContent::Intact),
            Ok(actual) => {
                tracing::warn!(
                    locator = %record.locator,
                    expected = %record.fingerprint,
                    %actual,
                    "stored content does not match record"
                );
                Ok(StoredContent::Corrupted { actual })
            }
            Err(StoreError::NotFound(_)) => Ok(StoredContent::Missing),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use proptest::prelude::*;
    use truelocker_core::{ContentLocator, CoreError, Identity, SequenceId};
    use truelocker_store::MemoryContentStore;

    fn catalog_of(entries: &[(&str, &[u8])]) -> CatalogSnapshot {
        let records = entries
            .iter()
            .enumerate()
            .map(|(i, (who, content))| EvidenceRecord {
                locator: ContentLocator::new(format!("loc-{}", i)).unwrap(),
                fingerprint: Fingerprint::of(content),
                submitter: Identity::new(*who).unwrap(),
                recorded_at: 1_700_000_000 + i as u64,
                sequence_id: SequenceId::new(i as u64),
            })
            .collect();
        CatalogSnapshot::from_records(records).unwrap()
    }

    #[test]
    fn test_match_and_no_match() {
        let catalog = catalog_of(&[("alice", b"alice"), ("bob", b"bob")]);
        let engine = VerificationEngine::default();

        let outcome = engine.verify_bytes(b"alice", &catalog);
        assert!(outcome.is_match());
        assert_eq!(outcome.record().unwrap().sequence_id, SequenceId::new(0));

        assert_eq!(engine.verify_bytes(b"carol", &catalog), VerificationOutcome::NoMatch);
    }

    #[test]
    fn test_reader_and_hex_inputs() {
        let catalog = catalog_of(&[("alice", b"alice")]);
        let engine = VerificationEngine::new(FingerprintEngine::new(2));

        let outcome = engine.verify(&b"alice"[..], &catalog).unwrap();
        assert!(outcome.is_match());

        let upper = Fingerprint::of(b"alice").to_hex().to_uppercase();
        assert!(engine.verify_hex(&upper, &catalog).unwrap().is_match());

        assert!(matches!(
            engine.verify_hex("not hex", &catalog),
            Err(CatalogError::Encoding(CoreError::InvalidFingerprint(_)))
        ));
    }

    #[tokio::test]
    async fn test_verify_stream() {
        let catalog = catalog_of(&[("alice", b"exhibit")]);
        let engine = VerificationEngine::default();
        let mut reader: &[u8] = b"exhibit";
        assert!(engine.verify_stream(&mut reader, &catalog).await.unwrap().is_match());
    }

    #[tokio::test]
    async fn test_verify_stored_states() {
        let store = MemoryContentStore::new();
        let mut data: &[u8] = b"original";
        let locator = store.put(&mut data).await.unwrap();
        let record = EvidenceRecord {
            locator: locator.clone(),
            fingerprint: Fingerprint::of(b"original"),
            submitter: Identity::new("alice").unwrap(),
            recorded_at: 0,
            sequence_id: SequenceId::FIRST,
        };
        let engine = VerificationEngine::default();

        assert_eq!(engine.verify_stored(&record, &store).await.unwrap(), StoredContent::Intact);

        store.corrupt(&locator).unwrap();
        assert!(matches!(
            engine.verify_stored(&record, &store).await.unwrap(),
            StoredContent::Corrupted { .. }
        ));

        store.evict(&locator).unwrap();
        assert_eq!(engine.verify_stored(&record, &store).await.unwrap(), StoredContent::Missing);
    }

    proptest! {
        #[test]
        fn prop_match_is_earliest_with_same_fingerprint(
            contents in prop::collection::vec(0u8..4, 0..24),
            probe in 0u8..5,
        ) {
            let entries: Vec<(&str, Vec<u8>)> =
                contents.iter().map(|c| ("someone", vec![*c])).collect();
            let borrowed: Vec<(&str, &[u8])> =
                entries.iter().map(|(w, c)| (*w, c.as_slice())).collect();
            let catalog = catalog_of(&borrowed);

            let outcome = VerificationEngine::default().verify_bytes(&[probe], &catalog);
            let expected = contents.iter().position(|c| *c == probe);

            match (outcome, expected) {
                (VerificationOutcome::Matched(r), Some(i)) => {
                    prop_assert_eq!(r.sequence_id, SequenceId::new(i as u64));
                }
                (VerificationOutcome::NoMatch, None) => {}
                (other, expected) => prop_assert!(false, "{:?} vs {:?}", other, expected),
            }
        }
    }
}
