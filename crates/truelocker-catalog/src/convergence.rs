//! Convergence checks between catalogs and the ledger.
//!
//! Two catalogs built from the same ledger agree on every record they both
//! hold, so one can only be a prefix of the other. Digests let two parties
//! confirm that without exchanging records.

use std::fmt;

use truelocker_core::{canonical_record_bytes, EvidenceRecord, SequenceId};
use truelocker_store::Ledger;

use crate::catalog::CatalogSnapshot;
use crate::error::Result;

const DIGEST_DOMAIN: &[u8] = b"truelocker-catalog-v1:";

/// BLAKE3 digest over a catalog's records.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CatalogDigest(pub [u8; 32]);

impl CatalogDigest {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for CatalogDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CatalogDigest({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for CatalogDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Hash the record count, then each record's canonical encoding with a
/// length prefix, in sequence order.
pub(crate) fn compute_digest(records: &[EvidenceRecord]) -> Result<CatalogDigest> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DIGEST_DOMAIN);
    hasher.update(&(records.len() as u64).to_le_bytes());

    for record in records {
        let bytes = canonical_record_bytes(record)?;
        hasher.update(&(bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
    }

    Ok(CatalogDigest(*hasher.finalize().as_bytes()))
}

/// How one view of the ledger relates to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// Same records.
    Converged,
    /// The local view is a strict prefix; `missing` records behind.
    Behind { missing: u64 },
    /// The local view extends the other by `extra` records.
    Ahead { extra: u64 },
    /// The views disagree on the record at `at`.
    Diverged { at: SequenceId },
}

impl Convergence {
    pub fn is_converged(&self) -> bool {
        matches!(self, Convergence::Converged)
    }

    pub fn is_diverged(&self) -> bool {
        matches!(self, Convergence::Diverged { .. })
    }
}

/// Compare a local snapshot against another one.
pub fn compare(local: &CatalogSnapshot, other: &CatalogSnapshot) -> Convergence {
    let shared = local.len().min(other.len());
    let mismatch = local.all()[..shared]
        .iter()
        .zip(&other.all()[..shared])
        .find(|(a, b)| a != b);
    if let Some((a, _)) = mismatch {
        return Convergence::Diverged { at: a.sequence_id };
    }
    by_length(local.len() as u64, other.len() as u64)
}

/// Compare a snapshot against the ledger's current contents.
///
/// Reads every record the two have in common, so this costs as much as a
/// refresh.
pub async fn compare_with_ledger<L>(local: &CatalogSnapshot, ledger: &L) -> Result<Convergence>
where
    L: Ledger + ?Sized,
{
    let remote_len = ledger.count().await?;
    let shared = (local.len() as u64).min(remote_len);

    for i in 0..shared {
        let id = SequenceId::new(i);
        let remote = ledger.get(id).await?;
        if local.get(id) != Some(&remote) {
            tracing::warn!(%id, "catalog disagrees with ledger");
            return Ok(Convergence::Diverged { at: id });
        }
    }

    Ok(by_length(local.len() as u64, remote_len))
}

fn by_length(local: u64, other: u64) -> Convergence {
    if local < other {
        Convergence::Behind {
            missing: other - local,
        }
    } else if local > other {
        Convergence::Ahead {
            extra: local - other,
        }
    } else {
        Convergence::Converged
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use truelocker_core::{ContentLocator, Fingerprint, Identity};
    use truelocker_store::{ManualClock, MemoryLedger};

    use super::*;
    use crate::catalog::EvidenceCatalog;

    fn record(i: u64, content: &[u8]) -> EvidenceRecord {
        EvidenceRecord {
            locator: ContentLocator::new(format!("loc-{}", i)).unwrap(),
            fingerprint: Fingerprint::of(content),
            submitter: Identity::new("alice").unwrap(),
            recorded_at: 1_000 + i,
            sequence_id: SequenceId::new(i),
        }
    }

    fn snapshot(records: Vec<EvidenceRecord>) -> CatalogSnapshot {
        CatalogSnapshot::from_records(records).unwrap()
    }

    #[test]
    fn test_digest_deterministic_and_order_sensitive() {
        let a = snapshot(vec![record(0, b"x"), record(1, b"y")]);
        let b = snapshot(vec![record(0, b"x"), record(1, b"y")]);
        let c = snapshot(vec![record(0, b"y"), record(1, b"x")]);

        assert_eq!(a.digest().unwrap(), b.digest().unwrap());
        assert_ne!(a.digest().unwrap(), c.digest().unwrap());
        assert_ne!(
            CatalogSnapshot::empty().digest().unwrap(),
            a.digest().unwrap()
        );
    }

    #[test]
    fn test_compare_prefixes() {
        let short = snapshot(vec![record(0, b"x")]);
        let long = snapshot(vec![record(0, b"x"), record(1, b"y"), record(2, b"z")]);

        assert_eq!(compare(&short, &long), Convergence::Behind { missing: 2 });
        assert_eq!(compare(&long, &short), Convergence::Ahead { extra: 2 });
        assert!(compare(&long, &long).is_converged());
    }

    #[test]
    fn test_compare_detects_divergence() {
        let a = snapshot(vec![record(0, b"x"), record(1, b"y")]);
        let b = snapshot(vec![record(0, b"x"), record(1, b"tampered")]);

        let result = compare(&a, &b);
        assert_eq!(result, Convergence::Diverged { at: SequenceId::new(1) });
        assert!(result.is_diverged());
    }

    #[tokio::test]
    async fn test_compare_with_ledger() {
        let ledger = MemoryLedger::with_clock(
            Identity::new("alice").unwrap(),
            Arc::new(ManualClock::new(1_000)),
        );
        let catalog = EvidenceCatalog::new();

        let loc = ContentLocator::new("loc").unwrap();
        ledger.append(&loc, &Fingerprint::of(b"one")).await.unwrap();
        catalog.refresh(&ledger).await.unwrap();
        ledger.append(&loc, &Fingerprint::of(b"two")).await.unwrap();

        let result = compare_with_ledger(&catalog.snapshot(), &ledger).await.unwrap();
        assert_eq!(result, Convergence::Behind { missing: 1 });

        catalog.refresh(&ledger).await.unwrap();
        let result = compare_with_ledger(&catalog.snapshot(), &ledger).await.unwrap();
        assert!(result.is_converged());
    }
}
