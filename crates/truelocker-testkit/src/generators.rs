//! Proptest generators for property-based testing.

use proptest::prelude::*;

use truelocker_core::{ContentLocator, EvidenceRecord, Fingerprint, Identity, SequenceId};

/// Generate content bytes of at most `max_len` bytes.
pub fn content(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a random Fingerprint.
pub fn fingerprint() -> impl Strategy<Value = Fingerprint> {
    any::<[u8; 32]>().prop_map(Fingerprint::from_bytes)
}

/// Generate a read size for chunked fingerprinting.
pub fn chunk_size() -> impl Strategy<Value = usize> {
    prop_oneof![1usize..=16, 17usize..=4096, Just(64 * 1024)]
}

/// Generate an account-like identity.
pub fn identity() -> impl Strategy<Value = Identity> {
    "0x[0-9a-f]{8,40}".prop_filter_map("identity", |s| Identity::new(s).ok())
}

/// Generate a short base32-style locator.
pub fn locator() -> impl Strategy<Value = ContentLocator> {
    "b[a-z2-7]{1,64}".prop_filter_map("locator", |s| ContentLocator::new(s).ok())
}

/// Generate a reasonable commit time (Unix seconds).
pub fn recorded_at() -> impl Strategy<Value = u64> {
    0u64..=4_102_444_800
}

/// Generate a dense ledger of up to `max_len` records whose fingerprints
/// are drawn from a small pool, so duplicates are common.
pub fn ledger_records(max_len: usize) -> impl Strategy<Value = Vec<EvidenceRecord>> {
    prop::collection::vec(
        (locator(), 0u8..4, identity(), recorded_at()),
        0..=max_len,
    )
    .prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, (locator, content, submitter, recorded_at))| EvidenceRecord {
                locator,
                fingerprint: Fingerprint::of(&[content]),
                submitter,
                recorded_at,
                sequence_id: SequenceId::new(i as u64),
            })
            .collect()
    })
}
