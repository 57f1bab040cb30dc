//! # TrueLocker Core
//!
//! Pure primitives for the TrueLocker evidence vault: content fingerprints,
//! storage locators, submitter identities and the evidence record schema.
//!
//! This crate performs no networking and no storage. The only I/O it knows
//! about is `std::io::Read`, so a fingerprint can be streamed over content
//! that does not fit in memory.
//!
//! ## Key Types
//!
//! - [`Fingerprint`] - SHA-256 digest of evidence content
//! - [`FingerprintEngine`] - Chunked, deterministic fingerprinting
//! - [`ContentLocator`] - Opaque pointer into a content-addressable store
//! - [`Identity`] - The account that submitted a record
//! - [`EvidenceRecord`] - A committed ledger entry
//! - [`LedgerRecord`] - The external (wire) form of a record
//!
//! ## Canonical Encoding
//!
//! Records have a deterministic CBOR encoding used for catalog digests.
//! See [`record::canonical_record_bytes`].

pub mod error;
pub mod fingerprint;
pub mod record;
pub mod types;

pub use error::{CoreError, Result};
pub use fingerprint::{Fingerprint, FingerprintEngine, Fingerprinter, DEFAULT_CHUNK_SIZE};
pub use record::{canonical_record_bytes, EvidenceRecord, LedgerRecord};
pub use types::{ContentLocator, Identity, SequenceId, MAX_LOCATOR_LEN};
