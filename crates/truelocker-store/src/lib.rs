//! # TrueLocker Store
//!
//! The two external collaborators of the evidence vault, expressed as async
//! traits, plus local adapters for each.
//!
//! ## Overview
//!
//! - [`ContentStore`] uploads evidence bytes and hands back an opaque
//!   [`ContentLocator`](truelocker_core::ContentLocator).
//! - [`Ledger`] appends `(locator, fingerprint)` pairs to an append-only
//!   record log and reads them back by sequence id.
//!
//! ## Key Types
//!
//! - [`MemoryContentStore`] / [`FsContentStore`] - content stores addressed
//!   by a BLAKE3 CID, independent of the SHA-256 fingerprint
//! - [`MemoryLedger`] - shared in-memory ledger with fault injection
//! - [`SqliteLedger`] - persistent local ledger with storage-enforced
//!   append-only semantics
//!
//! ## Usage
//!
//! ```rust,no_run
//! use truelocker_core::{Fingerprint, Identity};
//! use truelocker_store::{ContentStore, Ledger, MemoryContentStore, SqliteLedger};
//!
//! async fn example() {
//!     let submitter = Identity::new("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
//!     let ledger = SqliteLedger::open("evidence.db", submitter).unwrap();
//!     let content = MemoryContentStore::new();
//!
//!     let mut bytes: &[u8] = b"exhibit A";
//!     let locator = content.put(&mut bytes).await.unwrap();
//!     let id = ledger
//!         .append(&locator, &Fingerprint::of(b"exhibit A"))
//!         .await
//!         .unwrap();
//!     let record = ledger.get(id).await.unwrap();
//!     assert_eq!(record.locator, locator);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Ledger assigns ids and times**: clients never choose `sequence_id`
//!   or `recorded_at`.
//! - **Indeterminate writes**: an append that may have committed is
//!   reported as [`StoreError::SubmissionIndeterminate`], never as a plain
//!   failure.
//! - **Non-idempotent uploads**: callers must not assume two `put`s of the
//!   same bytes return the same locator, even though these adapters do.

pub mod clock;
pub mod error;
pub mod fs;
pub mod locator;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod stream;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, StoreError};
pub use fs::FsContentStore;
pub use memory::{MemoryContentStore, MemoryLedger};
pub use sqlite::SqliteLedger;
pub use stream::{fetch_verified, fingerprint_stored, fingerprint_stream};
pub use traits::{ContentReader, ContentStore, ContentStream, Ledger};
