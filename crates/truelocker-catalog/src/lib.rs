//! # TrueLocker Catalog
//!
//! The local read model of the evidence ledger, and the matching logic that
//! verifies content against it.
//!
//! ## Overview
//!
//! The catalog is a possibly-stale copy of the ledger. It is rebuilt
//! wholesale on refresh and swapped in atomically, so a reader always sees
//! one complete generation.
//!
//! ## Key Properties
//!
//! - **Atomic**: a failed refresh leaves the previous snapshot untouched
//! - **Monotonic**: a snapshot never replaces a longer one
//! - **First registration wins**: content registered more than once resolves
//!   to the record with the lowest sequence id
//!
//! ## Usage
//!
//! ```rust,no_run
//! use truelocker_catalog::{EvidenceCatalog, VerificationEngine, VerificationOutcome};
//! use truelocker_store::MemoryLedger;
//! use truelocker_core::Identity;
//!
//! async fn example() {
//!     let ledger = MemoryLedger::new(Identity::new("0xabc").unwrap());
//!     let catalog = EvidenceCatalog::new();
//!     catalog.refresh(&ledger).await.unwrap();
//!
//!     let engine = VerificationEngine::default();
//!     match engine.verify_bytes(b"exhibit A", &catalog.snapshot()) {
//!         VerificationOutcome::Matched(record) => println!("registered as {}", record.sequence_id),
//!         VerificationOutcome::NoMatch => println!("not registered"),
//!     }
//! }
//! ```
//!
//! ## Refresh Flow
//!
//! ```text
//! Catalog                             Ledger
//!   |-------- count() ---------------->|
//!   |<------- n -----------------------|
//!   |-------- get(0) .. get(n-1) ----->|
//!   |<------- records -----------------|
//!   |  validate dense ids, index by fingerprint
//!   |  swap in if not shorter than current
//! ```

pub mod catalog;
pub mod convergence;
pub mod error;
pub mod verify;

pub use catalog::{CatalogSnapshot, EvidenceCatalog, RefreshPolicy, RefreshReport};
pub use convergence::{compare, compare_with_ledger, CatalogDigest, Convergence};
pub use error::{CatalogError, Result, StaleCatalogError};
pub use verify::{StoredContent, VerificationEngine, VerificationOutcome};
