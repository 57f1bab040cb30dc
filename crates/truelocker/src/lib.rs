//! # TrueLocker
//!
//! The unified API for the TrueLocker evidence vault: register content by
//! publishing its fingerprint to an append-only ledger, and later prove that
//! a piece of content is exactly what was registered.
//!
//! ## Overview
//!
//! - **Fingerprints**: SHA-256 over the raw content, computed before upload
//! - **Content store**: holds the originals, addressed by opaque locators
//! - **Ledger**: the external, append-only source of truth for records
//! - **Catalog**: a local, possibly stale copy of the ledger used for lookups
//!
//! ## Registration
//!
//! ```text
//! Idle -> Hashing -> Uploading -> Submitting -> Confirmed
//! ```
//!
//! Any stage can fail. A submission that reached the ledger and failed,
//! whether rejected or *indeterminate*, might still be recorded, so the
//! workflow refuses to resubmit until [`RegistrationWorkflow::reconcile`]
//! has looked.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use truelocker::{Vault, VaultConfig};
//! use truelocker::store::{FsContentStore, SqliteLedger};
//! use truelocker::core::Identity;
//!
//! async fn example() -> truelocker::Result<()> {
//!     let ledger = Arc::new(SqliteLedger::open("evidence.db", Identity::new("0xabc")?)?);
//!     let store = Arc::new(FsContentStore::open("blobs").await?);
//!     let vault = Vault::connect(ledger, store, VaultConfig::default()).await?;
//!
//!     let mut workflow = vault.workflow(std::path::PathBuf::from("photo.jpg"));
//!     match workflow.run().await {
//!         Ok(receipt) => println!("registered as {}", receipt.sequence_id),
//!         Err(failed) if failed.needs_reconcile() => {
//!             workflow.reconcile().await?;
//!         }
//!         Err(failed) => println!("{}", failed),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `truelocker::core` - fingerprints, locators, identities, records
//! - `truelocker::store` - content store and ledger traits and adapters
//! - `truelocker::catalog` - the catalog and verification engine

pub mod config;
pub mod error;
pub mod hashing;
pub mod vault;
pub mod workflow;

// Re-export component crates
pub use truelocker_catalog as catalog;
pub use truelocker_core as core;
pub use truelocker_store as store;

// Re-export main types for convenience
pub use config::VaultConfig;
pub use error::{
    RegistrationError, RegistrationFailed, Result, Stage, VaultError, WorkflowError,
};
pub use hashing::{fingerprint_content, Content};
pub use vault::{Vault, VerificationReport};
pub use workflow::{
    ReconcileOutcome, RegistrationReceipt, RegistrationState, RegistrationWorkflow,
};

// Re-export commonly used component types
pub use truelocker_catalog::{
    CatalogSnapshot, EvidenceCatalog, RefreshPolicy, StaleCatalogError, StoredContent,
    VerificationEngine, VerificationOutcome,
};
pub use truelocker_core::{
    ContentLocator, EvidenceRecord, Fingerprint, FingerprintEngine, Identity, SequenceId,
};
