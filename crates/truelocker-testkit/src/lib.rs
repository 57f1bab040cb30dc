//! # TrueLocker Testkit
//!
//! Testing utilities for TrueLocker.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: published SHA-256 inputs and digests
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: shared in-memory services for multi-party scenarios
//!
//! ## Golden Vectors
//!
//! ```rust
//! use truelocker_core::FingerprintEngine;
//! use truelocker_testkit::vectors::verify_all_vectors;
//!
//! assert!(verify_all_vectors(&FingerprintEngine::default()).is_empty());
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use truelocker_testkit::generators::{chunk_size, content};
//!
//! proptest! {
//!     #[test]
//!     fn chunking_is_invisible(data in content(4096), chunk in chunk_size()) {
//!         let engine = FingerprintEngine::new(chunk);
//!         prop_assert_eq!(engine.fingerprint_reader(&data[..]).unwrap(), Fingerprint::of(&data));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use truelocker_testkit::fixtures::multi_party_fixtures;
//!
//! async fn example() {
//!     let (_fixture, vaults) = multi_party_fixtures(&["0xa11ce", "0xb0b"]).await.unwrap();
//!     vaults[0].register("exhibit").await.unwrap();
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, random_content, MemoryVault, TestFixture};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
