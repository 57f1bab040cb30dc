//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: one in-memory ledger and one
//! content store shared by any number of submitter identities.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use truelocker::{Result, Vault, VaultConfig};
use truelocker_core::Identity;
use truelocker_store::{ManualClock, MemoryContentStore, MemoryLedger};

/// Commit time the fixture clock starts at (2025-01-14T16:00:00Z).
pub const FIXTURE_EPOCH: u64 = 1_736_870_400;

/// A vault backed by the fixture's in-memory services.
pub type MemoryVault = Vault<MemoryLedger, MemoryContentStore>;

/// A shared ledger, store and clock.
pub struct TestFixture {
    pub ledger: MemoryLedger,
    pub store: Arc<MemoryContentStore>,
    pub clock: Arc<ManualClock>,
    pub config: VaultConfig,
}

impl TestFixture {
    /// Create a fixture whose default identity is `0xfixture`.
    pub fn new() -> Self {
        Self::with_config(VaultConfig::default())
    }

    pub fn with_config(config: VaultConfig) -> Self {
        let clock = Arc::new(ManualClock::new(FIXTURE_EPOCH));
        let submitter = Identity::new("0xfixture").unwrap_or_else(|_| unreachable!());
        Self {
            ledger: MemoryLedger::with_clock(submitter, clock.clone()),
            store: Arc::new(MemoryContentStore::new()),
            clock,
            config,
        }
    }

    /// A ledger handle writing as `identity`.
    pub fn ledger_for(&self, identity: &Identity) -> Arc<MemoryLedger> {
        Arc::new(self.ledger.with_submitter(identity.clone()))
    }

    /// Connect a vault for `identity` to the shared services.
    pub async fn vault(&self, identity: &str) -> Result<MemoryVault> {
        let identity = Identity::new(identity)?;
        Vault::connect(
            self.ledger_for(&identity),
            Arc::clone(&self.store),
            self.config.clone(),
        )
        .await
    }

    /// Advance the ledger clock.
    pub fn advance(&self, secs: u64) {
        self.clock.advance(secs);
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Vaults for several identities sharing one fixture.
pub async fn multi_party_fixtures(names: &[&str]) -> Result<(TestFixture, Vec<MemoryVault>)> {
    let fixture = TestFixture::new();
    let mut vaults = Vec::with_capacity(names.len());
    for name in names {
        vaults.push(fixture.vault(name).await?);
    }
    Ok((fixture, vaults))
}

/// Deterministic pseudo-random content.
pub fn random_content(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill(data.as_mut_slice());
    data
}
