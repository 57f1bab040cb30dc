//! Vault configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use truelocker_catalog::RefreshPolicy;
use truelocker_core::{FingerprintEngine, DEFAULT_CHUNK_SIZE};

use crate::error::Result;

/// Content at or above this size is hashed on a blocking worker.
pub const DEFAULT_BACKGROUND_HASH_THRESHOLD: u64 = 8 * 1024 * 1024;

/// Configuration for a [`Vault`](crate::Vault) and the workflows it creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Read size used when fingerprinting.
    pub chunk_size: usize,
    /// Content size from which hashing moves to a blocking worker.
    pub background_hash_threshold: u64,
    /// Read every upload back and compare it to the computed fingerprint.
    pub verify_uploads: bool,
    /// Upper bound on a single upload.
    pub upload_timeout_ms: Option<u64>,
    /// Upper bound on waiting for ledger confirmation. Expiry leaves the
    /// submission indeterminate.
    pub submit_timeout_ms: Option<u64>,
    /// How catalog refreshes treat records appended while they run.
    pub refresh_policy: RefreshPolicy,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            background_hash_threshold: DEFAULT_BACKGROUND_HASH_THRESHOLD,
            verify_uploads: true,
            upload_timeout_ms: None,
            submit_timeout_ms: None,
            refresh_policy: RefreshPolicy::default(),
        }
    }
}

impl VaultConfig {
    /// Parse configuration from JSON. Missing fields take their defaults.
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn fingerprint_engine(&self) -> FingerprintEngine {
        FingerprintEngine::new(self.chunk_size)
    }

    pub fn upload_timeout(&self) -> Option<Duration> {
        self.upload_timeout_ms.map(Duration::from_millis)
    }

    pub fn submit_timeout(&self) -> Option<Duration> {
        self.submit_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VaultError;

    #[test]
    fn test_defaults() {
        let config = VaultConfig::default();
        assert_eq!(config.chunk_size, 64 * 1024);
        assert_eq!(config.background_hash_threshold, 8 * 1024 * 1024);
        assert!(config.verify_uploads);
        assert_eq!(config.upload_timeout(), None);
        assert_eq!(config.refresh_policy, RefreshPolicy::Snapshot);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = VaultConfig::from_json(
            r#"{ "submit_timeout_ms": 30000, "refresh_policy": { "mode": "until_stable", "max_rounds": 4 } }"#,
        )
        .unwrap();
        assert_eq!(config.submit_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.refresh_policy, RefreshPolicy::UntilStable { max_rounds: 4 });
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(config.verify_uploads);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        std::fs::write(&path, r#"{ "verify_uploads": false, "chunk_size": 4096 }"#).unwrap();

        let config = VaultConfig::from_file(&path).unwrap();
        assert!(!config.verify_uploads);
        assert_eq!(config.fingerprint_engine().chunk_size(), 4096);

        assert!(matches!(
            VaultConfig::from_file(dir.path().join("missing.json")),
            Err(VaultError::Io(_))
        ));
        assert!(matches!(
            VaultConfig::from_json("{ not json"),
            Err(VaultError::Config(_))
        ));
    }
}
