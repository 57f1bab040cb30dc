//! Store traits: the abstract interfaces for content and ledger access.
//!
//! Both collaborators are external services. The vault only depends on
//! these traits, so tests and offline deployments can swap in the local
//! adapters from this crate.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use truelocker_core::{ContentLocator, EvidenceRecord, Fingerprint, Identity, SequenceId};

use crate::error::Result;

/// Borrowed content being uploaded.
pub type ContentReader<'a> = &'a mut (dyn AsyncRead + Send + Unpin);

/// Owned content being read back from a store.
pub type ContentStream = Box<dyn AsyncRead + Send + Unpin>;

/// A content-addressable blob store.
///
/// Trusted not to corrupt content silently, but not trusted to be
/// available. Callers that need end-to-end integrity re-fingerprint what
/// they read back (see [`fetch_verified`](crate::fetch_verified)).
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Upload everything the reader yields and return its locator.
    ///
    /// Not guaranteed idempotent: two uploads of the same bytes may return
    /// different locators.
    async fn put(&self, content: ContentReader<'_>) -> Result<ContentLocator>;

    /// Open previously uploaded content.
    async fn get(&self, locator: &ContentLocator) -> Result<ContentStream>;

    /// Whether the store currently holds the locator.
    async fn contains(&self, locator: &ContentLocator) -> Result<bool>;
}

/// An append-only evidence ledger.
///
/// A ledger handle is bound to the identity that signs its writes.
///
/// # Design Notes
///
/// - `append` returns only once the ledger reports the write as final.
///   An error after the write may have been broadcast is
///   `SubmissionIndeterminate`, and callers must reconcile through
///   `count`/`get` before resubmitting.
/// - `count` and `get` may lag behind the latest append from this or any
///   other client.
/// - Ids are dense: `get(i)` is defined for every `i < count()`.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// The identity recorded as submitter of this handle's appends.
    fn submitter(&self) -> &Identity;

    /// Append a record and wait for finality.
    async fn append(
        &self,
        locator: &ContentLocator,
        fingerprint: &Fingerprint,
    ) -> Result<SequenceId>;

    /// Number of committed records.
    async fn count(&self) -> Result<u64>;

    /// Read a committed record. Ids at or beyond `count()` are `NotFound`.
    async fn get(&self, id: SequenceId) -> Result<EvidenceRecord>;
}

#[async_trait]
impl<T: ContentStore + ?Sized> ContentStore for Arc<T> {
    async fn put(&self, content: ContentReader<'_>) -> Result<ContentLocator> {
        (**self).put(content).await
    }

    async fn get(&self, locator: &ContentLocator) -> Result<ContentStream> {
        (**self).get(locator).await
    }

    async fn contains(&self, locator: &ContentLocator) -> Result<bool> {
        (**self).contains(locator).await
    }
}

#[async_trait]
impl<T: Ledger + ?Sized> Ledger for Arc<T> {
    fn submitter(&self) -> &Identity {
        (**self).submitter()
    }

    async fn append(
        &self,
        locator: &ContentLocator,
        fingerprint: &Fingerprint,
    ) -> Result<SequenceId> {
        (**self).append(locator, fingerprint).await
    }

    async fn count(&self) -> Result<u64> {
        (**self).count().await
    }

    async fn get(&self, id: SequenceId) -> Result<EvidenceRecord> {
        (**self).get(id).await
    }
}
