//! Async fingerprinting over content streams.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use truelocker_core::{ContentLocator, Fingerprint, Fingerprinter};

use crate::error::{Result, StoreError};
use crate::traits::ContentStore;

/// Fingerprint everything an async reader yields, `chunk_size` bytes at a time.
pub async fn fingerprint_stream<R>(reader: &mut R, chunk_size: usize) -> io::Result<Fingerprint>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut hasher = Fingerprinter::new();
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

/// Fingerprint the content a store holds under `locator`.
pub async fn fingerprint_stored<C>(
    store: &C,
    locator: &ContentLocator,
    chunk_size: usize,
) -> Result<Fingerprint>
where
    C: ContentStore + ?Sized,
{
    let mut stream = store.get(locator).await?;
    Ok(fingerprint_stream(&mut stream, chunk_size).await?)
}

/// Read content back from a store and check it against the fingerprint
/// computed before upload.
pub async fn fetch_verified<C>(
    store: &C,
    locator: &ContentLocator,
    expected: &Fingerprint,
    chunk_size: usize,
) -> Result<()>
where
    C: ContentStore + ?Sized,
{
    let actual = fingerprint_stored(store, locator, chunk_size).await?;
    if actual != *expected {
        return Err(StoreError::IntegrityMismatch {
            locator: locator.clone(),
            expected: *expected,
            actual,
        });
    }
    Ok(())
}
