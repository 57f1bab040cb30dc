//! Content sources and async fingerprinting.
//!
//! Small content is hashed inline on the calling task. Content at or above
//! the configured threshold is hashed on tokio's blocking pool so a large
//! file does not stall other workflows sharing the runtime.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::io::AsyncRead;

use truelocker_core::{Fingerprint, FingerprintEngine};
use truelocker_store::fingerprint_stream;

/// Something to register or verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Content already in memory.
    Bytes(Bytes),
    /// A local file, read each time the content is needed.
    File(PathBuf),
}

impl Content {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Content::File(path.as_ref().to_path_buf())
    }

    /// Size in bytes.
    pub async fn size(&self) -> io::Result<u64> {
        match self {
            Content::Bytes(bytes) => Ok(bytes.len() as u64),
            Content::File(path) => Ok(tokio::fs::metadata(path).await?.len()),
        }
    }

    /// Open a fresh reader over the content.
    pub async fn open(&self) -> io::Result<Box<dyn AsyncRead + Send + Unpin>> {
        match self {
            Content::Bytes(bytes) => Ok(Box::new(io::Cursor::new(bytes.clone()))),
            Content::File(path) => Ok(Box::new(tokio::fs::File::open(path).await?)),
        }
    }
}

impl From<Bytes> for Content {
    fn from(bytes: Bytes) -> Self {
        Content::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Content::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Content {
    fn from(bytes: &'static [u8]) -> Self {
        Content::Bytes(Bytes::from_static(bytes))
    }
}

impl From<&'static str> for Content {
    fn from(text: &'static str) -> Self {
        Content::Bytes(Bytes::from_static(text.as_bytes()))
    }
}

impl From<PathBuf> for Content {
    fn from(path: PathBuf) -> Self {
        Content::File(path)
    }
}

/// Fingerprint content, moving to a blocking worker at `background_threshold`
/// bytes and above.
pub async fn fingerprint_content(
    content: &Content,
    engine: FingerprintEngine,
    background_threshold: u64,
) -> io::Result<Fingerprint> {
    let len = content.size().await?;

    if len < background_threshold {
        let mut reader = content.open().await?;
        return fingerprint_stream(&mut reader, engine.chunk_size()).await;
    }

    tracing::debug!(len, "hashing on blocking worker");
    let content = content.clone();
    tokio::task::spawn_blocking(move || match content {
        Content::Bytes(bytes) => Ok(engine.fingerprint_bytes(&bytes)),
        Content::File(path) => engine.fingerprint_reader(std::fs::File::open(path)?),
    })
    .await
    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_inline_and_background_agree() {
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        let content = Content::from(data.clone());
        let engine = FingerprintEngine::new(1000);

        let inline = fingerprint_content(&content, engine, u64::MAX).await.unwrap();
        let background = fingerprint_content(&content, engine, 0).await.unwrap();

        assert_eq!(inline, background);
        assert_eq!(inline, Fingerprint::of(&data));
    }

    #[tokio::test]
    async fn test_file_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"scan-0001.pdf").unwrap();
        let content = Content::file(file.path());

        assert_eq!(content.size().await.unwrap(), 13);
        let engine = FingerprintEngine::default();
        for threshold in [0, u64::MAX] {
            assert_eq!(
                fingerprint_content(&content, engine, threshold).await.unwrap(),
                Fingerprint::of(b"scan-0001.pdf")
            );
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let content = Content::file(dir.path().join("gone.jpg"));
        let err = fingerprint_content(&content, FingerprintEngine::default(), 0)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_empty_content() {
        let content = Content::from(Vec::<u8>::new());
        let fp = fingerprint_content(&content, FingerprintEngine::default(), 8)
            .await
            .unwrap();
        assert_eq!(fp, Fingerprint::of(b""));
    }
}
