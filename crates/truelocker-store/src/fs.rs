//! Directory-backed content store.
//!
//! Each blob lives in a file named by its locator. Uploads stream into a
//! temporary file and are renamed into place once complete, so a partial
//! upload is never visible under a locator.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use truelocker_core::ContentLocator;

use crate::error::{Result, StoreError};
use crate::locator::{is_well_formed, LocatorHasher};
use crate::traits::{ContentReader, ContentStore, ContentStream};

const UPLOAD_CHUNK: usize = 64 * 1024;

/// Content store rooted at a local directory.
pub struct FsContentStore {
    root: PathBuf,
    uploads: AtomicU64,
}

impl FsContentStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            uploads: AtomicU64::new(0),
        })
    }

    /// The directory blobs are stored in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, locator: &ContentLocator) -> Option<PathBuf> {
        is_well_formed(locator).then(|| self.root.join(locator.as_str()))
    }

    fn temp_path(&self) -> PathBuf {
        let n = self.uploads.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(format!(".upload-{}-{}", std::process::id(), n))
    }

    async fn write_temp(&self, content: ContentReader<'_>, temp: &Path) -> Result<ContentLocator> {
        let mut file = fs::File::create(temp).await?;
        let mut hasher = LocatorHasher::new();
        let mut buf = vec![0u8; UPLOAD_CHUNK];
        loop {
            let n = content.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            file.write_all(&buf[..n]).await?;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(hasher.finalize())
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn put(&self, content: ContentReader<'_>) -> Result<ContentLocator> {
        let temp = self.temp_path();

        let locator = match self.write_temp(content, &temp).await {
            Ok(locator) => locator,
            Err(e) => {
                let _ = fs::remove_file(&temp).await;
                return Err(match e {
                    StoreError::Io(io) => StoreError::Upload(io.to_string()),
                    other => other,
                });
            }
        };

        let target = self.root.join(locator.as_str());
        if let Err(e) = fs::rename(&temp, &target).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StoreError::Upload(e.to_string()));
        }

        tracing::debug!(%locator, "stored blob");
        Ok(locator)
    }

    async fn get(&self, locator: &ContentLocator) -> Result<ContentStream> {
        let path = self
            .blob_path(locator)
            .ok_or_else(|| StoreError::NotFound(locator.to_string()))?;
        match fs::File::open(&path).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(locator.to_string()))
            }
            Err(e) => Err(StoreError::Unavailable(e.to_string())),
        }
    }

    async fn contains(&self, locator: &ContentLocator) -> Result<bool> {
        match self.blob_path(locator) {
            Some(path) => Ok(fs::try_exists(path).await?),
            None => Ok(false),
        }
    }
}
