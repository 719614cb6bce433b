use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, SeekFrom};

use crate::error::{ContentError, Result};
use crate::ContentStore;

/// A filesystem-backed [`ContentStore`] rooted at a base directory. Keys
/// (e.g. `sources/ontology/hash.txt`) map onto relative paths under that
/// root; `put` creates parent directories as needed.
#[derive(Debug, Clone)]
pub struct FilesystemContentStore {
    root: PathBuf,
}

impl FilesystemContentStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ContentStore for FilesystemContentStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        if let Ok(existing) = fs::read(&path).await {
            if existing == bytes {
                return Ok(());
            }
            return Err(ContentError::HashMismatch(key.to_string()));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key);
        fs::read(&path)
            .await
            .map_err(|_| ContentError::NotFound(key.to_string()))
    }

    async fn get_range(&self, key: &str, start: usize, end: usize) -> Result<Vec<u8>> {
        let path = self.path_for(key);
        let mut file = fs::File::open(&path)
            .await
            .map_err(|_| ContentError::NotFound(key.to_string()))?;
        let len = file.metadata().await?.len() as usize;
        if start > end || end > len {
            return Err(ContentError::RangeOutOfBounds { start, end, len });
        }
        file.seek(SeekFrom::Start(start as u64)).await?;
        let mut buf = vec![0u8; end - start];
        file.read_exact(&mut buf).await?;
        Ok(buf)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(fs::metadata(self.path_for(key)).await.is_ok())
    }
}

/// Convenience for tests and callers that already have a root `&Path`.
impl From<&Path> for FilesystemContentStore {
    fn from(path: &Path) -> Self {
        Self::new(path.to_path_buf())
    }
}
