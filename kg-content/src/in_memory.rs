use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{ContentError, Result};
use crate::ContentStore;

/// An in-memory [`ContentStore`], used in tests and in single-process
/// deployments that don't need durability across restarts.
#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    objects: DashMap<String, Vec<u8>>,
}

impl InMemoryContentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        if let Some(existing) = self.objects.get(key) {
            if existing.as_slice() != bytes {
                return Err(ContentError::HashMismatch(key.to_string()));
            }
            return Ok(());
        }
        self.objects.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .get(key)
            .map(|v| v.clone())
            .ok_or_else(|| ContentError::NotFound(key.to_string()))
    }

    async fn get_range(&self, key: &str, start: usize, end: usize) -> Result<Vec<u8>> {
        let bytes = self.get(key).await?;
        if start > end || end > bytes.len() {
            return Err(ContentError::RangeOutOfBounds {
                start,
                end,
                len: bytes.len(),
            });
        }
        Ok(bytes[start..end].to_vec())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.contains_key(key))
    }
}
