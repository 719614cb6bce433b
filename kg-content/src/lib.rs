//! Content Store (C1): persists raw document bytes keyed by content hash
//! with idempotent put and byte-range get. This crate is an in-process
//! stand-in for the production object store, which spec §1 names as an
//! external collaborator out of scope here; both implementations satisfy
//! the same [`ContentStore`] seam so the ingestion engine never depends on
//! which one is wired in.

mod error;
mod filesystem;
mod hash;
mod in_memory;

pub use error::{ContentError, Result};
pub use filesystem::FilesystemContentStore;
pub use hash::content_hash;
pub use in_memory::InMemoryContentStore;

use async_trait::async_trait;

/// Key format: `sources/{ontology}/{content_hash[:32]}.{ext}`. 32 hex
/// chars is a 128-bit namespace, enough for cross-shard uniqueness
/// (spec §6 persisted state layout).
#[must_use]
pub fn storage_key(ontology: &str, content_hash: &str, ext: &str) -> String {
    let prefix: String = content_hash.chars().take(32).collect();
    format!("sources/{ontology}/{prefix}.{ext}")
}

/// Persist and retrieve raw document bytes by content-addressed key.
///
/// `put` is idempotent: putting the same bytes under the same key twice is
/// a no-op on the second call (content-hash dedup at the byte layer, a
/// prerequisite for C11's document-identity dedup).
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes` under `key`. Idempotent: returns `Ok(())` whether or
    /// not the key already existed, as long as existing bytes match.
    ///
    /// # Errors
    /// Returns [`ContentError::HashMismatch`] if `key` already exists with
    /// different bytes, since that would silently corrupt provenance.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Fetch the full bytes stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Fetch a half-open byte range `[start, end)` of the object at `key`.
    async fn get_range(&self, key: &str, start: usize, end: usize) -> Result<Vec<u8>>;

    /// Whether `key` exists.
    async fn exists(&self, key: &str) -> Result<bool>;
}
