//! Embedding adapter (C4): turns source text into vectors whose dimension
//! always agrees with the active [`kg_config::EmbeddingConfigGuard`], and
//! whose underlying [`EmbeddingProvider`] can be hot-swapped without
//! dropping in-flight requests (§4.3).

pub mod error;
pub mod provider;

pub use error::{EmbedError, Result};
pub use provider::{DeterministicHashEmbedder, EmbeddingProvider};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use kg_config::embedding::{EmbeddingConfigGuard, SWAP_WAIT_BOUND};
use parking_lot::RwLock;
use tracing::{debug, warn};

/// The embedding adapter: a provider behind a lock, paired with the
/// configuration guard it must stay dimension-consistent with.
///
/// In-flight embed calls hold a lease on the current provider (tracked via
/// `in_flight`); [`EmbeddingAdapter::hot_swap`] installs the new provider
/// for future calls immediately but waits up to [`SWAP_WAIT_BOUND`] for
/// existing leases to drain before returning, so a caller that awaits the
/// swap can be confident stragglers are bounded rather than unbounded.
pub struct EmbeddingAdapter {
    config: Arc<EmbeddingConfigGuard>,
    provider: RwLock<Arc<dyn EmbeddingProvider>>,
    in_flight: AtomicU64,
}

impl EmbeddingAdapter {
    #[must_use]
    pub fn new(config: Arc<EmbeddingConfigGuard>, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            config,
            provider: RwLock::new(provider),
            in_flight: AtomicU64::new(0),
        }
    }

    /// Embed a single piece of text with the active provider.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError::DimensionMismatch`] if the provider's fixed
    /// dimension disagrees with the active [`kg_config::embedding::EmbeddingConfig`] —
    /// this is the system refusing to mix vector spaces (spec invariant,
    /// error kind `embedding_dim_mismatch`).
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let _lease = self.lease();
        let provider = Arc::clone(&self.provider.read());
        let expected = self.config.current().dimension;
        if provider.dimension() != expected {
            return Err(EmbedError::DimensionMismatch {
                got: provider.dimension(),
                expected,
            });
        }
        let vector = provider.embed(text).await?;
        if vector.len() != expected {
            return Err(EmbedError::DimensionMismatch {
                got: vector.len(),
                expected,
            });
        }
        Ok(vector)
    }

    /// Embed many texts, preserving order. Fails fast on the first
    /// dimension mismatch rather than returning a partially-valid batch.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let _lease = self.lease();
        let provider = Arc::clone(&self.provider.read());
        let expected = self.config.current().dimension;
        if provider.dimension() != expected {
            return Err(EmbedError::DimensionMismatch {
                got: provider.dimension(),
                expected,
            });
        }
        let vectors = provider.embed_batch(texts).await?;
        for v in &vectors {
            if v.len() != expected {
                return Err(EmbedError::DimensionMismatch {
                    got: v.len(),
                    expected,
                });
            }
        }
        Ok(vectors)
    }

    fn lease(&self) -> InFlightLease<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlightLease { adapter: self }
    }

    /// Install a new provider, waiting up to [`SWAP_WAIT_BOUND`] for
    /// requests already in flight against the old one to finish.
    ///
    /// Does not touch the embedding configuration itself — callers
    /// orchestrate config `unprotect`/`set` (which governs the *expected*
    /// dimension) separately from swapping the *provider* that produces
    /// vectors of that dimension; the two are kept distinct so a caller can
    /// warm a new provider before committing to the config change.
    pub async fn hot_swap(&self, new_provider: Arc<dyn EmbeddingProvider>) {
        {
            let mut guard = self.provider.write();
            debug!(
                from = %guard.model(),
                to = %new_provider.model(),
                "swapping embedding provider"
            );
            *guard = new_provider;
        }
        let deadline = Instant::now() + SWAP_WAIT_BOUND;
        while self.in_flight.load(Ordering::SeqCst) > 0 && Instant::now() < deadline {
            tokio::task::yield_now().await;
        }
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            warn!("embedding provider swap completed with stragglers still in flight");
        }
    }

    #[must_use]
    pub fn active_model(&self) -> String {
        self.provider.read().model().to_string()
    }
}

struct InFlightLease<'a> {
    adapter: &'a EmbeddingAdapter,
}

impl Drop for InFlightLease<'_> {
    fn drop(&mut self) {
        self.adapter.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_config::embedding::EmbeddingConfig;

    fn adapter_with_dimension(dim: usize) -> EmbeddingAdapter {
        let config = Arc::new(EmbeddingConfigGuard::new(EmbeddingConfig::new(
            "local", "m1", dim,
        )));
        let provider: Arc<dyn EmbeddingProvider> =
            Arc::new(DeterministicHashEmbedder::new("m1", dim));
        EmbeddingAdapter::new(config, provider)
    }

    #[tokio::test]
    async fn embeds_matching_dimension() {
        let adapter = adapter_with_dimension(32);
        let v = adapter.embed("hello world").await.unwrap();
        assert_eq!(v.len(), 32);
    }

    #[tokio::test]
    async fn rejects_provider_dimension_mismatch() {
        let config = Arc::new(EmbeddingConfigGuard::new(EmbeddingConfig::new(
            "local", "m1", 64,
        )));
        let provider: Arc<dyn EmbeddingProvider> =
            Arc::new(DeterministicHashEmbedder::new("m1", 32));
        let adapter = EmbeddingAdapter::new(config, provider);
        let err = adapter.embed("hello").await.unwrap_err();
        assert!(matches!(err, EmbedError::DimensionMismatch { got: 32, expected: 64 }));
    }

    #[tokio::test]
    async fn hot_swap_switches_active_provider() {
        let adapter = adapter_with_dimension(16);
        assert_eq!(adapter.active_model(), "m1");
        let new_provider: Arc<dyn EmbeddingProvider> =
            Arc::new(DeterministicHashEmbedder::new("m2", 16));
        adapter.hot_swap(new_provider).await;
        assert_eq!(adapter.active_model(), "m2");
        let v = adapter.embed("hello").await.unwrap();
        assert_eq!(v.len(), 16);
    }

    #[tokio::test]
    async fn batch_embed_preserves_order_and_fails_fast_on_mismatch() {
        let adapter = adapter_with_dimension(8);
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let vectors = adapter.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|v| v.len() == 8));
    }
}
