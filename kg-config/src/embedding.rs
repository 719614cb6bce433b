//! Embedding configuration and its change-protection / hot-swap guard
//! (§4.3). Expressed as an atomically-swapped handle inside a service
//! object per the redesign note in §9 — never module-level global state.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// `{provider, model, dimension, extra_params}` — the single active
/// embedding configuration (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub dimension: usize,
    #[serde(default)]
    pub extra_params: serde_json::Map<String, serde_json::Value>,
}

impl EmbeddingConfig {
    #[must_use]
    pub fn new(provider: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            dimension,
            extra_params: serde_json::Map::new(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::new("local", "deterministic-hash-384", 384)
    }
}

/// How long a new operation will wait for an in-flight hot-reload swap to
/// finish before it may observe the *old* model (§4.3: "a small bounded
/// interval").
pub const SWAP_WAIT_BOUND: Duration = Duration::from_millis(500);

/// A hot-swappable, change-protected handle to the active embedding
/// configuration. Protected by default immediately after any change, so
/// every mutation is a deliberate two-step `unprotect()` then `set()`.
pub struct EmbeddingConfigGuard {
    inner: RwLock<Protected<EmbeddingConfig>>,
}

struct Protected<T> {
    value: Arc<T>,
    change_protected: bool,
}

impl EmbeddingConfigGuard {
    #[must_use]
    pub fn new(initial: EmbeddingConfig) -> Self {
        Self {
            inner: RwLock::new(Protected {
                value: Arc::new(initial),
                change_protected: true,
            }),
        }
    }

    /// The currently active configuration.
    #[must_use]
    pub fn current(&self) -> Arc<EmbeddingConfig> {
        Arc::clone(&self.inner.read().value)
    }

    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.inner.read().change_protected
    }

    /// Explicitly unprotect the active configuration so the next `set()`
    /// is accepted. Mirrors spec §4.3: "configuration changes require
    /// explicit unprotect".
    pub fn unprotect(&self) {
        self.inner.write().change_protected = false;
    }

    /// Swap in a new configuration.
    ///
    /// A dimension change invalidates all stored embeddings; per §4.3 this
    /// crate never re-embeds automatically, it only refuses to let a
    /// caller silently mix vector spaces. `dimension_changed` in the
    /// returned [`SwapOutcome`] is the signal the ingestion engine uses to
    /// surface a re-embedding task (Open Question 4: left out of scope).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Protected`] if the active config was not
    /// unprotected first.
    pub fn set(&self, new_config: EmbeddingConfig) -> Result<SwapOutcome> {
        let mut guard = self.inner.write();
        if guard.change_protected {
            return Err(ConfigError::Protected(
                "embedding configuration is change-protected".into(),
            ));
        }
        let old = Arc::clone(&guard.value);
        let dimension_changed = old.dimension != new_config.dimension;
        guard.value = Arc::new(new_config);
        // Auto-protect again immediately after the change (§4.3).
        guard.change_protected = true;
        Ok(SwapOutcome {
            previous: old,
            dimension_changed,
        })
    }
}

/// Result of a configuration swap.
pub struct SwapOutcome {
    pub previous: Arc<EmbeddingConfig>,
    pub dimension_changed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_without_unprotect_is_rejected() {
        let guard = EmbeddingConfigGuard::new(EmbeddingConfig::default());
        let err = guard.set(EmbeddingConfig::new("openai", "text-embedding-3-small", 1536));
        assert!(err.is_err());
    }

    #[test]
    fn unprotect_then_set_succeeds_and_reprotects() {
        let guard = EmbeddingConfigGuard::new(EmbeddingConfig::default());
        guard.unprotect();
        let outcome = guard
            .set(EmbeddingConfig::new("openai", "text-embedding-3-small", 1536))
            .unwrap();
        assert!(outcome.dimension_changed);
        assert_eq!(guard.current().dimension, 1536);
        assert!(guard.is_protected());
        // Second set without unprotecting again must fail.
        assert!(guard
            .set(EmbeddingConfig::new("openai", "text-embedding-3-large", 3072))
            .is_err());
    }

    #[test]
    fn same_dimension_swap_reports_unchanged() {
        let guard = EmbeddingConfigGuard::new(EmbeddingConfig::new("local", "m1", 384));
        guard.unprotect();
        let outcome = guard.set(EmbeddingConfig::new("local", "m2", 384)).unwrap();
        assert!(!outcome.dimension_changed);
    }
}
