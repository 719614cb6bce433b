//! Layered configuration for the knowledge-graph ingestion engine:
//! defaults -> TOML file -> environment variable overrides, the way
//! `llmspell-config` composes its sources. Two pieces double as the
//! "single active row enforced by a partial index" tables from spec §6:
//! [`concept_match::ConceptMatchConfig`] and [`embedding::EmbeddingConfig`]
//! (the latter behind the hot-swap guard in [`embedding::EmbeddingConfigGuard`]).

pub mod analyzer;
pub mod chunking;
pub mod concept_match;
pub mod embedding;
pub mod env;
pub mod error;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use analyzer::AnalyzerCostModel;
pub use chunking::ChunkingConfig;
pub use concept_match::{ConceptMatchConfig, VectorStrategy};
pub use embedding::{EmbeddingConfig, EmbeddingConfigGuard, SwapOutcome};
pub use error::{ConfigError, Result};

mod jobs;
pub use jobs::JobsConfig;

/// The full, file-loadable configuration. The embedding configuration is
/// intentionally *not* part of this struct: it is never read from a plain
/// TOML file without going through [`EmbeddingConfigGuard`], so that
/// protection/unprotect semantics cannot be bypassed by a config reload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub chunking: ChunkingConfig,
    pub concept_match: ConceptMatchConfig,
    pub jobs: JobsConfig,
    pub analyzer: AnalyzerCostModel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            concept_match: ConceptMatchConfig::default(),
            jobs: JobsConfig::default(),
            analyzer: AnalyzerCostModel::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file, falling back to defaults for any field the
    /// file omits (`#[serde(default)]` on every sub-config), then apply
    /// environment overrides, then validate.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Self = toml::from_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides applied and validated; used
    /// when no config file is present.
    pub fn from_env_or_default() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env::parse_env::<usize>("KG_WORKER_POOL_SIZE") {
            self.jobs.worker_pool_size = v;
        }
        if let Some(v) = env::parse_env::<f32>("KG_SIMILARITY_THRESHOLD") {
            self.concept_match.similarity_threshold = v;
        }
        if let Some(v) = env::parse_env::<usize>("KG_VECTOR_TOP_K") {
            self.concept_match.top_k = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.concept_match.validate()?;
        Ok(())
    }
}
