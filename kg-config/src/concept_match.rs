//! Concept-match configuration: the single active row backing C7 (§4.6) and
//! C5's strategy selection (§4.4).

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Vector index search strategy, selectable at ingestion start from this
/// persistent configuration (§4.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VectorStrategy {
    /// Search all concepts.
    Exhaustive,
    /// Pre-filter to the top-degree percentile, then search.
    DegreeOnly,
    /// Epsilon-greedy: 80% top-degree filter, 20% full set, merged.
    DegreeBiased,
}

impl Default for VectorStrategy {
    fn default() -> Self {
        Self::Exhaustive
    }
}

/// Concept-match configuration: thresholds for C7, loaded once at job start
/// and cached for the job's lifetime (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConceptMatchConfig {
    pub strategy: VectorStrategy,
    pub similarity_threshold: f32,
    pub top_k: usize,
    pub degree_percentile: f32,
    /// Confidence floor for the relationship-type fuzzy cascade (§4.6).
    pub fuzzy_match_threshold: f32,
}

impl Default for ConceptMatchConfig {
    fn default() -> Self {
        Self {
            strategy: VectorStrategy::Exhaustive,
            similarity_threshold: 0.85,
            top_k: 5,
            degree_percentile: 0.75,
            fuzzy_match_threshold: 0.8,
        }
    }
}

impl ConceptMatchConfig {
    /// Validate the invariants this config must hold; called on load.
    pub fn validate(&self) -> Result<()> {
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        if !in_unit(self.similarity_threshold) {
            return Err(ConfigError::Invalid(format!(
                "similarity_threshold must be in [0,1], got {}",
                self.similarity_threshold
            )));
        }
        if !in_unit(self.degree_percentile) {
            return Err(ConfigError::Invalid(format!(
                "degree_percentile must be in [0,1], got {}",
                self.degree_percentile
            )));
        }
        if !in_unit(self.fuzzy_match_threshold) {
            return Err(ConfigError::Invalid(format!(
                "fuzzy_match_threshold must be in [0,1], got {}",
                self.fuzzy_match_threshold
            )));
        }
        if self.top_k == 0 {
            return Err(ConfigError::Invalid("top_k must be >= 1".into()));
        }
        Ok(())
    }
}
