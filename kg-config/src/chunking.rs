//! Chunker configuration (§4.1, §6 submission surface, §6 config knobs).

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    pub target_words: usize,
    pub min_words: usize,
    pub max_words: usize,
    pub overlap_words: usize,
    /// Checkpoint after this many chunks; spec default is "every chunk".
    pub checkpoint_interval: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_words: 1000,
            min_words: 800,
            max_words: 1500,
            overlap_words: 200,
            checkpoint_interval: 1,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_words == 0 || self.max_words == 0 || self.target_words == 0 {
            return Err(ConfigError::Invalid(
                "chunking word bounds must be positive".into(),
            ));
        }
        if !(self.min_words <= self.target_words && self.target_words <= self.max_words) {
            return Err(ConfigError::Invalid(format!(
                "expected min_words <= target_words <= max_words, got {} <= {} <= {}",
                self.min_words, self.target_words, self.max_words
            )));
        }
        if self.overlap_words >= self.max_words {
            return Err(ConfigError::Invalid(
                "overlap_words must be smaller than max_words".into(),
            ));
        }
        if self.checkpoint_interval == 0 {
            return Err(ConfigError::Invalid(
                "checkpoint_interval must be >= 1".into(),
            ));
        }
        Ok(())
    }
}
