//! Cost-model constants for the job analyzer (C10, §4.9). SPEC_FULL §11.3:
//! the distilled spec names the shape of the cost model but not concrete
//! rates, so these are fixed here as overridable configuration rather than
//! inline magic numbers in the analyzer itself.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyzerCostModel {
    /// Extraction tokens per word, low estimate (terse LLM output).
    pub extraction_low_factor: f64,
    /// Extraction tokens per word, high estimate (verbose LLM output).
    pub extraction_high_factor: f64,
    /// USD per million extraction tokens.
    pub extraction_rate_per_million: f64,
    /// Estimated embedding tokens consumed per extracted concept.
    pub embedding_tokens_per_concept: f64,
    /// USD per million embedding tokens.
    pub embedding_rate_per_million: f64,
    /// Estimated concepts produced per 1000 words, used to project
    /// `estimated_concepts` before any extraction has run.
    pub concepts_per_thousand_words: f64,
    /// Above this many estimated chunks, warn the operator about runtime.
    pub large_file_chunk_warning: usize,
    /// Assumed wall-clock minutes per chunk, used to phrase large-file
    /// warnings in terms of minutes rather than raw chunk counts.
    pub minutes_per_chunk: f64,
}

impl Default for AnalyzerCostModel {
    fn default() -> Self {
        Self {
            extraction_low_factor: 1.3,
            extraction_high_factor: 2.2,
            extraction_rate_per_million: 3.0,
            embedding_tokens_per_concept: 24.0,
            embedding_rate_per_million: 0.13,
            concepts_per_thousand_words: 4.5,
            large_file_chunk_warning: 16,
            minutes_per_chunk: 0.75,
        }
    }
}
