//! Job Analyzer (C10): a pure function over a word count and the active
//! cost model, run once when a job leaves `pending`. Never calls the LLM
//! (§4.9) — every number here is a projection, not a measurement.

use chrono::Utc;
use kg_config::{AnalyzerCostModel, ChunkingConfig};

use crate::model::{AnalysisResult, CostEstimate, FileStats};

/// Count words the same way C2 does, so `estimated_chunks` here matches
/// what chunking will actually produce.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Project cost, chunk count, and warnings for a not-yet-ingested document.
///
/// `duplicate_checkpoint_elsewhere` flags that another active job already
/// holds a checkpoint for this `content_hash` (§4.9's "existing checkpoint
/// for same content_hash in another active job" warning).
#[must_use]
pub fn analyze(
    word_count: usize,
    chunking: &ChunkingConfig,
    cost_model: &AnalyzerCostModel,
    duplicate_checkpoint_elsewhere: bool,
    encoding_known: bool,
) -> AnalysisResult {
    let estimated_chunks = word_count.div_ceil(chunking.target_words.max(1));

    let extraction_tokens_low = word_count as f64 * cost_model.extraction_low_factor;
    let extraction_tokens_high = word_count as f64 * cost_model.extraction_high_factor;
    let extraction_usd_low = extraction_tokens_low / 1_000_000.0 * cost_model.extraction_rate_per_million;
    let extraction_usd_high = extraction_tokens_high / 1_000_000.0 * cost_model.extraction_rate_per_million;

    let estimated_concepts =
        (word_count as f64 / 1000.0 * cost_model.concepts_per_thousand_words).round() as usize;
    let embedding_tokens = estimated_concepts as f64 * cost_model.embedding_tokens_per_concept;
    let embedding_usd = embedding_tokens / 1_000_000.0 * cost_model.embedding_rate_per_million;

    let mut warnings = Vec::new();
    if estimated_chunks > cost_model.large_file_chunk_warning {
        let minutes = estimated_chunks as f64 * cost_model.minutes_per_chunk;
        warnings.push(format!(
            "large file: {estimated_chunks} chunks, roughly {minutes:.0} minutes to ingest"
        ));
    }
    if duplicate_checkpoint_elsewhere {
        warnings.push("another active job already holds a checkpoint for this content_hash".to_string());
    }
    if !encoding_known {
        warnings.push("file encoding could not be determined, assuming UTF-8".to_string());
    }

    AnalysisResult {
        file_stats: FileStats {
            word_count,
            estimated_chunks,
        },
        cost_estimate: CostEstimate {
            extraction_usd_low,
            extraction_usd_high,
            embedding_usd,
            total_usd_low: extraction_usd_low + embedding_usd,
            total_usd_high: extraction_usd_high + embedding_usd,
        },
        estimated_concepts,
        config_snapshot: cost_model.clone(),
        warnings,
        analyzed_at: Utc::now(),
    }
}
