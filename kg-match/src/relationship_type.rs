//! Relationship-type normalization: a four-stage cascade from an
//! extracted free-text `type` string to a registered
//! [`kg_core::types::VocabType`] name (§4.6).
//!
//! 1. exact match -> confidence 1.0
//! 2. prefix match (either direction) -> confidence 1.0
//! 3. Porter-stem equality -> confidence ~0.67
//! 4. normalized Levenshtein similarity >= threshold -> that similarity
//!
//! The first stage to produce a match wins; if none clears
//! `fuzzy_match_threshold` the relationship is rejected.

use kg_core::types::VocabType;
use rust_stemmers::{Algorithm, Stemmer};

/// Confidence reported for a Porter-stem match — fixed rather than a
/// similarity score, since stem equality is binary (§4.6).
pub const STEM_MATCH_CONFIDENCE: f32 = 0.67;

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedType {
    pub vocab_name: String,
    pub confidence: f32,
}

/// Run the cascade against the registered vocabulary. Returns `None` if no
/// stage clears `fuzzy_match_threshold`; the caller drops the relationship
/// and logs it (§4.7 step 5d).
#[must_use]
pub fn normalize(extracted: &str, vocabulary: &[VocabType], fuzzy_match_threshold: f32) -> Option<NormalizedType> {
    let extracted_upper = extracted.trim().to_uppercase();
    if extracted_upper.is_empty() {
        return None;
    }

    // Stage 1: exact match.
    if let Some(vocab) = vocabulary.iter().find(|v| v.name == extracted_upper) {
        return Some(NormalizedType {
            vocab_name: vocab.name.clone(),
            confidence: 1.0,
        });
    }

    // Stage 2: prefix match, either direction.
    if let Some(vocab) = vocabulary.iter().find(|v| {
        v.name.starts_with(&extracted_upper) || extracted_upper.starts_with(&v.name)
    }) {
        return Some(NormalizedType {
            vocab_name: vocab.name.clone(),
            confidence: 1.0,
        });
    }

    // Stage 3: Porter-stem equality.
    let stemmer = Stemmer::create(Algorithm::English);
    let extracted_stem = stem_words(&stemmer, &extracted_upper);
    if let Some(vocab) = vocabulary
        .iter()
        .find(|v| stem_words(&stemmer, &v.name) == extracted_stem)
    {
        return Some(NormalizedType {
            vocab_name: vocab.name.clone(),
            confidence: STEM_MATCH_CONFIDENCE,
        });
    }

    // Stage 4: normalized Levenshtein similarity.
    let best = vocabulary
        .iter()
        .map(|v| {
            let similarity = strsim::normalized_levenshtein(&extracted_upper, &v.name) as f32;
            (v, similarity)
        })
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    match best {
        Some((vocab, similarity)) if similarity >= fuzzy_match_threshold => Some(NormalizedType {
            vocab_name: vocab.name.clone(),
            confidence: similarity,
        }),
        _ => None,
    }
}

/// Stem every underscore-separated word in a `VocabType`-style name and
/// rejoin, so multi-word types (`CONTRASTS_WITH`) compare stem-for-stem.
fn stem_words(stemmer: &Stemmer, name: &str) -> String {
    name.split('_')
        .map(|w| stemmer.stem(&w.to_lowercase()).to_string())
        .collect::<Vec<_>>()
        .join("_")
}
