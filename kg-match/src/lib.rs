//! Concept matcher (C7): for each extracted concept, decide whether it
//! links to an existing [`kg_core::types::Concept`] or becomes a new one,
//! and normalizes extracted relationship-type strings against the
//! registered vocabulary (§4.6).

pub mod error;
pub mod relationship_type;

pub use error::{MatchError, Result};
pub use relationship_type::{normalize as normalize_relationship_type, NormalizedType};

use kg_config::ConceptMatchConfig;
use kg_core::types::Concept;
use kg_embed::EmbeddingAdapter;
use kg_vector::{DegreeLookup, SearchQuery, VectorIndex};
use tracing::debug;

/// The outcome of matching one extracted concept against the vector
/// index (§4.6 steps 3-4).
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Matched an existing concept; its `search_terms` should be merged
    /// with the newly extracted ones via
    /// [`kg_core::types::Concept::merge_search_terms`].
    Link { concept_id: String, similarity: f32 },
    /// No match cleared the threshold; mint a new concept.
    Create { embedding: Vec<f32> },
}

/// Compute the embedding text for a concept the way §4.6 step 1 specifies:
/// `label + " " + join(search_terms, " ")`.
#[must_use]
pub fn embedding_text(label: &str, search_terms: &[String]) -> String {
    if search_terms.is_empty() {
        label.to_string()
    } else {
        format!("{label} {}", search_terms.join(" "))
    }
}

/// Run the link-vs-create decision for one extracted concept.
///
/// # Errors
///
/// Propagates embedding or vector-search failures.
pub async fn match_concept(
    label: &str,
    search_terms: &[String],
    embed: &EmbeddingAdapter,
    index: &dyn VectorIndex,
    degrees: &dyn DegreeLookup,
    config: &ConceptMatchConfig,
) -> Result<MatchOutcome> {
    let text = embedding_text(label, search_terms);
    let embedding = embed.embed(&text).await?;

    let query = SearchQuery {
        embedding: embedding.clone(),
        top_k: config.top_k,
        threshold: config.similarity_threshold,
        strategy: config.strategy,
        degree_percentile: config.degree_percentile,
    };
    let hits = index.search(&query, degrees).await?;

    match hits.first() {
        Some(top) => {
            debug!(concept_id = %top.concept_id, similarity = top.similarity, "linking to existing concept");
            Ok(MatchOutcome::Link {
                concept_id: top.concept_id.clone(),
                similarity: top.similarity,
            })
        }
        None => Ok(MatchOutcome::Create { embedding }),
    }
}

/// Apply a [`MatchOutcome::Link`] decision to an existing concept,
/// merging newly extracted search terms in place (§4.6 step 3).
pub fn apply_link(existing: &mut Concept, incoming_search_terms: &[String]) {
    existing.merge_search_terms(incoming_search_terms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_config::embedding::{EmbeddingConfig, EmbeddingConfigGuard};
    use kg_embed::DeterministicHashEmbedder;
    use kg_vector::{InMemoryVectorIndex, NoDegrees};
    use std::sync::Arc;

    fn adapter(dim: usize) -> EmbeddingAdapter {
        let config = Arc::new(EmbeddingConfigGuard::new(EmbeddingConfig::new("local", "m", dim)));
        let provider = Arc::new(DeterministicHashEmbedder::new("m", dim));
        EmbeddingAdapter::new(config, provider)
    }

    #[tokio::test]
    async fn links_to_near_duplicate_label() {
        let embed = adapter(32);
        let index = InMemoryVectorIndex::new();
        let existing_embedding = embed.embed("Homeostasis self-regulation").await.unwrap();
        index.upsert("homeostasis".into(), existing_embedding).await.unwrap();

        let config = ConceptMatchConfig {
            similarity_threshold: 0.99,
            ..Default::default()
        };
        let outcome = match_concept(
            "Homeostasis",
            &["self-regulation".to_string()],
            &embed,
            &index,
            &NoDegrees,
            &config,
        )
        .await
        .unwrap();
        assert_eq!(
            outcome,
            MatchOutcome::Link {
                concept_id: "homeostasis".into(),
                similarity: 1.0
            }
        );
    }

    #[tokio::test]
    async fn creates_when_nothing_matches() {
        let embed = adapter(32);
        let index = InMemoryVectorIndex::new();
        let config = ConceptMatchConfig::default();
        let outcome = match_concept("Entropy", &[], &embed, &index, &NoDegrees, &config)
            .await
            .unwrap();
        assert!(matches!(outcome, MatchOutcome::Create { .. }));
    }

    #[test]
    fn embedding_text_joins_label_and_terms() {
        assert_eq!(
            embedding_text("Homeostasis", &["self-regulation".to_string(), "balance".to_string()]),
            "Homeostasis self-regulation balance"
        );
        assert_eq!(embedding_text("Entropy", &[]), "Entropy");
    }
}
