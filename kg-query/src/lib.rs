//! Query Facade (C13): concept search, evidence retrieval, path finding and
//! neighborhood traversal over the graph built by ingestion (§4.11).
//!
//! Every method here is read-only and synchronous except the two that need
//! an embedding call (`search_concepts`, `find_connection_by_query`).
//! Modeled on the teacher's `RetrievalFlow::search` (`llmspell-rag`):
//! embed the query, search the vector index, shape the hits — but without
//! hybrid fusion or reranking, which this engine has no use for.

pub mod error;

pub use error::{QueryError, Result};
pub use kg_graph::{Path, RelatedConcept};

use std::sync::Arc;

use kg_config::ConceptMatchConfig;
use kg_core::edges::SemanticEdge;
use kg_core::types::{Concept, Instance, Source};
use kg_embed::EmbeddingAdapter;
use kg_graph::InMemoryGraphStore;
use kg_vector::{SearchQuery, VectorIndex};
use tracing::debug;

/// One ranked hit from [`QueryFacade::search_concepts`] (§4.11).
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptSearchHit {
    pub concept_id: String,
    pub label: String,
    pub similarity: f32,
    /// Ontologies this concept appears in; concepts are global (Open
    /// Question 1), so this can have more than one entry.
    pub ontology_set: Vec<String>,
}

/// Full detail view of one concept (§4.11): its edges and the Instances
/// (with backing Source) evidencing it.
#[derive(Debug, Clone)]
pub struct ConceptDetails {
    pub concept_id: String,
    pub label: String,
    pub search_terms: Vec<String>,
    pub edges: Vec<SemanticEdge>,
    pub evidence: Vec<(Instance, Option<Source>)>,
}

/// Stateless facade over a graph store, vector index and embedding
/// adapter; holds no query-session state of its own.
pub struct QueryFacade {
    graph: Arc<InMemoryGraphStore>,
    vector_index: Arc<dyn VectorIndex>,
    embed: Arc<EmbeddingAdapter>,
    match_config: ConceptMatchConfig,
}

impl QueryFacade {
    #[must_use]
    pub fn new(
        graph: Arc<InMemoryGraphStore>,
        vector_index: Arc<dyn VectorIndex>,
        embed: Arc<EmbeddingAdapter>,
        match_config: ConceptMatchConfig,
    ) -> Self {
        Self {
            graph,
            vector_index,
            embed,
            match_config,
        }
    }

    /// Embed `query_text` and return the `limit` nearest concepts at or
    /// above `min_similarity`, ranked by similarity descending (§4.11).
    ///
    /// # Errors
    ///
    /// Propagates embedding or vector-search failures.
    pub async fn search_concepts(
        &self,
        query_text: &str,
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<ConceptSearchHit>> {
        let hits = self.vector_search(query_text, limit, min_similarity).await?;
        let mut out = Vec::with_capacity(hits.len());
        for hit in hits {
            let Some(concept) = self.graph.get_concept(&hit.concept_id) else {
                // Index and graph can briefly disagree mid-ingest; skip
                // rather than fail the whole search.
                continue;
            };
            out.push(ConceptSearchHit {
                concept_id: concept.concept_id.clone(),
                label: concept.label,
                similarity: hit.similarity,
                ontology_set: self.graph.ontologies_for_concept(&concept.concept_id),
            });
        }
        Ok(out)
    }

    /// Label, search terms, every semantic edge, and every linked Instance
    /// (with its Source) for `concept_id` (§4.11).
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NotFound`] if `concept_id` doesn't exist.
    pub fn concept_details(&self, concept_id: &str) -> Result<ConceptDetails> {
        let concept = self
            .graph
            .get_concept(concept_id)
            .ok_or_else(|| QueryError::NotFound(concept_id.to_string()))?;
        Ok(ConceptDetails {
            concept_id: concept.concept_id.clone(),
            label: concept.label,
            search_terms: concept.search_terms,
            edges: self.graph.edges_for_concept(concept_id),
            evidence: self.graph.instances_for_concept(concept_id),
        })
    }

    /// Shortest path (by edge count, ties broken by confidence) between two
    /// known concepts, within `max_hops` (§4.11).
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NotFound`] if either endpoint is unknown. A
    /// path that doesn't exist within `max_hops` is not an error — it comes
    /// back as `Ok(None)`.
    pub fn find_connection(&self, from_id: &str, to_id: &str, max_hops: usize) -> Result<Option<Path>> {
        if self.graph.get_concept(from_id).is_none() {
            return Err(QueryError::NotFound(from_id.to_string()));
        }
        if self.graph.get_concept(to_id).is_none() {
            return Err(QueryError::NotFound(to_id.to_string()));
        }
        Ok(kg_graph::find_connection(&self.graph, from_id, to_id, max_hops))
    }

    /// Resolve `from_text` and `to_text` to their best-matching concepts
    /// (similarity at or above the configured threshold), then call
    /// [`Self::find_connection`] on the resolved ids (§4.11).
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NotResolvable`] if either text doesn't reach
    /// the threshold against any indexed concept.
    pub async fn find_connection_by_query(
        &self,
        from_text: &str,
        to_text: &str,
        max_hops: usize,
    ) -> Result<Option<Path>> {
        let from_id = self.resolve_endpoint(from_text).await?;
        let to_id = self.resolve_endpoint(to_text).await?;
        Ok(kg_graph::find_connection(&self.graph, &from_id, &to_id, max_hops))
    }

    /// Breadth-first neighborhood of `concept_id`, deduplicated and grouped
    /// by minimum distance, up to `max_depth` (§4.11).
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NotFound`] if `concept_id` is unknown.
    pub fn related_concepts(&self, concept_id: &str, max_depth: usize) -> Result<Vec<RelatedConcept>> {
        if self.graph.get_concept(concept_id).is_none() {
            return Err(QueryError::NotFound(concept_id.to_string()));
        }
        Ok(kg_graph::related_concepts(&self.graph, concept_id, max_depth))
    }

    /// Property-level substring/regex match on `Concept.label` (§4.11).
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Graph`] if `pattern` is not a valid regex.
    pub fn substring_match(&self, pattern: &str, case_insensitive: bool, limit: usize) -> Result<Vec<Concept>> {
        Ok(self.graph.substring_match(pattern, case_insensitive, limit)?)
    }

    async fn resolve_endpoint(&self, text: &str) -> Result<String> {
        let hits = self
            .vector_search(text, 1, self.match_config.similarity_threshold)
            .await?;
        hits.into_iter()
            .next()
            .map(|hit| hit.concept_id)
            .ok_or_else(|| QueryError::NotResolvable(text.to_string()))
    }

    async fn vector_search(
        &self,
        text: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<kg_vector::SearchHit>> {
        let embedding = self.embed.embed(text).await?;
        let query = SearchQuery {
            embedding,
            top_k,
            threshold,
            strategy: self.match_config.strategy,
            degree_percentile: self.match_config.degree_percentile,
        };
        let hits = self.vector_index.search(&query, self.graph.as_ref()).await?;
        debug!(query = text, hits = hits.len(), "query facade vector search");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_config::embedding::{EmbeddingConfig, EmbeddingConfigGuard};
    use kg_core::edges::StructuralEdge;
    use kg_embed::DeterministicHashEmbedder;
    use kg_vector::InMemoryVectorIndex;

    fn facade_with(graph: Arc<InMemoryGraphStore>) -> QueryFacade {
        let embed_config = Arc::new(EmbeddingConfigGuard::new(EmbeddingConfig::new("local", "m", 8)));
        let provider = Arc::new(DeterministicHashEmbedder::new("m", 8));
        let embed = Arc::new(EmbeddingAdapter::new(embed_config, provider));
        let vector_index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());
        QueryFacade::new(graph, vector_index, embed, ConceptMatchConfig::default())
    }

    async fn seed_concept(facade: &QueryFacade, graph: &InMemoryGraphStore, label: &str) -> Concept {
        let embedding = facade.embed.embed(label).await.unwrap();
        let concept = Concept::new(label.to_string(), vec![], embedding.clone());
        graph
            .transaction(|tx| {
                tx.upsert_concept(concept.clone());
                Ok(())
            })
            .unwrap();
        facade
            .vector_index
            .upsert(concept.concept_id.clone(), embedding)
            .await
            .unwrap();
        concept
    }

    #[tokio::test]
    async fn search_concepts_finds_near_duplicate_label() {
        let graph = Arc::new(InMemoryGraphStore::new());
        let facade = facade_with(graph.clone());
        let concept = seed_concept(&facade, &graph, "Homeostasis").await;

        let hits = facade.search_concepts("Homeostasis", 5, 0.5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].concept_id, concept.concept_id);
    }

    #[test]
    fn concept_details_reports_not_found_for_unknown_id() {
        let graph = Arc::new(InMemoryGraphStore::new());
        let facade = facade_with(graph);
        assert!(matches!(facade.concept_details("nope"), Err(QueryError::NotFound(_))));
    }

    #[tokio::test]
    async fn concept_details_includes_edges_and_evidence() {
        let graph = Arc::new(InMemoryGraphStore::new());
        let facade = facade_with(graph.clone());
        let a = seed_concept(&facade, &graph, "Cause").await;
        let b = seed_concept(&facade, &graph, "Effect").await;
        graph
            .transaction(|tx| {
                tx.merge_semantic_edge(SemanticEdge::new(
                    a.concept_id.clone(),
                    b.concept_id.clone(),
                    "CAUSES".into(),
                    0.9,
                ));
                let instance = Instance {
                    instance_id: "inst1".into(),
                    quote: "A causes B".into(),
                };
                tx.add_instance(instance.clone());
                tx.add_structural_edge(a.concept_id.clone(), StructuralEdge::EvidencedBy, instance.instance_id.clone());
                Ok(())
            })
            .unwrap();

        let details = facade.concept_details(&a.concept_id).unwrap();
        assert_eq!(details.edges.len(), 1);
        assert_eq!(details.evidence.len(), 1);
    }

    #[test]
    fn find_connection_rejects_unknown_endpoint() {
        let graph = Arc::new(InMemoryGraphStore::new());
        let facade = facade_with(graph.clone());
        graph
            .transaction(|tx| {
                tx.upsert_concept(Concept::new("A".into(), vec![], vec![]));
                Ok(())
            })
            .unwrap();
        let result = facade.find_connection("a", "missing", 3);
        assert!(matches!(result, Err(QueryError::NotFound(_))));
    }

    #[test]
    fn find_connection_returns_none_without_error_when_no_path_exists() {
        let graph = Arc::new(InMemoryGraphStore::new());
        let facade = facade_with(graph.clone());
        graph
            .transaction(|tx| {
                tx.upsert_concept(Concept::new("A".into(), vec![], vec![]));
                tx.upsert_concept(Concept::new("B".into(), vec![], vec![]));
                Ok(())
            })
            .unwrap();
        let path = facade.find_connection("a", "b", 3).unwrap();
        assert!(path.is_none());
    }

    #[tokio::test]
    async fn find_connection_by_query_reports_not_resolvable_below_threshold() {
        let graph = Arc::new(InMemoryGraphStore::new());
        let mut facade = facade_with(graph.clone());
        facade.match_config.similarity_threshold = 0.999;
        seed_concept(&facade, &graph, "Something Else Entirely").await;

        let result = facade.find_connection_by_query("totally unrelated text", "also unrelated", 3).await;
        assert!(matches!(result, Err(QueryError::NotResolvable(_))));
    }

    #[test]
    fn substring_match_is_property_level() {
        let graph = Arc::new(InMemoryGraphStore::new());
        let facade = facade_with(graph.clone());
        graph
            .transaction(|tx| {
                tx.upsert_concept(Concept::new("Requisite Variety".into(), vec![], vec![]));
                Ok(())
            })
            .unwrap();
        let hits = facade.substring_match("variety", true, 10).unwrap();
        assert_eq!(hits.len(), 1);
    }
}
