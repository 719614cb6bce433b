//! Ingestion engine (C8): the per-document, per-chunk state machine that
//! drives chunking (C2), extraction (C3), embedding (C4), concept matching
//! (C7), and graph commit (C6), checkpointing after every chunk (§4.7).

pub mod error;
pub mod progress;

pub use error::{IngestError, Result};
pub use progress::{ChunkProgress, IngestStats, InMemoryCheckpoint, JobCheckpoint};

use std::collections::HashMap;
use std::sync::Arc;

use kg_config::{ChunkingConfig, ConceptMatchConfig};
use kg_core::edges::{SemanticEdge, StructuralEdge};
use kg_core::ids::new_instance_id;
use kg_core::types::{Concept, Instance, Source, VocabType};
use kg_embed::EmbeddingAdapter;
use kg_extract::{ExtractionAdapter, LlmClient, RecentConcept};
use kg_graph::InMemoryGraphStore;
use kg_match::{apply_link, match_concept, normalize_relationship_type, MatchOutcome};
use kg_vector::VectorIndex;
use tracing::{debug, info, warn};

/// Recent-concept context is bounded to at most this many items (§4.7
/// step 3).
pub const MAX_RECENT_CONCEPT_CONTEXT: usize = 50;

enum ConceptUpdate {
    Create(Concept),
    Link { concept_id: String, search_terms: Vec<String> },
}

/// Everything the engine needs to process one document, wired once per
/// job. Mirrors the teacher's `DocumentProcessor`: chunking and embedding
/// collaborators held behind `Arc`, with the document-processing method
/// doing the orchestration.
pub struct IngestionEngine<C: LlmClient> {
    chunk_config: ChunkingConfig,
    embed: Arc<EmbeddingAdapter>,
    extractor: Arc<ExtractionAdapter<C>>,
    vector_index: Arc<dyn VectorIndex>,
    graph: Arc<InMemoryGraphStore>,
    vocabulary: Vec<VocabType>,
    match_config: ConceptMatchConfig,
}

impl<C: LlmClient> IngestionEngine<C> {
    #[must_use]
    pub fn new(
        chunk_config: ChunkingConfig,
        embed: Arc<EmbeddingAdapter>,
        extractor: Arc<ExtractionAdapter<C>>,
        vector_index: Arc<dyn VectorIndex>,
        graph: Arc<InMemoryGraphStore>,
        vocabulary: Vec<VocabType>,
        match_config: ConceptMatchConfig,
    ) -> Self {
        Self {
            chunk_config,
            embed,
            extractor,
            vector_index,
            graph,
            vocabulary,
            match_config,
        }
    }

    /// Process a full document end to end: chunk it, then run each chunk
    /// through the per-chunk protocol, checkpointing after every one.
    ///
    /// # Errors
    ///
    /// Returns the first [`IngestError`] that isn't recoverable (graph
    /// commit failure, checkpoint write failure, or a chunk extraction
    /// failure whose underlying cause was a sustained/fatal LLM error).
    /// A recoverable chunk failure also returns `Err` — the caller (the
    /// job queue) is the one that decides whether the job stays
    /// `processing` for a later restart, per §7.
    pub async fn process_document(
        &self,
        document_text: &str,
        content_hash: &str,
        ontology: &str,
        file_path: &str,
        checkpoint: &dyn JobCheckpoint,
    ) -> Result<IngestStats> {
        let chunks = kg_chunk::chunk_document(document_text, &self.chunk_config)?;
        let mut progress = checkpoint.load().await;

        info!(
            total_chunks = chunks.len(),
            resume_from = ?progress.resume_from_chunk,
            "starting document ingestion"
        );

        for chunk in &chunks {
            if let Some(resume) = progress.resume_from_chunk {
                if chunk.chunk_index <= resume {
                    debug!(chunk_index = chunk.chunk_index, "skipping already-checkpointed chunk");
                    continue;
                }
            }

            let chunk_stats = self
                .process_chunk(chunk, content_hash, ontology, file_path)
                .await?;

            progress.stats.accumulate(&chunk_stats);
            progress.resume_from_chunk = Some(chunk.chunk_index);
            progress.recent_concept_ids = self
                .graph
                .recent_concepts(MAX_RECENT_CONCEPT_CONTEXT)
                .into_iter()
                .map(|c| c.concept_id)
                .collect();

            checkpoint
                .checkpoint(&progress)
                .await
                .map_err(|_| IngestError::CheckpointWriteFailed(format!("chunk {}", chunk.chunk_index)))?;
        }

        Ok(progress.stats)
    }

    async fn process_chunk(
        &self,
        chunk: &kg_chunk::Chunk,
        content_hash: &str,
        ontology: &str,
        file_path: &str,
    ) -> Result<IngestStats> {
        let recent_ctx: Vec<RecentConcept> = self
            .graph
            .recent_concepts(MAX_RECENT_CONCEPT_CONTEXT)
            .into_iter()
            .map(|c| RecentConcept {
                concept_id: c.concept_id,
                label: c.label,
                search_terms: c.search_terms,
            })
            .collect();

        let extraction = self
            .extractor
            .extract(&chunk.text, &recent_ctx)
            .await
            .map_err(|source| {
                let recoverable = matches!(source, kg_extract::ExtractError::SchemaValidation { .. });
                IngestError::ChunkExtractionFailed {
                    chunk_index: chunk.chunk_index,
                    source,
                    recoverable,
                }
            })?;

        // Concept matching happens before the graph transaction opens:
        // it's async (embedding + vector search), and the transaction
        // closure the graph store runs is synchronous.
        let mut local_to_concept_id: HashMap<String, String> = HashMap::new();
        let mut concept_updates = Vec::with_capacity(extraction.concepts.len());
        for extracted in &extraction.concepts {
            let outcome = match_concept(
                &extracted.label,
                &extracted.search_terms,
                &self.embed,
                self.vector_index.as_ref(),
                self.graph.as_ref(),
                &self.match_config,
            )
            .await?;
            match outcome {
                MatchOutcome::Link { concept_id, similarity } => {
                    debug!(local_id = %extracted.local_id, %concept_id, similarity, "linked concept");
                    local_to_concept_id.insert(extracted.local_id.clone(), concept_id.clone());
                    concept_updates.push(ConceptUpdate::Link {
                        concept_id,
                        search_terms: extracted.search_terms.clone(),
                    });
                }
                MatchOutcome::Create { embedding } => {
                    let concept = Concept::new(extracted.label.clone(), extracted.search_terms.clone(), embedding);
                    local_to_concept_id.insert(extracted.local_id.clone(), concept.concept_id.clone());
                    concept_updates.push(ConceptUpdate::Create(concept));
                }
            }
        }

        // Relationship-type normalization and endpoint resolution (§4.7
        // step 5d): an endpoint is resolved if it was minted in this same
        // chunk or already exists in the graph.
        let mut resolved_edges = Vec::new();
        let mut relationships_rejected = 0usize;
        for relationship in &extraction.relationships {
            let from_id = self.resolve_endpoint(&relationship.from, &local_to_concept_id);
            let to_id = self.resolve_endpoint(&relationship.to, &local_to_concept_id);
            match (from_id, to_id) {
                (Some(from_id), Some(to_id)) => {
                    match normalize_relationship_type(
                        &relationship.edge_type,
                        &self.vocabulary,
                        self.match_config.fuzzy_match_threshold,
                    ) {
                        Some(normalized) => {
                            resolved_edges.push(SemanticEdge::new(
                                from_id,
                                to_id,
                                normalized.vocab_name,
                                relationship.confidence,
                            ));
                        }
                        None => {
                            warn!(edge_type = %relationship.edge_type, "rejected relationship type, no vocabulary match");
                            relationships_rejected += 1;
                        }
                    }
                }
                _ => {
                    warn!(from = %relationship.from, to = %relationship.to, "dropped relationship, unresolved endpoint");
                    relationships_rejected += 1;
                }
            }
        }

        // Evidence must be a verbatim substring of the chunk's own text,
        // which becomes the Source's full_text (§4.7 step 5c).
        let mut accepted_evidence = Vec::new();
        let mut evidence_rejected = 0usize;
        for item in &extraction.evidence {
            let concept_id = local_to_concept_id.get(&item.concept_local_id).cloned();
            match concept_id {
                Some(concept_id) if chunk.text.contains(&item.quote) => {
                    accepted_evidence.push((item.quote.clone(), concept_id));
                }
                _ => {
                    warn!(quote_id = %item.quote_id, "dropped evidence, not a verbatim substring or unknown concept");
                    evidence_rejected += 1;
                }
            }
        }

        let content_hash_owned = content_hash.to_string();
        let ontology_owned = ontology.to_string();
        let file_path_owned = file_path.to_string();
        let chunk_owned = chunk.clone();

        let commit_stats = self.graph.transaction(|tx| {
            let source_id = tx.get_or_create_source(&content_hash_owned, chunk_owned.chunk_index, || Source {
                source_id: kg_core::ids::source_id(&file_path_owned, chunk_owned.chunk_index),
                document: ontology_owned.clone(),
                file_path: file_path_owned.clone(),
                paragraph: chunk_owned.chunk_index,
                full_text: chunk_owned.text.clone(),
                char_offset_start: chunk_owned.char_offset_start,
                char_offset_end: chunk_owned.char_offset_end,
                line_start: chunk_owned.line_start,
                line_end: chunk_owned.line_end,
                chunk_index: chunk_owned.chunk_index,
                chunk_method: "word_bounded".to_string(),
                overlap_chars: chunk_owned.overlap_chars,
                content_hash: content_hash_owned.clone(),
                storage_key: kg_content::storage_key(&ontology_owned, &content_hash_owned, "txt"),
            });

            let mut concepts_created = 0usize;
            let mut concepts_linked = 0usize;
            for update in &concept_updates {
                match update {
                    ConceptUpdate::Create(concept) => {
                        tx.upsert_concept(concept.clone());
                        tx.add_structural_edge(concept.concept_id.clone(), StructuralEdge::AppearsIn, source_id.clone());
                        concepts_created += 1;
                    }
                    ConceptUpdate::Link { concept_id, search_terms } => {
                        if let Some(mut existing) = tx.get_concept(concept_id).cloned() {
                            apply_link(&mut existing, search_terms);
                            tx.upsert_concept(existing);
                        }
                        tx.add_structural_edge(concept_id.clone(), StructuralEdge::AppearsIn, source_id.clone());
                        concepts_linked += 1;
                    }
                }
            }

            for (quote, concept_id) in &accepted_evidence {
                let instance = Instance {
                    instance_id: new_instance_id(),
                    quote: quote.clone(),
                };
                tx.add_structural_edge(concept_id.clone(), StructuralEdge::EvidencedBy, instance.instance_id.clone());
                tx.add_structural_edge(instance.instance_id.clone(), StructuralEdge::FromSource, source_id.clone());
                tx.add_instance(instance);
            }

            for edge in &resolved_edges {
                tx.merge_semantic_edge(edge.clone());
            }

            Ok(IngestStats {
                concepts_created,
                concepts_linked,
                relationships_created: resolved_edges.len(),
                relationships_rejected,
                evidence_accepted: accepted_evidence.len(),
                evidence_rejected,
            })
        })?;

        // Keep the vector index's column in step with the graph's
        // embedding property for every newly created concept (§4.5).
        for update in &concept_updates {
            if let ConceptUpdate::Create(concept) = update {
                if let Err(err) = self
                    .vector_index
                    .upsert(concept.concept_id.clone(), concept.embedding.clone())
                    .await
                {
                    warn!(concept_id = %concept.concept_id, error = %err, "vector index upsert failed after graph commit");
                }
            }
        }

        Ok(commit_stats)
    }

    fn resolve_endpoint(&self, endpoint: &str, local_to_concept_id: &HashMap<String, String>) -> Option<String> {
        local_to_concept_id
            .get(endpoint)
            .cloned()
            .or_else(|| self.graph.get_concept(endpoint).map(|c| c.concept_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kg_config::embedding::{EmbeddingConfig, EmbeddingConfigGuard};
    use kg_embed::DeterministicHashEmbedder;
    use kg_vector::InMemoryVectorIndex;

    struct ScriptedClient {
        response: String,
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok(self.response.clone())
        }
    }

    fn build_engine(response: &str) -> IngestionEngine<ScriptedClient> {
        let chunk_config = ChunkingConfig {
            target_words: 50,
            min_words: 10,
            max_words: 100,
            overlap_words: 5,
            checkpoint_interval: 1,
        };
        let embed_config = Arc::new(EmbeddingConfigGuard::new(EmbeddingConfig::new("local", "m", 16)));
        let provider = Arc::new(DeterministicHashEmbedder::new("m", 16));
        let embed = Arc::new(EmbeddingAdapter::new(embed_config, provider));
        let extractor = Arc::new(ExtractionAdapter::new(
            ScriptedClient {
                response: response.to_string(),
            },
            1,
        ));
        let vector_index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());
        let graph = Arc::new(InMemoryGraphStore::new());
        let vocabulary = vec![VocabType::new("CAUSES")];
        IngestionEngine::new(
            chunk_config,
            embed,
            extractor,
            vector_index,
            graph,
            vocabulary,
            ConceptMatchConfig::default(),
        )
    }

    const SINGLE_CONCEPT_RESPONSE: &str = r#"{"concepts":[{"local_id":"c1","label":"Homeostasis","search_terms":["self-regulation"],"quote_ids":["q1"]}],"relationships":[],"evidence":[{"quote_id":"q1","quote":"bodies regulate their own temperature","concept_local_id":"c1"}]}"#;

    #[tokio::test]
    async fn ingests_a_short_document_and_creates_one_concept() {
        let engine = build_engine(SINGLE_CONCEPT_RESPONSE);
        let checkpoint = InMemoryCheckpoint::default();
        let document = "bodies regulate their own temperature through careful internal control.";
        let stats = engine
            .process_document(document, "hash123", "biology", "doc.txt", &checkpoint)
            .await
            .unwrap();
        assert_eq!(stats.concepts_created, 1);
        assert_eq!(stats.evidence_accepted, 1);
        assert!(engine.graph.get_concept("homeostasis").is_some());
    }

    #[tokio::test]
    async fn resuming_from_checkpoint_skips_processed_chunks() {
        let engine = build_engine(SINGLE_CONCEPT_RESPONSE);
        let checkpoint = InMemoryCheckpoint::default();
        let document = "bodies regulate their own temperature through careful internal control.";
        engine
            .process_document(document, "hash123", "biology", "doc.txt", &checkpoint)
            .await
            .unwrap();
        let stats_second_run = engine
            .process_document(document, "hash123", "biology", "doc.txt", &checkpoint)
            .await
            .unwrap();
        // Re-running after the checkpoint does no further work (spec P1 /
        // §4.7 determinism guarantee): stats are unchanged from the
        // first run's final snapshot.
        assert_eq!(stats_second_run.concepts_created, 1);
    }

    #[tokio::test]
    async fn rejects_evidence_that_is_not_a_verbatim_substring() {
        let fabricated = r#"{"concepts":[{"local_id":"c1","label":"Homeostasis","search_terms":[],"quote_ids":["q1"]}],"relationships":[],"evidence":[{"quote_id":"q1","quote":"this text does not appear anywhere","concept_local_id":"c1"}]}"#;
        let engine = build_engine(fabricated);
        let checkpoint = InMemoryCheckpoint::default();
        let document = "bodies regulate their own temperature through careful internal control.";
        let stats = engine
            .process_document(document, "hash123", "biology", "doc.txt", &checkpoint)
            .await
            .unwrap();
        assert_eq!(stats.evidence_rejected, 1);
        assert_eq!(stats.evidence_accepted, 0);
    }
}
