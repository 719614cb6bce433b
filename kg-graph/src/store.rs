//! In-memory property graph storage and its transaction boundary.
//!
//! Transactions are copy-on-write: [`InMemoryGraphStore::transaction`]
//! clones the current [`GraphData`] snapshot, hands a mutable view of the
//! clone to the caller's closure, and only swaps it into the store if the
//! closure returns `Ok`. This gives "atomic multi-statement writes" (§4.5)
//! without a WAL: a failure partway through the closure simply discards
//! the clone, leaving the store exactly as it was before the transaction
//! began, matching the "abort transaction, no partial chunk state"
//! requirement (§7).

use std::collections::HashMap;

use chrono::Utc;
use kg_core::edges::{SemanticEdge, StructuralEdge};
use kg_core::types::{Concept, DocumentMeta, Instance, Source};
use parking_lot::RwLock;
use regex::Regex;
use tracing::{trace, warn};

use crate::error::{GraphError, Result};

#[derive(Debug, Clone, Default)]
pub struct GraphData {
    pub(crate) concepts: HashMap<String, Concept>,
    pub(crate) sources: HashMap<String, Source>,
    pub(crate) instances: HashMap<String, Instance>,
    pub(crate) documents: HashMap<String, DocumentMeta>,
    /// `(from_concept_id, edge_type, to_concept_id) -> SemanticEdge`
    pub(crate) semantic_edges: HashMap<(String, String, String), SemanticEdge>,
    /// Structural edges: `(from_id, kind, to_id)`, duplicates suppressed.
    pub(crate) structural_edges: Vec<(String, StructuralEdge, String)>,
    /// Last-touched timestamp per concept, for the recent-concept-context
    /// feed C8 step 3 needs (§4.7).
    pub(crate) concept_touched_at: HashMap<String, chrono::DateTime<Utc>>,
}

impl GraphData {
    fn touch(&mut self, concept_id: &str) {
        self.concept_touched_at
            .insert(concept_id.to_string(), Utc::now());
    }

    /// Count of distinct concepts adjacent to `concept_id` via any semantic
    /// edge, in either direction. Computed on demand, never cached, per
    /// §4.4's "no separate cache" requirement.
    pub fn degree(&self, concept_id: &str) -> usize {
        let mut neighbors = std::collections::HashSet::new();
        for (from, _, to) in self.semantic_edges.keys() {
            if from == concept_id {
                neighbors.insert(to.clone());
            } else if to == concept_id {
                neighbors.insert(from.clone());
            }
        }
        neighbors.len()
    }

    pub fn neighbors(&self, concept_id: &str) -> Vec<(&SemanticEdge, String)> {
        self.semantic_edges
            .values()
            .filter_map(|edge| {
                if edge.from_concept_id == concept_id {
                    Some((edge, edge.to_concept_id.clone()))
                } else if edge.to_concept_id == concept_id {
                    Some((edge, edge.from_concept_id.clone()))
                } else {
                    None
                }
            })
            .collect()
    }
}

/// A mutable view into a staged transaction, handed to the closure passed
/// to [`InMemoryGraphStore::transaction`].
pub struct TxnContext<'a> {
    pub(crate) data: &'a mut GraphData,
}

impl TxnContext<'_> {
    /// Insert or overwrite a concept (§4.7 step 5b — linking updates the
    /// existing record in place; creating inserts a fresh one).
    pub fn upsert_concept(&mut self, concept: Concept) {
        self.data.touch(&concept.concept_id);
        self.data.concepts.insert(concept.concept_id.clone(), concept);
    }

    pub fn get_concept(&self, concept_id: &str) -> Option<&Concept> {
        self.data.concepts.get(concept_id)
    }

    /// Locate the Source for `(content_hash, chunk_index)`, creating it
    /// from `factory` if absent (§4.7 step 5a).
    pub fn get_or_create_source(
        &mut self,
        content_hash: &str,
        chunk_index: usize,
        factory: impl FnOnce() -> Source,
    ) -> String {
        if let Some(existing) = self.data.sources.values().find(|s| {
            s.content_hash == content_hash && s.chunk_index == chunk_index
        }) {
            return existing.source_id.clone();
        }
        let source = factory();
        let source_id = source.source_id.clone();
        self.data.sources.insert(source_id.clone(), source);
        source_id
    }

    pub fn get_source(&self, source_id: &str) -> Option<&Source> {
        self.data.sources.get(source_id)
    }

    pub fn add_instance(&mut self, instance: Instance) {
        self.data.instances.insert(instance.instance_id.clone(), instance);
    }

    pub fn add_structural_edge(&mut self, from: String, kind: StructuralEdge, to: String) {
        let entry = (from, kind, to);
        if !self.data.structural_edges.contains(&entry) {
            self.data.structural_edges.push(entry);
        }
    }

    /// Merge a semantic edge into the store, keeping the maximum of old and
    /// new confidence when one already exists for these endpoints and type
    /// (§4.7 step 5d).
    pub fn merge_semantic_edge(&mut self, edge: SemanticEdge) {
        let key = (
            edge.from_concept_id.clone(),
            edge.edge_type.clone(),
            edge.to_concept_id.clone(),
        );
        self.data
            .semantic_edges
            .entry(key)
            .and_modify(|existing| {
                existing.confidence = existing.merged_confidence(edge.confidence);
                if existing.category.is_none() {
                    existing.category = edge.category.clone();
                }
            })
            .or_insert(edge);
    }

    pub fn upsert_document(&mut self, document: DocumentMeta) {
        self.data
            .documents
            .insert(document.document_id.clone(), document);
    }

    pub fn get_document(&self, document_id: &str) -> Option<&DocumentMeta> {
        self.data.documents.get(document_id)
    }

    pub fn find_document(&self, content_hash: &str, ontology: &str) -> Option<&DocumentMeta> {
        self.data
            .documents
            .values()
            .find(|d| d.document_id == content_hash && d.ontology == ontology)
    }
}

/// The store itself: a single `RwLock`-guarded snapshot.
pub struct InMemoryGraphStore {
    data: RwLock<GraphData>,
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGraphStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: RwLock::new(GraphData::default()),
        }
    }

    /// Run `f` against a staged copy of the graph; only commit that copy
    /// back into the store if `f` returns `Ok`.
    ///
    /// # Errors
    ///
    /// Propagates whatever error `f` returns, without applying any of the
    /// mutations it staged.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut TxnContext) -> Result<T>,
    {
        let mut staged = self.data.read().clone();
        let mut ctx = TxnContext { data: &mut staged };
        match f(&mut ctx) {
            Ok(value) => {
                trace!("graph transaction committed");
                *self.data.write() = staged;
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "graph transaction aborted, no mutation applied");
                Err(GraphError::TransactionAborted(err.to_string()))
            }
        }
    }

    pub fn get_concept(&self, concept_id: &str) -> Option<Concept> {
        self.data.read().concepts.get(concept_id).cloned()
    }

    pub fn get_source(&self, source_id: &str) -> Option<Source> {
        self.data.read().sources.get(source_id).cloned()
    }

    pub fn get_instance(&self, instance_id: &str) -> Option<Instance> {
        self.data.read().instances.get(instance_id).cloned()
    }

    pub fn degree(&self, concept_id: &str) -> usize {
        self.data.read().degree(concept_id)
    }

    pub fn get_document(&self, document_id: &str) -> Option<DocumentMeta> {
        self.data.read().documents.get(document_id).cloned()
    }

    /// Look up an existing document by `(content_hash, ontology)`, the key
    /// the content-hash dedup check (C11) queries before enqueuing a job.
    pub fn find_document(&self, content_hash: &str, ontology: &str) -> Option<DocumentMeta> {
        self.data
            .read()
            .documents
            .values()
            .find(|d| d.document_id == content_hash && d.ontology == ontology)
            .cloned()
    }

    /// Distinct ontologies (`Source.document`) a concept appears in, via its
    /// `APPEARS_IN` structural edges. Concepts are global (Open Question 1),
    /// so this set can span more than one ontology.
    pub fn ontologies_for_concept(&self, concept_id: &str) -> Vec<String> {
        let data = self.data.read();
        let mut ontologies: Vec<String> = data
            .structural_edges
            .iter()
            .filter(|(from, kind, _)| from == concept_id && matches!(kind, StructuralEdge::AppearsIn))
            .filter_map(|(_, _, source_id)| data.sources.get(source_id))
            .map(|source| source.document.clone())
            .collect();
        ontologies.sort();
        ontologies.dedup();
        ontologies
    }

    /// Semantic edges touching `concept_id`, either direction.
    pub fn edges_for_concept(&self, concept_id: &str) -> Vec<SemanticEdge> {
        let data = self.data.read();
        data.semantic_edges
            .values()
            .filter(|e| e.from_concept_id == concept_id || e.to_concept_id == concept_id)
            .cloned()
            .collect()
    }

    /// Instances linked to `concept_id` via `EVIDENCED_BY`, with their
    /// backing Sources.
    pub fn instances_for_concept(&self, concept_id: &str) -> Vec<(Instance, Option<Source>)> {
        let data = self.data.read();
        data.structural_edges
            .iter()
            .filter(|(from, kind, _)| {
                from == concept_id && matches!(kind, StructuralEdge::EvidencedBy)
            })
            .filter_map(|(_, _, instance_id)| {
                let instance = data.instances.get(instance_id)?.clone();
                let source = data
                    .structural_edges
                    .iter()
                    .find(|(from, kind, _)| {
                        from == instance_id && matches!(kind, StructuralEdge::FromSource)
                    })
                    .and_then(|(_, _, source_id)| data.sources.get(source_id))
                    .cloned();
                Some((instance, source))
            })
            .collect()
    }

    /// Property-level substring or regex match on `Concept.label`. Treats
    /// `pattern` as a regex; callers passing a plain word get the regex
    /// engine's literal-match behavior for free.
    pub fn substring_match(&self, pattern: &str, case_insensitive: bool, limit: usize) -> Result<Vec<Concept>> {
        let built = if case_insensitive {
            format!("(?i){pattern}")
        } else {
            pattern.to_string()
        };
        let re = Regex::new(&built).map_err(|e| GraphError::InvalidQuery(e.to_string()))?;
        let data = self.data.read();
        let mut matches: Vec<Concept> = data
            .concepts
            .values()
            .filter(|c| re.is_match(&c.label))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.concept_id.cmp(&b.concept_id));
        matches.truncate(limit);
        Ok(matches)
    }

    /// The `limit` most-recently-touched concepts (§4.7 step 3: recent
    /// concept context feed, bounded to <= 50 by the caller). Concepts are
    /// global (§4.6's cross-ontology matching is the intentional default),
    /// so recency is tracked across the whole store rather than per
    /// ontology.
    pub fn recent_concepts(&self, limit: usize) -> Vec<Concept> {
        let data = self.data.read();
        let mut touched: Vec<(&String, &chrono::DateTime<Utc>)> =
            data.concept_touched_at.iter().collect();
        touched.sort_by(|a, b| b.1.cmp(a.1));
        touched
            .into_iter()
            .filter_map(|(id, _)| data.concepts.get(id).cloned())
            .take(limit)
            .collect()
    }

    pub(crate) fn snapshot(&self) -> GraphData {
        self.data.read().clone()
    }
}

impl kg_vector::DegreeLookup for InMemoryGraphStore {
    fn degree(&self, concept_id: &str) -> usize {
        InMemoryGraphStore::degree(self, concept_id)
    }
}
