//! Graph store (C6): a property graph of concepts, sources, and instances
//! with atomic multi-statement transactions, substring/regex search, and a
//! vector column (the `embedding` field on [`kg_core::types::Concept`])
//! kept in step with a paired [`kg_vector::VectorIndex`] by the caller on
//! every upsert.
//!
//! Modeled on `llmspell-graph`'s `KnowledgeGraph` trait: swap the backend
//! behind [`GraphBackend`] without touching callers. This crate ships one
//! in-memory implementation; a durable backend (e.g. an embedded
//! `SurrealDB` instance, the way the teacher's own graph crate does it)
//! can be added later behind the same seam.

pub mod error;
pub mod store;
pub mod traverse;

pub use error::{GraphError, Result};
pub use store::{GraphData, InMemoryGraphStore, TxnContext};
pub use traverse::{find_connection, related_concepts, Path, RelatedConcept};

use async_trait::async_trait;
use kg_core::edges::SemanticEdge;
use kg_core::types::{Concept, Instance, Source};
use std::sync::Arc;

/// Async seam over the graph store, so an ingestion job never depends on
/// a concrete backend. The in-memory store below never actually awaits
/// anything; a durable backend implementing this trait would.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    async fn run_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut TxnContext) -> Result<T> + Send,
        T: Send;

    async fn get_concept(&self, concept_id: &str) -> Option<Concept>;
    async fn substring_match(&self, pattern: &str, case_insensitive: bool, limit: usize) -> Result<Vec<Concept>>;
    async fn recent_concepts(&self, limit: usize) -> Vec<Concept>;
    async fn edges_for_concept(&self, concept_id: &str) -> Vec<SemanticEdge>;
    async fn instances_for_concept(&self, concept_id: &str) -> Vec<(Instance, Option<Source>)>;
    async fn degree(&self, concept_id: &str) -> usize;
}

#[async_trait]
impl GraphBackend for InMemoryGraphStore {
    async fn run_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut TxnContext) -> Result<T> + Send,
        T: Send,
    {
        self.transaction(f)
    }

    async fn get_concept(&self, concept_id: &str) -> Option<Concept> {
        InMemoryGraphStore::get_concept(self, concept_id)
    }

    async fn substring_match(&self, pattern: &str, case_insensitive: bool, limit: usize) -> Result<Vec<Concept>> {
        InMemoryGraphStore::substring_match(self, pattern, case_insensitive, limit)
    }

    async fn recent_concepts(&self, limit: usize) -> Vec<Concept> {
        InMemoryGraphStore::recent_concepts(self, limit)
    }

    async fn edges_for_concept(&self, concept_id: &str) -> Vec<SemanticEdge> {
        InMemoryGraphStore::edges_for_concept(self, concept_id)
    }

    async fn instances_for_concept(&self, concept_id: &str) -> Vec<(Instance, Option<Source>)> {
        InMemoryGraphStore::instances_for_concept(self, concept_id)
    }

    async fn degree(&self, concept_id: &str) -> usize {
        InMemoryGraphStore::degree(self, concept_id)
    }
}

/// Convenience alias for the shared handle callers pass around.
pub type SharedGraphStore = Arc<InMemoryGraphStore>;

pub fn new_store() -> SharedGraphStore {
    Arc::new(InMemoryGraphStore::new())
}

#[cfg(test)]
mod lib_tests {
    use super::*;
    use kg_core::types::Concept;

    #[tokio::test]
    async fn transaction_commits_on_ok() {
        let store = InMemoryGraphStore::new();
        store
            .transaction(|tx| {
                tx.upsert_concept(Concept::new("Homeostasis".into(), vec![], vec![0.1, 0.2]));
                Ok(())
            })
            .unwrap();
        assert!(store.get_concept("homeostasis").is_some());
    }

    #[tokio::test]
    async fn transaction_rolls_back_on_err() {
        let store = InMemoryGraphStore::new();
        let result: Result<()> = store.transaction(|tx| {
            tx.upsert_concept(Concept::new("Ghost".into(), vec![], vec![]));
            Err(GraphError::InvalidQuery("simulated failure".into()))
        });
        assert!(result.is_err());
        assert!(store.get_concept("ghost").is_none());
    }

    #[tokio::test]
    async fn substring_match_is_case_insensitive_when_requested() {
        let store = InMemoryGraphStore::new();
        store
            .transaction(|tx| {
                tx.upsert_concept(Concept::new("Requisite Variety".into(), vec![], vec![]));
                Ok(())
            })
            .unwrap();
        let hits = store.substring_match("variety", true, 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(store.substring_match("variety", false, 10).unwrap().is_empty());
    }
}
