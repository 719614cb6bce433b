//! Node types of the knowledge graph data contract (spec §3).
//!
//! These are the shaped records the graph store hands back at its
//! boundary — per the redesign note in spec §9, a dynamic row object from
//! the underlying graph driver is mapped into one of these tagged structs
//! right at the adapter and never passed deeper as an untyped map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::concept_id_from_label;

/// A deduplicated idea with a semantic embedding.
///
/// `concept_id` is derived from `label` (see [`crate::ids::concept_id_from_label`])
/// and is stable: re-deriving it from the same label always yields the same
/// id, which is what lets the concept matcher treat a match-miss as "safe
/// to create" without a separate uniqueness probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Concept {
    pub concept_id: String,
    pub label: String,
    /// Ordered set: insertion order preserved, duplicates suppressed.
    pub search_terms: Vec<String>,
    pub embedding: Vec<f32>,
    /// Derived reliability score in `[-1, 1]`; out of scope for ingestion
    /// correctness, consumed by downstream grounding analysis only.
    pub grounding_strength: Option<f32>,
}

impl Concept {
    /// Create a new concept, deriving `concept_id` from `label`.
    #[must_use]
    pub fn new(label: String, search_terms: Vec<String>, embedding: Vec<f32>) -> Self {
        let concept_id = concept_id_from_label(&label);
        Self {
            concept_id,
            label,
            search_terms,
            embedding,
            grounding_strength: None,
        }
    }

    /// Merge newly extracted search terms into this concept's set,
    /// preserving insertion order and suppressing duplicates (§4.6 step 3).
    pub fn merge_search_terms(&mut self, incoming: &[String]) {
        for term in incoming {
            if !self.search_terms.iter().any(|t| t == term) {
                self.search_terms.push(term.clone());
            }
        }
    }
}

/// One ordered chunk of a document — the unit of provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub source_id: String,
    /// Ontology name (the `document` field in spec §3).
    pub document: String,
    pub file_path: String,
    /// Sequential chunk index within the document (0-based); invariant 7
    /// requires these be contiguous for all sources of one `DocumentMeta`.
    pub paragraph: usize,
    pub full_text: String,
    pub char_offset_start: usize,
    pub char_offset_end: usize,
    pub line_start: usize,
    pub line_end: usize,
    pub chunk_index: usize,
    pub chunk_method: String,
    pub overlap_chars: usize,
    pub content_hash: String,
    /// Content-store key of the parent document (see `kg-content`).
    pub storage_key: String,
}

/// A verbatim quote binding a concept to a source — the unit of evidence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instance {
    pub instance_id: String,
    pub quote: String,
}

/// How a document entered the system, per spec §6 submission surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    File,
    Stdin,
    Mcp,
    Api,
}

/// One record per ingested `(content_hash, ontology)` pair; owns its
/// Sources (deletion cascades per spec §3 ownership rules).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMeta {
    /// `document_id` is always the content hash.
    pub document_id: String,
    pub ontology: String,
    pub filename: String,
    pub source_type: Option<SourceType>,
    pub source_path: Option<String>,
    pub hostname: Option<String>,
    pub ingested_at: DateTime<Utc>,
    pub ingested_by: Option<String>,
    pub job_id: String,
    pub source_count: usize,
    pub version: Option<u32>,
    pub supersedes: Option<String>,
    pub superseded_by: Option<String>,
}

impl DocumentMeta {
    #[must_use]
    pub fn new(content_hash: String, ontology: String, filename: String, job_id: String) -> Self {
        Self {
            document_id: content_hash,
            ontology,
            filename,
            source_type: None,
            source_path: None,
            hostname: None,
            ingested_at: Utc::now(),
            ingested_by: None,
            job_id,
            source_count: 0,
            version: None,
            supersedes: None,
            superseded_by: None,
        }
    }
}

/// A registered relationship type against which extracted `type` strings
/// are normalized (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VocabType {
    /// Upper snake case, e.g. `CONTRASTS_WITH`.
    pub name: String,
    pub synonyms: Vec<String>,
    pub embedding: Option<Vec<f32>>,
    /// Cached epistemic statistics; not authoritative, may be stale.
    pub cached_stats: Option<serde_json::Value>,
}

impl VocabType {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            synonyms: Vec::new(),
            embedding: None,
            cached_stats: None,
        }
    }

    #[must_use]
    pub fn with_synonyms(mut self, synonyms: Vec<String>) -> Self {
        self.synonyms = synonyms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concept_new_derives_id() {
        let c = Concept::new("Requisite Variety".into(), vec!["law".into()], vec![0.0; 4]);
        assert_eq!(c.concept_id, "requisite-variety");
    }

    #[test]
    fn merge_search_terms_dedupes_and_preserves_order() {
        let mut c = Concept::new("X".into(), vec!["a".into(), "b".into()], vec![]);
        c.merge_search_terms(&["b".into(), "c".into()]);
        assert_eq!(c.search_terms, vec!["a", "b", "c"]);
    }
}
