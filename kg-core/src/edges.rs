//! Edge labels of the knowledge graph (spec §3).
//!
//! Structural edges (the evidence chain) carry no properties beyond their
//! endpoints; semantic edges carry a normalized `VocabType` name, a
//! confidence, and an optional denormalized category cache (canonical
//! location for category is the `VocabType` node — Open Question 3).

use serde::{Deserialize, Serialize};

/// The fixed structural edges that make up the provenance chain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StructuralEdge {
    /// `Concept --APPEARS_IN--> Source`
    AppearsIn,
    /// `Concept --EVIDENCED_BY--> Instance`
    EvidencedBy,
    /// `Instance --FROM_SOURCE--> Source`
    FromSource,
    /// `DocumentMeta --HAS_SOURCE--> Source`
    HasSource,
}

impl StructuralEdge {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AppearsIn => "APPEARS_IN",
            Self::EvidencedBy => "EVIDENCED_BY",
            Self::FromSource => "FROM_SOURCE",
            Self::HasSource => "HAS_SOURCE",
        }
    }
}

/// A typed, directed relationship between two concepts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SemanticEdge {
    pub from_concept_id: String,
    pub to_concept_id: String,
    /// A registered `VocabType.name`, already normalized (§4.6).
    pub edge_type: String,
    pub confidence: f32,
    /// Denormalized cache only; not authoritative (Open Question 3).
    pub category: Option<String>,
}

impl SemanticEdge {
    #[must_use]
    pub fn new(from: String, to: String, edge_type: String, confidence: f32) -> Self {
        Self {
            from_concept_id: from,
            to_concept_id: to,
            edge_type,
            confidence: confidence.clamp(0.0, 1.0),
            category: None,
        }
    }

    /// Merge with an existing edge of the same type/endpoints, keeping the
    /// maximum confidence as required by the per-chunk commit protocol
    /// (§4.7 step 5d).
    #[must_use]
    pub fn merged_confidence(&self, other_confidence: f32) -> f32 {
        self.confidence.max(other_confidence)
    }
}
