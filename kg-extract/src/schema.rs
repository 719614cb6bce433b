//! The structured output contract the extraction adapter validates every
//! LLM response against (§4.2).

use serde::{Deserialize, Serialize};

/// A small slice of already-known concepts handed to the model so it can
/// anchor new extractions onto them instead of re-discovering them under
/// a different local id (§4.2 rationale).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentConcept {
    pub concept_id: String,
    pub label: String,
    pub search_terms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExtractionOutput {
    #[serde(default)]
    pub concepts: Vec<ExtractedConcept>,
    #[serde(default)]
    pub relationships: Vec<ExtractedRelationship>,
    #[serde(default)]
    pub evidence: Vec<ExtractedEvidence>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedConcept {
    pub local_id: String,
    pub label: String,
    #[serde(default)]
    pub search_terms: Vec<String>,
    #[serde(default)]
    pub quote_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedRelationship {
    /// Either a `local_id` minted in this same response or an existing
    /// `concept_id` carried over from the recent-concept context.
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEvidence {
    pub quote_id: String,
    pub quote: String,
    pub concept_local_id: String,
}

/// Validate structural invariants the schema alone (via serde) can't
/// express: non-empty labels, in-range confidences, and that every
/// `quote_id`/`concept_local_id` reference in `evidence` and
/// `relationships` resolves to something this same response defined or
/// could plausibly carry over.
///
/// # Errors
///
/// Returns a human-readable reason string on the first violation found.
pub fn validate(output: &ExtractionOutput) -> std::result::Result<(), String> {
    let local_ids: std::collections::HashSet<&str> =
        output.concepts.iter().map(|c| c.local_id.as_str()).collect();

    for concept in &output.concepts {
        if concept.label.trim().is_empty() {
            return Err(format!("concept {} has an empty label", concept.local_id));
        }
    }
    for relationship in &output.relationships {
        if !(0.0..=1.0).contains(&relationship.confidence) {
            return Err(format!(
                "relationship {} -> {} has out-of-range confidence {}",
                relationship.from, relationship.to, relationship.confidence
            ));
        }
        if relationship.edge_type.trim().is_empty() {
            return Err("relationship has an empty type".into());
        }
    }
    for item in &output.evidence {
        if item.quote.trim().is_empty() {
            return Err(format!("evidence {} has an empty quote", item.quote_id));
        }
        if !local_ids.contains(item.concept_local_id.as_str()) {
            return Err(format!(
                "evidence {} references unknown concept_local_id {}",
                item.quote_id, item.concept_local_id
            ));
        }
    }
    Ok(())
}
