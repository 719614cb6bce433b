//! Vector index (C5): approximate nearest neighbor search over concept
//! embeddings with cosine distance and strategy-selectable pre-filtering
//! (§4.4). Degree (count of adjacent edges) is never cached here — callers
//! supply a [`DegreeLookup`] that the graph store answers inline at query
//! time, matching the "no separate cache" requirement.

pub mod error;

pub use error::{Result, VectorError};
pub use kg_config::VectorStrategy;

use std::cmp::Ordering;
use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use tracing::debug;

/// Parameters for a single [`VectorIndex::search`] call.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub embedding: Vec<f32>,
    pub top_k: usize,
    pub threshold: f32,
    pub strategy: VectorStrategy,
    pub degree_percentile: f32,
}

/// One ranked result from [`VectorIndex::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub concept_id: String,
    pub similarity: f32,
    pub degree: usize,
}

/// Supplies a concept's degree (count of adjacent edges) at query time.
/// Implemented by the graph store; the vector index never persists degree
/// itself (§4.4: "Degree is computed inline, no separate cache").
pub trait DegreeLookup: Send + Sync {
    fn degree(&self, concept_id: &str) -> usize;
}

/// A `DegreeLookup` that reports zero for every concept; useful in tests
/// and for the `exhaustive` strategy, which never consults degree.
pub struct NoDegrees;

impl DegreeLookup for NoDegrees {
    fn degree(&self, _concept_id: &str) -> usize {
        0
    }
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite the embedding for a concept.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::DimensionMismatch`] if the index is
    /// non-empty and `embedding`'s length disagrees with the dimension
    /// already in use.
    async fn upsert(&self, concept_id: String, embedding: Vec<f32>) -> Result<()>;

    async fn remove(&self, concept_id: &str) -> Result<()>;

    /// Search for concepts near `query.embedding`, ordered by cosine
    /// similarity descending, filtered to `similarity >= query.threshold`,
    /// truncated to `query.top_k`. Ties break by higher degree, then
    /// lexicographic `concept_id` (§4.4).
    async fn search(&self, query: &SearchQuery, degrees: &dyn DegreeLookup) -> Result<Vec<SearchHit>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process vector index backed by a plain map. Adequate for the corpus
/// sizes this engine targets; a production deployment could swap this for
/// an HNSW-backed implementation behind the same trait without touching
/// callers.
pub struct InMemoryVectorIndex {
    entries: RwLock<HashMap<String, Vec<f32>>>,
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryVectorIndex {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn dimension(&self) -> Option<usize> {
        self.entries.read().values().next().map(Vec::len)
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, concept_id: String, embedding: Vec<f32>) -> Result<()> {
        if let Some(expected) = self.dimension() {
            if !embedding.is_empty() && embedding.len() != expected {
                return Err(VectorError::DimensionMismatch {
                    got: embedding.len(),
                    expected,
                });
            }
        }
        self.entries.write().insert(concept_id, embedding);
        Ok(())
    }

    async fn remove(&self, concept_id: &str) -> Result<()> {
        self.entries.write().remove(concept_id);
        Ok(())
    }

    async fn search(&self, query: &SearchQuery, degrees: &dyn DegreeLookup) -> Result<Vec<SearchHit>> {
        if query.top_k == 0 {
            return Err(VectorError::InvalidQuery("top_k must be at least 1".into()));
        }
        let entries = self.entries.read();
        if let Some(expected) = entries.values().next().map(Vec::len) {
            if query.embedding.len() != expected {
                return Err(VectorError::DimensionMismatch {
                    got: query.embedding.len(),
                    expected,
                });
            }
        }

        let candidates: Vec<&String> = match query.strategy {
            VectorStrategy::Exhaustive => entries.keys().collect(),
            VectorStrategy::DegreeOnly => {
                top_degree_concepts(&entries, degrees, query.degree_percentile)
                    .into_iter()
                    .collect()
            }
            VectorStrategy::DegreeBiased => {
                let filtered = top_degree_concepts(&entries, degrees, query.degree_percentile);
                let sample_size = (entries.len() as f64 * 0.2).ceil() as usize;
                let mut rng = rand::thread_rng();
                let mut pool: Vec<&String> = entries.keys().collect();
                pool.shuffle(&mut rng);
                let sampled = pool.into_iter().take(sample_size.max(1));
                let mut merged: HashSet<&String> = filtered.into_iter().collect();
                merged.extend(sampled);
                merged.into_iter().collect()
            }
        };
        debug!(
            strategy = ?query.strategy,
            candidates = candidates.len(),
            total = entries.len(),
            "vector index search candidate pool"
        );

        let mut hits: Vec<SearchHit> = candidates
            .into_iter()
            .filter_map(|concept_id| {
                let embedding = entries.get(concept_id)?;
                let similarity = cosine_similarity(&query.embedding, embedding);
                if similarity >= query.threshold {
                    Some(SearchHit {
                        concept_id: concept_id.clone(),
                        similarity,
                        degree: degrees.degree(concept_id),
                    })
                } else {
                    None
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.degree.cmp(&a.degree))
                .then_with(|| a.concept_id.cmp(&b.concept_id))
        });
        hits.truncate(query.top_k);
        Ok(hits)
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// Concepts in the top `(1 - degree_percentile)` fraction by degree,
/// highest degree first. An empty index or `degree_percentile >= 1.0`
/// yields an empty set; `degree_percentile <= 0.0` keeps everything.
fn top_degree_concepts(
    entries: &HashMap<String, Vec<f32>>,
    degrees: &dyn DegreeLookup,
    degree_percentile: f32,
) -> HashSet<String> {
    let mut ranked: Vec<(String, usize)> = entries
        .keys()
        .map(|id| (id.clone(), degrees.degree(id)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let keep_fraction = (1.0 - degree_percentile.clamp(0.0, 1.0)) as f64;
    let keep_count = ((ranked.len() as f64) * keep_fraction).ceil() as usize;
    ranked
        .into_iter()
        .take(keep_count.max(1).min(entries.len()))
        .map(|(id, _)| id)
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDegrees(HashMap<&'static str, usize>);

    impl DegreeLookup for FixedDegrees {
        fn degree(&self, concept_id: &str) -> usize {
            self.0.get(concept_id).copied().unwrap_or(0)
        }
    }

    fn query(embedding: Vec<f32>, strategy: VectorStrategy) -> SearchQuery {
        SearchQuery {
            embedding,
            top_k: 5,
            threshold: 0.0,
            strategy,
            degree_percentile: 0.75,
        }
    }

    #[tokio::test]
    async fn finds_exact_match_first() {
        let index = InMemoryVectorIndex::new();
        index.upsert("a".into(), vec![1.0, 0.0]).await.unwrap();
        index.upsert("b".into(), vec![0.0, 1.0]).await.unwrap();
        let hits = index
            .search(&query(vec![1.0, 0.0], VectorStrategy::Exhaustive), &NoDegrees)
            .await
            .unwrap();
        assert_eq!(hits[0].concept_id, "a");
        assert!((hits[0].similarity - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn filters_below_threshold() {
        let index = InMemoryVectorIndex::new();
        index.upsert("a".into(), vec![1.0, 0.0]).await.unwrap();
        index.upsert("b".into(), vec![0.0, 1.0]).await.unwrap();
        let mut q = query(vec![1.0, 0.0], VectorStrategy::Exhaustive);
        q.threshold = 0.9;
        let hits = index.search(&q, &NoDegrees).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].concept_id, "a");
    }

    #[tokio::test]
    async fn ties_break_on_degree_then_concept_id() {
        let index = InMemoryVectorIndex::new();
        index.upsert("zeta".into(), vec![1.0, 0.0]).await.unwrap();
        index.upsert("alpha".into(), vec![1.0, 0.0]).await.unwrap();
        let mut degrees = HashMap::new();
        degrees.insert("zeta", 5);
        degrees.insert("alpha", 5);
        let lookup = FixedDegrees(degrees);
        let hits = index
            .search(&query(vec![1.0, 0.0], VectorStrategy::Exhaustive), &lookup)
            .await
            .unwrap();
        assert_eq!(hits[0].concept_id, "alpha");
        assert_eq!(hits[1].concept_id, "zeta");
    }

    #[tokio::test]
    async fn degree_only_restricts_to_high_degree_candidates() {
        let index = InMemoryVectorIndex::new();
        for (id, degree) in [("hub1", 10usize), ("hub2", 9), ("leaf1", 1), ("leaf2", 0)] {
            index.upsert(id.into(), vec![1.0, 0.0]).await.unwrap();
            let _ = degree;
        }
        let mut degrees = HashMap::new();
        degrees.insert("hub1", 10);
        degrees.insert("hub2", 9);
        degrees.insert("leaf1", 1);
        degrees.insert("leaf2", 0);
        let lookup = FixedDegrees(degrees);
        let mut q = query(vec![1.0, 0.0], VectorStrategy::DegreeOnly);
        q.degree_percentile = 0.75; // keep top 25% => 1 of 4
        let hits = index.search(&q, &lookup).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].concept_id, "hub1");
    }

    #[tokio::test]
    async fn rejects_dimension_mismatch() {
        let index = InMemoryVectorIndex::new();
        index.upsert("a".into(), vec![1.0, 0.0, 0.0]).await.unwrap();
        let err = index.upsert("b".into(), vec![1.0, 0.0]).await.unwrap_err();
        assert!(matches!(err, VectorError::DimensionMismatch { got: 2, expected: 3 }));
    }

    #[tokio::test]
    async fn remove_drops_from_results() {
        let index = InMemoryVectorIndex::new();
        index.upsert("a".into(), vec![1.0, 0.0]).await.unwrap();
        index.remove("a").await.unwrap();
        assert!(index.is_empty());
    }
}
