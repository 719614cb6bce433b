//! Path finding and neighborhood traversal over the semantic-edge graph,
//! used by the query facade's `find_connection` and `related_concepts`
//! (§4.11). A plain BFS: at this engine's scale a full shortest-path
//! index would be premature, and BFS already gives deterministic,
//! easy-to-reason-about tie-breaking.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::store::InMemoryGraphStore;

/// A path between two concepts: alternating node ids and the edge types
/// connecting consecutive nodes (`edge_types.len() == node_ids.len() - 1`).
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub node_ids: Vec<String>,
    pub edge_types: Vec<String>,
    pub total_confidence: f32,
}

/// Shortest path from `from_id` to `to_id` by edge count, within
/// `max_hops`. Among equal-length paths, the one with the higher sum of
/// edge confidences wins. Returns `None` when no path exists within
/// `max_hops` — the caller renders that as an empty path, not an error
/// (§4.11).
pub fn find_connection(store: &InMemoryGraphStore, from_id: &str, to_id: &str, max_hops: usize) -> Option<Path> {
    if from_id == to_id {
        return Some(Path {
            node_ids: vec![from_id.to_string()],
            edge_types: Vec::new(),
            total_confidence: 0.0,
        });
    }

    let data = store.snapshot();
    // BFS layer by layer, tracking every best-confidence path per node at
    // the current shortest distance so the tie-break is exact rather than
    // greedy.
    let mut best_at_depth: HashMap<String, Path> = HashMap::new();
    best_at_depth.insert(
        from_id.to_string(),
        Path {
            node_ids: vec![from_id.to_string()],
            edge_types: Vec::new(),
            total_confidence: 0.0,
        },
    );
    let mut frontier: Vec<String> = vec![from_id.to_string()];
    let mut visited: HashSet<String> = HashSet::from([from_id.to_string()]);

    for _ in 0..max_hops {
        if frontier.is_empty() {
            break;
        }
        let mut next_frontier_paths: HashMap<String, Path> = HashMap::new();
        for node in &frontier {
            let current_path = best_at_depth.get(node).cloned().unwrap_or(Path {
                node_ids: vec![node.clone()],
                edge_types: Vec::new(),
                total_confidence: 0.0,
            });
            for (edge, neighbor) in data.neighbors(node) {
                if visited.contains(&neighbor) {
                    continue;
                }
                let mut candidate = current_path.clone();
                candidate.node_ids.push(neighbor.clone());
                candidate.edge_types.push(edge.edge_type.clone());
                candidate.total_confidence += edge.confidence;

                next_frontier_paths
                    .entry(neighbor.clone())
                    .and_modify(|existing| {
                        if candidate.total_confidence > existing.total_confidence {
                            *existing = candidate.clone();
                        }
                    })
                    .or_insert(candidate);
            }
        }
        if next_frontier_paths.contains_key(to_id) {
            return next_frontier_paths.remove(to_id);
        }
        for (node, path) in &next_frontier_paths {
            visited.insert(node.clone());
            best_at_depth.insert(node.clone(), path.clone());
        }
        frontier = next_frontier_paths.into_keys().collect();
    }
    None
}

/// One concept's minimum BFS distance from the query concept.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedConcept {
    pub concept_id: String,
    pub distance: usize,
}

/// Breadth-first neighborhood up to `max_depth`, deduplicated by concept
/// and grouped by the minimum distance at which each was reached (§4.11).
pub fn related_concepts(store: &InMemoryGraphStore, concept_id: &str, max_depth: usize) -> Vec<RelatedConcept> {
    let data = store.snapshot();
    let mut visited: HashSet<String> = HashSet::from([concept_id.to_string()]);
    let mut result = Vec::new();
    let mut queue: VecDeque<(String, usize)> = VecDeque::from([(concept_id.to_string(), 0)]);

    while let Some((node, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        let mut neighbors: Vec<String> = data
            .neighbors(&node)
            .into_iter()
            .map(|(_, neighbor)| neighbor)
            .collect();
        neighbors.sort();
        neighbors.dedup();
        for neighbor in neighbors {
            if visited.insert(neighbor.clone()) {
                result.push(RelatedConcept {
                    concept_id: neighbor.clone(),
                    distance: depth + 1,
                });
                queue.push_back((neighbor, depth + 1));
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryGraphStore;
    use kg_core::edges::SemanticEdge;

    fn link(store: &InMemoryGraphStore, from: &str, to: &str, confidence: f32) {
        store
            .transaction(|tx| {
                tx.merge_semantic_edge(SemanticEdge::new(
                    from.to_string(),
                    to.to_string(),
                    "RELATES_TO".into(),
                    confidence,
                ));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn finds_direct_connection() {
        let store = InMemoryGraphStore::new();
        link(&store, "a", "b", 0.9);
        let path = find_connection(&store, "a", "b", 3).unwrap();
        assert_eq!(path.node_ids, vec!["a", "b"]);
        assert_eq!(path.edge_types, vec!["RELATES_TO"]);
    }

    #[test]
    fn prefers_shorter_path_within_hop_budget() {
        let store = InMemoryGraphStore::new();
        link(&store, "a", "b", 0.5);
        link(&store, "b", "c", 0.5);
        link(&store, "a", "c", 0.5); // direct edge, shortest
        let path = find_connection(&store, "a", "c", 3).unwrap();
        assert_eq!(path.node_ids, vec!["a", "c"]);
    }

    #[test]
    fn returns_none_when_no_path_within_max_hops() {
        let store = InMemoryGraphStore::new();
        link(&store, "a", "b", 0.5);
        link(&store, "b", "c", 0.5);
        link(&store, "c", "d", 0.5);
        assert!(find_connection(&store, "a", "d", 1).is_none());
        assert!(find_connection(&store, "a", "d", 3).is_some());
    }

    #[test]
    fn related_concepts_groups_by_minimum_distance() {
        let store = InMemoryGraphStore::new();
        link(&store, "a", "b", 0.5);
        link(&store, "a", "c", 0.5);
        link(&store, "b", "d", 0.5);
        link(&store, "c", "d", 0.5); // d reachable at distance 2 via either path
        let related = related_concepts(&store, "a", 2);
        let d = related.iter().find(|r| r.concept_id == "d").unwrap();
        assert_eq!(d.distance, 2);
        assert_eq!(related.iter().filter(|r| r.concept_id == "d").count(), 1);
    }
}
