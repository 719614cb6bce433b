use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueryError>;

#[derive(Debug, Error)]
pub enum QueryError {
    /// `concept_details`/`related_concepts`/`find_connection` given an id
    /// with no matching concept in the graph.
    #[error("concept not found: {0}")]
    NotFound(String),

    /// `find_connection_by_query`: an endpoint's query text didn't reach
    /// `min_similarity` against any indexed concept, so there is nothing to
    /// resolve it to.
    #[error("query text did not resolve to a concept above the similarity threshold: {0}")]
    NotResolvable(String),

    #[error(transparent)]
    Embed(#[from] kg_embed::EmbedError),

    #[error(transparent)]
    Vector(#[from] kg_vector::VectorError),

    #[error(transparent)]
    Graph(#[from] kg_graph::GraphError),
}
