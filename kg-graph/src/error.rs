//! Error taxonomy for the graph store, grounded on the shape of
//! `llmspell-graph`'s `GraphError` but narrowed to this store's surface.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("concept not found: {0}")]
    ConceptNotFound(String),

    #[error("source not found: {0}")]
    SourceNotFound(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A transaction's closure returned an error; no mutation it staged was
    /// applied (§7: graph commit failure aborts the whole chunk).
    #[error("transaction aborted: {0}")]
    TransactionAborted(String),
}
