use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorError>;

#[derive(Debug, Error)]
pub enum VectorError {
    #[error("query embedding has dimension {got}, index entries have dimension {expected}")]
    DimensionMismatch { got: usize, expected: usize },

    #[error("invalid search parameters: {0}")]
    InvalidQuery(String),
}
