use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChunkError>;

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("invalid chunking configuration: {0}")]
    InvalidConfig(String),
}
