use thiserror::Error;

pub type Result<T> = std::result::Result<T, ContentError>;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("byte range [{start}, {end}) out of bounds for object of length {len}")]
    RangeOutOfBounds {
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("key {0} already stored with different content")]
    HashMismatch(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
