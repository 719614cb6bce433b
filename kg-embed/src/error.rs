use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbedError>;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding provider error: {0}")]
    Provider(String),

    /// §4.3 / §7: the requested embedding's dimension disagrees with the
    /// active configuration. The system refuses to mix vector spaces
    /// rather than silently truncating or padding.
    #[error("embedding dimension mismatch: got {got}, active config expects {expected}")]
    DimensionMismatch { got: usize, expected: usize },

    #[error("embedding configuration is protected: {0}")]
    ConfigProtected(String),
}
