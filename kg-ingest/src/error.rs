use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Content(#[from] kg_content::ContentError),

    #[error(transparent)]
    Chunk(#[from] kg_chunk::ChunkError),

    #[error(transparent)]
    Match(#[from] kg_match::MatchError),

    #[error(transparent)]
    Graph(#[from] kg_graph::GraphError),

    /// Malformed LLM output survived retries; the chunk is recoverable —
    /// the job stays `processing` and an operator can restart it (§7).
    #[error("chunk {chunk_index} failed extraction: {source}")]
    ChunkExtractionFailed {
        chunk_index: usize,
        #[source]
        source: kg_extract::ExtractError,
        recoverable: bool,
    },

    #[error("checkpoint write failed: {0}")]
    CheckpointWriteFailed(String),
}

impl IngestError {
    /// Whether the job can stay `processing` and be restarted at this
    /// chunk, or must transition to `failed` outright (§7).
    #[must_use]
    pub fn recoverable(&self) -> bool {
        match self {
            Self::ChunkExtractionFailed { recoverable, .. } => *recoverable,
            Self::Graph(_) | Self::CheckpointWriteFailed(_) => false,
            _ => true,
        }
    }
}
