//! Error taxonomy shared by the ingestion engine.
//!
//! Every crate in the workspace defines its own `thiserror` enum scoped to
//! its component, but each variant maps onto one of the recovery kinds
//! below so that a caller several layers up (the job queue, a test) can
//! reason about recovery without string-matching messages. See spec §7.

use thiserror::Error;

/// Result alias for core-level operations (id derivation, validation).
pub type Result<T> = std::result::Result<T, CoreError>;

/// The recovery-relevant kind of an error, independent of which crate or
/// component raised it. Mirrors the taxonomy table in the design spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed submission or query input; reject, no retry.
    InvalidInput,
    /// Submission deduplicates against existing content; not a failure.
    DuplicateContent,
    /// Admin operation refused because the target config row is protected.
    ConfigProtected,
    /// LLM returned output that failed schema validation.
    LlmParseError,
    /// Rate limit, timeout, or 5xx from an LLM or embedding call.
    LlmTransient,
    /// Auth failure or unknown model; not recoverable by retry.
    LlmFatal,
    /// Stored embedding dimension disagrees with the active configuration.
    EmbeddingDimMismatch,
    /// An evidence quote was not a substring of its source; evidence dropped.
    EvidenceNotSubstring,
    /// A semantic edge endpoint could not be resolved to a concept.
    UnresolvedRelationshipEndpoint,
    /// A relationship type string fell below the fuzzy-match threshold.
    UnknownRelationshipType,
    /// The graph transaction for a chunk failed to commit.
    GraphTransactionFailure,
    /// The post-commit checkpoint write failed.
    CheckpointWriteFailure,
    /// The operation was cancelled by request or by the lifecycle scheduler.
    Cancelled,
}

/// Errors raised by `kg-core` itself: id derivation and cross-cutting
/// validation that every higher-level crate reuses.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("value out of range: {field} = {value} (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// The recovery-relevant kind for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::OutOfRange { .. } | Self::Serialization(_) => {
                ErrorKind::InvalidInput
            }
        }
    }
}

/// Common trait implemented by every crate-local error enum so that
/// consumers (job stats, logging) can bucket an error without matching on
/// its concrete type.
pub trait HasErrorKind {
    fn error_kind(&self) -> ErrorKind;
}

impl HasErrorKind for CoreError {
    fn error_kind(&self) -> ErrorKind {
        self.kind()
    }
}
