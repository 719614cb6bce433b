use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExtractError>;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The model's output never validated against the expected schema,
    /// even after exhausting all retries. Recoverable: the chunk is marked
    /// failed but the job stays `processing` (§4.7, §7).
    #[error("LLM output failed schema validation after {attempts} attempt(s): {reason}")]
    SchemaValidation { attempts: u32, reason: String },

    /// The underlying call itself failed (network, rate limit, 5xx) and
    /// retries were exhausted. Sustained failure fails the whole job (§7).
    #[error("LLM call failed after {attempts} attempt(s): {source}")]
    Transient { attempts: u32, source: String },

    /// A non-retryable provider error (auth failure, invalid request).
    #[error("LLM call failed fatally: {0}")]
    Fatal(String),
}
