//! LLM extraction adapter (C3): turns a chunk of text plus recent-concept
//! context into a validated set of concepts, relationships, and evidence
//! (§4.2). Retries malformed output with an escalating-strictness prompt
//! up to a configured limit before failing the chunk.

pub mod error;
pub mod prompt;
pub mod schema;

pub use error::{ExtractError, Result};
pub use schema::{ExtractedConcept, ExtractedEvidence, ExtractedRelationship, ExtractionOutput, RecentConcept};

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

/// The raw completion seam: one call out to an LLM. Modeled on the
/// teacher's `ProviderInstance::complete` — a single prompt in, a single
/// text completion out, with transport/auth errors surfacing as `Err`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

pub struct ExtractionAdapter<C: LlmClient> {
    client: C,
    max_retries: u32,
}

impl<C: LlmClient> ExtractionAdapter<C> {
    #[must_use]
    pub fn new(client: C, max_retries: u32) -> Self {
        Self { client, max_retries }
    }

    /// Run the extraction cascade for one chunk: call the model, parse and
    /// validate its JSON response, retrying with escalating strictness on
    /// malformed output.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::SchemaValidation`] once all retries are spent on
    ///   output that never parses or validates.
    /// - [`ExtractError::Transient`] once all retries are spent on calls
    ///   that themselves returned `Err` (network/backoff exhaustion).
    pub async fn extract(&self, chunk_text: &str, recent_concepts: &[RecentConcept]) -> Result<ExtractionOutput> {
        let mut last_parse_error = String::new();
        let mut last_call_error = String::new();
        let mut call_failures = 0u32;

        for attempt in 0..=self.max_retries {
            let prompt_text = prompt::build_prompt(chunk_text, recent_concepts, attempt);
            let raw = match self.client.complete(&prompt_text).await {
                Ok(raw) => raw,
                Err(err) => {
                    call_failures += 1;
                    last_call_error = err.to_string();
                    warn!(attempt, error = %last_call_error, "LLM call failed, backing off");
                    if attempt < self.max_retries {
                        tokio::time::sleep(backoff(attempt)).await;
                        continue;
                    }
                    break;
                }
            };

            match parse_and_validate(&raw) {
                Ok(output) => {
                    debug!(attempt, concepts = output.concepts.len(), "extraction succeeded");
                    return Ok(output);
                }
                Err(reason) => {
                    last_parse_error = reason;
                    warn!(attempt, reason = %last_parse_error, "LLM output failed validation, retrying");
                }
            }
        }

        if call_failures > self.max_retries {
            Err(ExtractError::Transient {
                attempts: call_failures,
                source: last_call_error,
            })
        } else {
            Err(ExtractError::SchemaValidation {
                attempts: self.max_retries + 1,
                reason: last_parse_error,
            })
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(100 * 2u64.saturating_pow(attempt))
}

fn parse_and_validate(raw: &str) -> std::result::Result<ExtractionOutput, String> {
    let candidate = strip_code_fence(raw);
    let output: ExtractionOutput =
        serde_json::from_str(candidate).map_err(|e| format!("invalid JSON: {e}"))?;
    schema::validate(&output)?;
    Ok(output)
}

/// Models are prone to wrapping JSON in markdown code fences despite being
/// told not to; strip those before attempting to parse.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim();
        }
    }
    trimmed
}
