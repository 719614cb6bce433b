//! The swappable embedding provider seam. Production backends (OpenAI,
//! local ONNX models, ...) are out of scope for this crate (spec §1); what
//! lives here is the trait every such backend must satisfy, plus one
//! deterministic reference implementation used in tests and as a safe
//! default before an operator wires in a real provider.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// A provider that turns text into fixed-dimension embeddings.
///
/// Must be deterministic per `(model, text)` (spec §4.3): calling `embed`
/// twice with the same text returns bitwise-identical vectors, which is
/// what lets the matcher's similarity search be reproducible in tests.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier, e.g. `text-embedding-3-small`.
    fn model(&self) -> &str;

    /// The fixed dimension every vector this provider returns will have.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text; default implementation delegates to
    /// [`EmbeddingProvider::embed_batch`].
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut out = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        Ok(out.pop().unwrap_or_default())
    }
}

/// A deterministic, hash-based embedder: expands the SHA-256 digest of the
/// input text into a unit vector of the configured dimension. Not
/// semantically meaningful (it is not a real ML model), but stable,
/// dependency-free, and good enough to exercise the matcher, vector index,
/// and ingestion engine in tests without a network call.
#[derive(Debug, Clone)]
pub struct DeterministicHashEmbedder {
    model_name: String,
    dimension: usize,
}

impl DeterministicHashEmbedder {
    #[must_use]
    pub fn new(model_name: impl Into<String>, dimension: usize) -> Self {
        Self {
            model_name: model_name.into(),
            dimension,
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.dimension);
        let mut counter: u32 = 0;
        while out.len() < self.dimension {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hasher.update(counter.to_le_bytes());
            let digest = hasher.finalize();
            for chunk in digest.chunks(4) {
                if out.len() >= self.dimension {
                    break;
                }
                let mut buf = [0u8; 4];
                buf[..chunk.len()].copy_from_slice(chunk);
                let as_u32 = u32::from_le_bytes(buf);
                // Map into [-1, 1].
                let v = (as_u32 as f64 / u32::MAX as f64) * 2.0 - 1.0;
                out.push(v as f32);
            }
            counter += 1;
        }
        normalize(&mut out);
        out
    }
}

fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[async_trait]
impl EmbeddingProvider for DeterministicHashEmbedder {
    fn model(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
