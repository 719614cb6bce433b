//! Accumulated stats and the checkpoint a job record durably persists
//! after every chunk (§4.7 step 7).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct IngestStats {
    pub concepts_created: usize,
    pub concepts_linked: usize,
    pub relationships_created: usize,
    pub relationships_rejected: usize,
    pub evidence_accepted: usize,
    pub evidence_rejected: usize,
}

impl IngestStats {
    pub fn accumulate(&mut self, other: &Self) {
        self.concepts_created += other.concepts_created;
        self.concepts_linked += other.concepts_linked;
        self.relationships_created += other.relationships_created;
        self.relationships_rejected += other.relationships_rejected;
        self.evidence_accepted += other.evidence_accepted;
        self.evidence_rejected += other.evidence_rejected;
    }
}

/// The durable checkpoint written after every chunk commits (§4.7 step 7;
/// §4.8's job record holds this inside `job_data`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkProgress {
    /// Chunks with `chunk_index <= resume_from_chunk` are skipped on
    /// replay; `None` means no chunk has checkpointed yet.
    pub resume_from_chunk: Option<usize>,
    pub stats: IngestStats,
    /// Last-50 touched concept ids, refreshed every checkpoint — a cache
    /// mirroring the graph's own recency tracking so a restart doesn't
    /// need to re-scan the whole graph before resuming (§4.7 step 3, 7).
    pub recent_concept_ids: Vec<String>,
}

/// The job-side half of the checkpoint protocol: load where a restart
/// should resume from, and durably persist progress after each chunk.
/// Implemented by `kg-jobs`'s job record; kept as a narrow trait here so
/// this crate never depends on the job queue's storage format.
#[async_trait::async_trait]
pub trait JobCheckpoint: Send + Sync {
    async fn load(&self) -> ChunkProgress;

    /// # Errors
    /// Returns an error if the durable write itself fails — per §7 this
    /// must abort the whole job, since an un-persisted checkpoint would
    /// make the next restart silently redo work or, worse, skip it.
    async fn checkpoint(&self, progress: &ChunkProgress) -> crate::error::Result<()>;
}

/// An in-memory `JobCheckpoint` for tests and single-shot callers that
/// don't need cross-process durability.
#[derive(Default)]
pub struct InMemoryCheckpoint {
    state: parking_lot::Mutex<ChunkProgress>,
}

#[async_trait::async_trait]
impl JobCheckpoint for InMemoryCheckpoint {
    async fn load(&self) -> ChunkProgress {
        self.state.lock().clone()
    }

    async fn checkpoint(&self, progress: &ChunkProgress) -> crate::error::Result<()> {
        *self.state.lock() = progress.clone();
        Ok(())
    }
}
