//! Job Queue (C9): durable state machine, crash-recovery scan, and a
//! bounded worker pool that executes `approved` jobs through C8.
//!
//! The worker pool follows the teacher's batch-ingestion concurrency
//! pattern (`RAGPipeline::batch_ingest`): a `tokio::sync::Semaphore` sized
//! to the configured pool caps how many jobs run at once, while the queue
//! itself stays a plain `RwLock`-guarded map — the in-memory stand-in this
//! workspace uses everywhere a production build would reach for a durable
//! store (cf. `InMemoryGraphStore`, `InMemoryContentStore`).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kg_config::{AnalyzerCostModel, ChunkingConfig, JobsConfig};
use kg_content::ContentStore;
use kg_core::ids::new_job_id;
use kg_core::types::DocumentMeta;
use kg_extract::LlmClient;
use kg_graph::InMemoryGraphStore;
use kg_ingest::{ChunkProgress, IngestionEngine, JobCheckpoint};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::analyzer;
use crate::dedup::{check_duplicate, DuplicateSource};
use crate::error::{JobError, Result};
use crate::model::{CancelReason, JobRecord, JobStatus};

pub struct JobQueue<C: LlmClient> {
    jobs: RwLock<HashMap<String, JobRecord>>,
    content: Arc<dyn ContentStore>,
    graph: Arc<InMemoryGraphStore>,
    engine: Arc<IngestionEngine<C>>,
    chunking: ChunkingConfig,
    cost_model: AnalyzerCostModel,
    config: JobsConfig,
    in_flight: Arc<AtomicU64>,
}

impl<C: LlmClient + 'static> JobQueue<C> {
    #[must_use]
    pub fn new(
        content: Arc<dyn ContentStore>,
        graph: Arc<InMemoryGraphStore>,
        engine: Arc<IngestionEngine<C>>,
        chunking: ChunkingConfig,
        cost_model: AnalyzerCostModel,
        config: JobsConfig,
    ) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            content,
            graph,
            engine,
            chunking,
            cost_model,
            config,
            in_flight: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Submit a document for ingestion: dedup check (C11, skipped when
    /// `force` is set), then immediately analyze (C10) and advance past
    /// `pending` — analysis never calls the LLM, so there's no reason to
    /// make the caller wait for a second round trip.
    ///
    /// # Errors
    /// Returns [`JobError::Content`] if the document can't be read back
    /// from the content store to compute its word count.
    pub async fn submit(
        &self,
        content_hash: String,
        ontology: String,
        file_path: String,
        auto_approve: bool,
        force: bool,
    ) -> Result<String> {
        if !force {
            let jobs = self.jobs.read();
            let dup = check_duplicate(&self.graph, jobs.values(), &content_hash, &ontology);
            if dup.duplicate {
                let source = match dup.source {
                    Some(DuplicateSource::Graph) => "graph",
                    Some(DuplicateSource::Jobs) => "jobs",
                    None => "unknown",
                };
                return Err(JobError::InvalidTransition {
                    job_id: content_hash,
                    status: format!("duplicate (source={source})"),
                    expected: "not yet ingested".to_string(),
                });
            }
        }

        let storage_key = kg_content::storage_key(&ontology, &content_hash, "txt");
        let bytes = self.content.get(&storage_key).await?;
        let text = String::from_utf8_lossy(&bytes);
        let words = analyzer::word_count(&text);

        let job_id = new_job_id();
        let now = Utc::now();
        let mut record = JobRecord::new(job_id.clone(), content_hash.clone(), ontology, file_path, auto_approve, force, now);

        let duplicate_checkpoint_elsewhere = {
            let jobs = self.jobs.read();
            jobs.values()
                .any(|j| j.content_hash == content_hash && j.status == JobStatus::Processing)
        };
        let analysis = analyzer::analyze(words, &self.chunking, &self.cost_model, duplicate_checkpoint_elsewhere, true);
        record.analysis = Some(analysis);
        record.status = JobStatus::AwaitingApproval;
        record.expires_at = Some(now + chrono::Duration::seconds(self.config.approval_timeout_secs as i64));

        if auto_approve {
            record.status = JobStatus::Approved;
            record.approved_at = Some(now);
            record.expires_at = None;
        }

        info!(job_id = %job_id, status = %record.status, "job submitted");
        self.jobs.write().insert(job_id.clone(), record);
        Ok(job_id)
    }

    /// `awaiting_approval -> approved`, the user/client transition of §4.8.
    pub fn approve(&self, job_id: &str) -> Result<()> {
        let mut jobs = self.jobs.write();
        let record = jobs.get_mut(job_id).ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        if record.status != JobStatus::AwaitingApproval {
            return Err(JobError::InvalidTransition {
                job_id: job_id.to_string(),
                status: record.status.to_string(),
                expected: "awaiting_approval".to_string(),
            });
        }
        record.status = JobStatus::Approved;
        record.approved_at = Some(Utc::now());
        record.expires_at = None;
        Ok(())
    }

    /// Cancel a job (§5). `pending | awaiting_approval | approved` cancel
    /// immediately; `processing` only sets the advisory flag the worker
    /// checks between chunks.
    pub fn cancel(&self, job_id: &str, reason: CancelReason) -> Result<()> {
        let mut jobs = self.jobs.write();
        let record = jobs.get_mut(job_id).ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        match record.status {
            JobStatus::Pending | JobStatus::AwaitingApproval | JobStatus::Approved => {
                record.status = JobStatus::Cancelled;
                record.completed_at = Some(Utc::now());
                record.error = Some(format!("cancelled: {reason:?}"));
            }
            JobStatus::Processing => {
                record.cancel_requested = true;
            }
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => {
                return Err(JobError::InvalidTransition {
                    job_id: job_id.to_string(),
                    status: record.status.to_string(),
                    expected: "a non-terminal status".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, job_id: &str) -> Result<JobRecord> {
        self.jobs
            .read()
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    #[must_use]
    pub fn list(&self) -> Vec<JobRecord> {
        self.jobs.read().values().cloned().collect()
    }

    /// Hard-delete a job record (§4.8's retention-driven deletion, C12).
    /// Returns whether a record was actually present.
    pub fn remove(&self, job_id: &str) -> bool {
        self.jobs.write().remove(job_id).is_some()
    }

    #[cfg(test)]
    pub(crate) fn insert_for_test(&self, record: JobRecord) {
        self.jobs.write().insert(record.job_id.clone(), record);
    }

    /// FIFO by `created_at` among `approved` jobs (§5 ordering guarantee).
    fn next_approved(&self) -> Option<String> {
        self.jobs
            .read()
            .values()
            .filter(|j| j.status == JobStatus::Approved)
            .min_by_key(|j| j.created_at)
            .map(|j| j.job_id.clone())
    }

    /// Crash-recovery scan (§4.8 "on restart"): every job left `processing`
    /// either still has chunks left (reset to `approved`, re-enqueued by
    /// the next FIFO pop) or had finished its last chunk when the process
    /// died (mark `completed` outright — durable checkpoint state is
    /// sufficient to tell the two cases apart, no external work markers
    /// are needed).
    pub fn recover_on_restart(&self) {
        let mut jobs = self.jobs.write();
        for record in jobs.values_mut() {
            if record.status != JobStatus::Processing {
                continue;
            }
            let resumed_through = record.job_data.progress.resume_from_chunk;
            let done = match (resumed_through, record.job_data.chunks_total) {
                (Some(resume), Some(total)) => resume + 1 >= total,
                _ => false,
            };
            if done {
                info!(job_id = %record.job_id, "recovered job had finished its last chunk, marking completed");
                record.status = JobStatus::Completed;
                record.completed_at = Some(Utc::now());
            } else {
                warn!(job_id = %record.job_id, "recovered processing job still has chunks remaining, resetting to approved");
                record.status = JobStatus::Approved;
            }
        }
    }

    /// Run the bounded worker pool until `shutdown` fires. Mirrors the
    /// teacher's `batch_ingest` semaphore-bounded concurrency, but polled
    /// on a fixed interval against the live queue instead of a
    /// pre-collected batch.
    pub async fn run_worker_pool(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(200);
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.worker_pool_size.max(1)));

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("worker pool shutdown signal received");
                    break;
                }
                () = tokio::time::sleep(POLL_INTERVAL) => {
                    while let Some(job_id) = self.next_approved() {
                        let Ok(permit) = Arc::clone(&semaphore).try_acquire_owned() else {
                            break;
                        };
                        let queue = Arc::clone(&self);
                        self.in_flight.fetch_add(1, Ordering::SeqCst);
                        tokio::spawn(async move {
                            queue.process_job(job_id).await;
                            queue.in_flight.fetch_sub(1, Ordering::SeqCst);
                            drop(permit);
                        });
                    }
                }
            }
        }

        while self.in_flight.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    }

    async fn process_job(self: Arc<Self>, job_id: String) {
        let storage_key = {
            let mut jobs = self.jobs.write();
            let Some(record) = jobs.get_mut(&job_id) else { return };
            if record.status != JobStatus::Approved {
                return;
            }
            record.status = JobStatus::Processing;
            kg_content::storage_key(&record.ontology, &record.content_hash, "txt")
        };

        let bytes = match self.content.get(&storage_key).await {
            Ok(b) => b,
            Err(err) => {
                self.finalize_failed(&job_id, err.to_string());
                return;
            }
        };
        let text = String::from_utf8_lossy(&bytes).into_owned();

        let chunks_total = match kg_chunk::chunk_document(&text, &self.chunking) {
            Ok(chunks) => chunks.len(),
            Err(err) => {
                self.finalize_failed(&job_id, err.to_string());
                return;
            }
        };
        {
            let mut jobs = self.jobs.write();
            if let Some(record) = jobs.get_mut(&job_id) {
                record.job_data.chunks_total = Some(chunks_total);
            }
        }

        let (content_hash, ontology, file_path, force) = {
            let jobs = self.jobs.read();
            let record = &jobs[&job_id];
            (
                record.content_hash.clone(),
                record.ontology.clone(),
                record.job_data.file_path.clone(),
                record.job_data.force,
            )
        };

        let checkpoint = QueueCheckpoint { queue: &self, job_id: job_id.clone() };
        let outcome = self
            .engine
            .process_document(&text, &content_hash, &ontology, &file_path, &checkpoint)
            .await;

        if self.jobs.read().get(&job_id).map(|j| j.cancel_requested).unwrap_or(false) {
            let mut jobs = self.jobs.write();
            if let Some(record) = jobs.get_mut(&job_id) {
                record.status = JobStatus::Cancelled;
                record.completed_at = Some(Utc::now());
                record.error = Some("cancelled: Requested".to_string());
            }
            return;
        }

        match outcome {
            Ok(_stats) => {
                self.finalize_completed(&job_id, &content_hash, &ontology, &file_path, force);
            }
            Err(err) => {
                if err.recoverable() {
                    debug!(job_id = %job_id, error = %err, "chunk failed recoverably, job stays processing");
                    let mut jobs = self.jobs.write();
                    if let Some(record) = jobs.get_mut(&job_id) {
                        record.error = Some(err.to_string());
                    }
                } else {
                    self.finalize_failed(&job_id, err.to_string());
                }
            }
        }
    }

    fn finalize_failed(&self, job_id: &str, error: String) {
        warn!(job_id = %job_id, %error, "job failed");
        let mut jobs = self.jobs.write();
        if let Some(record) = jobs.get_mut(job_id) {
            record.status = JobStatus::Failed;
            record.completed_at = Some(Utc::now());
            record.error = Some(error);
        }
    }

    fn finalize_completed(&self, job_id: &str, content_hash: &str, ontology: &str, file_path: &str, force: bool) {
        let previous = self.graph.find_document(content_hash, ontology);
        let mut document = DocumentMeta::new(content_hash.to_string(), ontology.to_string(), file_path.to_string(), job_id.to_string());
        if force {
            if let Some(prev) = &previous {
                // `document_id` is normally just the content hash (§3), but a
                // forced re-ingest of the *same* hash needs a distinct id for
                // the new version or it would overwrite `prev` in place
                // instead of superseding it.
                let version = prev.version.unwrap_or(1) + 1;
                document.document_id = format!("{content_hash}#v{version}");
                document.version = Some(version);
                document.supersedes = Some(prev.document_id.clone());
            }
        }
        let result = self.graph.transaction(|tx| {
            if force {
                if let Some(prev) = &previous {
                    let mut superseded = prev.clone();
                    superseded.superseded_by = Some(document.document_id.clone());
                    tx.upsert_document(superseded);
                }
            }
            tx.upsert_document(document);
            Ok(())
        });
        if let Err(err) = result {
            warn!(job_id = %job_id, error = %err, "failed to record document metadata after successful ingestion");
        }

        let mut jobs = self.jobs.write();
        if let Some(record) = jobs.get_mut(job_id) {
            record.status = JobStatus::Completed;
            record.completed_at = Some(Utc::now());
        }
        info!(job_id = %job_id, "job completed");
    }
}

/// Bridges a queued job's `job_data.progress` to the narrow checkpoint
/// seam [`kg_ingest::IngestionEngine`] depends on, so C8 never needs to
/// know about job records at all.
struct QueueCheckpoint<'q, C: LlmClient> {
    queue: &'q JobQueue<C>,
    job_id: String,
}

#[async_trait]
impl<C: LlmClient + 'static> JobCheckpoint for QueueCheckpoint<'_, C> {
    async fn load(&self) -> ChunkProgress {
        self.queue
            .jobs
            .read()
            .get(&self.job_id)
            .map(|r| r.job_data.progress.clone())
            .unwrap_or_default()
    }

    async fn checkpoint(&self, progress: &ChunkProgress) -> kg_ingest::Result<()> {
        let mut jobs = self.queue.jobs.write();
        if let Some(record) = jobs.get_mut(&self.job_id) {
            record.job_data.progress = progress.clone();
        }
        Ok(())
    }
}

/// The instant a job was created or last touched, for retention math in
/// C12. Exposed here rather than as a method on `JobRecord` since only the
/// lifecycle scheduler needs it.
#[must_use]
pub fn terminal_timestamp(record: &JobRecord) -> Option<DateTime<Utc>> {
    record.completed_at
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_config::embedding::{EmbeddingConfig, EmbeddingConfigGuard};
    use kg_config::ConceptMatchConfig;
    use kg_content::InMemoryContentStore;
    use kg_embed::{DeterministicHashEmbedder, EmbeddingAdapter};
    use kg_vector::{InMemoryVectorIndex, VectorIndex};

    struct ScriptedClient(String);

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok(self.0.clone())
        }
    }

    const EMPTY_RESPONSE: &str = r#"{"concepts":[],"relationships":[],"evidence":[]}"#;

    async fn build_queue(response: &str) -> (JobQueue<ScriptedClient>, Arc<InMemoryContentStore>) {
        let embed_config = Arc::new(EmbeddingConfigGuard::new(EmbeddingConfig::new("local", "m", 8)));
        let provider = Arc::new(DeterministicHashEmbedder::new("m", 8));
        let embed = Arc::new(EmbeddingAdapter::new(embed_config, provider));
        let extractor = Arc::new(kg_extract::ExtractionAdapter::new(ScriptedClient(response.to_string()), 1));
        let vector_index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());
        let graph = Arc::new(InMemoryGraphStore::new());
        let engine = Arc::new(IngestionEngine::new(
            ChunkingConfig {
                target_words: 50,
                min_words: 10,
                max_words: 100,
                overlap_words: 5,
                checkpoint_interval: 1,
            },
            embed,
            extractor,
            vector_index,
            graph.clone(),
            vec![],
            ConceptMatchConfig::default(),
        ));
        let content = Arc::new(InMemoryContentStore::new());
        let queue = JobQueue::new(
            content.clone(),
            graph,
            engine,
            ChunkingConfig {
                target_words: 50,
                min_words: 10,
                max_words: 100,
                overlap_words: 5,
                checkpoint_interval: 1,
            },
            AnalyzerCostModel::default(),
            JobsConfig::default(),
        );
        (queue, content)
    }

    async fn seed(content: &InMemoryContentStore, ontology: &str, content_hash: &str, text: &str) {
        let key = kg_content::storage_key(ontology, content_hash, "txt");
        content.put(&key, text.as_bytes()).await.unwrap();
    }

    #[tokio::test]
    async fn submit_lands_in_awaiting_approval_with_analysis_attached() {
        let (queue, content) = build_queue(EMPTY_RESPONSE).await;
        seed(&content, "biology", "hash1", "a short document about cells").await;
        let job_id = queue
            .submit("hash1".into(), "biology".into(), "doc.txt".into(), false, false)
            .await
            .unwrap();
        let record = queue.get(&job_id).unwrap();
        assert_eq!(record.status, JobStatus::AwaitingApproval);
        assert!(record.analysis.is_some());
    }

    #[tokio::test]
    async fn auto_approve_skips_straight_to_approved() {
        let (queue, content) = build_queue(EMPTY_RESPONSE).await;
        seed(&content, "biology", "hash1", "a short document about cells").await;
        let job_id = queue
            .submit("hash1".into(), "biology".into(), "doc.txt".into(), true, false)
            .await
            .unwrap();
        assert_eq!(queue.get(&job_id).unwrap().status, JobStatus::Approved);
    }

    #[tokio::test]
    async fn duplicate_submission_is_rejected_without_force() {
        let (queue, content) = build_queue(EMPTY_RESPONSE).await;
        seed(&content, "biology", "hash1", "a short document about cells").await;
        queue
            .submit("hash1".into(), "biology".into(), "doc.txt".into(), false, false)
            .await
            .unwrap();
        let second = queue
            .submit("hash1".into(), "biology".into(), "doc.txt".into(), false, false)
            .await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn approve_then_process_job_completes_it() {
        let (queue, content) = build_queue(EMPTY_RESPONSE).await;
        seed(&content, "biology", "hash1", "a short document about cells and organisms").await;
        let job_id = queue
            .submit("hash1".into(), "biology".into(), "doc.txt".into(), false, false)
            .await
            .unwrap();
        queue.approve(&job_id).unwrap();
        let queue = Arc::new(queue);
        Arc::clone(&queue).process_job(job_id.clone()).await;
        let record = queue.get(&job_id).unwrap();
        assert_eq!(record.status, JobStatus::Completed);
        assert!(queue.graph.find_document("hash1", "biology").is_some());
    }

    #[tokio::test]
    async fn cancel_from_approved_is_immediate() {
        let (queue, content) = build_queue(EMPTY_RESPONSE).await;
        seed(&content, "biology", "hash1", "a short document about cells").await;
        let job_id = queue
            .submit("hash1".into(), "biology".into(), "doc.txt".into(), true, false)
            .await
            .unwrap();
        queue.cancel(&job_id, CancelReason::Requested).unwrap();
        assert_eq!(queue.get(&job_id).unwrap().status, JobStatus::Cancelled);
    }

    #[test]
    fn recover_on_restart_resets_incomplete_processing_job_to_approved() {
        let (queue, _content) = tokio_test::block_on(build_queue(EMPTY_RESPONSE));
        let mut record = JobRecord::new("job_1".into(), "hash1".into(), "biology".into(), "doc.txt".into(), false, false, Utc::now());
        record.status = JobStatus::Processing;
        record.job_data.chunks_total = Some(5);
        record.job_data.progress = ChunkProgress {
            resume_from_chunk: Some(1),
            ..ChunkProgress::default()
        };
        queue.insert_for_test(record);

        queue.recover_on_restart();
        assert_eq!(queue.get("job_1").unwrap().status, JobStatus::Approved);
    }

    #[test]
    fn recover_on_restart_marks_fully_checkpointed_job_completed() {
        let (queue, _content) = tokio_test::block_on(build_queue(EMPTY_RESPONSE));
        let mut record = JobRecord::new("job_1".into(), "hash1".into(), "biology".into(), "doc.txt".into(), false, false, Utc::now());
        record.status = JobStatus::Processing;
        record.job_data.chunks_total = Some(2);
        record.job_data.progress = ChunkProgress {
            resume_from_chunk: Some(1),
            ..ChunkProgress::default()
        };
        queue.insert_for_test(record);

        queue.recover_on_restart();
        assert_eq!(queue.get("job_1").unwrap().status, JobStatus::Completed);
    }
}
