//! Lifecycle Scheduler (C12): periodic cleanup of expired approvals and
//! aged terminal jobs (§4.8's "Lifecycle cleanup").
//!
//! Structured like the teacher's `ConsolidationDaemon`: a `watch`-based
//! shutdown signal, an `AtomicBool` running flag, and a background task
//! that ticks on a fixed interval rather than the daemon's adaptive
//! fast/normal/slow tiers — cleanup has no queue-depth-sensitive reason to
//! speed up, so one interval (`JobsConfig::cleanup_interval`) is enough.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use kg_config::JobsConfig;
use kg_extract::LlmClient;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::model::{CancelReason, JobStatus};
use crate::queue::JobQueue;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupStats {
    pub expired_approvals: usize,
    pub deleted_completed_or_cancelled: usize,
    pub deleted_failed: usize,
}

pub struct LifecycleScheduler<C: LlmClient> {
    queue: Arc<JobQueue<C>>,
    config: JobsConfig,
    running: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    last_run: Mutex<CleanupStats>,
}

impl<C: LlmClient + 'static> LifecycleScheduler<C> {
    #[must_use]
    pub fn new(queue: Arc<JobQueue<C>>, config: JobsConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            queue,
            config,
            running: AtomicBool::new(false),
            shutdown_tx,
            shutdown_rx,
            last_run: Mutex::new(CleanupStats::default()),
        }
    }

    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        let scheduler = Arc::clone(&self);
        tokio::spawn(async move { scheduler.run().await })
    }

    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn last_run_stats(&self) -> CleanupStats {
        *self.last_run.lock().await
    }

    async fn run(&self) {
        let mut shutdown = self.shutdown_rx.clone();
        let mut interval = tokio::time::interval(self.config.cleanup_interval());
        interval.tick().await; // first tick fires immediately, skip it

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let stats = self.cleanup_once();
                    debug!(?stats, "lifecycle cleanup pass complete");
                    *self.last_run.lock().await = stats;
                }
                _ = shutdown.changed() => {
                    info!("lifecycle scheduler shutdown signal received");
                    break;
                }
            }
        }
    }

    /// One cleanup pass (§4.8): cancel approvals that sat too long, then
    /// hard-delete terminal jobs past their retention window.
    pub fn cleanup_once(&self) -> CleanupStats {
        let now = chrono::Utc::now();
        let mut stats = CleanupStats::default();

        let expired: Vec<String> = self
            .queue
            .list()
            .into_iter()
            .filter(|j| j.status == JobStatus::AwaitingApproval)
            .filter(|j| j.expires_at.is_some_and(|exp| exp < now))
            .map(|j| j.job_id)
            .collect();
        for job_id in &expired {
            if self.queue.cancel(job_id, CancelReason::ApprovalExpired).is_ok() {
                stats.expired_approvals += 1;
            }
        }

        let completed_retention = self.config.completed_retention();
        let failed_retention = self.config.failed_retention();
        for record in self.queue.list() {
            let Some(terminal_at) = record.completed_at else { continue };
            let age = now.signed_duration_since(terminal_at);
            match record.status {
                JobStatus::Completed | JobStatus::Cancelled
                    if age > chrono::Duration::from_std(completed_retention).unwrap_or_default() =>
                {
                    if self.queue.remove(&record.job_id) {
                        stats.deleted_completed_or_cancelled += 1;
                    }
                }
                JobStatus::Failed if age > chrono::Duration::from_std(failed_retention).unwrap_or_default() => {
                    if self.queue.remove(&record.job_id) {
                        stats.deleted_failed += 1;
                    }
                }
                _ => {}
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JobRecord;
    use chrono::Duration;
    use kg_config::{AnalyzerCostModel, ChunkingConfig};
    use kg_content::InMemoryContentStore;
    use kg_embed::{DeterministicHashEmbedder, EmbeddingAdapter};
    use kg_config::embedding::{EmbeddingConfig, EmbeddingConfigGuard};
    use kg_extract::ExtractionAdapter;
    use kg_graph::InMemoryGraphStore;
    use kg_ingest::IngestionEngine;
    use kg_vector::InMemoryVectorIndex;

    struct NoopClient;
    #[async_trait::async_trait]
    impl LlmClient for NoopClient {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok(r#"{"concepts":[],"relationships":[],"evidence":[]}"#.to_string())
        }
    }

    fn build_queue() -> JobQueue<NoopClient> {
        let embed_config = Arc::new(EmbeddingConfigGuard::new(EmbeddingConfig::new("local", "m", 8)));
        let provider = Arc::new(DeterministicHashEmbedder::new("m", 8));
        let embed = Arc::new(EmbeddingAdapter::new(embed_config, provider));
        let extractor = Arc::new(ExtractionAdapter::new(NoopClient, 1));
        let vector_index: Arc<dyn kg_vector::VectorIndex> = Arc::new(InMemoryVectorIndex::new());
        let graph = Arc::new(InMemoryGraphStore::new());
        let engine = Arc::new(IngestionEngine::new(
            ChunkingConfig::default(),
            embed,
            extractor,
            vector_index,
            graph.clone(),
            vec![],
            kg_config::ConceptMatchConfig::default(),
        ));
        JobQueue::new(
            Arc::new(InMemoryContentStore::new()),
            graph,
            engine,
            ChunkingConfig::default(),
            AnalyzerCostModel::default(),
            JobsConfig::default(),
        )
    }

    #[test]
    fn expired_awaiting_approval_is_cancelled() {
        let queue = build_queue();
        let mut record = JobRecord::new("job_1".into(), "hash1".into(), "bio".into(), "doc.txt".into(), false, false, chrono::Utc::now());
        record.status = JobStatus::AwaitingApproval;
        record.expires_at = Some(chrono::Utc::now() - Duration::seconds(1));
        queue.insert_for_test(record);

        let scheduler = LifecycleScheduler::new(Arc::new(queue), JobsConfig::default());
        let stats = scheduler.cleanup_once();
        assert_eq!(stats.expired_approvals, 1);
        assert_eq!(scheduler.queue.get("job_1").unwrap().status, JobStatus::Cancelled);
    }

    #[test]
    fn stale_completed_job_is_hard_deleted() {
        let queue = build_queue();
        let mut record = JobRecord::new("job_2".into(), "hash2".into(), "bio".into(), "doc.txt".into(), false, false, chrono::Utc::now());
        record.status = JobStatus::Completed;
        record.completed_at = Some(chrono::Utc::now() - Duration::hours(49));
        queue.insert_for_test(record);

        let config = JobsConfig::default();
        let scheduler = LifecycleScheduler::new(Arc::new(queue), config);
        let stats = scheduler.cleanup_once();
        assert_eq!(stats.deleted_completed_or_cancelled, 1);
        assert!(scheduler.queue.get("job_2").is_err());
    }

    #[test]
    fn fresh_completed_job_survives_a_cleanup_pass() {
        let queue = build_queue();
        let mut record = JobRecord::new("job_3".into(), "hash3".into(), "bio".into(), "doc.txt".into(), false, false, chrono::Utc::now());
        record.status = JobStatus::Completed;
        record.completed_at = Some(chrono::Utc::now());
        queue.insert_for_test(record);

        let scheduler = LifecycleScheduler::new(Arc::new(queue), JobsConfig::default());
        let stats = scheduler.cleanup_once();
        assert_eq!(stats.deleted_completed_or_cancelled, 0);
        assert!(scheduler.queue.get("job_3").is_ok());
    }
}
