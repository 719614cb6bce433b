//! Job record shape and state machine (§4.8).

use chrono::{DateTime, Utc};
use kg_ingest::ChunkProgress;
use serde::{Deserialize, Serialize};

/// Non-terminal and terminal states of the job state machine (§4.8). Every
/// transition the queue performs is checked against this diagram in
/// [`crate::queue::JobQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    AwaitingApproval,
    Approved,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::Pending | Self::AwaitingApproval | Self::Approved | Self::Processing
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::AwaitingApproval => "awaiting_approval",
            Self::Approved => "approved",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// The only job type this engine runs today; kept as an enum (rather than
/// a bare string, per spec `type` field) so a second job kind can be added
/// without widening every match on a string constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    IngestDocument,
}

/// Reasons a job can land in `cancelled`, surfaced in [`JobRecord::error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    Requested,
    ApprovalExpired,
}

/// Everything C8 needs to (re)start processing this job, carried inside
/// the job record rather than as separate side storage (§4.8 persistence:
/// "no external work markers are needed").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobData {
    pub file_path: String,
    pub auto_approve: bool,
    pub force: bool,
    pub progress: ChunkProgress,
    /// Set once chunking has actually run (processing has started at least
    /// once). Lets the crash-recovery scan (§4.8 "on restart") tell a job
    /// that finished its last chunk but never got to record `completed`
    /// apart from one that still has chunks left.
    pub chunks_total: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStats {
    pub word_count: usize,
    pub estimated_chunks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostEstimate {
    pub extraction_usd_low: f64,
    pub extraction_usd_high: f64,
    pub embedding_usd: f64,
    pub total_usd_low: f64,
    pub total_usd_high: f64,
}

/// The analyzer's (C10) output: `{file_stats, cost_estimate, config_snapshot,
/// warnings[], analyzed_at}` (§4.9), attached to the job record once
/// `pending -> awaiting_approval` fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub file_stats: FileStats,
    pub cost_estimate: CostEstimate,
    pub estimated_concepts: usize,
    pub config_snapshot: kg_config::AnalyzerCostModel,
    pub warnings: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    pub job_type: JobType,
    pub content_hash: String,
    pub ontology: String,
    pub job_data: JobData,
    pub analysis: Option<AnalysisResult>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    /// Advisory cancellation flag for a `processing` job (§5): the current
    /// chunk runs to its checkpoint or failure, then the worker observes
    /// this and finalizes the job as `cancelled` instead of looping to the
    /// next chunk.
    pub cancel_requested: bool,
}

impl JobRecord {
    #[must_use]
    pub fn new(
        job_id: String,
        content_hash: String,
        ontology: String,
        file_path: String,
        auto_approve: bool,
        force: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id,
            status: JobStatus::Pending,
            job_type: JobType::IngestDocument,
            content_hash,
            ontology,
            job_data: JobData {
                file_path,
                auto_approve,
                force,
                progress: ChunkProgress::default(),
                chunks_total: None,
            },
            analysis: None,
            created_at: now,
            approved_at: None,
            expires_at: None,
            completed_at: None,
            error: None,
            cancel_requested: false,
        }
    }
}
