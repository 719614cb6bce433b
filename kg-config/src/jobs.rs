//! Job queue and lifecycle scheduler configuration knobs (§6, §4.8, §4.12).

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JobsConfig {
    pub worker_pool_size: usize,
    pub cleanup_interval_secs: u64,
    pub approval_timeout_secs: u64,
    pub completed_retention_secs: u64,
    pub failed_retention_secs: u64,
    pub max_llm_retries: u32,
    pub context_window_concepts: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 4,
            cleanup_interval_secs: 3600,
            approval_timeout_secs: 24 * 3600,
            completed_retention_secs: 48 * 3600,
            failed_retention_secs: 7 * 24 * 3600,
            max_llm_retries: 3,
            context_window_concepts: 50,
        }
    }
}

impl JobsConfig {
    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    #[must_use]
    pub fn approval_timeout(&self) -> Duration {
        Duration::from_secs(self.approval_timeout_secs)
    }

    #[must_use]
    pub fn completed_retention(&self) -> Duration {
        Duration::from_secs(self.completed_retention_secs)
    }

    #[must_use]
    pub fn failed_retention(&self) -> Duration {
        Duration::from_secs(self.failed_retention_secs)
    }
}
