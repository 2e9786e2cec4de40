use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mass mutation run chunk by chunk over every user. Each variant only touches rows that
/// are not yet in the target state, so a repeated run converges to zero affected rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMutation {
    ExpireTrials { trial_limit: i32 },
    AcknowledgeBoot { epoch: DateTime<Utc> },
}

impl BatchMutation {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchMutation::ExpireTrials { .. } => "expire_trials",
            BatchMutation::AcknowledgeBoot { .. } => "acknowledge_boot",
        }
    }
}

impl Display for BatchMutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchJobState {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchProgress {
    pub job: String,
    pub state: BatchJobState,
    pub processed: usize,
    pub total: usize,
    pub affected: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl BatchProgress {
    pub fn started(mutation: BatchMutation, total: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            job: mutation.as_str().to_string(),
            state: BatchJobState::Running,
            processed: 0,
            total,
            affected: 0,
            started_at,
            finished_at: None,
            error: None,
        }
    }

    pub fn progress_line(&self) -> String {
        format!("{}: processed {}/{}", self.job, self.processed, self.total)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchSummary {
    pub job: String,
    pub total: usize,
    pub affected: usize,
    pub chunks: usize,
}

impl BatchSummary {
    pub fn summary_line(&self) -> String {
        format!(
            "{}: done, {} users checked, {} updated in {} chunks",
            self.job, self.total, self.affected, self.chunks
        )
    }
}
