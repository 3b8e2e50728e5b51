use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a job.
///
/// - `Pending`: not started yet (waiting on dependencies, capacity or rate).
/// - `Running`: handed to the executor.
/// - `Succeeded`, `Failed`, `Timeout`: outcome of the last attempt.
/// - `Skipped`: never ran because a dependency did not succeed.
/// - `Cancelled`: stopped (or never started) due to global cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Timeout,
    Skipped,
    Cancelled,
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Pending
    }
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Timeout => "timeout",
            JobStatus::Skipped => "skipped",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the job will not change status again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Pending | JobStatus::Running)
    }

    /// `failed` or `timeout`: eligible for retry and for stop-on-error.
    pub fn is_failure(self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::Timeout)
    }

    /// Whether dependents of a job in this status must be skipped.
    pub fn blocks_dependents(self) -> bool {
        matches!(
            self,
            JobStatus::Failed | JobStatus::Timeout | JobStatus::Cancelled | JobStatus::Skipped
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "succeeded" => Ok(JobStatus::Succeeded),
            "failed" => Ok(JobStatus::Failed),
            "timeout" => Ok(JobStatus::Timeout),
            "skipped" => Ok(JobStatus::Skipped),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(format!("invalid job status: {other}")),
        }
    }
}
