// src/engine/retry.rs

//! Retry / exponential backoff policy.
//!
//! The delay before retry `n` (after the `n`-th failed attempt) is
//! `backoff_base × 2^(n-1)`. No jitter: runs are deterministic.

use std::time::Duration;

use crate::dag::TaskSpec;
use crate::types::JobStatus;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Base delay in seconds.
    pub backoff_base: f64,
}

impl RetryPolicy {
    pub fn from_task(task: &TaskSpec) -> Self {
        Self {
            max_retries: task.max_retries,
            backoff_base: task.backoff_base,
        }
    }

    /// Whether an attempt that ended in `status` should be retried, given
    /// that `attempts` attempts (including this one) have been made.
    ///
    /// Only `failed` and `timeout` are retry-eligible.
    pub fn should_retry(&self, status: JobStatus, attempts: u32) -> bool {
        status.is_failure() && attempts <= self.max_retries
    }

    /// Delay to wait after `attempts` failed attempts.
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.backoff_base.max(0.0) * 2f64.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}
