// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the pure DAG scheduler (`dag::Scheduler`)
//! - the launch gates: concurrency slots, the [`limiter`] and the [`tracker`]
//! - the per-job execution path with [`retry`] and cancellation
//! - the [`events`] log and the final [`summary`]
//!
//! The main loop lives in [`runtime`]; a single job's path in [`job_runner`].

use crate::errors::{JobdagError, Result};

/// Run-level configuration of the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerOptions {
    /// Maximum number of simultaneously running jobs (>= 1).
    pub concurrency: usize,
    /// Maximum job launches per rolling second; `None` or `<= 0` disables.
    pub rate_limit_per_sec: Option<f64>,
    /// Cancel everything after the first job ends `failed` / `timeout`.
    pub stop_on_error: bool,
    /// Bound for the CPU worker pool; `None` uses the core count.
    pub max_workers: Option<usize>,
}

pub const DEFAULT_CONCURRENCY: usize = 4;

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            rate_limit_per_sec: None,
            stop_on_error: false,
            max_workers: None,
        }
    }
}

impl SchedulerOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_rate_limit(mut self, per_sec: f64) -> Self {
        self.rate_limit_per_sec = Some(per_sec);
        self
    }

    pub fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(JobdagError::InvalidOptions(
                "concurrency must be positive (got 0)".to_string(),
            ));
        }
        if let Some(rate) = self.rate_limit_per_sec {
            if rate.is_nan() {
                return Err(JobdagError::InvalidOptions(
                    "rate must be a number".to_string(),
                ));
            }
        }
        Ok(())
    }
}

pub mod events;
pub mod job_runner;
pub mod limiter;
pub mod retry;
pub mod runtime;
pub mod summary;
pub mod tracker;

pub use events::{EventKind, EventLog, LogRecord};
pub use limiter::RateLimiter;
pub use retry::RetryPolicy;
pub use runtime::Runtime;
pub use summary::{JobReport, Summary};
pub use tracker::ConcurrencyTracker;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = SchedulerOptions::default()
            .with_concurrency(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, JobdagError::InvalidOptions(_)));
    }

    #[test]
    fn defaults_are_valid() {
        let opts = SchedulerOptions::default();
        assert_eq!(opts.concurrency, DEFAULT_CONCURRENCY);
        assert!(opts.validate().is_ok());
        assert!(SchedulerOptions::default().with_rate_limit(f64::NAN).validate().is_err());
    }
}
