// src/dag/scheduler_step.rs

//! Step-by-step result type for the scheduler.

use crate::dag::job::JobId;

/// Structured result of applying one job outcome to the scheduler.
///
/// Useful for tests that want to step the DAG manually and assert on what
/// changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStep {
    /// Jobs whose dependencies all succeeded as a result of this step.
    pub newly_ready: Vec<JobId>,
    /// Jobs skipped because this step's job (or a skipped ancestor) did not
    /// succeed.
    pub newly_skipped: Vec<JobId>,
}
