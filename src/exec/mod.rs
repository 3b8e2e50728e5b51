// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`task_runner`] runs one attempt of a task by dispatching on its kind.
//! - [`cpu_pool`] owns the OS-thread pool that `cpu` tasks are offloaded to.
//! - [`backend`] provides the `ExecutorBackend` trait and the concrete
//!   `BuiltinExecutor` that the runtime uses in production, and which tests
//!   can replace with a fake implementation.

pub mod backend;
pub mod cpu_pool;
pub mod task_runner;

use thiserror::Error;

use crate::types::JobStatus;

pub use backend::{BuiltinExecutor, ExecFuture, ExecutorBackend};

/// Why a single attempt of a task did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskFailure {
    /// Task logic failed; retry-eligible.
    #[error("{0}")]
    Failed(String),
    /// The attempt exceeded its deadline; retry-eligible.
    #[error("timeout")]
    Timeout,
    /// The scheduler cancelled the job; terminal.
    #[error("cancelled")]
    Cancelled,
}

impl TaskFailure {
    /// Job status this failure leaves the job in.
    pub fn status(&self) -> JobStatus {
        match self {
            TaskFailure::Failed(_) => JobStatus::Failed,
            TaskFailure::Timeout => JobStatus::Timeout,
            TaskFailure::Cancelled => JobStatus::Cancelled,
        }
    }
}
