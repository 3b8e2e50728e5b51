// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of calling the task
//! runner directly. This makes it easy to swap in a fake executor in tests
//! while keeping the production implementation in [`task_runner`].
//!
//! [`task_runner`]: crate::exec::task_runner

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::dag::TaskSpec;
use crate::exec::TaskFailure;
use crate::exec::cpu_pool::{LazyCpuPool, pool_size};
use crate::exec::task_runner::run_task;

/// Future returned by [`ExecutorBackend::execute`].
pub type ExecFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, TaskFailure>> + Send + 'a>>;

/// Trait abstracting how one attempt of a task is executed.
///
/// Production code uses [`BuiltinExecutor`]; tests can provide their own
/// implementation that records calls or scripts outcomes.
pub trait ExecutorBackend: Send + Sync {
    /// Run attempt number `attempt` (counting from 1) of `task`.
    fn execute<'a>(&'a self, job_id: &'a str, task: &'a TaskSpec, attempt: u32) -> ExecFuture<'a>;

    /// Release resources held for the run. The runtime calls this once when
    /// a run ends, on every termination path.
    fn shutdown(&self) {}
}

/// Executor for the built-in task kinds.
///
/// Owns the CPU worker pool, which is created on the first `cpu` task.
#[derive(Debug)]
pub struct BuiltinExecutor {
    cpu: LazyCpuPool,
}

impl BuiltinExecutor {
    /// `max_workers` bounds the CPU pool; `None` uses the core count.
    pub fn new(max_workers: Option<usize>) -> Self {
        Self {
            cpu: LazyCpuPool::new(pool_size(max_workers)),
        }
    }

    pub fn cpu_pool(&self) -> &LazyCpuPool {
        &self.cpu
    }
}

impl Default for BuiltinExecutor {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ExecutorBackend for BuiltinExecutor {
    fn execute<'a>(&'a self, job_id: &'a str, task: &'a TaskSpec, attempt: u32) -> ExecFuture<'a> {
        Box::pin(run_task(job_id, task, attempt, &self.cpu))
    }

    fn shutdown(&self) {
        self.cpu.shutdown();
    }
}
