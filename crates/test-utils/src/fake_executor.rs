use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use jobdag::dag::TaskSpec;
use jobdag::exec::{ExecFuture, ExecutorBackend, TaskFailure};

/// What one scripted attempt does.
#[derive(Debug, Clone)]
pub enum Step {
    Succeed(Value),
    Fail(String),
    /// Sleep, then fail with the message.
    FailAfter(Duration, String),
    /// Sleep, then succeed with the job id.
    Sleep(Duration),
    /// Never completes; only a timeout or cancellation ends it.
    Hang,
    /// Panics inside the job path.
    Panic(String),
}

/// A fake executor that:
/// - records every `(job, attempt)` it was asked to run, in call order
/// - plays back a per-job script of steps (the last step repeats)
/// - succeeds with the job id for jobs without a script
/// - counts `shutdown` calls
#[derive(Debug, Default, Clone)]
pub struct ScriptedExecutor {
    scripts: Arc<HashMap<String, Vec<Step>>>,
    calls: Arc<Mutex<Vec<(String, u32)>>>,
    shutdowns: Arc<AtomicUsize>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a script to `job`. Must be called before the executor is
    /// cloned or handed to a runtime.
    pub fn script(mut self, job: &str, steps: Vec<Step>) -> Self {
        Arc::make_mut(&mut self.scripts).insert(job.to_string(), steps);
        self
    }

    /// Every `(job, attempt)` executed so far.
    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }

    /// Job ids in the order their first attempt started.
    pub fn started_jobs(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(_, attempt)| *attempt == 1)
            .map(|(job, _)| job)
            .collect()
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    fn step_for(&self, job: &str, attempt: u32) -> Option<Step> {
        let steps = self.scripts.get(job)?;
        let idx = (attempt as usize).saturating_sub(1).min(steps.len().saturating_sub(1));
        steps.get(idx).cloned()
    }
}

impl ExecutorBackend for ScriptedExecutor {
    fn execute<'a>(&'a self, job_id: &'a str, _task: &'a TaskSpec, attempt: u32) -> ExecFuture<'a> {
        self.calls.lock().unwrap().push((job_id.to_string(), attempt));
        let step = self.step_for(job_id, attempt);

        Box::pin(async move {
            match step {
                None => Ok(Value::String(job_id.to_string())),
                Some(Step::Succeed(value)) => Ok(value),
                Some(Step::Fail(message)) => Err(TaskFailure::Failed(message)),
                Some(Step::FailAfter(d, message)) => {
                    tokio::time::sleep(d).await;
                    Err(TaskFailure::Failed(message))
                }
                Some(Step::Sleep(d)) => {
                    tokio::time::sleep(d).await;
                    Ok(Value::String(job_id.to_string()))
                }
                Some(Step::Panic(message)) => panic!("{message}"),
                Some(Step::Hang) => {
                    std::future::pending::<()>().await;
                    Ok(Value::Null)
                }
            }
        })
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}
