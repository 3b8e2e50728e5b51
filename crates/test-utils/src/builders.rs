#![allow(dead_code)]

use serde_json::Value;
use jobdag::dag::{JobSpec, TaskKind, TaskSpec};

/// Builder for a list of `JobSpec`s to simplify test setup.
#[derive(Debug, Default)]
pub struct PlanBuilder {
    jobs: Vec<JobSpec>,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job without dependencies.
    pub fn job(self, id: &str, task: TaskBuilder) -> Self {
        self.job_after(id, &[], task)
    }

    pub fn job_after(mut self, id: &str, deps: &[&str], task: TaskBuilder) -> Self {
        let mut spec = JobSpec::new(id, task.build());
        for dep in deps {
            spec = spec.after(*dep);
        }
        self.jobs.push(spec);
        self
    }

    /// `count` independent noop jobs named `<prefix><i>`.
    pub fn noops(mut self, prefix: &str, count: usize) -> Self {
        for i in 0..count {
            self.jobs
                .push(JobSpec::new(format!("{prefix}{i}"), TaskBuilder::noop().build()));
        }
        self
    }

    pub fn build(self) -> Vec<JobSpec> {
        self.jobs
    }
}

/// Builder for `TaskSpec`.
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    task: TaskSpec,
}

impl TaskBuilder {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            task: TaskSpec::new(kind),
        }
    }

    pub fn noop() -> Self {
        Self::new(TaskKind::Noop { value: None })
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Self::new(TaskKind::Noop {
            value: Some(value.into()),
        })
    }

    pub fn sleep(seconds: f64) -> Self {
        Self::new(TaskKind::Sleep { seconds })
    }

    pub fn cpu(work: u64) -> Self {
        Self::new(TaskKind::Cpu { work })
    }

    pub fn fail(message: &str) -> Self {
        Self::new(TaskKind::Fail {
            message: message.to_string(),
        })
    }

    pub fn flaky(fail_until: u32) -> Self {
        Self::new(TaskKind::Flaky { fail_until })
    }

    pub fn name(mut self, name: &str) -> Self {
        self.task = self.task.with_name(name);
        self
    }

    pub fn timeout(mut self, seconds: f64) -> Self {
        self.task = self.task.with_timeout_secs(seconds);
        self
    }

    pub fn retries(mut self, max_retries: u32) -> Self {
        self.task = self.task.with_max_retries(max_retries);
        self
    }

    pub fn backoff(mut self, seconds: f64) -> Self {
        self.task = self.task.with_backoff_base(seconds);
        self
    }

    pub fn build(self) -> TaskSpec {
        self.task
    }
}
