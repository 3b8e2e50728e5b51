// src/dag/job.rs

//! Job descriptions and per-job runtime records.

use std::time::Duration;

use serde_json::{Map, Value};

use crate::types::JobStatus;

/// Canonical job identifier type used throughout the crate.
pub type JobId = String;

/// Default delay base (seconds) for exponential retry backoff.
pub const DEFAULT_BACKOFF_BASE: f64 = 0.01;

/// Unit of work a job performs, with its typed arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskKind {
    /// Returns `value`, or the task name / job id when absent.
    Noop { value: Option<Value> },
    /// Cooperative sleep.
    Sleep { seconds: f64 },
    /// `work` iterations of a modular accumulation on the CPU pool.
    Cpu { work: u64 },
    /// Always fails with `message`.
    Fail { message: String },
    /// Fails while the attempt number is `<= fail_until`.
    Flaky { fail_until: u32 },
}

impl TaskKind {
    /// The plan-file spelling of this kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            TaskKind::Noop { .. } => "noop",
            TaskKind::Sleep { .. } => "sleep",
            TaskKind::Cpu { .. } => "cpu",
            TaskKind::Fail { .. } => "fail",
            TaskKind::Flaky { .. } => "flaky",
        }
    }
}

/// Immutable description of the work a job performs.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    pub kind: TaskKind,
    pub name: String,
    /// Raw arguments as given in the plan (kept for metadata / diagnostics).
    pub args: Map<String, Value>,
    /// Per-attempt deadline. `None` means no deadline.
    pub timeout: Option<Duration>,
    pub max_retries: u32,
    /// Seconds; the delay before retry `n` is `backoff_base * 2^(n-1)`.
    pub backoff_base: f64,
}

impl TaskSpec {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            name: String::new(),
            args: Map::new(),
            timeout: None,
            max_retries: 0,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }

    pub fn noop() -> Self {
        Self::new(TaskKind::Noop { value: None })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Set the per-attempt timeout in seconds; values `<= 0` disable it.
    pub fn with_timeout_secs(mut self, seconds: f64) -> Self {
        self.timeout = timeout_from_secs(seconds);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff_base(mut self, seconds: f64) -> Self {
        self.backoff_base = seconds.max(0.0);
        self
    }
}

/// Convert a plan-level timeout in seconds into an optional deadline.
///
/// Values too large for a `Duration` mean no deadline at all.
pub fn timeout_from_secs(seconds: f64) -> Option<Duration> {
    if seconds > 0.0 {
        Duration::try_from_secs_f64(seconds).ok()
    } else {
        None
    }
}

/// Render seconds the way plan authors write them: `1.0`, `0.05`.
pub fn format_seconds(seconds: f64) -> String {
    if seconds.fract() == 0.0 {
        format!("{seconds:.1}")
    } else {
        format!("{seconds}")
    }
}

/// Input to graph construction: a job id, its task and its dependencies.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub id: JobId,
    pub task: TaskSpec,
    pub deps: Vec<JobId>,
}

impl JobSpec {
    pub fn new(id: impl Into<JobId>, task: TaskSpec) -> Self {
        Self {
            id: id.into(),
            task,
            deps: Vec::new(),
        }
    }

    pub fn after(mut self, dep: impl Into<JobId>) -> Self {
        self.deps.push(dep.into());
        self
    }
}

/// Mutable execution record of a job. Persists into the final summary.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub task: TaskSpec,
    pub deps: Vec<JobId>,
    pub status: JobStatus,
    pub attempts: u32,
    pub error: Option<String>,
    /// Seconds since the scheduler started.
    pub started_at: Option<f64>,
    pub ended_at: Option<f64>,
    pub result: Option<Value>,
}

impl Job {
    pub fn from_spec(spec: JobSpec) -> Self {
        Self {
            id: spec.id,
            task: spec.task,
            deps: spec.deps,
            status: JobStatus::Pending,
            attempts: 0,
            error: None,
            started_at: None,
            ended_at: None,
            result: None,
        }
    }

    /// Terminal transition for a job that never ran (skip / forced cancel).
    pub(crate) fn settle_without_running(&mut self, status: JobStatus, at: f64) {
        self.status = status;
        self.started_at.get_or_insert(at);
        self.ended_at.get_or_insert(at);
        if status == JobStatus::Cancelled {
            self.error.get_or_insert_with(|| "cancelled".to_string());
        }
    }

    pub(crate) fn apply_outcome(&mut self, outcome: JobOutcome) {
        self.status = outcome.status;
        self.attempts = outcome.attempts;
        self.error = outcome.error;
        self.started_at = outcome.started_at;
        self.ended_at = outcome.ended_at;
        self.result = outcome.result;
    }
}

/// What a job's execution path reports back to the core loop.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub id: JobId,
    pub status: JobStatus,
    pub attempts: u32,
    pub error: Option<String>,
    pub started_at: Option<f64>,
    pub ended_at: Option<f64>,
    pub result: Option<Value>,
}

impl JobOutcome {
    /// Outcome for a job that was cancelled before it ever reached `running`.
    pub fn cancelled_before_start(id: JobId, at: f64) -> Self {
        Self {
            id,
            status: JobStatus::Cancelled,
            attempts: 0,
            error: Some("cancelled".to_string()),
            started_at: Some(at),
            ended_at: Some(at),
            result: None,
        }
    }
}
