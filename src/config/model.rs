// src/config/model.rs

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::dag::JobSpec;
use crate::dag::job::DEFAULT_BACKOFF_BASE;

/// Plan file as read from JSON, before validation.
///
/// ```json
/// {
///   "jobs": [
///     {"id": "fetch", "task": {"type": "sleep", "args": {"seconds": 0.1}}},
///     {"id": "crunch", "task": {"type": "cpu", "args": {"work": 200000}}, "deps": ["fetch"]}
///   ]
/// }
/// ```
///
/// Every field except `jobs` is optional; see [`RawTask`] for the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPlanFile {
    #[serde(default)]
    pub jobs: Vec<RawJob>,
}

/// One entry of `jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJob {
    /// String or number. Missing ids become `job_<n>` (1-based position).
    #[serde(default)]
    pub id: Option<Value>,

    #[serde(default)]
    pub task: RawTask,

    /// Ids of jobs that must succeed first. Strings or numbers.
    #[serde(default)]
    pub deps: Vec<Value>,
}

/// `task` object of a plan entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTask {
    /// `noop` (default), `sleep`, `cpu`, `fail` or `flaky`.
    #[serde(default = "default_task_type", rename = "type")]
    pub kind: String,

    /// Defaults to the job id.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub args: Map<String, Value>,

    /// Seconds; `null`, absent or `<= 0` means no deadline.
    #[serde(default)]
    pub timeout: Option<f64>,

    #[serde(default)]
    pub max_retries: u32,

    #[serde(default = "default_backoff_base")]
    pub backoff_base: f64,
}

fn default_task_type() -> String {
    "noop".to_string()
}

fn default_backoff_base() -> f64 {
    DEFAULT_BACKOFF_BASE
}

impl Default for RawTask {
    fn default() -> Self {
        Self {
            kind: default_task_type(),
            name: None,
            args: Map::new(),
            timeout: None,
            max_retries: 0,
            backoff_base: default_backoff_base(),
        }
    }
}

/// Validated plan: jobs in file order, each with a typed task.
///
/// Built from [`RawPlanFile`] via `TryFrom` (see `config::validate`). Graph
/// level checks (duplicates, dangling deps, cycles) happen when the
/// scheduler is constructed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub jobs: Vec<JobSpec>,
}

impl Plan {
    pub fn new(jobs: Vec<JobSpec>) -> Self {
        Self { jobs }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn into_jobs(self) -> Vec<JobSpec> {
        self.jobs
    }
}

/// Optional TOML settings file.
///
/// ```toml
/// [scheduler]
/// concurrency = 8
/// rate = 20.0
/// stop_on_error = true
/// max_workers = 4
/// json = true
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    #[serde(default)]
    pub scheduler: SchedulerSection,
}

/// `[scheduler]` section. Every key is optional; CLI flags take precedence.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SchedulerSection {
    pub concurrency: Option<usize>,
    pub rate: Option<f64>,
    pub stop_on_error: Option<bool>,
    pub max_workers: Option<usize>,
    pub json: Option<bool>,
}
