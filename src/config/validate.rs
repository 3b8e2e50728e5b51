// src/config/validate.rs

//! Turn raw plan entries into typed job specs.
//!
//! Only per-entry checks live here (task type, argument types, numeric
//! ranges). Graph checks run in `dag::graph` when the scheduler is built.

use serde_json::{Map, Value};

use crate::config::model::{Plan, RawJob, RawPlanFile, RawTask};
use crate::dag::job::{timeout_from_secs, JobId, JobSpec, TaskKind, TaskSpec};
use crate::errors::{JobdagError, Result};

pub const DEFAULT_CPU_WORK: u64 = 100_000;
pub const DEFAULT_FAIL_UNTIL: u32 = 1;
pub const DEFAULT_FAIL_MESSAGE: &str = "intentional failure";

impl TryFrom<RawPlanFile> for Plan {
    type Error = JobdagError;

    fn try_from(raw: RawPlanFile) -> std::result::Result<Self, Self::Error> {
        let jobs = raw
            .jobs
            .into_iter()
            .enumerate()
            .map(|(i, job)| job_from_raw(i + 1, job))
            .collect::<Result<Vec<_>>>()?;
        Ok(Plan::new(jobs))
    }
}

/// Convert the `position`-th (1-based) plan entry.
pub fn job_from_raw(position: usize, raw: RawJob) -> Result<JobSpec> {
    let id = match &raw.id {
        Some(value) => id_from_value(value).ok_or_else(|| JobdagError::InvalidTask {
            job: format!("job_{position}"),
            reason: format!("id must be a string or a number, got {value}"),
        })?,
        None => format!("job_{position}"),
    };

    let deps = raw
        .deps
        .iter()
        .map(|dep| {
            id_from_value(dep).ok_or_else(|| JobdagError::InvalidTask {
                job: id.clone(),
                reason: format!("dependency must be a string or a number, got {dep}"),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let task = task_from_raw(&id, raw.task)?;
    Ok(JobSpec { id, task, deps })
}

fn id_from_value(value: &Value) -> Option<JobId> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Resolve a raw task into a [`TaskSpec`], rejecting unknown kinds and
/// malformed arguments up front.
pub fn task_from_raw(job: &str, raw: RawTask) -> Result<TaskSpec> {
    let kind = parse_kind(job, &raw.kind, &raw.args)?;

    if !(raw.backoff_base >= 0.0 && raw.backoff_base.is_finite()) {
        return Err(invalid(job, format!("backoff_base must be >= 0, got {}", raw.backoff_base)));
    }

    Ok(TaskSpec {
        kind,
        name: raw.name.unwrap_or_else(|| job.to_string()),
        args: raw.args,
        timeout: raw.timeout.and_then(timeout_from_secs),
        max_retries: raw.max_retries,
        backoff_base: raw.backoff_base,
    })
}

/// Map a plan `type` plus its `args` onto a [`TaskKind`].
pub fn parse_kind(job: &str, kind: &str, args: &Map<String, Value>) -> Result<TaskKind> {
    match kind {
        "noop" => Ok(TaskKind::Noop {
            value: args.get("value").cloned(),
        }),
        "sleep" => {
            let seconds = match args.get("seconds").or_else(|| args.get("s")) {
                Some(v) => non_negative_f64(job, "seconds", v)?,
                None => 0.0,
            };
            Ok(TaskKind::Sleep { seconds })
        }
        "cpu" => {
            let work = match args.get("work") {
                Some(v) => non_negative_u64(job, "work", v)?,
                None => DEFAULT_CPU_WORK,
            };
            Ok(TaskKind::Cpu { work })
        }
        "fail" => {
            let message = match args.get("message") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => DEFAULT_FAIL_MESSAGE.to_string(),
            };
            Ok(TaskKind::Fail { message })
        }
        "flaky" => {
            let fail_until = match args.get("fail_until") {
                Some(v) => {
                    let n = non_negative_u64(job, "fail_until", v)?;
                    u32::try_from(n)
                        .map_err(|_| invalid(job, format!("fail_until is too large: {n}")))?
                }
                None => DEFAULT_FAIL_UNTIL,
            };
            Ok(TaskKind::Flaky { fail_until })
        }
        other => Err(JobdagError::UnknownTaskKind {
            job: job.to_string(),
            kind: other.to_string(),
        }),
    }
}

fn invalid(job: &str, reason: String) -> JobdagError {
    JobdagError::InvalidTask {
        job: job.to_string(),
        reason,
    }
}

/// Numbers and numeric strings are accepted.
fn non_negative_f64(job: &str, key: &str, value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(x) if x >= 0.0 && x.is_finite() => Ok(x),
        _ => Err(invalid(job, format!("{key} must be a non-negative number, got {value}"))),
    }
}

fn non_negative_u64(job: &str, key: &str, value: &Value) -> Result<u64> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|x| *x >= 0.0 && x.fract() == 0.0 && *x <= u64::MAX as f64)
                .map(|x| x as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| invalid(job, format!("{key} must be a non-negative integer, got {value}")))
}
