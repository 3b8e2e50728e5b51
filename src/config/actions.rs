// src/config/actions.rs

//! Inline action mini-language used by `--actions`.
//!
//! Each token becomes one dependency-free job named `job_<n>`:
//!
//! | token | job |
//! |---|---|
//! | `sleep:<seconds>` | sleep |
//! | `cpu:<work>` | CPU work on the pool |
//! | `noop`, `noop:<value>` | returns the value (or the job id) |
//! | `fail` | always fails |
//! | `flaky:fail_until=<n>` | fails `n` times, retried `n` times |
//! | `task:k=v;k=v` | noop carrying metadata; `name` and `timeout` are honoured |
//!
//! Anything else is a noop whose value is the token itself.

use serde_json::{Map, Number, Value};

use crate::config::validate::{DEFAULT_FAIL_MESSAGE, DEFAULT_FAIL_UNTIL};
use crate::dag::job::format_seconds;
use crate::dag::{JobSpec, TaskKind, TaskSpec};
use crate::errors::{JobdagError, Result};

/// Parse every token into a job. An empty list is a usage error.
pub fn parse_actions(actions: &[String]) -> Result<Vec<JobSpec>> {
    if actions.is_empty() {
        return Err(JobdagError::NoActions);
    }

    actions
        .iter()
        .enumerate()
        .map(|(i, token)| {
            let id = format!("job_{}", i + 1);
            let task = parse_action(&id, token)?;
            Ok(JobSpec::new(id, task))
        })
        .collect()
}

/// Parse one token for job `id`.
pub fn parse_action(id: &str, token: &str) -> Result<TaskSpec> {
    let token = token.trim().trim_matches('"');
    let bad = || JobdagError::InvalidAction(token.to_string());

    if let Some(arg) = token.strip_prefix("sleep:") {
        let seconds: f64 = arg.trim().parse().map_err(|_| bad())?;
        if !(seconds >= 0.0 && seconds.is_finite()) {
            return Err(bad());
        }
        return Ok(TaskSpec::new(TaskKind::Sleep { seconds })
            .with_name(format!("sleep_{}", format_seconds(seconds)))
            .with_arg("seconds", seconds));
    }

    if let Some(arg) = token.strip_prefix("cpu:") {
        let work: u64 = arg.trim().parse().map_err(|_| bad())?;
        return Ok(TaskSpec::new(TaskKind::Cpu { work })
            .with_name(format!("cpu_{work}"))
            .with_arg("work", work));
    }

    if token == "noop" || token.starts_with("noop:") {
        let value = token
            .split_once(':')
            .map_or_else(|| id.to_string(), |(_, v)| v.to_string());
        return Ok(noop_with_value(Value::String(value)));
    }

    if token == "fail" {
        return Ok(TaskSpec::new(TaskKind::Fail {
            message: DEFAULT_FAIL_MESSAGE.to_string(),
        })
        .with_name("fail"));
    }

    if token.starts_with("flaky:") {
        let threshold = token
            .split_once(':')
            .and_then(|(_, kv)| kv.trim().strip_prefix("fail_until="));
        let fail_until = match threshold {
            Some(n) => n.trim().parse::<u32>().map_err(|_| bad())?,
            None => DEFAULT_FAIL_UNTIL,
        };
        return Ok(TaskSpec::new(TaskKind::Flaky { fail_until })
            .with_name("flaky")
            .with_arg("fail_until", fail_until)
            .with_max_retries(fail_until));
    }

    if let Some(pairs) = token.strip_prefix("task:") {
        return parse_task_token(id, pairs).ok_or_else(bad);
    }

    Ok(noop_with_value(Value::String(token.to_string())))
}

fn noop_with_value(value: Value) -> TaskSpec {
    TaskSpec::new(TaskKind::Noop {
        value: Some(value.clone()),
    })
    .with_name("noop")
    .with_arg("value", value)
}

/// `k=v;k=v;flag`. Returns `None` when `timeout` is not numeric.
fn parse_task_token(id: &str, pairs: &str) -> Option<TaskSpec> {
    let mut meta = Map::new();
    for pair in pairs.split(';').filter(|p| !p.is_empty()) {
        match pair.split_once('=') {
            Some((k, v)) => meta.insert(k.to_string(), coerce(v)),
            None => meta.insert(pair.to_string(), Value::Bool(true)),
        };
    }

    let timeout = match meta.get("timeout") {
        None => 0.0,
        Some(Value::Number(n)) => n.as_f64()?,
        Some(_) => return None,
    };

    let value = meta
        .get("name")
        .cloned()
        .unwrap_or_else(|| Value::String(id.to_string()));
    let name = match &value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let mut task = TaskSpec::new(TaskKind::Noop { value: Some(value) })
        .with_name(name)
        .with_timeout_secs(timeout);
    task.args = meta;
    Some(task)
}

/// Contains `.` → float, else integer, else the raw string.
fn coerce(raw: &str) -> Value {
    let number = if raw.contains('.') {
        raw.parse::<f64>().ok().and_then(Number::from_f64)
    } else {
        raw.parse::<i64>().ok().map(Number::from)
    };
    number.map_or_else(|| Value::String(raw.to_string()), Value::Number)
}
