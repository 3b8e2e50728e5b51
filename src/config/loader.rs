// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{Plan, RawPlanFile, SchedulerSection, SettingsFile};
use crate::engine::{DEFAULT_CONCURRENCY, SchedulerOptions};
use crate::errors::Result;

/// Read a JSON plan file without validating it.
pub fn load_raw_plan(path: impl AsRef<Path>) -> Result<RawPlanFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawPlanFile = serde_json::from_str(&contents)?;
    Ok(raw)
}

/// Load a JSON plan file and convert every entry into a typed job.
///
/// Unknown task types and malformed arguments are rejected here. Graph
/// problems (duplicate ids, dangling deps, cycles) are reported when the
/// scheduler is built from the plan.
pub fn load_plan(path: impl AsRef<Path>) -> Result<Plan> {
    let path = path.as_ref();
    let plan = Plan::try_from(load_raw_plan(path)?)?;
    debug!(path = %path.display(), jobs = plan.len(), "plan loaded");
    Ok(plan)
}

/// Load a TOML settings file. Unknown keys are an error.
pub fn load_settings(path: impl AsRef<Path>) -> Result<SettingsFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let settings: SettingsFile = toml::from_str(&contents)?;
    Ok(settings)
}

/// Fully resolved run settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub options: SchedulerOptions,
    pub json: bool,
}

/// Merge settings: `cli` wins over `file`, which wins over the defaults.
///
/// Concurrency is floored to 1 here so a careless `0` from either source
/// still produces a runnable configuration.
pub fn resolve_settings(cli: &SchedulerSection, file: Option<&SettingsFile>) -> RunSettings {
    let file = file.map(|f| &f.scheduler);
    let concurrency = cli.concurrency.or_else(|| file.and_then(|f| f.concurrency));
    let rate = cli.rate.or_else(|| file.and_then(|f| f.rate));
    let stop_on_error = cli
        .stop_on_error
        .or_else(|| file.and_then(|f| f.stop_on_error))
        .unwrap_or(false);
    let max_workers = cli.max_workers.or_else(|| file.and_then(|f| f.max_workers));
    let json = cli.json.or_else(|| file.and_then(|f| f.json)).unwrap_or(false);

    RunSettings {
        options: SchedulerOptions {
            concurrency: concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1),
            rate_limit_per_sec: rate,
            stop_on_error,
            max_workers,
        },
        json,
    }
}
