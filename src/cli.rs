// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, ValueEnum};

use crate::config::SchedulerSection;

/// Command-line arguments for `jobdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobdag",
    version,
    about = "Run a DAG of jobs with a concurrency cap, rate limit, timeouts and retries.",
    long_about = None
)]
#[command(group(ArgGroup::new("input").required(true).args(["plan", "actions"])))]
pub struct CliArgs {
    /// Path to a JSON plan file.
    #[arg(long, value_name = "PATH")]
    pub plan: Option<PathBuf>,

    /// Inline action tokens, e.g. `sleep:0.1 noop:hello flaky:fail_until=2`.
    #[arg(long, value_name = "TOKEN", num_args = 0..)]
    pub actions: Option<Vec<String>>,

    /// Maximum number of jobs running at once (default 4, floored to 1).
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub concurrency: Option<i64>,

    /// Maximum job launches per second.
    #[arg(long, value_name = "PER_SEC")]
    pub rate: Option<f64>,

    /// Cancel remaining jobs after the first failure or timeout.
    #[arg(long)]
    pub stop_on_error: bool,

    /// Print the JSON summary instead of the one-line text summary.
    #[arg(long)]
    pub json: bool,

    /// Optional TOML settings file (`[scheduler]` section).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Upper bound for the CPU worker pool (default: core count, max 16).
    #[arg(long, value_name = "N")]
    pub max_workers: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JOBDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate and print the plan, but don't run any job.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Settings given on the command line; unset flags stay `None` so the
    /// settings file can fill them in.
    pub fn overrides(&self) -> SchedulerSection {
        SchedulerSection {
            concurrency: self.concurrency.map(|c| usize::try_from(c.max(1)).unwrap_or(1)),
            rate: self.rate,
            stop_on_error: self.stop_on_error.then_some(true),
            max_workers: self.max_workers,
            json: self.json.then_some(true),
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_and_actions_are_exclusive() {
        assert!(CliArgs::try_parse_from(["jobdag", "--plan", "p.json", "--actions", "noop"]).is_err());
        assert!(CliArgs::try_parse_from(["jobdag", "--json"]).is_err());
    }

    #[test]
    fn actions_stop_at_the_next_flag() {
        let args =
            CliArgs::try_parse_from(["jobdag", "--actions", "noop", "sleep:0.1", "--json"]).unwrap();
        assert_eq!(args.actions.as_deref(), Some(&["noop".to_string(), "sleep:0.1".to_string()][..]));
        assert!(args.json);
    }

    #[test]
    fn concurrency_is_floored_to_one() {
        let args =
            CliArgs::try_parse_from(["jobdag", "--concurrency", "-3", "--actions", "noop"]).unwrap();
        assert_eq!(args.overrides().concurrency, Some(1));
        assert_eq!(args.overrides().stop_on_error, None);
    }
}
