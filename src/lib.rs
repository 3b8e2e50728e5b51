// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::io::{self, Write};

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_plan, load_settings, parse_actions, resolve_settings};
use crate::dag::{JobSpec, Scheduler};
use crate::engine::{Runtime, SchedulerOptions, Summary};
use crate::errors::{JobdagError, Result};
use crate::exec::BuiltinExecutor;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings resolution (CLI > settings file > defaults)
/// - plan loading or `--actions` parsing
/// - scheduler construction (graph validation)
/// - the runtime with the built-in executor
/// - summary output on stdout
pub async fn run(args: CliArgs) -> Result<()> {
    let file = args.config.as_ref().map(load_settings).transpose()?;
    let settings = resolve_settings(&args.overrides(), file.as_ref());
    debug!(?settings, "resolved settings");

    let jobs = match (&args.plan, &args.actions) {
        (Some(path), _) => load_plan(path)?.into_jobs(),
        (None, Some(actions)) => parse_actions(actions)?,
        (None, None) => return Err(JobdagError::NoActions),
    };

    let scheduler = Scheduler::new(jobs)?;

    if args.dry_run {
        write_dry_run(&mut io::stdout().lock(), &scheduler, &settings.options)?;
        return Ok(());
    }

    let summary = run_scheduler(scheduler, settings.options).await?;

    let mut out = io::stdout().lock();
    if settings.json {
        writeln!(out, "{}", summary.to_json()?)?;
    } else {
        writeln!(out, "{}", summary.text_line())?;
    }
    out.flush()?;
    Ok(())
}

/// Build a scheduler from `jobs` and run it with the built-in executor.
///
/// Construction errors (duplicate ids, unknown deps, cycles, invalid options)
/// are returned before any job runs. Job failures are reported in the
/// summary, never as an `Err`.
pub async fn run_plan(jobs: Vec<JobSpec>, options: SchedulerOptions) -> Result<Summary> {
    run_scheduler(Scheduler::new(jobs)?, options).await
}

async fn run_scheduler(scheduler: Scheduler, options: SchedulerOptions) -> Result<Summary> {
    let executor = BuiltinExecutor::new(options.max_workers);
    let runtime = Runtime::new(scheduler, options, executor)?;
    let summary = runtime.run().await;
    info!(ok = summary.all_succeeded(), "run complete");
    Ok(summary)
}

/// Dry-run output: options, then each job with its kind and deps in
/// dependency order.
pub fn write_dry_run(
    out: &mut impl Write,
    scheduler: &Scheduler,
    options: &SchedulerOptions,
) -> io::Result<()> {
    writeln!(out, "jobdag dry-run")?;
    writeln!(out, "  concurrency = {}", options.concurrency)?;
    match options.rate_limit_per_sec {
        Some(rate) => writeln!(out, "  rate = {rate}")?,
        None => writeln!(out, "  rate = unlimited")?,
    }
    writeln!(out, "  stop_on_error = {}", options.stop_on_error)?;
    writeln!(out)?;

    writeln!(out, "jobs ({}):", scheduler.len())?;
    let graph = scheduler.graph();
    for pos in graph.topological_order() {
        let job = &scheduler.jobs()[pos];
        writeln!(out, "  - {}", job.id)?;
        writeln!(out, "      type: {}", job.task.kind.type_name())?;
        if job.task.name != job.id {
            writeln!(out, "      name: {}", job.task.name)?;
        }
        if !job.deps.is_empty() {
            writeln!(out, "      deps: {:?}", job.deps)?;
        }
        if let Some(timeout) = job.task.timeout {
            writeln!(out, "      timeout: {}s", timeout.as_secs_f64())?;
        }
        if job.task.max_retries > 0 {
            writeln!(
                out,
                "      max_retries: {} (backoff_base {}s)",
                job.task.max_retries, job.task.backoff_base
            )?;
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
