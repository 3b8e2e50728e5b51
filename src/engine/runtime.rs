// src/engine/runtime.rs

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use tokio::task::{Id, JoinSet};
use tracing::{debug, error, info, warn};

use crate::dag::{JobId, JobOutcome, Scheduler, SchedulerStep};
use crate::engine::events::{EventKind, LogRecord};
use crate::engine::job_runner::{RunContext, run_job};
use crate::engine::summary::Summary;
use crate::engine::SchedulerOptions;
use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::types::JobStatus;

/// Drives the pure [`Scheduler`] state machine, launching job paths as jobs
/// become ready and feeding their outcomes back in.
///
/// This is the async shell around the scheduler: the scheduler decides what
/// is ready or skipped, the runtime decides when to launch, and handles
/// stop-on-error cancellation and teardown.
pub struct Runtime<E: ExecutorBackend + 'static> {
    scheduler: Scheduler,
    options: SchedulerOptions,
    executor: E,
}

impl<E: ExecutorBackend + 'static> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Calls [`ExecutorBackend::shutdown`] exactly once, even if the run future
/// is dropped part-way.
struct ShutdownGuard<E: ExecutorBackend> {
    ctx: Option<Arc<RunContext<E>>>,
}

impl<E: ExecutorBackend> ShutdownGuard<E> {
    fn release(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            ctx.cancel.cancel();
            ctx.executor.shutdown();
            debug!("executor resources released");
        }
    }
}

impl<E: ExecutorBackend> Drop for ShutdownGuard<E> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<E: ExecutorBackend + 'static> Runtime<E> {
    pub fn new(scheduler: Scheduler, options: SchedulerOptions, executor: E) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            scheduler,
            options,
            executor,
        })
    }

    /// Run every job to a terminal status and return the summary.
    ///
    /// Job-level failures never abort the loop; they surface in the summary.
    pub async fn run(self) -> Summary {
        let Runtime {
            mut scheduler,
            options,
            executor,
        } = self;

        let ctx = Arc::new(RunContext::new(executor, &options));
        let mut guard = ShutdownGuard {
            ctx: Some(Arc::clone(&ctx)),
        };

        ctx.events.emit(
            LogRecord::new(EventKind::SchedulerStarted)
                .with("jobs", scheduler.len())
                .with("concurrency", options.concurrency),
        );
        info!(
            jobs = scheduler.len(),
            concurrency = options.concurrency,
            rate = ?options.rate_limit_per_sec,
            stop_on_error = options.stop_on_error,
            "scheduler started"
        );

        let mut ready: VecDeque<JobId> = scheduler.initial_ready().into();
        let mut in_flight: JoinSet<JobOutcome> = JoinSet::new();
        let mut launched: HashMap<Id, JobId> = HashMap::new();
        let mut cancelling = false;

        loop {
            while !cancelling
                && !ctx.cancel.is_cancelled()
                && in_flight.len() < options.concurrency
            {
                let Some(id) = ready.pop_front() else {
                    break;
                };
                let Some(task) = scheduler
                    .job(&id)
                    .filter(|job| job.status == JobStatus::Pending)
                    .map(|job| job.task.clone())
                else {
                    continue;
                };

                scheduler.mark_running(&id);
                debug!(job = %id, "launching job");
                let handle = in_flight.spawn(run_job(Arc::clone(&ctx), id.clone(), task));
                launched.insert(handle.id(), id);
            }

            let Some(joined) = in_flight.join_next_with_id().await else {
                break;
            };

            let outcome = match joined {
                Ok((task_id, outcome)) => {
                    launched.remove(&task_id);
                    outcome
                }
                Err(err) => {
                    let Some(id) = launched.remove(&err.id()) else {
                        error!(error = %err, "job path for unknown job ended abnormally");
                        continue;
                    };
                    error!(job = %id, error = %err, "job path ended abnormally");
                    let at = ctx.events.elapsed();
                    ctx.events.emit(
                        LogRecord::new(EventKind::JobFinished).for_job(&id, JobStatus::Failed, 0),
                    );
                    JobOutcome {
                        id,
                        status: JobStatus::Failed,
                        attempts: 0,
                        error: Some(err.to_string()),
                        started_at: Some(at),
                        ended_at: Some(at),
                        result: None,
                    }
                }
            };

            let failed_job = outcome.status.is_failure().then(|| outcome.id.clone());
            let step = scheduler.handle_completion(outcome);
            log_skips(&ctx, &step);
            ready.extend(step.newly_ready);

            if let Some(failed_job) = failed_job {
                if options.stop_on_error && !cancelling {
                    cancelling = true;
                    ctx.events.emit(
                        LogRecord::new(EventKind::SchedulerCancelling)
                            .with("reason", "stop_on_error")
                            .with("failed_job", failed_job.clone()),
                    );
                    warn!(
                        job = %failed_job,
                        in_flight = in_flight.len(),
                        "stop-on-error: cancelling remaining work"
                    );
                    ctx.cancel.cancel();
                }
            }
        }

        if cancelling {
            let at = ctx.events.elapsed();
            for id in scheduler.cancel_pending(at) {
                ctx.events.emit(
                    LogRecord::new(EventKind::JobCancelled)
                        .for_job(&id, JobStatus::Cancelled, 0)
                        .with("reason", "stop_on_error"),
                );
                debug!(job = %id, "pending job cancelled");
            }
        }

        if !scheduler.all_terminal() {
            warn!("scheduler loop ended with non-terminal jobs");
        }

        guard.release();

        ctx.events.emit(LogRecord::new(EventKind::SchedulerFinished));
        let summary = Summary {
            peak_concurrency: ctx.tracker.peak(),
            jobs: scheduler.jobs().iter().collect(),
            logs: ctx.events.snapshot(),
        };
        info!(
            peak_concurrency = summary.peak_concurrency,
            succeeded = summary.count(JobStatus::Succeeded),
            failed = summary.count(JobStatus::Failed),
            timeout = summary.count(JobStatus::Timeout),
            skipped = summary.count(JobStatus::Skipped),
            cancelled = summary.count(JobStatus::Cancelled),
            "scheduler finished"
        );
        summary
    }
}

fn log_skips<E: ExecutorBackend>(ctx: &RunContext<E>, step: &SchedulerStep) {
    for id in &step.newly_skipped {
        ctx.events.emit(
            LogRecord::new(EventKind::JobSkipped)
                .for_job(id, JobStatus::Skipped, 0)
                .with("reason", "dependency_failed"),
        );
        warn!(job = %id, "skipped: a dependency did not succeed");
    }
}
