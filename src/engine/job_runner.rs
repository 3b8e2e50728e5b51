// src/engine/job_runner.rs

//! The execution path of a single job.
//!
//! A job path waits for a concurrency slot and the rate limiter, runs
//! attempts under the task's deadline, backs off and retries per the retry
//! policy, and reports a [`JobOutcome`] back to the core loop. Every suspension
//! point also listens for the run's cancellation token. Under stop-on-error a
//! job that ends failed or timed out trips that token itself, so siblings stop
//! without waiting for the core loop to collect the outcome.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dag::{JobId, JobOutcome, TaskSpec};
use crate::engine::events::{EventKind, EventLog, LogRecord};
use crate::engine::limiter::RateLimiter;
use crate::engine::retry::RetryPolicy;
use crate::engine::tracker::ConcurrencyTracker;
use crate::engine::SchedulerOptions;
use crate::exec::{ExecutorBackend, TaskFailure};
use crate::types::JobStatus;

/// Resources shared by every job path of one run.
#[derive(Debug)]
pub struct RunContext<E> {
    pub executor: E,
    pub slots: Semaphore,
    pub limiter: RateLimiter,
    pub tracker: ConcurrencyTracker,
    pub events: EventLog,
    pub cancel: CancellationToken,
    pub stop_on_error: bool,
}

impl<E: ExecutorBackend> RunContext<E> {
    pub fn new(executor: E, options: &SchedulerOptions) -> Self {
        Self {
            executor,
            slots: Semaphore::new(options.concurrency),
            limiter: RateLimiter::new(options.rate_limit_per_sec),
            tracker: ConcurrencyTracker::new(),
            events: EventLog::new(),
            cancel: CancellationToken::new(),
            stop_on_error: options.stop_on_error,
        }
    }
}

/// Run one job to a terminal status.
pub async fn run_job<E: ExecutorBackend>(
    ctx: Arc<RunContext<E>>,
    id: JobId,
    task: TaskSpec,
) -> JobOutcome {
    let gate = async {
        let permit = ctx.slots.acquire().await;
        ctx.limiter.acquire().await;
        permit
    };

    let permit = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => None,
        permit = gate => permit.ok(),
    };

    let Some(_permit) = permit else {
        let at = ctx.events.elapsed();
        ctx.events.emit(
            LogRecord::new(EventKind::JobCancelled)
                .for_job(&id, JobStatus::Cancelled, 0)
                .with("reason", "scheduler_cancelled"),
        );
        debug!(job = %id, "cancelled before launch");
        return JobOutcome::cancelled_before_start(id, at);
    };

    let _running = ctx.tracker.enter();
    let started_at = ctx.events.elapsed();
    ctx.events
        .emit(LogRecord::new(EventKind::JobStarted).for_job(&id, JobStatus::Running, 0));
    info!(job = %id, kind = task.kind.type_name(), "job started");

    let policy = RetryPolicy::from_task(&task);
    let mut attempts = 0u32;

    let (status, error, result) = loop {
        attempts += 1;

        let attempt = run_attempt(&ctx.executor, &id, &task, attempts);
        let res = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(TaskFailure::Cancelled),
            res = attempt => res,
        };

        let failure = match res {
            Ok(value) => break (JobStatus::Succeeded, None, Some(value)),
            Err(TaskFailure::Cancelled) => {
                break (JobStatus::Cancelled, Some(TaskFailure::Cancelled.to_string()), None);
            }
            Err(failure) => failure,
        };

        let status = failure.status();
        if !policy.should_retry(status, attempts) {
            warn!(job = %id, attempts, error = %failure, "job failed");
            break (status, Some(failure.to_string()), None);
        }

        let delay = policy.delay_for(attempts);
        ctx.events.emit(
            LogRecord::new(EventKind::JobRetrying)
                .for_job(&id, status, attempts)
                .with("error", failure.to_string())
                .with("backoff", delay.as_secs_f64()),
        );
        debug!(job = %id, attempts, ?delay, error = %failure, "attempt failed; backing off");

        let backed_off = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        };
        if !backed_off {
            break (JobStatus::Cancelled, Some(TaskFailure::Cancelled.to_string()), None);
        }
    };

    let ended_at = ctx.events.elapsed();
    ctx.events
        .emit(LogRecord::new(EventKind::JobFinished).for_job(&id, status, attempts));
    info!(job = %id, %status, attempts, "job finished");

    if ctx.stop_on_error && status.is_failure() && !ctx.cancel.is_cancelled() {
        warn!(job = %id, %status, "stop-on-error: job path cancelling the run");
        ctx.cancel.cancel();
    }

    JobOutcome {
        id,
        status,
        attempts,
        error,
        started_at: Some(started_at),
        ended_at: Some(ended_at),
        result,
    }
}

/// One attempt, bounded by the task's timeout if it has one.
async fn run_attempt<E: ExecutorBackend>(
    executor: &E,
    id: &str,
    task: &TaskSpec,
    attempt: u32,
) -> Result<Value, TaskFailure> {
    let fut = executor.execute(id, task, attempt);
    match task.timeout {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(res) => res,
            Err(_elapsed) => Err(TaskFailure::Timeout),
        },
        None => fut.await,
    }
}
