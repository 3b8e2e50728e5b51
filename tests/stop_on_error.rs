// tests/stop_on_error.rs

mod common;
use crate::common::{PlanBuilder, ScriptedExecutor, Step, TaskBuilder, init_tracing, run_scripted};

use std::sync::Arc;
use std::time::Duration;

use jobdag::engine::job_runner::{RunContext, run_job};
use jobdag::engine::{EventKind, SchedulerOptions};
use jobdag::types::JobStatus;

fn reason_of(summary: &jobdag::engine::Summary, kind: EventKind, job: &str) -> Option<String> {
    summary
        .events(kind)
        .find(|r| r.job.as_deref() == Some(job))
        .and_then(|r| r.get("reason"))
        .and_then(|v| v.as_str().map(str::to_string))
}

#[tokio::test(start_paused = true)]
async fn failure_cancels_running_waiting_and_pending_jobs() {
    init_tracing();
    // concurrency 2: "bad" and "slow" run, "queued" waits for a slot,
    // "child" waits on "slow".
    let jobs = PlanBuilder::new()
        .job("bad", TaskBuilder::noop())
        .job("slow", TaskBuilder::noop())
        .job("queued", TaskBuilder::noop())
        .job_after("child", &["slow"], TaskBuilder::noop())
        .build();
    let executor = ScriptedExecutor::new()
        .script("bad", vec![Step::FailAfter(Duration::from_millis(10), "broken".into())])
        .script("slow", vec![Step::Sleep(Duration::from_secs(60))])
        .script("queued", vec![Step::Sleep(Duration::from_secs(60))]);

    let options = SchedulerOptions::default()
        .with_concurrency(2)
        .with_stop_on_error(true);
    let summary = run_scripted(jobs, options, executor.clone()).await;

    assert_eq!(summary.job("bad").unwrap().status, JobStatus::Failed);
    assert_eq!(summary.job("bad").unwrap().error.as_deref(), Some("broken"));

    let slow = summary.job("slow").unwrap();
    assert_eq!(slow.status, JobStatus::Cancelled);
    assert_eq!(slow.attempts, 1);

    // "queued" never reached running.
    let queued = summary.job("queued").unwrap();
    assert_eq!(queued.status, JobStatus::Cancelled);
    assert_eq!(queued.attempts, 0);
    assert!(!executor.started_jobs().contains(&"queued".to_string()));

    // "child" depends on a cancelled job: skipped, never cancelled.
    let child = summary.job("child").unwrap();
    assert_eq!(child.status, JobStatus::Skipped);
    assert_eq!(reason_of(&summary, EventKind::JobSkipped, "child").as_deref(), Some("dependency_failed"));

    let cancelling: Vec<_> = summary.events(EventKind::SchedulerCancelling).collect();
    assert_eq!(cancelling.len(), 1);
    assert_eq!(cancelling[0].get("failed_job"), Some(&serde_json::json!("bad")));
    assert!(summary.peak_concurrency <= 2);
}

#[tokio::test(start_paused = true)]
async fn pending_jobs_are_force_cancelled() {
    init_tracing();
    // Single slot: "gate" is still queued and "later" still waits on it when
    // "bad" fails. Neither may run; both end cancelled.
    let jobs = PlanBuilder::new()
        .job("bad", TaskBuilder::noop())
        .job("gate", TaskBuilder::noop())
        .job_after("later", &["gate"], TaskBuilder::noop())
        .build();
    let executor = ScriptedExecutor::new().script("bad", vec![Step::Fail("broken".into())]);

    let options = SchedulerOptions::default()
        .with_concurrency(1)
        .with_stop_on_error(true);
    let summary = run_scripted(jobs, options, executor.clone()).await;

    assert_eq!(summary.job("bad").unwrap().status, JobStatus::Failed);
    for id in ["gate", "later"] {
        let job = summary.job(id).unwrap();
        assert_eq!(job.status, JobStatus::Cancelled, "{id}");
        assert_eq!(job.attempts, 0);
        assert_eq!(job.started_at, job.ended_at);
        assert_eq!(
            reason_of(&summary, EventKind::JobCancelled, id).as_deref(),
            Some("stop_on_error")
        );
    }
    assert_eq!(executor.started_jobs(), vec!["bad".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn jobs_waiting_on_the_rate_limiter_are_cancelled() {
    init_tracing();
    // One launch per second: "second" waits in the limiter when "first" fails.
    let jobs = PlanBuilder::new()
        .job("first", TaskBuilder::noop())
        .job("second", TaskBuilder::noop())
        .build();
    let executor = ScriptedExecutor::new().script(
        "first",
        vec![Step::FailAfter(Duration::from_millis(100), "broken".into())],
    );

    let options = SchedulerOptions::default()
        .with_rate_limit(1.0)
        .with_stop_on_error(true);
    let summary = run_scripted(jobs, options, executor.clone()).await;

    let second = summary.job("second").unwrap();
    assert_eq!(second.status, JobStatus::Cancelled);
    assert_eq!(second.attempts, 0);
    assert_eq!(
        reason_of(&summary, EventKind::JobCancelled, "second").as_deref(),
        Some("scheduler_cancelled")
    );
    assert_eq!(executor.started_jobs(), vec!["first".to_string()]);
    assert!(summary.job("first").unwrap().ended_at.unwrap() < 1.0);
}

#[tokio::test(start_paused = true)]
async fn without_stop_on_error_independent_jobs_continue() {
    init_tracing();
    let jobs = PlanBuilder::new()
        .job("bad", TaskBuilder::noop())
        .job("fine", TaskBuilder::noop())
        .job_after("dependent", &["bad"], TaskBuilder::noop())
        .build();
    let executor = ScriptedExecutor::new()
        .script("bad", vec![Step::Fail("broken".into())])
        .script("fine", vec![Step::Sleep(Duration::from_secs(1))]);

    let summary = run_scripted(jobs, SchedulerOptions::default(), executor).await;

    assert_eq!(summary.job("bad").unwrap().status, JobStatus::Failed);
    assert_eq!(summary.job("fine").unwrap().status, JobStatus::Succeeded);
    assert_eq!(summary.job("dependent").unwrap().status, JobStatus::Skipped);
    assert_eq!(summary.events(EventKind::SchedulerCancelling).count(), 0);
}

#[tokio::test(start_paused = true)]
async fn retries_do_not_trigger_stop_on_error() {
    init_tracing();
    let jobs = PlanBuilder::new()
        .job("wobbly", TaskBuilder::noop().retries(1).backoff(0.0))
        .job("other", TaskBuilder::noop())
        .build();
    let executor = ScriptedExecutor::new()
        .script("wobbly", vec![Step::Fail("once".into()), Step::Succeed(serde_json::json!(1))])
        .script("other", vec![Step::Sleep(Duration::from_millis(50))]);

    let options = SchedulerOptions::default().with_stop_on_error(true);
    let summary = run_scripted(jobs, options, executor).await;

    assert!(summary.all_succeeded());
    assert_eq!(summary.job("wobbly").unwrap().attempts, 2);
}

#[tokio::test(start_paused = true)]
async fn timeout_cancels_running_siblings() {
    init_tracing();
    let jobs = PlanBuilder::new()
        .job("stuck", TaskBuilder::noop().timeout(0.05))
        .job("sleeper", TaskBuilder::noop())
        .job_after("child", &["sleeper"], TaskBuilder::noop())
        .build();
    let executor = ScriptedExecutor::new()
        .script("stuck", vec![Step::Hang])
        .script("sleeper", vec![Step::Sleep(Duration::from_secs(60))]);

    let options = SchedulerOptions::default().with_stop_on_error(true);
    let summary = run_scripted(jobs, options, executor).await;

    let stuck = summary.job("stuck").unwrap();
    assert_eq!(stuck.status, JobStatus::Timeout);
    assert_eq!(stuck.error.as_deref(), Some("timeout"));

    let sleeper = summary.job("sleeper").unwrap();
    assert_eq!(sleeper.status, JobStatus::Cancelled);
    assert_eq!(sleeper.error.as_deref(), Some("cancelled"));
    assert!(sleeper.ended_at.unwrap() < 1.0);
    assert_eq!(summary.job("child").unwrap().status, JobStatus::Skipped);

    let cancelling: Vec<_> = summary.events(EventKind::SchedulerCancelling).collect();
    assert_eq!(cancelling.len(), 1);
    assert_eq!(cancelling[0].get("failed_job"), Some(&serde_json::json!("stuck")));
}

#[tokio::test(start_paused = true)]
async fn final_failure_trips_the_cancel_token_from_the_job_path() {
    init_tracing();
    let executor = ScriptedExecutor::new().script("stuck", vec![Step::Hang]);
    let options = SchedulerOptions::default().with_stop_on_error(true);
    let ctx = Arc::new(RunContext::new(executor, &options));

    let task = TaskBuilder::noop().timeout(0.05).build();
    let outcome = run_job(Arc::clone(&ctx), "stuck".to_string(), task).await;

    assert_eq!(outcome.status, JobStatus::Timeout);
    assert!(ctx.cancel.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn job_path_leaves_the_token_alone_without_stop_on_error() {
    init_tracing();
    let executor = ScriptedExecutor::new().script("bad", vec![Step::Fail("broken".into())]);
    let ctx = Arc::new(RunContext::new(executor, &SchedulerOptions::default()));

    let outcome = run_job(Arc::clone(&ctx), "bad".to_string(), TaskBuilder::noop().build()).await;

    assert_eq!(outcome.status, JobStatus::Failed);
    assert!(!ctx.cancel.is_cancelled());
}
