// tests/retry_and_timeout.rs

mod common;
use crate::common::{
    PlanBuilder, ScriptedExecutor, Step, TaskBuilder, init_tracing, run_scripted, with_timeout,
};

use std::time::Duration;

use jobdag::engine::{EventKind, SchedulerOptions};
use jobdag::run_plan;
use jobdag::types::JobStatus;

#[tokio::test]
async fn flaky_with_too_few_retries_fails() {
    init_tracing();
    let jobs = PlanBuilder::new()
        .job("f", TaskBuilder::flaky(3).retries(1).backoff(0.0))
        .job_after("after", &["f"], TaskBuilder::noop())
        .build();

    let summary = run_plan(jobs, SchedulerOptions::default()).await.unwrap();

    let f = summary.job("f").unwrap();
    assert_eq!(f.status, JobStatus::Failed);
    assert_eq!(f.attempts, 2);
    assert_eq!(f.error.as_deref(), Some("flaky failing attempt 2 <= 3"));

    let after = summary.job("after").unwrap();
    assert_eq!(after.status, JobStatus::Skipped);
    assert_eq!(after.attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn backoff_doubles_between_attempts() {
    init_tracing();
    let jobs = PlanBuilder::new()
        .job("r", TaskBuilder::noop().retries(3).backoff(0.5))
        .build();
    let executor = ScriptedExecutor::new().script(
        "r",
        vec![
            Step::Fail("one".into()),
            Step::Fail("two".into()),
            Step::Fail("three".into()),
            Step::Succeed(serde_json::json!("done")),
        ],
    );

    let summary = run_scripted(jobs, SchedulerOptions::default(), executor.clone()).await;

    let r = summary.job("r").unwrap();
    assert_eq!(r.status, JobStatus::Succeeded);
    assert_eq!(r.attempts, 4);
    assert_eq!(r.result, serde_json::json!("done"));

    let backoffs: Vec<f64> = summary
        .events(EventKind::JobRetrying)
        .map(|rec| rec.get("backoff").and_then(|v| v.as_f64()).unwrap())
        .collect();
    assert_eq!(backoffs, vec![0.5, 1.0, 2.0]);

    // Paused clock: the run takes exactly the sum of the backoffs.
    let elapsed = r.ended_at.unwrap() - r.started_at.unwrap();
    assert!((elapsed - 3.5).abs() < 1e-3, "elapsed {elapsed}");
    assert_eq!(
        executor.calls(),
        vec![
            ("r".to_string(), 1),
            ("r".to_string(), 2),
            ("r".to_string(), 3),
            ("r".to_string(), 4)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn timeouts_are_retried() {
    init_tracing();
    let jobs = PlanBuilder::new()
        .job("t", TaskBuilder::noop().timeout(1.0).retries(1).backoff(0.0))
        .build();
    let executor = ScriptedExecutor::new().script(
        "t",
        vec![Step::Hang, Step::Sleep(Duration::from_millis(100))],
    );

    let summary = run_scripted(jobs, SchedulerOptions::default(), executor).await;

    let t = summary.job("t").unwrap();
    assert_eq!(t.status, JobStatus::Succeeded);
    assert_eq!(t.attempts, 2);
    assert!(t.error.is_none());

    let retry = summary.events(EventKind::JobRetrying).next().unwrap();
    assert_eq!(retry.status, Some(JobStatus::Timeout));
    assert_eq!(retry.get("error"), Some(&serde_json::json!("timeout")));
}

#[tokio::test(start_paused = true)]
async fn exhausted_timeouts_end_in_timeout() {
    init_tracing();
    let jobs = PlanBuilder::new()
        .job("t", TaskBuilder::noop().timeout(0.2).retries(2).backoff(0.0))
        .build();
    let executor = ScriptedExecutor::new().script("t", vec![Step::Hang]);

    let summary = run_scripted(jobs, SchedulerOptions::default(), executor).await;

    let t = summary.job("t").unwrap();
    assert_eq!(t.status, JobStatus::Timeout);
    assert_eq!(t.attempts, 3);
    assert_eq!(t.error.as_deref(), Some("timeout"));
}

#[tokio::test]
async fn oversized_sleep_hits_its_timeout() {
    init_tracing();
    let jobs = PlanBuilder::new()
        .job("s", TaskBuilder::sleep(1e20).timeout(0.05))
        .job("forever", TaskBuilder::noop().timeout(1e20))
        .build();

    let summary = with_timeout(run_plan(jobs, SchedulerOptions::default())).await.unwrap();

    let s = summary.job("s").unwrap();
    assert_eq!(s.status, JobStatus::Timeout);
    assert_eq!(s.error.as_deref(), Some("timeout"));

    assert_eq!(summary.job("forever").unwrap().status, JobStatus::Succeeded);
}
