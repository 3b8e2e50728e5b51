// tests/common/mod.rs

#![allow(dead_code, unused_imports)]

pub use jobdag_test_utils::{
    PlanBuilder, ScriptedExecutor, Step, TaskBuilder, init_tracing, with_timeout,
};

use jobdag::dag::{JobSpec, Scheduler};
use jobdag::engine::{Runtime, SchedulerOptions, Summary};

/// Run `jobs` on the scripted executor and return the summary.
pub async fn run_scripted(
    jobs: Vec<JobSpec>,
    options: SchedulerOptions,
    executor: ScriptedExecutor,
) -> Summary {
    let scheduler = Scheduler::new(jobs).expect("valid plan");
    Runtime::new(scheduler, options, executor)
        .expect("valid options")
        .run()
        .await
}

/// Start times (`job_started` timestamps) in log order.
pub fn start_times(summary: &Summary) -> Vec<f64> {
    summary
        .events(jobdag::engine::EventKind::JobStarted)
        .map(|r| r.ts)
        .collect()
}
