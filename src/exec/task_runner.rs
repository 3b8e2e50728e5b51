// src/exec/task_runner.rs

//! Runs a single attempt of a task by dispatching on its kind.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::dag::job::format_seconds;
use crate::dag::{TaskKind, TaskSpec};
use crate::exec::TaskFailure;
use crate::exec::cpu_pool::LazyCpuPool;

/// Execute one attempt of `task` for job `job_id`.
///
/// `attempt` counts from 1 and is what `flaky` tasks compare against their
/// `fail_until` threshold. Timeouts and cancellation are applied by the
/// caller around this future.
pub async fn run_task(
    job_id: &str,
    task: &TaskSpec,
    attempt: u32,
    cpu: &LazyCpuPool,
) -> Result<Value, TaskFailure> {
    debug!(job = %job_id, kind = task.kind.type_name(), attempt, "running task attempt");

    match &task.kind {
        TaskKind::Noop { value } => Ok(value.clone().unwrap_or_else(|| {
            let fallback = if task.name.is_empty() { job_id } else { task.name.as_str() };
            Value::String(fallback.to_string())
        })),

        TaskKind::Sleep { seconds } => {
            // Lengths past `Duration::MAX` just sleep until cancelled.
            let length = Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::MAX);
            tokio::time::sleep(length).await;
            Ok(Value::String(format!("slept:{}", format_seconds(*seconds))))
        }

        TaskKind::Fail { message } => Err(TaskFailure::Failed(message.clone())),

        TaskKind::Flaky { fail_until } => {
            if attempt <= *fail_until {
                Err(TaskFailure::Failed(format!(
                    "flaky failing attempt {attempt} <= {fail_until}"
                )))
            } else {
                Ok(Value::String(format!("flaky_ok_after_{attempt}")))
            }
        }

        TaskKind::Cpu { work } => {
            let pool = cpu
                .get()
                .map_err(|e| TaskFailure::Failed(e.to_string()))?;
            let sum = pool
                .run(*work)
                .await
                .map_err(|e| TaskFailure::Failed(e.to_string()))?;
            Ok(Value::from(sum))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pool() -> LazyCpuPool {
        LazyCpuPool::new(1)
    }

    #[tokio::test]
    async fn noop_prefers_value_then_name_then_id() {
        let cpu = pool();
        let with_value = TaskSpec::new(TaskKind::Noop { value: Some(json!(7)) });
        assert_eq!(run_task("j", &with_value, 1, &cpu).await, Ok(json!(7)));

        let named = TaskSpec::noop().with_name("hello");
        assert_eq!(run_task("j", &named, 1, &cpu).await, Ok(json!("hello")));

        assert_eq!(run_task("j", &TaskSpec::noop(), 1, &cpu).await, Ok(json!("j")));
        assert!(!cpu.is_started());
    }

    #[tokio::test]
    async fn sleep_reports_seconds() {
        let task = TaskSpec::new(TaskKind::Sleep { seconds: 0.01 });
        assert_eq!(run_task("s", &task, 1, &pool()).await, Ok(json!("slept:0.01")));
        let whole = TaskSpec::new(TaskKind::Sleep { seconds: 0.0 });
        assert_eq!(run_task("s", &whole, 1, &pool()).await, Ok(json!("slept:0.0")));
    }

    #[tokio::test]
    async fn oversized_sleep_waits_instead_of_panicking() {
        let cpu = pool();
        let task = TaskSpec::new(TaskKind::Sleep { seconds: 1e20 });
        let attempt = tokio::time::timeout(Duration::from_millis(20), run_task("s", &task, 1, &cpu));
        assert!(attempt.await.is_err());
    }

    #[tokio::test]
    async fn fail_and_flaky() {
        let cpu = pool();
        let fail = TaskSpec::new(TaskKind::Fail { message: "boom".into() });
        assert_eq!(
            run_task("f", &fail, 1, &cpu).await,
            Err(TaskFailure::Failed("boom".into()))
        );

        let flaky = TaskSpec::new(TaskKind::Flaky { fail_until: 2 });
        assert!(run_task("f", &flaky, 1, &cpu).await.is_err());
        assert!(run_task("f", &flaky, 2, &cpu).await.is_err());
        assert_eq!(
            run_task("f", &flaky, 3, &cpu).await,
            Ok(json!("flaky_ok_after_3"))
        );
    }

    #[tokio::test]
    async fn cpu_uses_the_lazy_pool() {
        let cpu = pool();
        let task = TaskSpec::new(TaskKind::Cpu { work: 10 });
        assert_eq!(run_task("c", &task, 1, &cpu).await, Ok(json!(45)));
        assert!(cpu.is_started());

        cpu.shutdown();
        assert!(matches!(
            run_task("c", &task, 1, &cpu).await,
            Err(TaskFailure::Failed(_))
        ));
    }
}
