use tracing::{debug, warn};

use crate::dag::graph::JobGraph;
use crate::dag::job::{Job, JobId, JobOutcome, JobSpec};
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::StateManager;
use crate::errors::Result;
use crate::types::JobStatus;

/// Scheduler holds the immutable job graph plus the mutable job records.
///
/// It is a pure, synchronous state machine; the async loop in
/// `engine::runtime` drives it. It is responsible for:
/// - validating the graph at construction
/// - reporting which jobs are ready initially
/// - applying job outcomes and releasing or skipping dependents
/// - force-cancelling pending jobs on global cancellation
#[derive(Debug)]
pub struct Scheduler {
    graph: JobGraph,
    jobs: Vec<Job>,
    /// Dependencies of each job that have not succeeded yet.
    remaining: Vec<usize>,
}

impl Scheduler {
    /// Validate the jobs and build the scheduler. No job runs if this fails.
    pub fn new(specs: Vec<JobSpec>) -> Result<Self> {
        let graph = JobGraph::build(&specs)?;
        let remaining = (0..graph.len()).map(|i| graph.indegree_of(i)).collect();
        let jobs = specs.into_iter().map(Job::from_spec).collect();

        Ok(Self {
            graph,
            jobs,
            remaining,
        })
    }

    pub fn graph(&self) -> &JobGraph {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// All job records in input order.
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, id: &str) -> Option<&Job> {
        self.graph.position(id).map(|pos| &self.jobs[pos])
    }

    /// Jobs with no dependencies, in input order.
    pub fn initial_ready(&self) -> Vec<JobId> {
        self.graph
            .roots()
            .map(|pos| self.jobs[pos].id.clone())
            .collect()
    }

    /// Record that `id` was handed to its execution path.
    pub fn mark_running(&mut self, id: &str) {
        match self.graph.position(id) {
            Some(pos) => self.jobs[pos].status = JobStatus::Running,
            None => warn!(job = %id, "mark_running for unknown job; ignoring"),
        }
    }

    /// Apply the outcome of a job's execution path and propagate it to the
    /// job's dependents.
    pub fn handle_completion(&mut self, outcome: JobOutcome) -> SchedulerStep {
        let Some(pos) = self.graph.position(&outcome.id) else {
            warn!(job = %outcome.id, "completion for unknown job; ignoring");
            return SchedulerStep::default();
        };

        let status = outcome.status;
        let at = outcome.ended_at.unwrap_or_default();
        self.jobs[pos].apply_outcome(outcome);
        debug!(job = %self.jobs[pos].id, %status, "job reached terminal status");

        let mut manager = StateManager::new(&self.graph, &mut self.jobs, &mut self.remaining);
        let mut step = SchedulerStep::default();

        if status == JobStatus::Succeeded {
            step.newly_ready = manager
                .release_dependents(pos)
                .into_iter()
                .map(|p| self.graph.id_of(p).to_string())
                .collect();
        } else if status.blocks_dependents() {
            step.newly_skipped = manager
                .mark_dependents_skipped(pos, at)
                .into_iter()
                .map(|p| self.graph.id_of(p).to_string())
                .collect();
        }

        step
    }

    /// Force every pending job to `Cancelled`; returns their ids.
    pub fn cancel_pending(&mut self, at: f64) -> Vec<JobId> {
        let mut manager = StateManager::new(&self.graph, &mut self.jobs, &mut self.remaining);
        manager
            .cancel_pending(at)
            .into_iter()
            .map(|p| self.graph.id_of(p).to_string())
            .collect()
    }

    /// Whether every job is in a terminal status.
    pub fn all_terminal(&self) -> bool {
        self.jobs.iter().all(|job| job.status.is_terminal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::job::TaskSpec;

    fn outcome(id: &str, status: JobStatus, at: f64) -> JobOutcome {
        JobOutcome {
            id: id.to_string(),
            status,
            attempts: 1,
            error: None,
            started_at: Some(at - 0.1),
            ended_at: Some(at),
            result: None,
        }
    }

    fn chain() -> Scheduler {
        Scheduler::new(vec![
            JobSpec::new("A", TaskSpec::noop()),
            JobSpec::new("B", TaskSpec::noop()).after("A"),
            JobSpec::new("C", TaskSpec::noop()).after("B"),
        ])
        .unwrap()
    }

    #[test]
    fn chain_steps_one_job_at_a_time() {
        let mut s = chain();
        assert_eq!(s.initial_ready(), vec!["A".to_string()]);

        s.mark_running("A");
        let step = s.handle_completion(outcome("A", JobStatus::Succeeded, 1.0));
        assert_eq!(step.newly_ready, vec!["B".to_string()]);

        s.mark_running("B");
        let step = s.handle_completion(outcome("B", JobStatus::Succeeded, 2.0));
        assert_eq!(step.newly_ready, vec!["C".to_string()]);
        assert!(!s.all_terminal());

        s.mark_running("C");
        s.handle_completion(outcome("C", JobStatus::Succeeded, 3.0));
        assert!(s.all_terminal());
    }

    #[test]
    fn timeout_skips_whole_chain() {
        let mut s = chain();
        s.mark_running("A");
        let step = s.handle_completion(outcome("A", JobStatus::Timeout, 1.0));
        assert!(step.newly_ready.is_empty());
        assert_eq!(step.newly_skipped, vec!["B".to_string(), "C".to_string()]);
        assert!(s.all_terminal());
        assert_eq!(s.job("C").unwrap().ended_at, Some(1.0));
    }

    #[test]
    fn cancelled_dependency_also_skips() {
        let mut s = chain();
        s.mark_running("A");
        let step = s.handle_completion(outcome("A", JobStatus::Cancelled, 1.0));
        assert_eq!(step.newly_skipped.len(), 2);
    }

    #[test]
    fn cancel_pending_only_touches_pending() {
        let mut s = Scheduler::new(vec![
            JobSpec::new("x", TaskSpec::noop()),
            JobSpec::new("y", TaskSpec::noop()),
        ])
        .unwrap();
        s.mark_running("x");
        assert_eq!(s.cancel_pending(0.3), vec!["y".to_string()]);
        assert_eq!(s.job("x").unwrap().status, JobStatus::Running);
        assert_eq!(s.job("y").unwrap().status, JobStatus::Cancelled);
    }

    #[test]
    fn unknown_completion_is_ignored() {
        let mut s = chain();
        let step = s.handle_completion(outcome("nope", JobStatus::Failed, 1.0));
        assert_eq!(step, SchedulerStep::default());
    }
}
