// src/dag/state_manager.rs

//! Dependency bookkeeping for a single scheduler run.

use tracing::debug;

use crate::dag::job::Job;
use crate::dag::JobGraph;
use crate::types::JobStatus;

/// Applies dependency consequences of terminal transitions.
///
/// `remaining[i]` is the number of dependency edges of job `i` whose source
/// has not yet succeeded. A job becomes ready when it reaches zero while still
/// `Pending`. A dependency ending in any blocking status skips the dependent
/// immediately, and the skip cascades through the whole dependent subgraph.
pub struct StateManager<'a> {
    graph: &'a JobGraph,
    jobs: &'a mut [Job],
    remaining: &'a mut [usize],
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a JobGraph, jobs: &'a mut [Job], remaining: &'a mut [usize]) -> Self {
        Self {
            graph,
            jobs,
            remaining,
        }
    }

    /// A job at `done` succeeded: release its dependents.
    ///
    /// Returns the dependents that just became ready.
    pub fn release_dependents(&mut self, done: usize) -> Vec<usize> {
        let mut ready = Vec::new();
        for &child in self.graph.children_of(done) {
            self.remaining[child] = self.remaining[child].saturating_sub(1);
            if self.remaining[child] == 0 && self.jobs[child].status == JobStatus::Pending {
                debug!(job = %self.jobs[child].id, "all dependencies succeeded; job is ready");
                ready.push(child);
            }
        }
        ready
    }

    /// A job at `root` ended in a blocking status: skip every pending job that
    /// transitively depends on it.
    ///
    /// Returns the newly skipped jobs, parents before children.
    pub fn mark_dependents_skipped(&mut self, root: usize, at: f64) -> Vec<usize> {
        let mut stack: Vec<usize> = self.graph.children_of(root).iter().rev().copied().collect();
        let mut skipped = Vec::new();

        while let Some(pos) = stack.pop() {
            let job = &mut self.jobs[pos];
            if job.status != JobStatus::Pending {
                // Already terminal, running, or skipped through another path.
                continue;
            }
            job.settle_without_running(JobStatus::Skipped, at);
            debug!(job = %job.id, "dependency did not succeed; marking skipped");
            skipped.push(pos);
            stack.extend(self.graph.children_of(pos).iter().rev().copied());
        }

        skipped
    }

    /// Force every still-pending job to `Cancelled`.
    pub fn cancel_pending(&mut self, at: f64) -> Vec<usize> {
        let mut cancelled = Vec::new();
        for (pos, job) in self.jobs.iter_mut().enumerate() {
            if job.status == JobStatus::Pending {
                job.settle_without_running(JobStatus::Cancelled, at);
                cancelled.push(pos);
            }
        }
        cancelled
    }
}
