// src/dag/mod.rs

//! Job graph representation and scheduling state.
//!
//! - [`graph`] validates and stores the dependency graph.
//! - [`job`] holds task descriptions and per-job runtime records.
//! - [`scheduler`] contains the per-run state machine that decides which
//!   jobs become ready, and which are skipped, as outcomes arrive.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] applies dependency consequences of transitions.

pub mod graph;
pub mod job;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;

pub use graph::JobGraph;
pub use job::{Job, JobId, JobOutcome, JobSpec, TaskKind, TaskSpec};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
