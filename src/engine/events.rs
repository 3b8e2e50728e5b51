// src/engine/events.rs

//! Append-only structured event log of a scheduler run.
//!
//! Records are independent from `tracing` output: they are part of the run
//! summary and allow reconstructing what ran, when, and why anything was
//! skipped or cancelled.

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::time::Instant;

use crate::dag::JobId;
use crate::types::JobStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SchedulerStarted,
    SchedulerCancelling,
    SchedulerFinished,
    JobStarted,
    JobRetrying,
    JobFinished,
    JobSkipped,
    JobCancelled,
}

/// One event. `ts` is seconds since the run started, rounded to microseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub ts: f64,
    pub event: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LogRecord {
    pub fn new(event: EventKind) -> Self {
        Self {
            ts: 0.0,
            event,
            job: None,
            status: None,
            attempts: None,
            extra: Map::new(),
        }
    }

    pub fn for_job(mut self, id: &str, status: JobStatus, attempts: u32) -> Self {
        self.job = Some(id.to_string());
        self.status = Some(status);
        self.attempts = Some(attempts);
        self
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Extra field by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// Thread-safe append-only log, shared by every job path of a run.
#[derive(Debug)]
pub struct EventLog {
    start: Instant,
    records: Mutex<Vec<LogRecord>>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Start a log; timestamps are relative to now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Seconds elapsed since the log was created.
    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Stamp and append a record.
    ///
    /// The timestamp is taken under the lock, so records are ordered by `ts`.
    pub fn emit(&self, mut record: LogRecord) {
        let mut records = self.records.lock();
        record.ts = round_micros(self.elapsed());
        records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }
}

fn round_micros(secs: f64) -> f64 {
    (secs * 1_000_000.0).round() / 1_000_000.0
}
