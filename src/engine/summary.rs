// src/engine/summary.rs

//! Final, immutable snapshot of a scheduler run.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

use crate::dag::{Job, JobId};
use crate::engine::events::{EventKind, LogRecord};
use crate::types::JobStatus;

/// Terminal state of one job as reported in the summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobReport {
    pub status: JobStatus,
    pub attempts: u32,
    pub error: Option<String>,
    pub started_at: Option<f64>,
    pub ended_at: Option<f64>,
    pub result: Value,
}

impl From<&Job> for JobReport {
    fn from(job: &Job) -> Self {
        Self {
            status: job.status,
            attempts: job.attempts,
            error: job.error.clone(),
            started_at: job.started_at,
            ended_at: job.ended_at,
            result: job.result.clone().unwrap_or(Value::Null),
        }
    }
}

/// Job reports keyed by id, in plan order. Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobReports(Vec<(JobId, JobReport)>);

impl JobReports {
    pub fn get(&self, id: &str) -> Option<&JobReport> {
        self.0
            .iter()
            .find_map(|(jid, report)| (jid == id).then_some(report))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JobReport)> {
        self.0.iter().map(|(id, report)| (id.as_str(), report))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> FromIterator<&'a Job> for JobReports {
    fn from_iter<I: IntoIterator<Item = &'a Job>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|job| (job.id.clone(), JobReport::from(job)))
                .collect(),
        )
    }
}

impl Serialize for JobReports {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, report) in &self.0 {
            map.serialize_entry(id, report)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub peak_concurrency: usize,
    pub jobs: JobReports,
    pub logs: Vec<LogRecord>,
}

impl Summary {
    pub fn job(&self, id: &str) -> Option<&JobReport> {
        self.jobs.get(id)
    }

    /// Whether every job succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.jobs
            .iter()
            .all(|(_, report)| report.status == JobStatus::Succeeded)
    }

    /// Number of jobs that ended in `status`.
    pub fn count(&self, status: JobStatus) -> usize {
        self.jobs
            .iter()
            .filter(|(_, report)| report.status == status)
            .count()
    }

    /// Log records of one kind, in order.
    pub fn events(&self, kind: EventKind) -> impl Iterator<Item = &LogRecord> {
        self.logs.iter().filter(move |r| r.event == kind)
    }

    /// One-line human-readable summary.
    pub fn text_line(&self) -> String {
        format!(
            "OK={}; peak_concurrency={}; jobs={}",
            self.all_succeeded(),
            self.peak_concurrency,
            self.jobs.len()
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
