// src/errors.rs

//! Crate-wide error type and `Result` alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobdagError {
    #[error("duplicate job id: {0}")]
    DuplicateId(String),

    #[error("unknown dependency '{dependency}' for job '{job}'")]
    UnknownDependency { job: String, dependency: String },

    #[error("cycle detected in DAG: {0}")]
    CycleDetected(String),

    #[error("unknown task type '{kind}' for job '{job}'")]
    UnknownTaskKind { job: String, kind: String },

    #[error("invalid task for job '{job}': {reason}")]
    InvalidTask { job: String, reason: String },

    #[error("invalid scheduler options: {0}")]
    InvalidOptions(String),

    #[error("invalid action '{0}'")]
    InvalidAction(String),

    #[error("no actions provided after --actions")]
    NoActions,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl JobdagError {
    /// Whether this error stems from a malformed invocation rather than from
    /// the plan or the environment. The binary maps these to exit code 2.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            JobdagError::NoActions | JobdagError::InvalidAction(_) | JobdagError::InvalidOptions(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, JobdagError>;
