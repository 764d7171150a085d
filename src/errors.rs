// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::exec::BackendError;
use crate::types::RuleName;

#[derive(Error, Debug)]
pub enum RuleflowError {
    /// The backend refused to start a job for this rule (e.g. not enough inputs).
    #[error("There are not enough inputs to run rule '{rule}'")]
    InsufficientInputs { rule: RuleName },

    /// A started job reached the `dead` state.
    #[error("Job '{job}' for rule '{rule}' failed")]
    JobFailed { rule: RuleName, job: String },

    /// A non-transient failure talking to the backend.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Sub-rules remain but none of them can become ready.
    #[error("No runnable rules left; still waiting on: {}", .pending.join(", "))]
    Unschedulable { pending: Vec<RuleName> },

    #[error("Rule not found: {0}")]
    UnknownRule(RuleName),

    #[error("Results for rule '{0}' were already recorded")]
    ResultAlreadyRecorded(RuleName),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cycle detected in rule graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RuleflowError>;
