// src/exec/backend.rs

//! Pluggable job backend abstraction.
//!
//! The engine talks to a `JobBackend` instead of a concrete job system. This
//! makes it easy to swap in a scripted fake in tests while keeping the
//! production implementation in [`super::local`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

use crate::dag::Rule;
use crate::types::{OutputRef, RuleName};

/// Boxed future returned by every [`JobBackend`] method.
pub type BackendFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, BackendError>> + Send + 'a>>;

/// Failures reported by a backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Communication hiccup; the same request may simply be repeated.
    #[error("transient backend error: {0}")]
    Transient(String),

    #[error("unknown job: {0}")]
    UnknownJob(String),

    #[error("{0}")]
    Failed(String),
}

impl BackendError {
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Transient(_))
    }
}

/// Status of a single job on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Active,
    /// Completed successfully; output references are available.
    Ready,
    /// Failed. Always fatal for the run.
    Dead,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Active)
    }
}

/// Identity of a started job.
///
/// Job ids have the form `<rule>@<suffix>`, so the originating rule can be
/// recovered from an id alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    id: String,
}

impl JobHandle {
    pub fn new(rule: &str, suffix: impl fmt::Display) -> Self {
        Self {
            id: format!("{rule}@{suffix}"),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the rule this job was started for.
    pub fn rule_name(&self) -> &str {
        self.id
            .rsplit_once('@')
            .map(|(rule, _)| rule)
            .unwrap_or(&self.id)
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// A job that left the active set during a poll.
#[derive(Debug, Clone)]
pub struct FinishedJob {
    pub handle: JobHandle,
    pub status: JobStatus,
    /// Output references; only meaningful when `status` is `Ready`.
    pub outputs: Vec<OutputRef>,
}

/// Result of a single bounded poll over a set of jobs.
#[derive(Debug, Clone, Default)]
pub struct PollResult {
    pub finished: Vec<FinishedJob>,
    pub active: Vec<JobHandle>,
}

/// Trait abstracting how rule jobs are executed.
pub trait JobBackend: Send {
    /// Start a job for `rule` with its resolved inputs.
    ///
    /// `Ok(None)` means the job could not even be started (e.g. not enough
    /// inputs); this is distinct from a job that starts and later dies.
    fn start<'a>(
        &'a mut self,
        rule: &'a Rule,
        inputs: Vec<OutputRef>,
    ) -> BackendFuture<'a, Option<JobHandle>>;

    /// Wait at most `wait` for progress on `jobs`, then report which of them
    /// finished and which are still active.
    fn poll<'a>(
        &'a mut self,
        jobs: &'a [JobHandle],
        wait: Duration,
    ) -> BackendFuture<'a, PollResult>;

    /// Stop a job. Must be a no-op for jobs that already finished.
    fn kill<'a>(&'a mut self, job: &'a JobHandle) -> BackendFuture<'a, ()>;

    /// Block until the job reaches a terminal status.
    fn wait<'a>(&'a mut self, job: &'a JobHandle) -> BackendFuture<'a, JobStatus>;

    /// Free backend-side resources held for the job. Idempotent.
    fn release<'a>(&'a mut self, job: &'a JobHandle) -> BackendFuture<'a, ()>;
}

/// Originating rule of each job, for log fields.
pub fn rule_names(jobs: &[JobHandle]) -> Vec<RuleName> {
    jobs.iter().map(|j| j.rule_name().to_string()).collect()
}
