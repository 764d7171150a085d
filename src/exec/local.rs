// src/exec/local.rs

//! `JobBackend` that runs every rule's command as a local process.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::dag::Rule;
use crate::exec::backend::{BackendFuture, JobBackend, JobHandle, JobStatus, PollResult};
use crate::exec::job_runner::{run_job, JobSpec};
use crate::exec::job_table::JobTable;
use crate::types::OutputRef;

/// Local process backend.
///
/// - A job's inputs are the rule's `sources` followed by the resolved
///   sub-rule outputs; if there are fewer than `min_inputs`, the job is not
///   started.
/// - Each job runs in its own Tokio task; completion is published through a
///   shared [`JobTable`].
/// - Once a job's process exits, its stdout is read for at most
///   `stdout_drain_timeout` more.
#[derive(Debug)]
pub struct LocalBackend {
    table: Arc<JobTable>,
    next_seq: u64,
    stdout_drain_timeout: Duration,
}

impl LocalBackend {
    pub const DEFAULT_STDOUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stdout_drain_timeout(mut self, timeout: Duration) -> Self {
        self.stdout_drain_timeout = timeout;
        self
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self {
            table: Arc::default(),
            next_seq: 0,
            stdout_drain_timeout: Self::DEFAULT_STDOUT_DRAIN_TIMEOUT,
        }
    }
}

impl JobBackend for LocalBackend {
    fn start<'a>(
        &'a mut self,
        rule: &'a Rule,
        inputs: Vec<OutputRef>,
    ) -> BackendFuture<'a, Option<JobHandle>> {
        Box::pin(async move {
            let mut effective = rule.sources.clone();
            effective.extend(inputs);

            if effective.len() < rule.min_inputs {
                warn!(
                    rule = %rule.name,
                    available = effective.len(),
                    required = rule.min_inputs,
                    "not enough inputs; job not started"
                );
                return Ok(None);
            }

            self.next_seq += 1;
            let handle = JobHandle::new(&rule.name, self.next_seq);
            let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
            self.table.insert(&handle, cancel_tx);

            let spec = JobSpec {
                handle: handle.clone(),
                cmd: rule.cmd.clone(),
                inputs: effective,
                drain_timeout: self.stdout_drain_timeout,
            };
            tokio::spawn(run_job(spec, Arc::clone(&self.table), cancel_rx));

            Ok(Some(handle))
        })
    }

    fn poll<'a>(
        &'a mut self,
        jobs: &'a [JobHandle],
        wait: Duration,
    ) -> BackendFuture<'a, PollResult> {
        Box::pin(async move {
            let deadline = Instant::now() + wait;

            loop {
                let notified = self.table.changed().notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                let result = self.table.partition(jobs)?;
                if !result.finished.is_empty() || result.active.is_empty() {
                    return Ok(result);
                }

                if timeout_at(deadline, notified).await.is_err() {
                    debug!(active = result.active.len(), "poll interval elapsed without progress");
                    return Ok(result);
                }
            }
        })
    }

    fn kill<'a>(&'a mut self, job: &'a JobHandle) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            if self.table.kill(job)? {
                debug!(job = %job, "killed active job");
            } else {
                debug!(job = %job, "kill requested for finished job; nothing to do");
            }
            Ok(())
        })
    }

    fn wait<'a>(&'a mut self, job: &'a JobHandle) -> BackendFuture<'a, JobStatus> {
        Box::pin(async move {
            loop {
                let notified = self.table.changed().notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                let status = self.table.status(job)?;
                if status.is_terminal() {
                    return Ok(status);
                }
                notified.await;
            }
        })
    }

    fn release<'a>(&'a mut self, job: &'a JobHandle) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            if self.table.remove(job) {
                debug!(job = %job, "released job");
            }
            Ok(())
        })
    }
}
