// src/exec/job_table.rs

//! Shared bookkeeping for jobs run by the local backend.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::{oneshot, Notify};
use tracing::debug;

use crate::exec::backend::{BackendError, FinishedJob, JobHandle, JobStatus, PollResult};
use crate::types::OutputRef;

#[derive(Debug)]
struct LocalJob {
    status: JobStatus,
    outputs: Vec<OutputRef>,
    /// Present while the process may still be running.
    cancel: Option<oneshot::Sender<()>>,
}

/// Jobs by id, plus a notifier fired whenever one of them changes status.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Mutex<HashMap<String, LocalJob>>,
    changed: Notify,
}

impl JobTable {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, LocalJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Notifier for status changes. Callers should `enable()` the returned
    /// future before inspecting the table to avoid missing a wakeup.
    pub fn changed(&self) -> &Notify {
        &self.changed
    }

    pub fn insert(&self, job: &JobHandle, cancel: oneshot::Sender<()>) {
        self.lock().insert(
            job.id().to_string(),
            LocalJob {
                status: JobStatus::Active,
                outputs: Vec::new(),
                cancel: Some(cancel),
            },
        );
    }

    /// Move an active job to a terminal status. Jobs that already finished
    /// (or were killed) keep their first terminal status.
    pub fn finish(&self, job: &JobHandle, status: JobStatus, outputs: Vec<OutputRef>) {
        {
            let mut jobs = self.lock();
            match jobs.get_mut(job.id()) {
                Some(entry) if entry.status == JobStatus::Active => {
                    entry.status = status;
                    entry.outputs = outputs;
                    entry.cancel = None;
                }
                Some(_) => {
                    debug!(job = %job, "job already terminal; ignoring late status");
                }
                None => {
                    debug!(job = %job, "job finished after release; ignoring");
                }
            }
        }
        self.changed.notify_waiters();
    }

    pub fn status(&self, job: &JobHandle) -> Result<JobStatus, BackendError> {
        self.lock()
            .get(job.id())
            .map(|entry| entry.status)
            .ok_or_else(|| BackendError::UnknownJob(job.id().to_string()))
    }

    /// Split `jobs` into finished and still-active.
    pub fn partition(&self, jobs: &[JobHandle]) -> Result<PollResult, BackendError> {
        let table = self.lock();
        let mut result = PollResult::default();

        for job in jobs {
            let entry = table
                .get(job.id())
                .ok_or_else(|| BackendError::UnknownJob(job.id().to_string()))?;

            if entry.status.is_terminal() {
                result.finished.push(FinishedJob {
                    handle: job.clone(),
                    status: entry.status,
                    outputs: entry.outputs.clone(),
                });
            } else {
                result.active.push(job.clone());
            }
        }

        Ok(result)
    }

    /// Mark an active job dead and signal its process to stop.
    ///
    /// Returns `false` if the job had already finished.
    pub fn kill(&self, job: &JobHandle) -> Result<bool, BackendError> {
        let cancel = {
            let mut jobs = self.lock();
            let entry = jobs
                .get_mut(job.id())
                .ok_or_else(|| BackendError::UnknownJob(job.id().to_string()))?;

            if entry.status.is_terminal() {
                return Ok(false);
            }
            entry.status = JobStatus::Dead;
            entry.cancel.take()
        };

        if let Some(cancel) = cancel {
            // The runner may have exited already; nothing left to stop then.
            let _ = cancel.send(());
        }
        self.changed.notify_waiters();
        Ok(true)
    }

    /// Drop a job's entry, stopping its process if it is still running.
    pub fn remove(&self, job: &JobHandle) -> bool {
        let removed = self.lock().remove(job.id());
        match removed {
            Some(mut entry) => {
                if let Some(cancel) = entry.cancel.take() {
                    let _ = cancel.send(());
                }
                true
            }
            None => false,
        }
    }
}
