// src/engine/sequential.rs

//! Blocking execution of the terminal rule.

use tracing::{debug, info, warn};

use crate::dag::{ResultStore, RuleGraph};
use crate::errors::{Result, RuleflowError};
use crate::exec::{JobBackend, JobHandle, JobStatus};

/// Start the job for `rule` and wait for it to finish.
///
/// Inputs are resolved from `store` exactly as for a concurrent batch. The
/// rule's outputs are not recorded anywhere; this is only used for the last
/// rule of a run.
///
/// If waiting fails with a non-transient backend error, the job is killed
/// and released before the error is returned.
pub async fn run_terminal_rule<G, B>(
    rule: &str,
    graph: &G,
    store: &ResultStore,
    backend: &mut B,
) -> Result<JobHandle>
where
    G: RuleGraph + ?Sized,
    B: JobBackend + ?Sized,
{
    let definition = graph
        .rule(rule)
        .ok_or_else(|| RuleflowError::UnknownRule(rule.to_string()))?;
    let inputs = store.resolve_inputs(graph.sub_rules_of(rule));

    info!(rule = %rule, inputs = inputs.len(), "starting terminal rule");
    let job = backend
        .start(definition, inputs)
        .await?
        .ok_or_else(|| RuleflowError::InsufficientInputs {
            rule: rule.to_string(),
        })?;

    loop {
        match backend.wait(&job).await {
            Ok(JobStatus::Ready) => {
                info!(rule = %rule, job = %job, "terminal rule completed");
                return Ok(job);
            }
            Ok(JobStatus::Dead) => {
                return Err(RuleflowError::JobFailed {
                    rule: rule.to_string(),
                    job: job.id().to_string(),
                });
            }
            Ok(JobStatus::Active) => {
                debug!(job = %job, "wait returned while job still active; waiting again");
            }
            Err(e) if e.is_transient() => {
                debug!(job = %job, error = %e, "transient error while waiting; waiting again");
            }
            Err(e) => {
                warn!(job = %job, error = %e, "backend error while waiting; abandoning terminal job");
                abandon(backend, &job).await;
                return Err(e.into());
            }
        }
    }
}

/// Best-effort kill and release of a job whose status can no longer be
/// observed.
async fn abandon<B>(backend: &mut B, job: &JobHandle)
where
    B: JobBackend + ?Sized,
{
    if let Err(e) = backend.kill(job).await {
        warn!(job = %job, error = %e, "failed to kill terminal job");
    }
    if let Err(e) = backend.release(job).await {
        warn!(job = %job, error = %e, "failed to release terminal job");
    }
}
