// src/engine/concurrent.rs

//! Concurrent execution of one batch of independent, ready rules.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::dag::{ResultStore, RuleGraph};
use crate::engine::ExecutionSettings;
use crate::errors::{Result, RuleflowError};
use crate::exec::backend::rule_names;
use crate::exec::{JobBackend, JobHandle, JobStatus};
use crate::types::{OutputRef, RuleName};

/// Result of a batch in which every job reached `ready`.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Output references per rule of the batch.
    pub results: HashMap<RuleName, Vec<OutputRef>>,
    /// Every job started for the batch, for later release.
    pub jobs: Vec<JobHandle>,
}

/// Start a job for every rule in `rules` and poll them until all are ready.
///
/// The batch fails as a whole:
/// - if any rule cannot be started, the jobs already started are killed and
///   [`RuleflowError::InsufficientInputs`] is returned;
/// - on the first job observed `dead` (or a non-transient backend error),
///   every other started job is killed and no results are returned.
///
/// A failed batch releases every job it started before returning.
///
/// Transient backend errors while polling are retried with the same job set.
pub async fn run_concurrent_rules<G, B>(
    rules: &[RuleName],
    graph: &G,
    store: &ResultStore,
    backend: &mut B,
    settings: &ExecutionSettings,
) -> Result<BatchOutcome>
where
    G: RuleGraph + ?Sized,
    B: JobBackend + ?Sized,
{
    let started = start_batch(rules, graph, store, backend).await?;

    let mut results: HashMap<RuleName, Vec<OutputRef>> = HashMap::new();
    let mut dead: HashSet<JobHandle> = HashSet::new();
    let mut failure: Option<RuleflowError> = None;
    let mut active = started.clone();
    let mut transient_retries = 0usize;

    while !active.is_empty() {
        let poll = match backend.poll(&active, settings.poll_interval).await {
            Ok(poll) => poll,
            Err(e) if e.is_transient() => {
                transient_retries += 1;
                debug!(
                    error = %e,
                    retries = transient_retries,
                    active = ?rule_names(&active),
                    "transient error while polling; polling again"
                );
                continue;
            }
            Err(e) => {
                warn!(error = %e, "backend error while polling; aborting batch");
                failure = Some(e.into());
                break;
            }
        };

        let mut still_active = poll.active;
        for job in poll.finished {
            match job.status {
                JobStatus::Ready => {
                    debug!(
                        rule = %job.handle.rule_name(),
                        job = %job.handle,
                        outputs = job.outputs.len(),
                        "job ready"
                    );
                    results.insert(job.handle.rule_name().to_string(), job.outputs);
                }
                JobStatus::Dead => {
                    warn!(rule = %job.handle.rule_name(), job = %job.handle, "job died");
                    if failure.is_none() {
                        failure = Some(RuleflowError::JobFailed {
                            rule: job.handle.rule_name().to_string(),
                            job: job.handle.id().to_string(),
                        });
                    }
                    dead.insert(job.handle);
                }
                JobStatus::Active => still_active.push(job.handle),
            }
        }
        active = still_active;

        if failure.is_some() {
            break;
        }
    }

    if let Some(err) = failure {
        let survivors: Vec<JobHandle> = started
            .iter()
            .filter(|job| !dead.contains(*job))
            .cloned()
            .collect();
        warn!(
            error = %err,
            killing = ?rule_names(&survivors),
            discarded = results.len(),
            "one of the concurrent jobs failed; aborting batch"
        );
        kill_all(backend, &survivors).await;
        release_all(backend, &started).await;
        return Err(err);
    }

    info!(rules = ?rules, "batch completed");
    Ok(BatchOutcome {
        results,
        jobs: started,
    })
}

/// Start one job per rule. On the first rule that cannot be started, kill
/// everything started so far and fail.
async fn start_batch<G, B>(
    rules: &[RuleName],
    graph: &G,
    store: &ResultStore,
    backend: &mut B,
) -> Result<Vec<JobHandle>>
where
    G: RuleGraph + ?Sized,
    B: JobBackend + ?Sized,
{
    let mut started = Vec::with_capacity(rules.len());

    for name in rules {
        let outcome = match graph.rule(name) {
            Some(rule) => {
                let inputs = store.resolve_inputs(graph.sub_rules_of(name));
                debug!(rule = %name, inputs = inputs.len(), "starting job");
                backend
                    .start(rule, inputs)
                    .await
                    .map_err(RuleflowError::from)
                    .and_then(|handle| {
                        handle.ok_or_else(|| RuleflowError::InsufficientInputs {
                            rule: name.clone(),
                        })
                    })
            }
            None => Err(RuleflowError::UnknownRule(name.clone())),
        };

        match outcome {
            Ok(handle) => started.push(handle),
            Err(err) => {
                warn!(
                    rule = %name,
                    error = %err,
                    killing = ?rule_names(&started),
                    "failed to start batch"
                );
                kill_all(backend, &started).await;
                release_all(backend, &started).await;
                return Err(err);
            }
        }
    }

    Ok(started)
}

/// Best-effort kill of every job in `jobs`.
pub(crate) async fn kill_all<B>(backend: &mut B, jobs: &[JobHandle])
where
    B: JobBackend + ?Sized,
{
    for job in jobs {
        if let Err(e) = backend.kill(job).await {
            warn!(job = %job, error = %e, "failed to kill job");
        }
    }
}

/// Best-effort release of every job in `jobs`.
pub(crate) async fn release_all<B>(backend: &mut B, jobs: &[JobHandle])
where
    B: JobBackend + ?Sized,
{
    for job in jobs {
        if let Err(e) = backend.release(job).await {
            warn!(job = %job, error = %e, "failed to release job");
        }
    }
}
