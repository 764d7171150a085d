// src/engine/orchestrator.rs

//! Whole-graph execution: batches of sub-rules, then the terminal rule.

use tracing::{debug, info, warn};

use crate::dag::{ready_rules, ResultStore, RuleGraph};
use crate::engine::concurrent::run_concurrent_rules;
use crate::engine::sequential::run_terminal_rule;
use crate::engine::ExecutionSettings;
use crate::errors::{Result, RuleflowError};
use crate::exec::{JobBackend, JobHandle};
use crate::types::RuleName;

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Sub-rule batches in the order they ran.
    pub batches: Vec<Vec<RuleName>>,
    /// The rule that ran last, on its own.
    pub terminal: RuleName,
    pub terminal_job: JobHandle,
}

impl RunReport {
    /// Every rule that ran, in execution order.
    pub fn executed(&self) -> Vec<RuleName> {
        self.batches
            .iter()
            .flatten()
            .cloned()
            .chain(std::iter::once(self.terminal.clone()))
            .collect()
    }
}

/// Execute the graph rooted at `root`.
///
/// All sub-rules run in concurrent batches, each batch holding the rules
/// whose sub-rules have produced outputs. Once every sub-rule is done the
/// root runs on its own, after which the sub-rule jobs are released.
///
/// The run is all-or-nothing: the first failure stops it and is returned
/// unchanged, after a best-effort release of the sub-rule jobs that had
/// already completed.
pub async fn execute_rule<G, B>(
    graph: &G,
    root: &str,
    backend: &mut B,
    settings: &ExecutionSettings,
) -> Result<RunReport>
where
    G: RuleGraph + ?Sized,
    B: JobBackend + ?Sized,
{
    let mut run = GraphRun::new(graph, root)?;

    info!(
        root = %run.terminal(),
        sub_rules = run.pending().len(),
        "executing rule graph"
    );

    while !run.is_done() {
        if let Err(err) = run.step_batch(backend, settings).await {
            release_best_effort(backend, run.sub_jobs()).await;
            return Err(err);
        }
    }

    run.finish(backend).await
}

/// One execution of a rule graph, driven a batch at a time.
///
/// [`execute_rule`] is the usual entry point; `GraphRun` exposes the same
/// steps so callers (and tests) can inspect the result store between
/// batches.
#[derive(Debug)]
pub struct GraphRun<'g, G: ?Sized> {
    graph: &'g G,
    terminal: RuleName,
    pending: Vec<RuleName>,
    store: ResultStore,
    sub_jobs: Vec<JobHandle>,
    batches: Vec<Vec<RuleName>>,
}

impl<'g, G> GraphRun<'g, G>
where
    G: RuleGraph + ?Sized,
{
    pub fn new(graph: &'g G, root: &str) -> Result<Self> {
        let mut pending = graph.flatten(root)?;
        let store = ResultStore::new(pending.iter().cloned());

        // `flatten` always yields at least `root`, and yields it last.
        let terminal = pending.pop().unwrap_or_else(|| root.to_string());

        Ok(Self {
            graph,
            terminal,
            pending,
            store,
            sub_jobs: Vec::new(),
            batches: Vec::new(),
        })
    }

    pub fn terminal(&self) -> &str {
        &self.terminal
    }

    /// Sub-rules that have not run yet.
    pub fn pending(&self) -> &[RuleName] {
        &self.pending
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Jobs of every completed batch, in start order.
    pub fn sub_jobs(&self) -> &[JobHandle] {
        &self.sub_jobs
    }

    pub fn batches(&self) -> &[Vec<RuleName>] {
        &self.batches
    }

    /// True once every sub-rule has run and only the terminal rule is left.
    pub fn is_done(&self) -> bool {
        self.pending.is_empty()
    }

    /// Run the next batch of ready sub-rules and record their outputs.
    ///
    /// On error nothing from the batch is recorded and `pending` is left
    /// unchanged; the jobs of a failed batch are already killed and released
    /// by the coordinator.
    pub async fn step_batch<B>(
        &mut self,
        backend: &mut B,
        settings: &ExecutionSettings,
    ) -> Result<Vec<RuleName>>
    where
        B: JobBackend + ?Sized,
    {
        let batch = ready_rules(&self.pending, self.graph, &self.store);
        if batch.is_empty() {
            return Err(RuleflowError::Unschedulable {
                pending: self.pending.clone(),
            });
        }

        info!(
            batch = self.batches.len() + 1,
            rules = ?batch,
            remaining = self.pending.len() - batch.len(),
            "running batch"
        );

        let outcome =
            run_concurrent_rules(&batch, self.graph, &self.store, backend, settings).await?;
        self.sub_jobs.extend(outcome.jobs);

        if let Some(rule) = outcome.results.keys().find(|r| self.store.is_recorded(r)) {
            return Err(RuleflowError::ResultAlreadyRecorded(rule.clone()));
        }
        for (rule, outputs) in outcome.results {
            self.store.record(&rule, outputs)?;
        }

        self.pending.retain(|rule| !batch.contains(rule));
        self.batches.push(batch.clone());
        Ok(batch)
    }

    /// Run the terminal rule, then release the sub-rule jobs.
    ///
    /// Expects [`GraphRun::is_done`]; a pending sub-rule would leave the
    /// terminal rule with missing inputs.
    pub async fn finish<B>(self, backend: &mut B) -> Result<RunReport>
    where
        B: JobBackend + ?Sized,
    {
        let terminal_job =
            match run_terminal_rule(&self.terminal, self.graph, &self.store, backend).await {
                Ok(job) => job,
                Err(err) => {
                    release_best_effort(backend, &self.sub_jobs).await;
                    return Err(err);
                }
            };

        release_all(backend, &self.sub_jobs).await?;

        info!(root = %self.terminal, batches = self.batches.len(), "rule graph completed");
        Ok(RunReport {
            batches: self.batches,
            terminal: self.terminal,
            terminal_job,
        })
    }
}

/// Release every job, continuing past failures; the first failure is
/// returned once all releases were attempted.
async fn release_all<B>(backend: &mut B, jobs: &[JobHandle]) -> Result<()>
where
    B: JobBackend + ?Sized,
{
    let mut first_err = None;

    for job in jobs {
        match backend.release(job).await {
            Ok(()) => debug!(job = %job, "released sub-rule job"),
            Err(e) => {
                warn!(job = %job, error = %e, "failed to release sub-rule job");
                first_err.get_or_insert(e);
            }
        }
    }

    match first_err {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Release on the failure path. Errors are logged only; the caller is about
/// to return the error that caused the abort.
async fn release_best_effort<B>(backend: &mut B, jobs: &[JobHandle])
where
    B: JobBackend + ?Sized,
{
    if let Err(e) = release_all(backend, jobs).await {
        warn!(error = %e, "cleanup after failed run was incomplete");
    }
}
