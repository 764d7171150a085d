// crates/test-utils/src/fake_backend.rs

use std::collections::HashMap;
use std::time::Duration;

use ruleflow::dag::Rule;
use ruleflow::exec::{
    BackendError, BackendFuture, FinishedJob, JobBackend, JobHandle, JobStatus, PollResult,
};
use ruleflow::types::{OutputRef, RuleName};

/// What a fake job does once started.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Finish `ready` with these outputs.
    Ready(Vec<OutputRef>),
    /// Finish `dead`.
    Dead,
    /// Refuse to start.
    NotStarted,
    /// Stay active until killed.
    Hang,
}

#[derive(Debug, Clone)]
struct Script {
    outcome: Outcome,
    /// Number of polls that still report the job active before it finishes.
    polls: usize,
}

#[derive(Debug)]
struct FakeJob {
    rule: RuleName,
    script: Script,
    status: JobStatus,
}

/// A scripted, in-memory `JobBackend`.
///
/// - Rules without a script finish `ready` on the first poll with a single
///   output `"<rule>-out"`.
/// - Every call is recorded so tests can assert on what the engine did.
/// - `poll` never sleeps.
#[derive(Debug, Default)]
pub struct FakeBackend {
    scripts: HashMap<RuleName, Script>,
    transient_polls: usize,
    jobs: HashMap<String, FakeJob>,
    next_seq: u64,

    started: Vec<(RuleName, Vec<OutputRef>)>,
    killed: Vec<RuleName>,
    released: Vec<RuleName>,
    waited: Vec<RuleName>,
    polls: usize,
    transient_errors: usize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcome(mut self, rule: &str, outcome: Outcome) -> Self {
        self.scripts
            .insert(rule.to_string(), Script { outcome, polls: 0 });
        self
    }

    /// Finish `ready` with `outputs` after staying active for `polls` polls.
    pub fn ready_after(mut self, rule: &str, polls: usize, outputs: &[&str]) -> Self {
        self.scripts.insert(
            rule.to_string(),
            Script {
                outcome: Outcome::Ready(refs(outputs)),
                polls,
            },
        );
        self
    }

    /// Finish `dead` after staying active for `polls` polls.
    pub fn dead_after(mut self, rule: &str, polls: usize) -> Self {
        self.scripts.insert(
            rule.to_string(),
            Script {
                outcome: Outcome::Dead,
                polls,
            },
        );
        self
    }

    /// Fail the next `n` polls with a transient error.
    pub fn with_transient_polls(mut self, n: usize) -> Self {
        self.transient_polls = n;
        self
    }

    /// Rules in the order their jobs were started.
    pub fn started_rules(&self) -> Vec<RuleName> {
        self.started.iter().map(|(r, _)| r.clone()).collect()
    }

    /// Inputs passed when `rule` was started.
    pub fn inputs_of(&self, rule: &str) -> Option<Vec<OutputRef>> {
        self.started
            .iter()
            .find(|(r, _)| r == rule)
            .map(|(_, inputs)| inputs.clone())
    }

    /// Rules whose jobs received a kill request.
    pub fn killed(&self) -> &[RuleName] {
        &self.killed
    }

    pub fn released(&self) -> &[RuleName] {
        &self.released
    }

    pub fn waited(&self) -> &[RuleName] {
        &self.waited
    }

    /// Number of successful polls.
    pub fn poll_count(&self) -> usize {
        self.polls
    }

    pub fn transient_errors(&self) -> usize {
        self.transient_errors
    }

    fn script_for(&self, rule: &str) -> Script {
        self.scripts.get(rule).cloned().unwrap_or_else(|| Script {
            outcome: Outcome::Ready(vec![OutputRef::new(format!("{rule}-out"))]),
            polls: 0,
        })
    }

    fn advance(job: &mut FakeJob) {
        if job.status != JobStatus::Active {
            return;
        }
        if job.script.polls > 0 {
            job.script.polls -= 1;
            return;
        }
        job.status = match job.script.outcome {
            Outcome::Ready(_) => JobStatus::Ready,
            Outcome::Dead | Outcome::NotStarted => JobStatus::Dead,
            Outcome::Hang => JobStatus::Active,
        };
    }

    fn outputs(job: &FakeJob) -> Vec<OutputRef> {
        match (&job.status, &job.script.outcome) {
            (JobStatus::Ready, Outcome::Ready(outputs)) => outputs.clone(),
            _ => Vec::new(),
        }
    }
}

pub fn refs(items: &[&str]) -> Vec<OutputRef> {
    items.iter().map(|s| OutputRef::from(*s)).collect()
}

impl JobBackend for FakeBackend {
    fn start<'a>(
        &'a mut self,
        rule: &'a Rule,
        inputs: Vec<OutputRef>,
    ) -> BackendFuture<'a, Option<JobHandle>> {
        Box::pin(async move {
            self.started.push((rule.name.clone(), inputs));
            let script = self.script_for(&rule.name);
            if matches!(script.outcome, Outcome::NotStarted) {
                return Ok(None);
            }

            self.next_seq += 1;
            let handle = JobHandle::new(&rule.name, self.next_seq);
            self.jobs.insert(
                handle.id().to_string(),
                FakeJob {
                    rule: rule.name.clone(),
                    script,
                    status: JobStatus::Active,
                },
            );
            Ok(Some(handle))
        })
    }

    fn poll<'a>(
        &'a mut self,
        jobs: &'a [JobHandle],
        _wait: Duration,
    ) -> BackendFuture<'a, PollResult> {
        Box::pin(async move {
            if self.transient_polls > 0 {
                self.transient_polls -= 1;
                self.transient_errors += 1;
                return Err(BackendError::Transient("connection reset".to_string()));
            }
            self.polls += 1;

            let mut result = PollResult::default();
            for handle in jobs {
                let job = self
                    .jobs
                    .get_mut(handle.id())
                    .ok_or_else(|| BackendError::UnknownJob(handle.id().to_string()))?;
                Self::advance(job);

                if job.status.is_terminal() {
                    result.finished.push(FinishedJob {
                        handle: handle.clone(),
                        status: job.status,
                        outputs: Self::outputs(job),
                    });
                } else {
                    result.active.push(handle.clone());
                }
            }
            Ok(result)
        })
    }

    fn kill<'a>(&'a mut self, job: &'a JobHandle) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let entry = self
                .jobs
                .get_mut(job.id())
                .ok_or_else(|| BackendError::UnknownJob(job.id().to_string()))?;
            self.killed.push(entry.rule.clone());
            if entry.status == JobStatus::Active {
                entry.status = JobStatus::Dead;
            }
            Ok(())
        })
    }

    fn wait<'a>(&'a mut self, job: &'a JobHandle) -> BackendFuture<'a, JobStatus> {
        Box::pin(async move {
            let entry = self
                .jobs
                .get_mut(job.id())
                .ok_or_else(|| BackendError::UnknownJob(job.id().to_string()))?;
            self.waited.push(entry.rule.clone());

            while entry.status == JobStatus::Active {
                if matches!(entry.script.outcome, Outcome::Hang) {
                    return Err(BackendError::Failed(format!("job '{}' never finishes", job)));
                }
                Self::advance(entry);
            }
            Ok(entry.status)
        })
    }

    fn release<'a>(&'a mut self, job: &'a JobHandle) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            if let Some(entry) = self.jobs.get(job.id()) {
                self.released.push(entry.rule.clone());
            }
            Ok(())
        })
    }
}
