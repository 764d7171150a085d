// src/engine/mod.rs

//! Execution engine for ruleflow.
//!
//! This module ties together:
//! - the batch coordinator that runs independent rules concurrently
//!   ([`concurrent`])
//! - the blocking runner for the terminal rule ([`sequential`])
//! - the orchestrator that drives the whole graph ([`orchestrator`])
//!
//! A single task drives a run. Concurrency only means that several backend
//! jobs are in flight while the coordinator polls them.

use std::time::Duration;

use crate::config::ConfigSection;

pub mod concurrent;
pub mod orchestrator;
pub mod sequential;

pub use concurrent::{run_concurrent_rules, BatchOutcome};
pub use orchestrator::{execute_rule, GraphRun, RunReport};
pub use sequential::run_terminal_rule;

/// Settings that apply to every job of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionSettings {
    /// Bounded wait for a single backend poll. Polling repeats until the
    /// batch finishes; there is no overall deadline.
    pub poll_interval: Duration,
}

impl ExecutionSettings {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

    pub fn from_config(cfg: &ConfigSection) -> Self {
        Self {
            poll_interval: cfg.poll_interval(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }
}
