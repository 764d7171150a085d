// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML rule file, before validation.
///
/// ```toml
/// [config]
/// root = "report"
/// poll_interval_ms = 5000
///
/// [rule.fetch]
/// cmd = "./fetch.sh"
/// sources = ["s3://bucket/day=1"]
/// min_inputs = 1
///
/// [rule.report]
/// cmd = "./report.sh"
/// sub_rules = ["fetch"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All rules from `[rule.<name>]`, keyed by rule name.
    #[serde(default)]
    pub rule: BTreeMap<String, RuleConfig>,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>`, so holding one means the
/// rule graph is known to be a finite DAG with resolvable references.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub rule: BTreeMap<String, RuleConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, rule: BTreeMap<String, RuleConfig>) -> Self {
        Self { config, rule }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Terminal rule to execute. If `None`, the single rule that no other
    /// rule depends on is used.
    #[serde(default)]
    pub root: Option<String>,

    /// Bounded wait (milliseconds) for each backend poll.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    5000
}

impl ConfigSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            root: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// `[rule.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    /// Shell command that performs the rule's work.
    pub cmd: String,

    /// Direct dependencies. Their outputs, concatenated in this order, become
    /// this rule's inputs.
    #[serde(default)]
    pub sub_rules: Vec<String>,

    /// Static input references handed to the job before any sub-rule outputs.
    #[serde(default)]
    pub sources: Vec<String>,

    /// The job is not started when fewer inputs than this are available.
    #[serde(default)]
    pub min_inputs: usize,
}
