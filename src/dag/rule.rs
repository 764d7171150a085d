// src/dag/rule.rs

//! Rule definitions.

use crate::config::model::RuleConfig;
use crate::types::{OutputRef, RuleName};

/// A named unit of computation in the rule graph.
///
/// The scheduler only relies on `name` and `sub_rules`; the remaining fields
/// are consumed by the backend when it starts a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: RuleName,
    pub cmd: String,
    /// Direct dependencies, in the order their outputs are concatenated.
    pub sub_rules: Vec<RuleName>,
    /// Static input references, placed before any sub-rule outputs.
    pub sources: Vec<OutputRef>,
    /// Minimum number of inputs required to start a job for this rule.
    pub min_inputs: usize,
}

impl Rule {
    pub fn new(name: impl Into<RuleName>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            sub_rules: Vec::new(),
            sources: Vec::new(),
            min_inputs: 0,
        }
    }

    pub fn from_config(name: RuleName, cfg: &RuleConfig) -> Self {
        Self {
            name,
            cmd: cfg.cmd.clone(),
            sub_rules: cfg.sub_rules.clone(),
            sources: cfg.sources.iter().map(|s| OutputRef::new(s.as_str())).collect(),
            min_inputs: cfg.min_inputs,
        }
    }

    pub fn with_sub_rule(mut self, sub: impl Into<RuleName>) -> Self {
        self.sub_rules.push(sub.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<OutputRef>) -> Self {
        self.sources.push(source.into());
        self
    }

    pub fn with_min_inputs(mut self, min_inputs: usize) -> Self {
        self.min_inputs = min_inputs;
        self
    }
}
