// src/dag/store.rs

//! Result store ("blackboard") shared between batches of a single run.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::errors::{Result, RuleflowError};
use crate::types::{OutputRef, RuleName};

/// Mapping from rule name to the output references its job produced.
///
/// Every rule of the run starts out mapped to an empty sequence. An entry is
/// written at most once, after the rule's job reached `ready`.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    outputs: HashMap<RuleName, Vec<OutputRef>>,
    recorded: HashSet<RuleName>,
}

impl ResultStore {
    pub fn new<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RuleName>,
    {
        Self {
            outputs: rules.into_iter().map(|r| (r.into(), Vec::new())).collect(),
            recorded: HashSet::new(),
        }
    }

    /// Output references of `rule`; empty if unknown or not yet recorded.
    pub fn outputs_of(&self, rule: &str) -> &[OutputRef] {
        self.outputs
            .get(rule)
            .map(|o| o.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `rule` has produced at least one output reference.
    pub fn has_outputs(&self, rule: &str) -> bool {
        !self.outputs_of(rule).is_empty()
    }

    pub fn is_recorded(&self, rule: &str) -> bool {
        self.recorded.contains(rule)
    }

    /// Record the outputs of a completed rule. Fails if the rule is not part
    /// of this run or was already recorded.
    pub fn record(&mut self, rule: &str, outputs: Vec<OutputRef>) -> Result<()> {
        let slot = self
            .outputs
            .get_mut(rule)
            .ok_or_else(|| RuleflowError::UnknownRule(rule.to_string()))?;

        if !self.recorded.insert(rule.to_string()) {
            return Err(RuleflowError::ResultAlreadyRecorded(rule.to_string()));
        }

        debug!(rule = %rule, outputs = outputs.len(), "recording rule outputs");
        *slot = outputs;
        Ok(())
    }

    /// Inputs for a rule with the given sub-rules: their outputs concatenated
    /// in sub-rule order.
    pub fn resolve_inputs(&self, sub_rules: &[RuleName]) -> Vec<OutputRef> {
        sub_rules
            .iter()
            .flat_map(|sub| self.outputs_of(sub).iter().cloned())
            .collect()
    }
}
