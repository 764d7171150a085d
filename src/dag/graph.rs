// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use crate::config::model::ConfigFile;
use crate::dag::rule::Rule;
use crate::errors::{Result, RuleflowError};
use crate::types::RuleName;

/// Read access to a rule graph.
///
/// The scheduler only needs to look rules up by name and enumerate their
/// direct sub-rules; [`RuleGraph::flatten`] is derived from those two.
pub trait RuleGraph {
    /// Look up a rule by name.
    fn rule(&self, name: &str) -> Option<&Rule>;

    /// Direct sub-rules of `name`, in declaration order.
    fn sub_rules_of(&self, name: &str) -> &[RuleName];

    /// Every rule reachable from `root`, each listed once, sub-rules before
    /// the rules that depend on them and `root` last.
    fn flatten(&self, root: &str) -> Result<Vec<RuleName>> {
        let mut order = Vec::new();
        let mut visited: HashSet<RuleName> = HashSet::new();

        // Iterative post-order walk. The bool marks a node whose sub-rules
        // have already been pushed.
        let mut stack: Vec<(RuleName, bool)> = vec![(root.to_string(), false)];

        while let Some((name, expanded)) = stack.pop() {
            if expanded {
                order.push(name);
                continue;
            }
            if !visited.insert(name.clone()) {
                continue;
            }
            if self.rule(&name).is_none() {
                return Err(RuleflowError::UnknownRule(name));
            }

            stack.push((name.clone(), true));
            // Reverse so the first declared sub-rule is visited first.
            for sub in self.sub_rules_of(&name).iter().rev() {
                if !visited.contains(sub) {
                    stack.push((sub.clone(), false));
                }
            }
        }

        Ok(order)
    }
}

/// In-memory rule graph keyed by rule name.
///
/// Acyclicity is validated in `config::validate`; here we only keep the rules
/// and reverse adjacency for terminal-rule discovery and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: HashMap<RuleName, Rule>,
    dependents: HashMap<RuleName, Vec<RuleName>>,
}

impl RuleSet {
    /// Build a rule graph from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::from_rules(
            cfg.rule
                .iter()
                .map(|(name, rc)| Rule::from_config(name.clone(), rc)),
        )
    }

    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        let rules: HashMap<RuleName, Rule> =
            rules.into_iter().map(|r| (r.name.clone(), r)).collect();

        let mut names: Vec<&RuleName> = rules.keys().collect();
        names.sort_unstable();

        let mut dependents: HashMap<RuleName, Vec<RuleName>> = HashMap::new();
        for rule in names.into_iter().filter_map(|n| rules.get(n)) {
            for sub in &rule.sub_rules {
                dependents
                    .entry(sub.clone())
                    .or_default()
                    .push(rule.name.clone());
            }
        }

        Self { rules, dependents }
    }

    /// All rule names, sorted.
    pub fn rule_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Rules that list `name` as a sub-rule.
    pub fn dependents_of(&self, name: &str) -> &[RuleName] {
        self.dependents
            .get(name)
            .map(|d| d.as_slice())
            .unwrap_or(&[])
    }

    /// Rules that nothing depends on, sorted. A well-formed graph run as a
    /// whole has exactly one.
    pub fn terminal_rules(&self) -> Vec<&str> {
        self.rule_names()
            .into_iter()
            .filter(|name| self.dependents_of(name).is_empty())
            .collect()
    }
}

impl RuleGraph for RuleSet {
    fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    fn sub_rules_of(&self, name: &str) -> &[RuleName] {
        self.rules
            .get(name)
            .map(|r| r.sub_rules.as_slice())
            .unwrap_or(&[])
    }
}
