// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, RuleflowError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::RuleflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.rule))
    }
}

/// Run every semantic check on a freshly parsed config.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_rules(cfg)?;
    validate_global_config(cfg)?;
    validate_sub_rules(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_rules(cfg: &RawConfigFile) -> Result<()> {
    if cfg.rule.is_empty() {
        return Err(RuleflowError::ConfigError(
            "config must contain at least one [rule.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.poll_interval_ms == 0 {
        return Err(RuleflowError::ConfigError(
            "[config].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    if let Some(ref root) = cfg.config.root {
        if !cfg.rule.contains_key(root) {
            return Err(RuleflowError::ConfigError(format!(
                "[config].root names unknown rule '{}'",
                root
            )));
        }
    }

    Ok(())
}

fn validate_sub_rules(cfg: &RawConfigFile) -> Result<()> {
    for (name, rule) in cfg.rule.iter() {
        for sub in rule.sub_rules.iter() {
            if !cfg.rule.contains_key(sub) {
                return Err(RuleflowError::ConfigError(format!(
                    "rule '{}' has unknown sub-rule '{}'",
                    name, sub
                )));
            }
            if sub == name {
                return Err(RuleflowError::ConfigError(format!(
                    "rule '{}' cannot list itself in `sub_rules`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: sub-rule -> rule
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.rule.keys() {
        graph.add_node(name.as_str());
    }

    for (name, rule) in cfg.rule.iter() {
        for sub in rule.sub_rules.iter() {
            graph.add_edge(sub.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(RuleflowError::DagCycle(format!(
            "cycle detected in rule graph involving rule '{}'",
            cycle.node_id()
        ))),
    }
}
