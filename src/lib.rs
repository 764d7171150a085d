// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::{RuleGraph, RuleSet};
use crate::engine::{execute_rule, ExecutionSettings};
use crate::errors::RuleflowError;
use crate::exec::LocalBackend;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - rule file loading
/// - terminal rule selection
/// - the local process backend
/// - the orchestrator
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    let graph = RuleSet::from_config(&cfg);
    let root = resolve_terminal_rule(&cfg, &graph, args.rule.as_deref())?;

    if args.dry_run {
        print_dry_run(&cfg, &graph, &root)?;
        return Ok(());
    }

    let mut settings = ExecutionSettings::from_config(&cfg.config);
    if let Some(ms) = args.poll_interval_ms {
        settings = settings.with_poll_interval(Duration::from_millis(ms));
    }

    let mut backend = LocalBackend::new();
    let report = execute_rule(&graph, &root, &mut backend, &settings).await?;

    info!(
        root = %report.terminal,
        batches = report.batches.len(),
        rules = report.executed().len(),
        "all rules completed"
    );
    Ok(())
}

/// Pick the rule to execute.
///
/// Priority: explicit `--rule`, then `[config].root`, then the only rule that
/// nothing depends on.
pub fn resolve_terminal_rule(
    cfg: &ConfigFile,
    graph: &RuleSet,
    cli_rule: Option<&str>,
) -> errors::Result<String> {
    if let Some(name) = cli_rule.or(cfg.config.root.as_deref()) {
        if graph.rule(name).is_none() {
            return Err(RuleflowError::UnknownRule(name.to_string()));
        }
        return Ok(name.to_string());
    }

    match graph.terminal_rules().as_slice() {
        [only] => Ok(only.to_string()),
        candidates => Err(RuleflowError::ConfigError(format!(
            "cannot pick a terminal rule: expected exactly one rule without dependents, found [{}]; \
             set [config].root or pass --rule",
            candidates.join(", ")
        ))),
    }
}

/// Simple dry-run output: print the run order with each rule's inputs.
fn print_dry_run(cfg: &ConfigFile, graph: &RuleSet, root: &str) -> errors::Result<()> {
    let order = graph.flatten(root)?;

    println!("ruleflow dry-run");
    println!("  config.poll_interval_ms = {}", cfg.config.poll_interval_ms);
    println!("  terminal rule = {root}");
    println!();

    println!("run order ({}):", order.len());
    for name in &order {
        let Some(rule) = graph.rule(name) else {
            continue;
        };
        println!("  - {name}");
        println!("      cmd: {}", rule.cmd);
        if !rule.sub_rules.is_empty() {
            println!("      sub_rules: {:?}", rule.sub_rules);
        }
        if !rule.sources.is_empty() {
            let sources: Vec<&str> = rule.sources.iter().map(|s| s.as_str()).collect();
            println!("      sources: {:?}", sources);
        }
        if rule.min_inputs > 0 {
            println!("      min_inputs: {}", rule.min_inputs);
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{ConfigSection, RawConfigFile, RuleConfig};
    use std::collections::BTreeMap;

    fn rule(cmd: &str, subs: &[&str]) -> RuleConfig {
        RuleConfig {
            cmd: cmd.to_string(),
            sub_rules: subs.iter().map(|s| s.to_string()).collect(),
            sources: Vec::new(),
            min_inputs: 0,
        }
    }

    fn config(root: Option<&str>, rules: &[(&str, RuleConfig)]) -> ConfigFile {
        let raw = RawConfigFile {
            config: ConfigSection {
                root: root.map(str::to_string),
                ..ConfigSection::default()
            },
            rule: rules
                .iter()
                .map(|(n, r)| (n.to_string(), r.clone()))
                .collect::<BTreeMap<_, _>>(),
        };
        ConfigFile::try_from(raw).unwrap()
    }

    #[test]
    fn single_sink_is_picked_automatically() {
        let cfg = config(None, &[("a", rule("true", &[])), ("b", rule("true", &["a"]))]);
        let graph = RuleSet::from_config(&cfg);
        assert_eq!(resolve_terminal_rule(&cfg, &graph, None).unwrap(), "b");
    }

    #[test]
    fn cli_rule_beats_config_root() {
        let cfg = config(
            Some("b"),
            &[("a", rule("true", &[])), ("b", rule("true", &["a"]))],
        );
        let graph = RuleSet::from_config(&cfg);
        assert_eq!(resolve_terminal_rule(&cfg, &graph, Some("a")).unwrap(), "a");
        assert_eq!(resolve_terminal_rule(&cfg, &graph, None).unwrap(), "b");
        assert!(matches!(
            resolve_terminal_rule(&cfg, &graph, Some("zzz")),
            Err(RuleflowError::UnknownRule(_))
        ));
    }

    #[test]
    fn several_sinks_need_an_explicit_root() {
        let cfg = config(None, &[("a", rule("true", &[])), ("b", rule("true", &[]))]);
        let graph = RuleSet::from_config(&cfg);
        assert!(matches!(
            resolve_terminal_rule(&cfg, &graph, None),
            Err(RuleflowError::ConfigError(_))
        ));
    }
}
