// tests/config_loading.rs

use std::io::Write;
use std::time::Duration;

use ruleflow::config::{load_and_validate, ConfigFile};
use ruleflow::dag::{RuleGraph, RuleSet};
use ruleflow::engine::ExecutionSettings;
use ruleflow::errors::RuleflowError;
use ruleflow::types::OutputRef;
use ruleflow_test_utils::builders::{ConfigFileBuilder, RuleConfigBuilder};
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn loads_rules_with_defaults() {
    let file = write_config(
        r#"
[rule.fetch]
cmd = "echo fetched"
sources = ["s3://bucket/a", "s3://bucket/b"]
min_inputs = 1

[rule.report]
cmd = "echo report"
sub_rules = ["fetch"]
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.config.poll_interval_ms, 5000);
    assert!(cfg.config.root.is_none());
    assert_eq!(
        ExecutionSettings::from_config(&cfg.config).poll_interval,
        Duration::from_secs(5)
    );

    let graph = RuleSet::from_config(&cfg);
    let fetch = graph.rule("fetch").unwrap();
    assert_eq!(fetch.min_inputs, 1);
    assert_eq!(
        fetch.sources,
        vec![OutputRef::from("s3://bucket/a"), OutputRef::from("s3://bucket/b")]
    );
    assert_eq!(graph.flatten("report").unwrap(), vec!["fetch", "report"]);
}

#[test]
fn cycle_returns_structured_error() {
    let file = write_config(
        r#"
[rule.A]
cmd = "echo A"
sub_rules = ["B"]

[rule.B]
cmd = "echo B"
sub_rules = ["A"]
"#,
    );

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, RuleflowError::DagCycle(_)), "got {err:?}");
}

#[test]
fn unknown_sub_rule_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_rule("A", RuleConfigBuilder::new("echo A").sub_rule("ghost").build())
        .build_raw();

    let err = ConfigFile::try_from(raw).unwrap_err();
    match err {
        RuleflowError::ConfigError(msg) => assert!(msg.contains("ghost")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn self_dependency_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_rule("A", RuleConfigBuilder::new("echo A").sub_rule("A").build())
        .build_raw();

    assert!(matches!(
        ConfigFile::try_from(raw),
        Err(RuleflowError::ConfigError(_))
    ));
}

#[test]
fn zero_poll_interval_and_unknown_root_are_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_rule("A", RuleConfigBuilder::new("echo A").build())
        .poll_interval_ms(0)
        .build_raw();
    assert!(matches!(
        ConfigFile::try_from(raw),
        Err(RuleflowError::ConfigError(_))
    ));

    let raw = ConfigFileBuilder::new()
        .with_rule("A", RuleConfigBuilder::new("echo A").build())
        .root("B")
        .build_raw();
    assert!(matches!(
        ConfigFile::try_from(raw),
        Err(RuleflowError::ConfigError(_))
    ));
}

#[test]
fn empty_config_is_rejected() {
    let file = write_config("[config]\npoll_interval_ms = 100\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(RuleflowError::ConfigError(_))
    ));
}

#[test]
fn invalid_toml_surfaces_as_toml_error() {
    let file = write_config("[rule.A\ncmd = ");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(RuleflowError::TomlError(_))
    ));
}
