#![allow(dead_code)]

use std::collections::BTreeMap;

use ruleflow::config::{ConfigFile, ConfigSection, RawConfigFile, RuleConfig};
use ruleflow::dag::{Rule, RuleSet};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                rule: BTreeMap::new(),
            },
        }
    }

    pub fn with_rule(mut self, name: &str, rule: RuleConfig) -> Self {
        self.config.rule.insert(name.to_string(), rule);
        self
    }

    pub fn root(mut self, name: &str) -> Self {
        self.config.config.root = Some(name.to_string());
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.config.poll_interval_ms = ms;
        self
    }

    /// The unvalidated config, for tests that exercise validation.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RuleConfig`.
pub struct RuleConfigBuilder {
    rule: RuleConfig,
}

impl RuleConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            rule: RuleConfig {
                cmd: cmd.to_string(),
                sub_rules: vec![],
                sources: vec![],
                min_inputs: 0,
            },
        }
    }

    pub fn sub_rule(mut self, name: &str) -> Self {
        self.rule.sub_rules.push(name.to_string());
        self
    }

    pub fn source(mut self, source: &str) -> Self {
        self.rule.sources.push(source.to_string());
        self
    }

    pub fn min_inputs(mut self, n: usize) -> Self {
        self.rule.min_inputs = n;
        self
    }

    pub fn build(self) -> RuleConfig {
        self.rule
    }
}

/// A rule running `true` with the given sub-rules.
pub fn rule(name: &str, sub_rules: &[&str]) -> Rule {
    sub_rules
        .iter()
        .fold(Rule::new(name, "true"), |rule, sub| rule.with_sub_rule(*sub))
}

/// Shorthand for `RuleSet::from_rules`.
pub fn rule_set(rules: impl IntoIterator<Item = Rule>) -> RuleSet {
    RuleSet::from_rules(rules)
}
