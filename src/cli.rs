// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `ruleflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ruleflow",
    version,
    about = "Run a graph of dependent rules, independent rules in parallel.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the rule file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Terminal rule to execute.
    ///
    /// Overrides `[config].root`. If neither is set, the single rule that no
    /// other rule depends on is used.
    #[arg(long, value_name = "NAME")]
    pub rule: Option<String>,

    /// Bounded wait per backend poll, in milliseconds.
    ///
    /// Overrides `[config].poll_interval_ms`.
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_ms: Option<u64>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RULEFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the run order, but don't execute any rules.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_ruleflow_toml() {
        let args = CliArgs::try_parse_from(["ruleflow"]).unwrap();
        assert_eq!(args.config, default_config_path());
        assert_eq!(args.config, PathBuf::from("Ruleflow.toml"));
        assert!(args.rule.is_none());
        assert!(!args.dry_run);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        assert!(CliArgs::try_parse_from(["ruleflow", "--poll-interval-ms", "0"]).is_err());
        let args = CliArgs::try_parse_from(["ruleflow", "--poll-interval-ms", "250"]).unwrap();
        assert_eq!(args.poll_interval_ms, Some(250));
    }
}
