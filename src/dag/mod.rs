// src/dag/mod.rs

//! Rule graph representation and dependency bookkeeping.
//!
//! - [`rule`] defines a single rule.
//! - [`graph`] holds the [`RuleGraph`] accessor trait and the in-memory
//!   [`RuleSet`] built from config.
//! - [`store`] is the per-run result store that records rule outputs.
//! - [`readiness`] decides which pending rules have all their inputs.

pub mod graph;
pub mod readiness;
pub mod rule;
pub mod store;

pub use graph::{RuleGraph, RuleSet};
pub use readiness::{is_ready, ready_rules};
pub use rule::Rule;
pub use store::ResultStore;
