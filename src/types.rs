// src/types.rs

use std::fmt;

/// Canonical rule name type used throughout the crate.
pub type RuleName = String;

/// Opaque locator for data produced by a completed job.
///
/// The scheduler never looks inside an `OutputRef`; it only moves them from
/// the job that produced them to the jobs that consume them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputRef(String);

impl OutputRef {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OutputRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for OutputRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}
