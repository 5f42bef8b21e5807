//! Core result types shared by checks, the run loop and renderers.
//!
//! - `Diagnostic` - raw output of a check function
//! - `Report` - a diagnostic enriched with the check identity and the object
//! - `Summary` / `LintResult` - what a run hands back to the caller

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::CheckSpec;
use crate::context::Object;

/// A diagnostic message produced by a check.
///
/// This is the raw output from a check function before it's
/// enriched with context information.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The diagnostic message describing the issue.
    pub message: String,
}

impl Diagnostic {
    /// Create a new diagnostic with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for Diagnostic {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for Diagnostic {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A finding: one diagnostic raised by a named check against an object.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report<'a> {
    pub diagnostic: Diagnostic,
    pub check: String,
    pub remediation: String,
    pub object: &'a Object,
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    Passed,
    Failed,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "Passed",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub checks_status: CheckStatus,
    pub check_end_time: DateTime<Utc>,
    /// Engine version that produced the result.
    pub version: &'static str,
}

/// Result of running a set of checks over one or more lint contexts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LintResult<'a> {
    /// The checks that ran, in run order.
    pub checks: Vec<CheckSpec>,
    pub reports: Vec<Report<'a>>,
    pub summary: Summary,
}

impl<'a> LintResult<'a> {
    /// Check if there are any findings.
    pub fn has_failures(&self) -> bool {
        !self.reports.is_empty()
    }

    /// Findings raised by one check, in traversal order.
    pub fn reports_for<'s>(&'s self, check: &'s str) -> impl Iterator<Item = &'s Report<'a>> + 's {
        self.reports.iter().filter(move |r| r.check == check)
    }
}
