//! Interpreter state types

use crate::diagnostics::{Diagnostic, Severity};
use crate::error::Error;
use crate::graph::BuildGraph;

/// Signal returned by every dispatch and inspected by the loop driver.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExecStatus {
    /// Keep going with the next invocation
    #[default]
    Normal,
    /// `return()`: stop the current function, macro caller or file
    Return,
    /// `break()`: leave the innermost loop
    Break,
    /// `continue()`: next iteration of the innermost loop
    Continue,
    /// The command failed with this message. In project mode the failure is
    /// recorded and the run continues (and ends failed); in script mode it
    /// is fatal.
    Error(String),
}

impl ExecStatus {
    /// Whether the status stops the current frame.
    pub fn interrupts(&self) -> bool {
        !matches!(self, ExecStatus::Normal)
    }
}

/// Outcome of one run.
#[derive(Debug, Default)]
pub struct RunResult {
    /// `message()` output (STATUS and NOTICE lines)
    pub output: String,
    /// Every warning and error reported, in order
    pub diagnostics: Vec<Diagnostic>,
    /// Directories and targets declared (empty in script mode)
    pub graph: BuildGraph,
    /// First fatal error, if the run was aborted
    pub error: Option<Error>,
}

impl RunResult {
    /// True when no fatal error occurred and no error diagnostic was issued.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && !self.diagnostics.iter().any(|d| d.severity.is_error())
    }

    /// Diagnostics of one severity.
    pub fn diagnostics_of(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.severity == severity)
    }

    /// Warning messages, for quick assertions.
    pub fn warnings(&self) -> Vec<&str> {
        self.diagnostics
            .iter()
            .filter(|d| !d.severity.is_error())
            .map(|d| d.message.as_str())
            .collect()
    }

    /// Error messages (fatal and non-fatal).
    pub fn errors(&self) -> Vec<&str> {
        self.diagnostics_of(Severity::Error)
            .map(|d| d.message.as_str())
            .collect()
    }
}
