//! Diagnostics reported during a run
//!
//! Warnings accumulate and are all reported even when the run succeeds.
//! Non-fatal errors (`message(SEND_ERROR)`, recoverable command failures in
//! project mode) are recorded here too and mark the run as failed; the
//! first fatal error is additionally returned as the run's error.

use std::fmt;

use serde::Serialize;

use crate::parser::Location;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    /// Warnings aimed at project authors (`message(AUTHOR_WARNING)`)
    AuthorWarning,
    Deprecation,
    Error,
}

impl Severity {
    pub fn is_error(self) -> bool {
        self == Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Warning => "Warning",
            Severity::AuthorWarning => "Warning (dev)",
            Severity::Deprecation => "Deprecation Warning",
            Severity::Error => "Error",
        };
        f.write_str(s)
    }
}

/// A single reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Invocation that raised it, when known
    pub location: Option<Location>,
    /// Enclosing call sites (function, macro, include, subdirectory), most
    /// recent first
    pub backtrace: Vec<Location>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            location: None,
            backtrace: Vec::new(),
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_backtrace(mut self, backtrace: Vec<Location>) -> Self {
        self.backtrace = backtrace;
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} at {}:\n  {}", self.severity, location, self.message)?,
            None => write!(f, "{}:\n  {}", self.severity, self.message)?,
        }
        if !self.backtrace.is_empty() {
            write!(f, "\nCall Stack (most recent call first):")?;
            for site in &self.backtrace {
                write!(f, "\n  {}", site)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_location_and_backtrace() {
        let diag = Diagnostic::new(Severity::Warning, "careful")
            .at(Location::new("/src/helpers.cmake", 3))
            .with_backtrace(vec![Location::new("/src/CMakeLists.txt", 10)]);
        assert_eq!(
            diag.to_string(),
            "Warning at /src/helpers.cmake:3:\n  careful\n\
             Call Stack (most recent call first):\n  /src/CMakeLists.txt:10"
        );
    }

    #[test]
    fn test_display_without_location() {
        let diag = Diagnostic::new(Severity::Error, "bad");
        assert_eq!(diag.to_string(), "Error:\n  bad");
        assert!(diag.severity.is_error());
    }
}
