//! Error types for Listkit
//!
//! This module provides error types for the interpreter with the following design goals:
//! - Human-readable error messages that point at the listfile line that failed
//! - One variant per failure category so embedders can react programmatically
//! - Execution-time errors carry the location of the innermost failing invocation

use crate::limits::LimitExceeded;
use crate::parser::Location;
use crate::policy::PolicyId;
use thiserror::Error;

/// Result type alias using Listkit's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Listkit error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed listfile syntax. Raised before any invocation of the file runs.
    #[error("{file}:{line}: parse error: {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },

    /// Variable reference cycle, runaway nesting or unterminated reference.
    #[error("expansion error: {0}")]
    Expansion(String),

    /// Unknown command name.
    #[error("unknown command \"{0}\"")]
    Dispatch(String),

    /// A policy whose effective setting is `ERROR` was consulted.
    #[error("policy {id} is set to ERROR: {message}")]
    Policy { id: PolicyId, message: String },

    /// A command reported a fatal failure.
    #[error("{command}: {message}")]
    Command { command: String, message: String },

    /// Resource limit exceeded (call depth, loop iterations, expansion depth).
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(#[from] LimitExceeded),

    /// The embedder raised the cancellation flag.
    #[error("run cancelled")]
    Cancelled,

    /// I/O error while reading a listfile.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error for unexpected failures (interpreter invariant broken).
    #[error("internal error: {0}")]
    Internal(String),

    /// An execution-time error tagged with the invocation that raised it.
    #[error("{location}: {source}")]
    At {
        location: Location,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a parse error with source location.
    pub fn parse_at(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    /// Create a fatal command error.
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Attach a location unless the error already carries one.
    ///
    /// Nested frames call this on the way out, so only the innermost
    /// invocation's location survives.
    pub fn located(self, location: &Location) -> Self {
        match self {
            Self::At { .. } | Self::Parse { .. } | Self::Cancelled => self,
            other => Self::At {
                location: location.clone(),
                source: Box::new(other),
            },
        }
    }

    /// The underlying error with any location wrapper removed.
    pub fn kind(&self) -> &Error {
        match self {
            Self::At { source, .. } => source.kind(),
            other => other,
        }
    }

    /// Where the error happened, if known.
    pub fn location(&self) -> Option<Location> {
        match self {
            Self::At { location, .. } => Some(location.clone()),
            Self::Parse { file, line, .. } => Some(Location::new(file.as_str(), *line)),
            _ => None,
        }
    }

    /// Message without the location prefix.
    pub fn message(&self) -> String {
        self.kind().to_string()
    }
}
