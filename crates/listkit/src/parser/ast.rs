//! Parsed listfile types
//!
//! An invocation is immutable once parsed. Interpretation (expansion,
//! dispatch) happens entirely in the interpreter.

use std::fmt;
use std::sync::Arc;

use super::span::Location;

/// How an argument was written, which decides whether variable expansion
/// and list splitting apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delimiter {
    /// Bare word: expanded, then split on `;` into zero or more arguments
    Unquoted,
    /// `"..."`: expanded, whitespace preserved, always exactly one argument
    Quoted,
    /// `[[...]]`: verbatim, no expansion, no escapes
    Bracket,
}

/// A raw argument token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub value: String,
    pub delimiter: Delimiter,
    pub line: usize,
}

impl Argument {
    pub fn new(value: impl Into<String>, delimiter: Delimiter, line: usize) -> Self {
        Self {
            value: value.into(),
            delimiter,
            line,
        }
    }

    pub fn unquoted(value: impl Into<String>, line: usize) -> Self {
        Self::new(value, Delimiter::Unquoted, line)
    }

    pub fn quoted(value: impl Into<String>, line: usize) -> Self {
        Self::new(value, Delimiter::Quoted, line)
    }

    pub fn is_quoted(&self) -> bool {
        self.delimiter != Delimiter::Unquoted
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.delimiter {
            Delimiter::Unquoted => write!(f, "{}", self.value),
            Delimiter::Quoted => write!(f, "\"{}\"", self.value),
            Delimiter::Bracket => write!(f, "[[{}]]", self.value),
        }
    }
}

/// A single parsed command call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Command name as written (lookup is case-insensitive)
    pub name: String,
    pub arguments: Vec<Argument>,
    pub location: Location,
}

impl Invocation {
    pub fn new(name: impl Into<String>, arguments: Vec<Argument>, location: Location) -> Self {
        Self {
            name: name.into(),
            arguments,
            location,
        }
    }

    /// Lowercased name used for dispatch.
    pub fn lookup_name(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    pub fn line(&self) -> usize {
        self.location.line
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

/// A parsed listfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFile {
    pub path: Arc<str>,
    pub invocations: Vec<Invocation>,
}
