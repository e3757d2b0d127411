//! Source location tracking for diagnostics and `CMAKE_CURRENT_LIST_LINE`
//!
//! Provides the scanner position type and the file/line location attached
//! to every parsed invocation.

use std::fmt;
use std::sync::Arc;

/// Scanner position: 1-based line and column, byte offset into the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl Position {
    pub fn new() -> Self {
        Self {
            line: 1,
            column: 1,
            offset: 0,
        }
    }

    /// Step over `ch`; a newline starts the next line.
    pub fn advance(&mut self, ch: char) {
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

/// File and line of an invocation.
///
/// The file name is shared between all invocations parsed from the same file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Location {
    pub file: Arc<str>,
    pub line: usize,
}

impl Location {
    pub fn new(file: impl Into<Arc<str>>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_tracks_lines_and_bytes() {
        let mut pos = Position::default();
        for ch in "ab\né".chars() {
            pos.advance(ch);
        }
        assert_eq!((pos.line, pos.column, pos.offset), (2, 2, 5));
    }

    #[test]
    fn test_location_display() {
        let loc = Location::new("CMakeLists.txt", 12);
        assert_eq!(loc.to_string(), "CMakeLists.txt:12");
    }
}
