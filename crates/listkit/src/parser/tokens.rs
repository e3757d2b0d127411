//! Token types for the lexer

use std::fmt;

/// Token types produced by the lexer.
///
/// Argument tokens keep their raw text: escape sequences and variable
/// references are resolved at execution time, not here.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A bare word: command name or unquoted argument
    Word(String),

    /// A double-quoted argument (delimiters stripped)
    Quoted(String),

    /// A bracket argument `[=[...]=]` (delimiters stripped, verbatim)
    Bracket(String),

    /// Left parenthesis (()
    LeftParen,

    /// Right parenthesis ())
    RightParen,

    /// Run of spaces, tabs or carriage returns
    Space,

    /// Newline character
    Newline,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => write!(f, "\"{}\"", w),
            Token::Quoted(_) => write!(f, "quoted argument"),
            Token::Bracket(_) => write!(f, "bracket argument"),
            Token::LeftParen => write!(f, "'('"),
            Token::RightParen => write!(f, "')'"),
            Token::Space => write!(f, "whitespace"),
            Token::Newline => write!(f, "newline"),
        }
    }
}
