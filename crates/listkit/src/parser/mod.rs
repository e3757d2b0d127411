//! Parser module for Listkit
//!
//! Turns listfile text into an ordered sequence of invocations
//! (`name(arg arg ...)`). Parsing is pure: no scope access, no side effects.

mod ast;
mod lexer;
mod span;
mod tokens;

pub use ast::{Argument, Delimiter, Invocation, ListFile};
pub use lexer::{LexError, Lexer};
pub use span::{Location, Position};

use std::sync::Arc;

use crate::error::{Error, Result};
use lexer::SpannedToken;
use tokens::Token;

/// Parse `text` as the listfile `file`.
pub fn parse(text: &str, file: &str) -> Result<Vec<Invocation>> {
    Parser::new(text, file).parse().map(|list| list.invocations)
}

/// Parser for listfiles.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    file: Arc<str>,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given input.
    pub fn new(input: &'a str, file: &str) -> Self {
        Self {
            lexer: Lexer::new(input),
            file: Arc::from(file),
        }
    }

    /// Parse the whole input.
    pub fn parse(mut self) -> Result<ListFile> {
        let mut invocations = Vec::new();

        while let Some(tok) = self.next()? {
            match tok.token {
                Token::Space | Token::Newline => continue,
                Token::Word(name) => {
                    let line = tok.start.line;
                    if !is_identifier(&name) {
                        return Err(self.error(line, format!("invalid command name \"{}\"", name)));
                    }
                    self.expect_open_paren(&name, line)?;
                    let arguments = self.parse_arguments(&name, line)?;
                    invocations.push(Invocation::new(
                        name,
                        arguments,
                        Location::new(Arc::clone(&self.file), line),
                    ));
                }
                Token::LeftParen => {
                    return Err(self.error(tok.start.line, "expected a command name before '('"));
                }
                other => {
                    return Err(self.error(
                        tok.start.line,
                        format!("expected a command name, got {}", other),
                    ));
                }
            }
        }

        Ok(ListFile {
            path: self.file,
            invocations,
        })
    }

    fn next(&mut self) -> Result<Option<SpannedToken>> {
        self.lexer
            .next_token()
            .map_err(|e| Error::parse_at(&*self.file, e.line, e.message))
    }

    fn error(&self, line: usize, message: impl Into<String>) -> Error {
        Error::parse_at(&*self.file, line, message)
    }

    fn expect_open_paren(&mut self, name: &str, line: usize) -> Result<()> {
        loop {
            match self.next()? {
                Some(SpannedToken {
                    token: Token::Space,
                    ..
                }) => continue,
                Some(SpannedToken {
                    token: Token::LeftParen,
                    ..
                }) => return Ok(()),
                Some(other) => {
                    return Err(self.error(
                        other.start.line,
                        format!("expected '(' after command name \"{}\", got {}", name, other.token),
                    ));
                }
                None => {
                    return Err(self.error(
                        line,
                        format!("expected '(' after command name \"{}\"", name),
                    ));
                }
            }
        }
    }

    /// Parse arguments up to the `)` that balances the invocation's `(`.
    ///
    /// Nested parentheses become standalone `(` / `)` unquoted arguments.
    fn parse_arguments(&mut self, name: &str, open_line: usize) -> Result<Vec<Argument>> {
        let mut arguments = Vec::new();
        let mut depth = 0usize;

        loop {
            let Some(tok) = self.next()? else {
                return Err(self.error(
                    open_line,
                    format!("unbalanced parentheses: \"{}(\" is never closed", name),
                ));
            };
            let line = tok.start.line;
            match tok.token {
                Token::Space | Token::Newline => {}
                Token::LeftParen => {
                    depth += 1;
                    arguments.push(Argument::unquoted("(", line));
                }
                Token::RightParen => {
                    if depth == 0 {
                        return Ok(arguments);
                    }
                    depth -= 1;
                    arguments.push(Argument::unquoted(")", line));
                }
                Token::Word(w) => arguments.push(Argument::new(w, Delimiter::Unquoted, line)),
                Token::Quoted(q) => arguments.push(Argument::new(q, Delimiter::Quoted, line)),
                Token::Bracket(b) => arguments.push(Argument::new(b, Delimiter::Bracket, line)),
            }
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
