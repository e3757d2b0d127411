//! Lexer for listfiles
//!
//! Tokenizes input into a stream of tokens with source position tracking.
//! Line comments (`# ...`) and bracket comments (`#[[ ... ]]`) are skipped
//! here and never reach the parser.

use super::span::Position;
use super::tokens::Token;

/// A token with the position it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub start: Position,
}

/// Lexical error: unterminated quoted or bracket region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub line: usize,
    pub message: String,
}

impl LexError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Lexer for listfiles.
pub struct Lexer<'a> {
    input: &'a str,
    /// Current position in the input
    position: Position,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            position: Position::new(),
        }
    }

    /// Get the current position in the input.
    pub fn position(&self) -> Position {
        self.position
    }

    fn rest(&self) -> &'a str {
        self.input.get(self.position.offset..).unwrap_or("")
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek_char();
        if let Some(c) = ch {
            self.position.advance(c);
        }
        ch
    }

    /// Get the next token, skipping comments.
    pub fn next_token(&mut self) -> Result<Option<SpannedToken>, LexError> {
        loop {
            let start = self.position;
            let Some(ch) = self.peek_char() else {
                return Ok(None);
            };

            let token = match ch {
                ' ' | '\t' | '\r' => {
                    while matches!(self.peek_char(), Some(' ' | '\t' | '\r')) {
                        self.advance();
                    }
                    Token::Space
                }
                '\n' => {
                    self.advance();
                    Token::Newline
                }
                '#' => {
                    self.skip_comment(start)?;
                    continue;
                }
                '(' => {
                    self.advance();
                    Token::LeftParen
                }
                ')' => {
                    self.advance();
                    Token::RightParen
                }
                '"' => Token::Quoted(self.read_quoted(start)?),
                '[' => match bracket_level(self.rest()) {
                    Some(level) => Token::Bracket(self.read_bracket(level, start, "argument")?),
                    None => Token::Word(self.read_unquoted(start)?),
                },
                _ => Token::Word(self.read_unquoted(start)?),
            };

            return Ok(Some(SpannedToken { token, start }));
        }
    }

    /// Skip a `#` line comment or a `#[[...]]` bracket comment.
    fn skip_comment(&mut self, start: Position) -> Result<(), LexError> {
        self.advance(); // consume '#'
        if let Some(level) = bracket_level(self.rest()) {
            self.read_bracket(level, start, "comment")?;
            return Ok(());
        }
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
        Ok(())
    }

    /// Read a bracket region whose opener `[` `=`*level `[` starts at the cursor.
    fn read_bracket(
        &mut self,
        level: usize,
        start: Position,
        what: &str,
    ) -> Result<String, LexError> {
        // consume the opener
        for _ in 0..level + 2 {
            self.advance();
        }
        // a newline directly after the opener is not part of the content
        if self.rest().starts_with("\r\n") {
            self.advance();
            self.advance();
        } else if self.peek_char() == Some('\n') {
            self.advance();
        }

        let closer = format!("]{}]", "=".repeat(level));
        let Some(len) = self.rest().find(&closer) else {
            // leave the cursor at EOF so callers never loop
            while self.advance().is_some() {}
            return Err(LexError::new(
                start.line,
                format!("unterminated bracket {}", what),
            ));
        };

        let content = self.rest().get(..len).unwrap_or("").to_string();
        for c in content.chars() {
            self.position.advance(c);
        }
        for c in closer.chars() {
            self.position.advance(c);
        }
        Ok(content)
    }

    /// Read a quoted argument, keeping escape sequences raw.
    fn read_quoted(&mut self, start: Position) -> Result<String, LexError> {
        self.advance(); // consume opening quote
        let mut content = String::new();
        loop {
            match self.advance() {
                Some('"') => return Ok(content),
                Some('\\') => {
                    content.push('\\');
                    match self.advance() {
                        Some(c) => content.push(c),
                        None => break,
                    }
                }
                Some(c) => content.push(c),
                None => break,
            }
        }
        Err(LexError::new(start.line, "unterminated quoted argument"))
    }

    /// Read an unquoted word.
    ///
    /// A `"` in the middle of a word opens a legacy quoted segment that is
    /// kept literally, so `-DX="a b"` stays one word.
    fn read_unquoted(&mut self, start: Position) -> Result<String, LexError> {
        let mut word = String::new();
        while let Some(c) = self.peek_char() {
            match c {
                ' ' | '\t' | '\r' | '\n' | '(' | ')' | '#' => break,
                '\\' => {
                    self.advance();
                    word.push('\\');
                    match self.advance() {
                        Some(escaped) => word.push(escaped),
                        None => {
                            return Err(LexError::new(
                                start.line,
                                "unterminated escape sequence at end of input",
                            ));
                        }
                    }
                }
                '"' if word.is_empty() => break,
                '"' => {
                    self.advance();
                    word.push('"');
                    loop {
                        match self.advance() {
                            Some('"') => {
                                word.push('"');
                                break;
                            }
                            Some(other) => word.push(other),
                            None => {
                                return Err(LexError::new(
                                    start.line,
                                    "unterminated quoted argument",
                                ));
                            }
                        }
                    }
                }
                _ => {
                    self.advance();
                    word.push(c);
                }
            }
        }
        Ok(word)
    }
}

/// If `text` starts with a bracket opener (`[`, any number of `=`, `[`),
/// return the number of `=` signs.
fn bracket_level(text: &str) -> Option<usize> {
    let rest = text.strip_prefix('[')?;
    let level = rest.chars().take_while(|&c| c == '=').count();
    rest.get(level..)?.starts_with('[').then_some(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        while let Some(tok) = lexer.next_token().unwrap() {
            out.push(tok.token);
        }
        out
    }

    #[test]
    fn test_simple_invocation() {
        assert_eq!(
            tokens("set(X 1)"),
            vec![
                Token::Word("set".into()),
                Token::LeftParen,
                Token::Word("X".into()),
                Token::Space,
                Token::Word("1".into()),
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn test_quoted_keeps_escapes_raw() {
        assert_eq!(
            tokens(r#""a \"b\" ${c}""#),
            vec![Token::Quoted(r#"a \"b\" ${c}"#.into())]
        );
    }

    #[test]
    fn test_comment_skipped() {
        assert_eq!(
            tokens("# a comment\nfoo"),
            vec![Token::Newline, Token::Word("foo".into())]
        );
    }

    #[test]
    fn test_bracket_comment_spans_lines() {
        assert_eq!(
            tokens("#[[ line one\nline two ]]x"),
            vec![Token::Word("x".into())]
        );
    }

    #[test]
    fn test_bracket_argument_levels() {
        assert_eq!(
            tokens("[==[a ]] b]==]"),
            vec![Token::Bracket("a ]] b".into())]
        );
        assert_eq!(tokens("[[\nfirst]]"), vec![Token::Bracket("first".into())]);
    }

    #[test]
    fn test_plain_bracket_is_word() {
        assert_eq!(tokens("[abc]"), vec![Token::Word("[abc]".into())]);
    }

    #[test]
    fn test_legacy_quote_inside_word() {
        assert_eq!(
            tokens(r#"-DX="a b""#),
            vec![Token::Word(r#"-DX="a b""#.into())]
        );
    }

    #[test]
    fn test_hash_ends_word() {
        assert_eq!(tokens("a#b"), vec![Token::Word("a".into())]);
    }

    #[test]
    fn test_unterminated_quote_reports_opening_line() {
        let mut lexer = Lexer::new("\n\n\"abc\n");
        assert_eq!(lexer.next_token().unwrap().map(|t| t.token), Some(Token::Newline));
        assert_eq!(lexer.next_token().unwrap().map(|t| t.token), Some(Token::Newline));
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("unterminated quoted"));
    }

    #[test]
    fn test_unterminated_bracket() {
        let mut lexer = Lexer::new("[=[ never closed ]]");
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("bracket argument"));
        assert!(lexer.next_token().unwrap().is_none());
    }

    #[test]
    fn test_positions() {
        let mut lexer = Lexer::new("a\n  b");
        let first = lexer.next_token().unwrap().unwrap();
        assert_eq!(first.start.line, 1);
        lexer.next_token().unwrap(); // newline
        lexer.next_token().unwrap(); // space
        let b = lexer.next_token().unwrap().unwrap();
        assert_eq!(b.start.line, 2);
        assert_eq!(b.start.column, 3);
        assert_eq!(lexer.position().offset, 5);
    }
}
