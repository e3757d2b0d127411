//! Argument expansion
//!
//! Resolves `${name}`, `$ENV{name}` and `$CACHE{name}` references and
//! escape sequences in raw argument tokens, then splits unquoted
//! arguments into list elements.
//!
//! A substituted value that itself contains references is expanded again.
//! Re-expansion tracks the chain of variable names being resolved: a name
//! that reappears on its own chain is a reference cycle, and chains longer
//! than the configured depth are rejected, so expansion always terminates.

use std::collections::BTreeMap;
use std::fmt;

use super::scope::ScopeStack;
use crate::parser::{Argument, Delimiter};

/// Why an expansion failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandError {
    /// `${` without a closing `}`
    Unterminated(String),
    /// A variable's value refers back to itself, directly or indirectly
    Cycle(Vec<String>),
    /// Re-expansion nested deeper than the limit
    TooDeep(usize),
}

impl fmt::Display for ExpandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpandError::Unterminated(text) => {
                write!(f, "unterminated variable reference in \"{}\"", text)
            }
            ExpandError::Cycle(chain) => {
                write!(f, "variable reference cycle: {}", chain.join(" -> "))
            }
            ExpandError::TooDeep(limit) => write!(
                f,
                "variable values nest more than {} levels of references",
                limit
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefKind {
    Normal,
    Env,
    Cache,
}

/// Recognize a reference opener at the start of `chars`.
fn ref_start(chars: &[char]) -> Option<(RefKind, usize)> {
    const OPENERS: [(&str, RefKind); 3] = [
        ("${", RefKind::Normal),
        ("$ENV{", RefKind::Env),
        ("$CACHE{", RefKind::Cache),
    ];
    OPENERS.iter().find_map(|(open, kind)| {
        let len = open.chars().count();
        let matches = chars.len() >= len && open.chars().zip(chars).all(|(a, &b)| a == b);
        matches.then_some((*kind, len))
    })
}

/// Whether `text` contains any reference opener.
pub fn has_reference(text: &str) -> bool {
    text.contains("${") || text.contains("$ENV{") || text.contains("$CACHE{")
}

/// Resolves references against a scope stack.
pub struct Expander<'a> {
    vars: &'a ScopeStack,
    env: &'a BTreeMap<String, String>,
    computed: &'a [(&'a str, String)],
    max_depth: usize,
    lenient: bool,
}

impl<'a> Expander<'a> {
    pub fn new(vars: &'a ScopeStack, env: &'a BTreeMap<String, String>, max_depth: usize) -> Self {
        Self {
            vars,
            env,
            computed: &[],
            max_depth,
            lenient: false,
        }
    }

    /// Variables whose value is computed on read rather than stored.
    pub fn with_computed(mut self, computed: &'a [(&'a str, String)]) -> Self {
        self.computed = computed;
        self
    }

    /// Keep unterminated `${` as literal text instead of failing.
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    /// Expand one raw argument into zero or more arguments.
    pub fn expand_argument(&self, arg: &Argument) -> Result<Vec<String>, ExpandError> {
        match arg.delimiter {
            Delimiter::Bracket => Ok(vec![arg.value.clone()]),
            Delimiter::Quoted => Ok(vec![self.expand_source(&arg.value)?]),
            Delimiter::Unquoted => {
                let expanded = self.expand_source(&arg.value)?;
                Ok(split_list(&expanded, false))
            }
        }
    }

    /// Expand one raw argument into exactly one string, without list
    /// splitting (what `if()` operands use).
    pub fn expand_single(&self, arg: &Argument) -> Result<String, ExpandError> {
        match arg.delimiter {
            Delimiter::Bracket => Ok(arg.value.clone()),
            _ => self.expand_source(&arg.value),
        }
    }

    /// Expand references in listfile source text, processing escapes.
    pub fn expand_source(&self, text: &str) -> Result<String, ExpandError> {
        self.expand_text(text, true, &mut Vec::new())
    }

    /// Expand references in a plain value. Escapes are left alone, so a
    /// value without references comes back unchanged.
    pub fn expand_str(&self, text: &str) -> Result<String, ExpandError> {
        if !has_reference(text) {
            return Ok(text.to_string());
        }
        self.expand_text(text, false, &mut Vec::new())
    }

    fn expand_text(
        &self,
        text: &str,
        escapes: bool,
        chain: &mut Vec<String>,
    ) -> Result<String, ExpandError> {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        let mut i = 0;

        while let Some(&c) = chars.get(i) {
            if escapes && c == '\\' {
                match chars.get(i + 1) {
                    None => out.push('\\'),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    // kept escaped so list splitting can tell it apart
                    Some(';') => out.push_str("\\;"),
                    // line continuation
                    Some('\n') => {}
                    Some(&other) => out.push(other),
                }
                i += 2;
                continue;
            }

            if c == '$' {
                if let Some((kind, open_len)) = chars.get(i..).and_then(ref_start) {
                    match self.parse_reference(&chars, i + open_len, escapes, chain)? {
                        Some((name, end)) => {
                            out.push_str(&self.lookup(kind, &name, chain)?);
                            i = end;
                            continue;
                        }
                        None if self.lenient => {}
                        None => return Err(ExpandError::Unterminated(text.to_string())),
                    }
                }
            }

            out.push(c);
            i += 1;
        }

        Ok(out)
    }

    /// Parse a reference name starting after its opener. Nested references
    /// in the name are resolved first. Returns the name and the index just
    /// past the closing `}`, or `None` if the reference never closes.
    fn parse_reference(
        &self,
        chars: &[char],
        start: usize,
        escapes: bool,
        chain: &mut Vec<String>,
    ) -> Result<Option<(String, usize)>, ExpandError> {
        let mut name = String::new();
        let mut j = start;

        while let Some(&c) = chars.get(j) {
            match c {
                '}' => return Ok(Some((name, j + 1))),
                '$' => {
                    if let Some((kind, open_len)) = chars.get(j..).and_then(ref_start) {
                        let Some((inner, end)) =
                            self.parse_reference(chars, j + open_len, escapes, chain)?
                        else {
                            return Ok(None);
                        };
                        name.push_str(&self.lookup(kind, &inner, chain)?);
                        j = end;
                        continue;
                    }
                    name.push(c);
                    j += 1;
                }
                '\\' if escapes => {
                    if let Some(&escaped) = chars.get(j + 1) {
                        name.push(escaped);
                    }
                    j += 2;
                }
                _ => {
                    name.push(c);
                    j += 1;
                }
            }
        }

        Ok(None)
    }

    fn lookup(
        &self,
        kind: RefKind,
        name: &str,
        chain: &mut Vec<String>,
    ) -> Result<String, ExpandError> {
        let value = match kind {
            RefKind::Env => return Ok(self.env.get(name).cloned().unwrap_or_default()),
            RefKind::Cache => self.vars.process_value(name).unwrap_or(""),
            RefKind::Normal => self
                .computed
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.as_str())
                .unwrap_or_else(|| self.vars.get(name)),
        };

        if !has_reference(value) {
            return Ok(value.to_string());
        }

        if chain.iter().any(|n| n == name) {
            let mut cycle = chain.clone();
            cycle.push(name.to_string());
            return Err(ExpandError::Cycle(cycle));
        }
        if chain.len() >= self.max_depth {
            return Err(ExpandError::TooDeep(self.max_depth));
        }

        chain.push(name.to_string());
        let expanded = self.expand_text(value, false, chain);
        chain.pop();
        expanded
    }
}

/// Split a value into list elements on unescaped `;` outside square
/// brackets. `\;` becomes a literal `;`.
pub fn split_list(value: &str, keep_empty: bool) -> Vec<String> {
    let mut items = Vec::new();
    if value.is_empty() {
        return items;
    }

    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&';') => {
                chars.next();
                current.push(';');
            }
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' if depth > 0 => {
                depth -= 1;
                current.push(c);
            }
            ';' if depth == 0 => {
                if keep_empty || !current.is_empty() {
                    items.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
            }
            _ => current.push(c),
        }
    }
    if keep_empty || !current.is_empty() {
        items.push(current);
    }
    items
}

/// Join list elements into a value.
pub fn join_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(";")
}
