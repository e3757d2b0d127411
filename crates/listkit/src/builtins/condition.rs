//! Condition evaluation for if() and while()
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! or      := and ("OR" and)*
//! and     := not ("AND" not)*
//! not     := "NOT" not | test
//! test    := UNARY operand | operand (BINARY operand)?
//! operand := "(" or ")" | value
//! ```
//!
//! Keywords are only recognized in unquoted arguments; quoted arguments
//! that spell a keyword or name a variable consult CMP0054.

use std::cmp::Ordering;
use std::path::Path;

use regex::Regex;

use super::{Context, is_off, is_on};
use crate::error::{Error, Result};
use crate::parser::{Argument, Delimiter, Location};
use crate::policy::{CMP0012, CMP0054, CMP0057, PolicyId, lookup};

const UNARY: &[&str] = &[
    "DEFINED",
    "COMMAND",
    "POLICY",
    "TARGET",
    "EXISTS",
    "IS_DIRECTORY",
    "IS_ABSOLUTE",
];

const BINARY: &[&str] = &[
    "EQUAL",
    "LESS",
    "GREATER",
    "LESS_EQUAL",
    "GREATER_EQUAL",
    "STREQUAL",
    "STRLESS",
    "STRGREATER",
    "STRLESS_EQUAL",
    "STRGREATER_EQUAL",
    "VERSION_EQUAL",
    "VERSION_LESS",
    "VERSION_GREATER",
    "VERSION_LESS_EQUAL",
    "VERSION_GREATER_EQUAL",
    "MATCHES",
    "IN_LIST",
];

const MAX_MATCH_GROUPS: usize = 10;

#[derive(Debug, Clone)]
struct Token {
    value: String,
    quoted: bool,
}

/// Evaluate the raw arguments of an `if`/`elseif`/`while` recorded at
/// `location`.
pub fn evaluate_condition(
    ctx: &mut Context<'_>,
    args: &[Argument],
    location: &Location,
) -> Result<bool> {
    let mut tokens = Vec::with_capacity(args.len());
    for arg in args {
        let quoted = arg.delimiter != Delimiter::Unquoted;
        for value in ctx.expand_arguments_at(std::slice::from_ref(arg), location)? {
            tokens.push(Token { value, quoted });
        }
    }
    if tokens.is_empty() {
        return Ok(false);
    }

    let mut eval = Evaluator {
        ctx,
        tokens: &tokens,
        pos: 0,
        location,
    };
    let result = eval.or()?;
    if eval.pos < tokens.len() {
        return Err(eval.syntax_error());
    }
    Ok(result)
}

struct Evaluator<'c, 'a, 't> {
    ctx: &'c mut Context<'a>,
    tokens: &'t [Token],
    pos: usize,
    location: &'t Location,
}

impl Evaluator<'_, '_, '_> {
    fn syntax_error(&self) -> Error {
        let args: Vec<String> = self
            .tokens
            .iter()
            .map(|t| {
                if t.quoted {
                    format!("\"{}\"", t.value)
                } else {
                    t.value.clone()
                }
            })
            .collect();
        Error::command(
            "if",
            format!(
                "given arguments:\n    {}\n  Unknown arguments specified",
                args.join(" ")
            ),
        )
    }

    fn policy(&mut self, id: PolicyId) -> Result<bool> {
        Ok(self.ctx.policy_at(id, self.location)?.is_new())
    }

    /// Whether the token at `pos` is the keyword `keyword`.
    fn is_keyword_at(&mut self, pos: usize, keyword: &str) -> Result<bool> {
        let Some(token) = self.tokens.get(pos) else {
            return Ok(false);
        };
        if token.value != keyword {
            return Ok(false);
        }
        if !token.quoted {
            return Ok(true);
        }
        Ok(!self.policy(CMP0054)?)
    }

    fn keyword_in(&mut self, pos: usize, keywords: &[&'static str]) -> Result<Option<&'static str>> {
        for &keyword in keywords {
            if self.is_keyword_at(pos, keyword)? {
                return Ok(Some(keyword));
            }
        }
        Ok(None)
    }

    fn next(&mut self) -> Result<Token> {
        let Some(token) = self.tokens.get(self.pos).cloned() else {
            return Err(self.syntax_error());
        };
        self.pos += 1;
        Ok(token)
    }

    fn or(&mut self) -> Result<bool> {
        let mut value = self.and()?;
        while self.is_keyword_at(self.pos, "OR")? {
            self.pos += 1;
            let rhs = self.and()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn and(&mut self) -> Result<bool> {
        let mut value = self.not()?;
        while self.is_keyword_at(self.pos, "AND")? {
            self.pos += 1;
            let rhs = self.not()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn not(&mut self) -> Result<bool> {
        if self.is_keyword_at(self.pos, "NOT")? {
            self.pos += 1;
            return Ok(!self.not()?);
        }
        self.test()
    }

    fn test(&mut self) -> Result<bool> {
        if let Some(op) = self.keyword_in(self.pos, UNARY)? {
            self.pos += 1;
            let operand = self.next()?;
            return self.unary(op, &operand);
        }

        if self.is_keyword_at(self.pos, "(")? {
            self.pos += 1;
            let value = self.or()?;
            if !self.is_keyword_at(self.pos, ")")? {
                return Err(self.syntax_error());
            }
            self.pos += 1;
            return Ok(value);
        }

        let lhs = self.next()?;
        if let Some(op) = self.keyword_in(self.pos, BINARY)? {
            self.pos += 1;
            let rhs = self.next()?;
            return self.binary(op, &lhs, &rhs);
        }
        self.truth(&lhs)
    }

    /// Value of a variable the token names, if it may be dereferenced.
    fn dereference(&mut self, token: &Token) -> Result<Option<String>> {
        let Some(value) = self.ctx.definition(&token.value).map(str::to_string) else {
            return Ok(None);
        };
        if token.quoted && self.policy(CMP0054)? {
            return Ok(None);
        }
        Ok(Some(value))
    }

    /// Variable value or the literal itself.
    fn value_of(&mut self, token: &Token) -> Result<String> {
        Ok(self
            .dereference(token)?
            .unwrap_or_else(|| token.value.clone()))
    }

    /// Truthiness of a lone operand.
    fn truth(&mut self, token: &Token) -> Result<bool> {
        let is_constant = is_on(&token.value) || is_off(&token.value);
        let variable = self.dereference(token)?;

        let constant_result = is_on(&token.value);
        let variable_result = variable.as_deref().map(|v| !is_off(v)).unwrap_or(false);
        if !is_constant {
            return Ok(variable_result);
        }

        // Before CMP0012 only integers were constants.
        let old_result = match token.value.as_str() {
            "0" => false,
            _ if variable.is_none() && leading_integer(&token.value) != 0 => true,
            _ => variable_result,
        };
        if old_result == constant_result {
            return Ok(constant_result);
        }
        if self.policy(CMP0012)? {
            Ok(constant_result)
        } else {
            Ok(old_result)
        }
    }

    fn unary(&mut self, op: &str, operand: &Token) -> Result<bool> {
        let value = &operand.value;
        Ok(match op {
            "DEFINED" => {
                if let Some(name) = value.strip_prefix("ENV{").and_then(|v| v.strip_suffix('}')) {
                    self.ctx.env().contains_key(name)
                } else if let Some(name) =
                    value.strip_prefix("CACHE{").and_then(|v| v.strip_suffix('}'))
                {
                    self.ctx.vars().process_value(name).is_some()
                } else {
                    self.ctx.definition(value).is_some()
                }
            }
            "COMMAND" => self.ctx.has_command(value),
            "POLICY" => value.parse::<PolicyId>().ok().and_then(lookup).is_some(),
            "TARGET" => self.ctx.graph().has_target(value),
            "EXISTS" => !value.is_empty() && self.ctx.fs().exists(Path::new(value)),
            "IS_DIRECTORY" => !value.is_empty() && self.ctx.fs().is_dir(Path::new(value)),
            "IS_ABSOLUTE" => Path::new(value).is_absolute(),
            _ => return Err(self.syntax_error()),
        })
    }

    fn binary(&mut self, op: &str, lhs: &Token, rhs: &Token) -> Result<bool> {
        if op == "IN_LIST" {
            if !self.policy(CMP0057)? {
                return Err(Error::command(
                    "if",
                    "IN_LIST is not supported by the current policy setting (CMP0057)",
                ));
            }
            let needle = self.value_of(lhs)?;
            let list = self.ctx.get_list(&rhs.value);
            return Ok(list.contains(&needle));
        }

        let left = self.value_of(lhs)?;
        if op == "MATCHES" {
            return self.matches(&left, &rhs.value);
        }
        let right = self.value_of(rhs)?;

        if let Some(cmp) = op.strip_prefix("VERSION_") {
            let ord = compare_versions(&left, &right);
            return Ok(ordering_matches(cmp, ord));
        }

        if let Some(cmp) = op.strip_prefix("STR") {
            return Ok(ordering_matches(cmp, left.cmp(&right)));
        }

        let (Some(a), Some(b)) = (parse_number(&left), parse_number(&right)) else {
            return Ok(false);
        };
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Less);
        Ok(ordering_matches(op, ord))
    }

    fn matches(&mut self, text: &str, pattern: &str) -> Result<bool> {
        let regex = Regex::new(pattern).map_err(|e| {
            Error::command(
                "if",
                format!("Regular expression \"{}\" cannot compile: {}", pattern, e),
            )
        })?;
        for n in 0..MAX_MATCH_GROUPS {
            self.ctx.unset(&format!("CMAKE_MATCH_{}", n));
        }
        let Some(captures) = regex.captures(text) else {
            self.ctx.set("CMAKE_MATCH_COUNT", "0");
            return Ok(false);
        };
        let mut count = 0;
        for (n, group) in captures.iter().enumerate().take(MAX_MATCH_GROUPS) {
            if let Some(group) = group {
                self.ctx.set(&format!("CMAKE_MATCH_{}", n), group.as_str());
                if n > 0 {
                    count = n;
                }
            }
        }
        self.ctx.set("CMAKE_MATCH_COUNT", count.to_string());
        Ok(true)
    }
}

fn ordering_matches(op: &str, ord: Ordering) -> bool {
    match op {
        "EQUAL" => ord == Ordering::Equal,
        "LESS" => ord == Ordering::Less,
        "GREATER" => ord == Ordering::Greater,
        "LESS_EQUAL" => ord != Ordering::Greater,
        "GREATER_EQUAL" => ord != Ordering::Less,
        _ => false,
    }
}

/// Integer prefix of `text` (`atoi` semantics), 0 when there is none.
fn leading_integer(text: &str) -> i64 {
    let text = text.trim_start();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let digits: String = digits.chars().take_while(char::is_ascii_digit).collect();
    digits.parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

/// Compare dotted versions component-wise; missing components are zero and
/// each component's leading digits are its value.
pub(crate) fn compare_versions(a: &str, b: &str) -> Ordering {
    let components = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|part| {
                let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
                digits.parse().unwrap_or(0)
            })
            .collect()
    };
    let (a, b) = (components(a), components(b));
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("3.10", "3.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.2", "1.2.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.2.3.4", "1.2.3.5"), Ordering::Less);
        assert_eq!(compare_versions("2", "10"), Ordering::Less);
    }

    #[test]
    fn test_ordering_matches() {
        assert!(ordering_matches("LESS_EQUAL", Ordering::Equal));
        assert!(!ordering_matches("GREATER", Ordering::Equal));
        assert!(ordering_matches("GREATER_EQUAL", Ordering::Greater));
    }
}
