//! string() command

use regex::Regex;

use super::{Command, Context};
use crate::error::Result;
use crate::interpreter::{ExecStatus, join_list};

/// `string(<subcommand> ...)`
///
/// Supported: `APPEND`, `PREPEND`, `CONCAT`, `JOIN`, `TOUPPER`, `TOLOWER`,
/// `LENGTH`, `STRIP`, `SUBSTRING`, `REPLACE`, `FIND`, `COMPARE` and
/// `REGEX MATCH|MATCHALL|REPLACE`.
#[derive(Clone)]
pub struct StringCommand;

impl Command for StringCommand {
    fn name(&self) -> &str {
        "string"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let Some((sub, rest)) = args.split_first() else {
            return Ok(ExecStatus::Error("must be called with at least one argument.".into()));
        };
        let outcome = match sub.as_str() {
            "APPEND" | "PREPEND" => append(ctx, sub, rest),
            "CONCAT" => match rest.split_first() {
                Some((out, parts)) => {
                    ctx.set(out, parts.concat());
                    Ok(())
                }
                None => Err(wrong_count(sub)),
            },
            "JOIN" => match rest {
                [glue, out, parts @ ..] => {
                    ctx.set(out, parts.join(glue));
                    Ok(())
                }
                _ => Err(wrong_count(sub)),
            },
            "TOUPPER" | "TOLOWER" => match rest {
                [input, out] => {
                    let value = if sub == "TOUPPER" {
                        input.to_ascii_uppercase()
                    } else {
                        input.to_ascii_lowercase()
                    };
                    ctx.set(out, value);
                    Ok(())
                }
                _ => Err(wrong_count(sub)),
            },
            "LENGTH" => match rest {
                [input, out] => {
                    ctx.set(out, input.len().to_string());
                    Ok(())
                }
                _ => Err(wrong_count(sub)),
            },
            "STRIP" => match rest {
                [input, out] => {
                    ctx.set(out, input.trim());
                    Ok(())
                }
                _ => Err(wrong_count(sub)),
            },
            "SUBSTRING" => substring(ctx, rest),
            "REPLACE" => match rest {
                [from, to, out, inputs @ ..] => {
                    if from.is_empty() {
                        Err("REPLACE match string is empty".to_string())
                    } else {
                        ctx.set(out, inputs.concat().replace(from.as_str(), to));
                        Ok(())
                    }
                }
                _ => Err(wrong_count(sub)),
            },
            "FIND" => find(ctx, rest),
            "COMPARE" => compare(ctx, rest),
            "REGEX" => regex_command(ctx, rest),
            other => Err(format!("does not recognize sub-command {}", other)),
        };
        Ok(match outcome {
            Ok(()) => ExecStatus::Normal,
            Err(message) => ExecStatus::Error(message),
        })
    }
}

type Outcome = std::result::Result<(), String>;

fn wrong_count(sub: &str) -> String {
    format!("sub-command {} requires different arguments.", sub)
}

fn append(ctx: &mut Context<'_>, sub: &str, rest: &[String]) -> Outcome {
    let Some((var, parts)) = rest.split_first() else {
        return Err(wrong_count(sub));
    };
    if parts.is_empty() {
        return Ok(());
    }
    let current = ctx.get(var).to_string();
    let value = if sub == "APPEND" {
        current + &parts.concat()
    } else {
        parts.concat() + &current
    };
    ctx.set(var, value);
    Ok(())
}

/// `SUBSTRING <string> <begin> <length> <out>`; a length of -1 means "to
/// the end". Offsets count bytes and must not split a character.
fn substring(ctx: &mut Context<'_>, rest: &[String]) -> Outcome {
    let [input, begin, length, out] = rest else {
        return Err(wrong_count("SUBSTRING"));
    };
    let begin: usize = begin
        .parse()
        .map_err(|_| format!("SUBSTRING begin index: {} is not a valid index", begin))?;
    let length: i64 = length
        .parse()
        .map_err(|_| format!("SUBSTRING length: {} is not a valid length", length))?;
    if begin > input.len() {
        return Err(format!(
            "begin index: {} is out of range 0 - {}",
            begin,
            input.len()
        ));
    }
    if length < -1 {
        return Err(format!("end index: {} is out of range -1 - {}", length, input.len()));
    }
    let end = if length == -1 {
        input.len()
    } else {
        begin.saturating_add(length as usize).min(input.len())
    };
    if let Some(offset) = [begin, end].into_iter().find(|&i| !input.is_char_boundary(i)) {
        return Err(format!(
            "index: {} falls inside a multi-byte character of \"{}\"",
            offset, input
        ));
    }
    ctx.set(out, &input[begin..end]);
    Ok(())
}

/// `FIND <string> <substring> <out> [REVERSE]`
fn find(ctx: &mut Context<'_>, rest: &[String]) -> Outcome {
    let (input, needle, out, reverse) = match rest {
        [input, needle, out] => (input, needle, out, false),
        [input, needle, out, flag] if flag == "REVERSE" => (input, needle, out, true),
        _ => return Err(wrong_count("FIND")),
    };
    let found = if reverse {
        input.rfind(needle.as_str())
    } else {
        input.find(needle.as_str())
    };
    let value = found
        .map(|i| i.to_string())
        .unwrap_or_else(|| "-1".to_string());
    ctx.set(out, value);
    Ok(())
}

/// `COMPARE <op> <a> <b> <out>`
fn compare(ctx: &mut Context<'_>, rest: &[String]) -> Outcome {
    let [op, a, b, out] = rest else {
        return Err(wrong_count("COMPARE"));
    };
    let result = match op.as_str() {
        "EQUAL" => a == b,
        "NOTEQUAL" => a != b,
        "LESS" => a < b,
        "GREATER" => a > b,
        "LESS_EQUAL" => a <= b,
        "GREATER_EQUAL" => a >= b,
        other => return Err(format!("COMPARE does not recognize operator {}", other)),
    };
    ctx.set(out, if result { "1" } else { "0" });
    Ok(())
}

fn compile(pattern: &str) -> std::result::Result<Regex, String> {
    Regex::new(pattern)
        .map_err(|e| format!("sub-command REGEX could not compile regex \"{}\": {}", pattern, e))
}

/// `\1`..`\9` and `\0` in a replacement become `${N}`; `$` is literal.
fn translate_replacement(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek().copied() {
                Some(d) if d.is_ascii_digit() => {
                    chars.next();
                    out.push_str(&format!("${{{}}}", d));
                }
                Some(next) => {
                    chars.next();
                    out.push(next);
                }
                None => out.push('\\'),
            },
            '$' => out.push_str("$$"),
            other => out.push(other),
        }
    }
    out
}

/// `REGEX MATCH|MATCHALL|REPLACE ...`
fn regex_command(ctx: &mut Context<'_>, rest: &[String]) -> Outcome {
    let Some((mode, rest)) = rest.split_first() else {
        return Err(wrong_count("REGEX"));
    };
    match mode.as_str() {
        "MATCH" | "MATCHALL" => {
            let [pattern, out, inputs @ ..] = rest else {
                return Err(wrong_count("REGEX"));
            };
            let regex = compile(pattern)?;
            let input = inputs.concat();
            let value = if mode == "MATCH" {
                regex
                    .find(&input)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default()
            } else {
                let all: Vec<&str> = regex.find_iter(&input).map(|m| m.as_str()).collect();
                join_list(&all)
            };
            ctx.set(out, value);
            Ok(())
        }
        "REPLACE" => {
            let [pattern, replacement, out, inputs @ ..] = rest else {
                return Err(wrong_count("REGEX"));
            };
            let regex = compile(pattern)?;
            let input = inputs.concat();
            let replacement = translate_replacement(replacement);
            let value = regex.replace_all(&input, replacement.as_str()).into_owned();
            ctx.set(out, value);
            Ok(())
        }
        other => Err(format!("sub-command REGEX does not recognize mode {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_replacement() {
        assert_eq!(translate_replacement("\\1-\\2"), "${1}-${2}");
        assert_eq!(translate_replacement("a$b"), "a$$b");
        assert_eq!(translate_replacement("x\\\\y"), "x\\y");
        assert_eq!(translate_replacement("end\\"), "end\\");
    }

    #[test]
    fn test_regex_replace_with_groups() {
        let regex = compile("([a-z]+)=([0-9]+)").unwrap();
        let replacement = translate_replacement("\\2:\\1");
        assert_eq!(regex.replace_all("a=1 b=2", replacement.as_str()), "1:a 2:b");
    }
}
