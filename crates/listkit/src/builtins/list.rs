//! list() command

use super::{Command, Context};
use crate::error::Result;
use crate::interpreter::{ExecStatus, join_list, split_list};

/// `list(<subcommand> <list-var> ...)`
///
/// Supported: `APPEND`, `PREPEND`, `LENGTH`, `GET`, `FIND`, `JOIN`,
/// `REMOVE_ITEM`, `REMOVE_DUPLICATES`, `REVERSE`, `SORT`.
#[derive(Clone)]
pub struct List;

impl Command for List {
    fn name(&self) -> &str {
        "list"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let [sub, var, rest @ ..] = args else {
            return Ok(ExecStatus::Error("must be called with at least two arguments.".into()));
        };
        // Empty elements count as items here, unlike in argument lists.
        let mut items = split_list(ctx.get(var), true);

        let status = match sub.as_str() {
            "APPEND" => {
                if !rest.is_empty() {
                    items.extend(rest.iter().cloned());
                    ctx.set(var, join_list(&items));
                }
                ExecStatus::Normal
            }
            "PREPEND" => {
                if !rest.is_empty() {
                    let mut joined = rest.to_vec();
                    joined.extend(items);
                    ctx.set(var, join_list(&joined));
                }
                ExecStatus::Normal
            }
            "LENGTH" => match rest {
                [out] => {
                    ctx.set(out, items.len().to_string());
                    ExecStatus::Normal
                }
                _ => wrong_count("LENGTH"),
            },
            "GET" => match rest.split_last() {
                Some((out, indexes)) if !indexes.is_empty() => {
                    let mut picked = Vec::with_capacity(indexes.len());
                    for index in indexes {
                        match resolve_index(index, items.len()) {
                            Some(i) => picked.push(items[i].clone()),
                            None => {
                                return Ok(ExecStatus::Error(format!(
                                    "index: {} out of range (-{}, {})",
                                    index,
                                    items.len(),
                                    items.len().saturating_sub(1)
                                )));
                            }
                        }
                    }
                    ctx.set(out, join_list(&picked));
                    ExecStatus::Normal
                }
                _ => wrong_count("GET"),
            },
            "FIND" => match rest {
                [value, out] => {
                    let found = items
                        .iter()
                        .position(|i| i == value)
                        .map(|i| i.to_string())
                        .unwrap_or_else(|| "-1".to_string());
                    ctx.set(out, found);
                    ExecStatus::Normal
                }
                _ => wrong_count("FIND"),
            },
            "JOIN" => match rest {
                [glue, out] => {
                    ctx.set(out, items.join(glue));
                    ExecStatus::Normal
                }
                _ => wrong_count("JOIN"),
            },
            "REMOVE_ITEM" => {
                if rest.is_empty() {
                    wrong_count("REMOVE_ITEM")
                } else {
                    items.retain(|i| !rest.contains(i));
                    ctx.set(var, join_list(&items));
                    ExecStatus::Normal
                }
            }
            "REMOVE_DUPLICATES" => {
                let mut seen = std::collections::HashSet::new();
                items.retain(|i| seen.insert(i.clone()));
                if ctx.definition(var).is_some() {
                    ctx.set(var, join_list(&items));
                }
                ExecStatus::Normal
            }
            "REVERSE" => {
                items.reverse();
                if ctx.definition(var).is_some() {
                    ctx.set(var, join_list(&items));
                }
                ExecStatus::Normal
            }
            "SORT" => match sort(&mut items, rest) {
                Ok(()) => {
                    if ctx.definition(var).is_some() {
                        ctx.set(var, join_list(&items));
                    }
                    ExecStatus::Normal
                }
                Err(message) => ExecStatus::Error(message),
            },
            other => ExecStatus::Error(format!("does not recognize sub-command {}", other)),
        };
        Ok(status)
    }
}

fn wrong_count(sub: &str) -> ExecStatus {
    ExecStatus::Error(format!("sub-command {} requires different arguments.", sub))
}

/// Map a possibly negative index onto `0..len`.
fn resolve_index(index: &str, len: usize) -> Option<usize> {
    let index: i64 = index.trim().parse().ok()?;
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { len + index } else { index };
    (0..len).contains(&resolved).then(|| resolved as usize)
}

/// `SORT [COMPARE STRING] [CASE SENSITIVE|INSENSITIVE] [ORDER ASCENDING|DESCENDING]`
fn sort(items: &mut [String], options: &[String]) -> std::result::Result<(), String> {
    let mut insensitive = false;
    let mut descending = false;
    let mut opts = options.iter();
    while let Some(option) = opts.next() {
        let value = opts
            .next()
            .ok_or_else(|| format!("sub-command SORT missing value for {}", option))?;
        match (option.as_str(), value.as_str()) {
            ("COMPARE", "STRING") => {}
            ("CASE", "SENSITIVE") => insensitive = false,
            ("CASE", "INSENSITIVE") => insensitive = true,
            ("ORDER", "ASCENDING") => descending = false,
            ("ORDER", "DESCENDING") => descending = true,
            _ => return Err(format!("sub-command SORT unsupported option {} {}", option, value)),
        }
    }
    if insensitive {
        items.sort_by_key(|a| a.to_lowercase());
    } else {
        items.sort();
    }
    if descending {
        items.reverse();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_index() {
        assert_eq!(resolve_index("0", 3), Some(0));
        assert_eq!(resolve_index("-1", 3), Some(2));
        assert_eq!(resolve_index("-3", 3), Some(0));
        assert_eq!(resolve_index("3", 3), None);
        assert_eq!(resolve_index("-4", 3), None);
        assert_eq!(resolve_index("x", 3), None);
    }

    #[test]
    fn test_sort_options() {
        let mut items: Vec<String> = ["b", "A", "c"].iter().map(|s| s.to_string()).collect();
        sort(&mut items, &[]).unwrap();
        assert_eq!(items, vec!["A", "b", "c"]);

        let opts: Vec<String> = ["CASE", "INSENSITIVE", "ORDER", "DESCENDING"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        sort(&mut items, &opts).unwrap();
        assert_eq!(items, vec!["c", "b", "A"]);

        assert!(sort(&mut items, &["ORDER".to_string()]).is_err());
    }
}
