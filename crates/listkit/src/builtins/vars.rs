//! Variable commands: set, unset, option

use super::{Command, Context, is_on};
use crate::diagnostics::Severity;
use crate::error::Result;
use crate::interpreter::{ExecStatus, SetScope, join_list};
use crate::policy::CMP0126;

const CACHE_TYPES: &[&str] = &["BOOL", "PATH", "FILEPATH", "STRING", "INTERNAL"];

fn env_name(name: &str) -> Option<&str> {
    name.strip_prefix("ENV{").and_then(|n| n.strip_suffix('}'))
}

/// Write to the parent scope. The top-level scope has none: that only
/// warns.
fn write_parent(ctx: &mut Context<'_>, name: &str, value: Option<String>) {
    let written = match value {
        Some(value) => ctx.vars_mut().set(name, value, SetScope::Parent),
        None => ctx.vars_mut().unset(name, SetScope::Parent),
    };
    if let Err(err) = written {
        ctx.issue(Severity::AuthorWarning, err.to_string());
    }
}

/// `set(<var> <value>... [PARENT_SCOPE])`,
/// `set(<var> <value>... CACHE <type> <doc> [FORCE])`,
/// `set(ENV{<var>} [<value>])`
#[derive(Clone)]
pub struct Set;

impl Command for Set {
    fn name(&self) -> &str {
        "set"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let Some((name, values)) = args.split_first() else {
            return Ok(ExecStatus::Error("called with incorrect number of arguments".into()));
        };

        if let Some(env) = env_name(name) {
            match values.first() {
                Some(value) if !value.is_empty() => ctx.set_env(env, value.clone()),
                _ => ctx.unset_env(env),
            }
            if values.len() > 1 {
                ctx.warn(format!("Only the first value argument is used when setting an environment variable. Argument '{}' and later are unused.", values[1]));
            }
            return Ok(ExecStatus::Normal);
        }

        if values.last().is_some_and(|v| v == "PARENT_SCOPE") {
            let value = join_list(&values[..values.len() - 1]);
            write_parent(ctx, name, Some(value));
            return Ok(ExecStatus::Normal);
        }

        if let Some(pos) = values.iter().position(|v| v == "CACHE") {
            return set_cache(ctx, name, &values[..pos], &values[pos + 1..]);
        }

        if values.is_empty() {
            ctx.unset(name);
        } else {
            ctx.set(name, join_list(values));
        }
        Ok(ExecStatus::Normal)
    }
}

fn set_cache(
    ctx: &mut Context<'_>,
    name: &str,
    values: &[String],
    options: &[String],
) -> Result<ExecStatus> {
    let (Some(kind), Some(_doc)) = (options.first(), options.get(1)) else {
        return Ok(ExecStatus::Error(
            "given invalid arguments for CACHE mode: missing type and docstring".into(),
        ));
    };
    if !CACHE_TYPES.contains(&kind.as_str()) {
        return Ok(ExecStatus::Error(format!(
            "given invalid CACHE entry TYPE \"{}\"",
            kind
        )));
    }
    let force = kind == "INTERNAL" || options.get(2).is_some_and(|o| o == "FORCE");

    if ctx.vars().process_value(name).is_some() && !force {
        return Ok(ExecStatus::Normal);
    }
    ctx.set_in(name, join_list(values), SetScope::Process)?;

    // An unset normal binding reads through to the process value.
    if ctx.vars().has_normal(name) && !ctx.policy(CMP0126)?.is_new() {
        ctx.unset(name);
    }
    Ok(ExecStatus::Normal)
}

/// `unset(<var> [CACHE | PARENT_SCOPE])`, `unset(ENV{<var>})`
#[derive(Clone)]
pub struct Unset;

impl Command for Unset {
    fn name(&self) -> &str {
        "unset"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let Some((name, options)) = args.split_first() else {
            return Ok(ExecStatus::Error("called with incorrect number of arguments".into()));
        };
        if let Some(env) = env_name(name) {
            ctx.unset_env(env);
            return Ok(ExecStatus::Normal);
        }
        match options {
            [] => ctx.unset(name),
            [scope] if scope == "CACHE" => ctx.unset_in(name, SetScope::Process)?,
            [scope] if scope == "PARENT_SCOPE" => write_parent(ctx, name, None),
            _ => {
                return Ok(ExecStatus::Error(format!(
                    "called with invalid arguments: {}",
                    options.join(" ")
                )));
            }
        }
        Ok(ExecStatus::Normal)
    }
}

/// `option(<var> "<doc>" [<value>])`
#[derive(Clone)]
pub struct OptionCommand;

impl Command for OptionCommand {
    fn name(&self) -> &str {
        "option"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        if !(2..=3).contains(&args.len()) {
            return Ok(ExecStatus::Error("called with incorrect number of arguments".into()));
        }
        let name = &args[0];
        if ctx.definition(name).is_some() {
            return Ok(ExecStatus::Normal);
        }
        let value = if args.get(2).is_some_and(|v| is_on(v)) {
            "ON"
        } else {
            "OFF"
        };
        ctx.set_in(name, value, SetScope::Process)?;
        Ok(ExecStatus::Normal)
    }
}
