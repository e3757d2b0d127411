//! Policy commands: cmake_minimum_required() and cmake_policy()

use tracing::debug;

use super::{Command, Context};
use crate::error::{Error, Result};
use crate::interpreter::ExecStatus;
use crate::policy::{PolicyId, PolicyStatus, TOOL_VERSION, Version, lookup};

/// Parse `min[...max]` into the baseline to apply. A minimum newer than
/// the running tool is fatal.
fn policy_baseline(command: &str, range: &str) -> Result<std::result::Result<Version, String>> {
    let (min_text, max_text) = match range.split_once("...") {
        Some((min, max)) => (min, Some(max)),
        None => (range, None),
    };
    let Some(min) = Version::parse(min_text) else {
        return Ok(Err(format!("VERSION \"{}\" does not have a version on both sides of \"...\" or could not be parsed", range)));
    };
    if min > TOOL_VERSION {
        return Err(Error::command(
            command,
            format!(
                "{} or higher is required. You are running version {}",
                min_text, TOOL_VERSION
            ),
        ));
    }
    let baseline = match max_text {
        None => min,
        Some(max_text) => match Version::parse(max_text) {
            Some(max) if max >= min => max.min(TOOL_VERSION),
            _ => {
                return Ok(Err(format!(
                    "VERSION \"{}\" does not have a valid maximum version",
                    range
                )));
            }
        },
    };
    Ok(Ok(baseline))
}

/// `cmake_minimum_required(VERSION <min>[...<max>] [FATAL_ERROR])`
#[derive(Clone)]
pub struct CMakeMinimumRequired;

impl Command for CMakeMinimumRequired {
    fn name(&self) -> &str {
        "cmake_minimum_required"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let range = match args {
            [keyword, range] | [keyword, range, _] if keyword == "VERSION" => range,
            _ => {
                return Ok(ExecStatus::Error(
                    "called with unknown argument; expected VERSION <min>[...<max>]".into(),
                ));
            }
        };
        let baseline = match policy_baseline("cmake_minimum_required", range)? {
            Ok(baseline) => baseline,
            Err(message) => return Ok(ExecStatus::Error(message)),
        };
        let min = range.split_once("...").map(|(min, _)| min).unwrap_or(range);
        ctx.set("CMAKE_MINIMUM_REQUIRED_VERSION", min);
        debug!(version = %baseline, "applying policy baseline");
        ctx.policies_mut().apply_version(baseline);
        Ok(ExecStatus::Normal)
    }
}

/// `cmake_policy(VERSION|SET|GET|PUSH|POP ...)`
#[derive(Clone)]
pub struct CMakePolicy;

impl Command for CMakePolicy {
    fn name(&self) -> &str {
        "cmake_policy"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let Some((sub, rest)) = args.split_first() else {
            return Ok(ExecStatus::Error("requires at least one argument.".into()));
        };
        let status = match (sub.as_str(), rest) {
            ("VERSION", [range]) => match policy_baseline("cmake_policy", range)? {
                Ok(baseline) => {
                    debug!(version = %baseline, "applying policy baseline");
                    ctx.policies_mut().apply_version(baseline);
                    ExecStatus::Normal
                }
                Err(message) => ExecStatus::Error(message),
            },
            ("SET", [id, setting]) => {
                let Some(id) = known_policy(id) else {
                    return Ok(ExecStatus::Error(format!("SET given unknown policy ID: {}", id)));
                };
                match setting.parse::<PolicyStatus>() {
                    Ok(status @ (PolicyStatus::Old | PolicyStatus::New)) => {
                        ctx.policies_mut().set(id, status);
                        ExecStatus::Normal
                    }
                    _ => ExecStatus::Error(format!(
                        "SET given unrecognized policy status \"{}\"",
                        setting
                    )),
                }
            }
            ("GET", [id, var]) => {
                let Some(id) = known_policy(id) else {
                    return Ok(ExecStatus::Error(format!("GET given unknown policy ID: {}", id)));
                };
                let value = match ctx.policies().explicit(id) {
                    Some(PolicyStatus::Old) => "OLD",
                    Some(PolicyStatus::New) => "NEW",
                    _ => "",
                };
                ctx.set(var, value);
                ExecStatus::Normal
            }
            ("PUSH", []) => {
                ctx.push_policy_scope();
                ExecStatus::Normal
            }
            ("POP", []) => {
                if ctx.pop_policy_scope() {
                    ExecStatus::Normal
                } else {
                    ExecStatus::Error("POP without matching PUSH".into())
                }
            }
            ("VERSION" | "SET" | "GET" | "PUSH" | "POP", _) => ExecStatus::Error(format!(
                "{} given wrong number of arguments.",
                sub
            )),
            (other, _) => ExecStatus::Error(format!("given unknown first argument \"{}\"", other)),
        };
        Ok(status)
    }
}

fn known_policy(text: &str) -> Option<PolicyId> {
    let id = text.parse::<PolicyId>().ok()?;
    lookup(id).map(|p| p.id)
}
