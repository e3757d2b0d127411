//! Flow control commands (if, break, continue, return)

use super::{Command, Context, FunctionBlocker, evaluate_condition};
use crate::error::{Error, Result};
use crate::interpreter::ExecStatus;
use crate::parser::{Argument, Invocation, Location};
use crate::policy::{CMP0055, CMP0140};

/// `if(<condition>)` ... `elseif()` ... `else()` ... `endif()`
#[derive(Clone)]
pub struct If;

impl Command for If {
    fn name(&self) -> &str {
        "if"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, _args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let invocation = ctx.invocation();
        let blocker = IfBlocker {
            condition: invocation.arguments.clone(),
            location: invocation.location.clone(),
        };
        ctx.add_blocker(Box::new(blocker))?;
        Ok(ExecStatus::Normal)
    }

    fn expands_arguments(&self) -> bool {
        false
    }
}

struct IfBlocker {
    condition: Vec<Argument>,
    location: Location,
}

/// One `if`/`elseif`/`else` arm.
struct Branch {
    /// `None` for `else()`
    condition: Option<Vec<Argument>>,
    location: Location,
    body: Vec<Invocation>,
}

impl IfBlocker {
    /// Split a recorded body into arms at top-level `elseif`/`else`.
    fn branches(self, body: Vec<Invocation>) -> Result<Vec<Branch>> {
        let mut branches = vec![Branch {
            condition: Some(self.condition),
            location: self.location,
            body: Vec::new(),
        }];
        let mut depth = 0usize;
        for invocation in body {
            let name = invocation.lookup_name();
            match name.as_str() {
                "if" => depth += 1,
                "endif" => depth = depth.saturating_sub(1),
                "elseif" | "else" if depth == 0 => {
                    if branches.last().is_some_and(|b| b.condition.is_none()) {
                        return Err(Error::command(
                            &invocation.name,
                            "may not be used after an else() of the same if()",
                        )
                        .located(&invocation.location));
                    }
                    let condition = (name == "elseif").then(|| invocation.arguments.clone());
                    branches.push(Branch {
                        condition,
                        location: invocation.location.clone(),
                        body: Vec::new(),
                    });
                    continue;
                }
                _ => {}
            }
            if let Some(branch) = branches.last_mut() {
                branch.body.push(invocation);
            }
        }
        Ok(branches)
    }
}

impl FunctionBlocker for IfBlocker {
    fn opener(&self) -> &'static str {
        "if"
    }

    fn closer(&self) -> &'static str {
        "endif"
    }

    fn replay(self: Box<Self>, body: Vec<Invocation>, ctx: &mut Context<'_>) -> Result<ExecStatus> {
        for branch in self.branches(body)? {
            let taken = match &branch.condition {
                None => true,
                Some(condition) => evaluate_condition(ctx, condition, &branch.location)
                    .map_err(|e| e.located(&branch.location))?,
            };
            if taken {
                return ctx.execute_body(&branch.body);
            }
        }
        Ok(ExecStatus::Normal)
    }
}

/// Apply CMP0055 to a misplaced or malformed `break()`/`continue()`.
fn check_loop_control(name: &str, args: &[String], ctx: &mut Context<'_>) -> Result<Option<ExecStatus>> {
    let problem = if !ctx.in_loop() {
        Some("A command was found outside of a proper FOREACH or WHILE loop scope.")
    } else if !args.is_empty() {
        Some("The command does not accept any arguments.")
    } else {
        None
    };
    let Some(problem) = problem else {
        return Ok(None);
    };
    if ctx.policy(CMP0055)?.is_new() {
        return Err(Error::command(name, problem));
    }
    Ok(Some(ExecStatus::Normal))
}

/// `break()`
#[derive(Clone)]
pub struct Break;

impl Command for Break {
    fn name(&self) -> &str {
        "break"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        if let Some(status) = check_loop_control("break", args, ctx)? {
            return Ok(status);
        }
        Ok(ExecStatus::Break)
    }
}

/// `continue()`
#[derive(Clone)]
pub struct Continue;

impl Command for Continue {
    fn name(&self) -> &str {
        "continue"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        if let Some(status) = check_loop_control("continue", args, ctx)? {
            return Ok(status);
        }
        Ok(ExecStatus::Continue)
    }
}

/// `return([PROPAGATE <var>...])`
#[derive(Clone)]
pub struct Return;

impl Command for Return {
    fn name(&self) -> &str {
        "return"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        if args.is_empty() {
            return Ok(ExecStatus::Return);
        }
        if !ctx.policy(CMP0140)?.is_new() {
            return Ok(ExecStatus::Return);
        }
        match args.split_first() {
            Some((keyword, vars)) if keyword == "PROPAGATE" => {
                ctx.set_return_propagate(vars.to_vec());
                Ok(ExecStatus::Return)
            }
            _ => Ok(ExecStatus::Error(format!(
                "called with unsupported arguments: {}",
                args.join(" ")
            ))),
        }
    }
}

/// A block closer or separator reached outside of its block.
#[derive(Clone)]
pub struct StrayCloser {
    name: &'static str,
}

impl StrayCloser {
    pub const ALL: [&'static str; 7] = [
        "else",
        "elseif",
        "endif",
        "endforeach",
        "endwhile",
        "endfunction",
        "endmacro",
    ];

    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Command for StrayCloser {
    fn name(&self) -> &str {
        self.name
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, _args: &[String], _ctx: &mut Context<'_>) -> Result<ExecStatus> {
        Err(Error::command(
            self.name,
            "An ELSE, ELSEIF or END command was found outside of a proper block.",
        ))
    }

    fn expands_arguments(&self) -> bool {
        false
    }
}
