//! Loop commands: foreach() and while()

use super::{Command, Context, FunctionBlocker, evaluate_condition, split_keywords};
use crate::error::Result;
use crate::interpreter::ExecStatus;
use crate::limits::LoopGuard;
use crate::parser::{Argument, Invocation, Location};
use crate::policy::CMP0124;

/// What a loop does after one iteration of its body.
enum Flow {
    Next,
    Stop(ExecStatus),
}

fn after_iteration(status: ExecStatus) -> Flow {
    match status {
        ExecStatus::Break => Flow::Stop(ExecStatus::Normal),
        ExecStatus::Return => Flow::Stop(ExecStatus::Return),
        _ => Flow::Next,
    }
}

/// `foreach(<var> <items>...)` and its `RANGE` / `IN` forms.
#[derive(Clone)]
pub struct Foreach;

impl Command for Foreach {
    fn name(&self) -> &str {
        "foreach"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let Some((var, rest)) = args.split_first() else {
            return Ok(ExecStatus::Error("called with incorrect number of arguments".into()));
        };
        let items = match rest.first().map(String::as_str) {
            Some("RANGE") => match range_items(&rest[1..]) {
                Ok(range) => Items::Range(range),
                Err(message) => return Ok(ExecStatus::Error(message)),
            },
            Some("IN") => Items::List(in_items(&rest[1..], ctx)),
            _ => Items::List(rest.to_vec()),
        };
        ctx.add_blocker(Box::new(ForeachBlocker {
            var: var.clone(),
            items,
        }))?;
        Ok(ExecStatus::Normal)
    }
}

fn range_items(args: &[String]) -> std::result::Result<Range, String> {
    let numbers: Vec<i64> = args
        .iter()
        .map(|a| a.trim().parse::<i64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| format!("RANGE arguments must be integers: {}", args.join(" ")))?;
    let (start, stop, step) = match numbers.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => return Err("called with incorrect number of arguments".into()),
    };
    if step == 0 || (step > 0 && start > stop) || (step < 0 && start < stop) {
        return Err(format!(
            "called with an invalid range: start {}, stop {}, step {}",
            start, stop, step
        ));
    }
    Ok(Range {
        next: Some(start),
        stop,
        step,
    })
}

/// A `RANGE` walked one value at a time, so the loop guard sees every item
/// before the next one is made. Stepping past `i64` ends the range.
#[derive(Debug, Clone)]
struct Range {
    next: Option<i64>,
    stop: i64,
    step: i64,
}

impl Iterator for Range {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        let n = self.next?;
        let within = if self.step > 0 { n <= self.stop } else { n >= self.stop };
        if !within {
            self.next = None;
            return None;
        }
        self.next = n.checked_add(self.step);
        Some(n)
    }
}

enum Items {
    List(Vec<String>),
    Range(Range),
}

fn in_items(args: &[String], ctx: &Context<'_>) -> Vec<String> {
    let (_, sections) = split_keywords(args, &["LISTS", "ITEMS"]);
    let mut items = Vec::new();
    for (keyword, values) in sections {
        match keyword {
            "LISTS" => {
                for name in values {
                    items.extend(ctx.get_list(name));
                }
            }
            _ => items.extend(values.iter().cloned()),
        }
    }
    items
}

struct ForeachBlocker {
    var: String,
    items: Items,
}

impl FunctionBlocker for ForeachBlocker {
    fn opener(&self) -> &'static str {
        "foreach"
    }

    fn closer(&self) -> &'static str {
        "endforeach"
    }

    fn replay(self: Box<Self>, body: Vec<Invocation>, ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let ForeachBlocker { var, items } = *self;
        let previous = ctx.definition(&var).map(str::to_string);
        let mut guard = LoopGuard::new();
        let mut result = ExecStatus::Normal;

        let items: Box<dyn Iterator<Item = String>> = match items {
            Items::List(values) => Box::new(values.into_iter()),
            Items::Range(range) => Box::new(range.map(|n| n.to_string())),
        };
        for item in items {
            ctx.tick_loop(&mut guard)?;
            ctx.set(&var, item);
            if let Flow::Stop(status) = after_iteration(ctx.execute_loop_body(&body)?) {
                result = status;
                break;
            }
        }

        match previous {
            Some(value) => ctx.set(&var, value),
            None if ctx.policy(CMP0124)?.is_new() => ctx.unset(&var),
            None => ctx.set(&var, ""),
        }
        Ok(result)
    }
}

/// `while(<condition>)`
#[derive(Clone)]
pub struct While;

impl Command for While {
    fn name(&self) -> &str {
        "while"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, _args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let invocation = ctx.invocation();
        let blocker = WhileBlocker {
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

struct WhileBlocker {
    condition: Vec<Argument>,
    location: Location,
}

impl FunctionBlocker for WhileBlocker {
    fn opener(&self) -> &'static str {
        "while"
    }

    fn closer(&self) -> &'static str {
        "endwhile"
    }

    fn replay(self: Box<Self>, body: Vec<Invocation>, ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let mut guard = LoopGuard::new();
        while evaluate_condition(ctx, &self.condition, &self.location)? {
            ctx.tick_loop(&mut guard)?;
            if let Flow::Stop(status) = after_iteration(ctx.execute_loop_body(&body)?) {
                return Ok(status);
            }
        }
        Ok(ExecStatus::Normal)
    }
}
