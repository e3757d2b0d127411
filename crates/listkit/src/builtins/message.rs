//! message() command

use tracing::{debug, trace};

use super::{Command, Context};
use crate::diagnostics::Severity;
use crate::error::{Error, Result};
use crate::interpreter::ExecStatus;

/// `message([<mode>] "text"...)`
#[derive(Clone)]
pub struct Message;

impl Command for Message {
    fn name(&self) -> &str {
        "message"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let (mode, parts) = match args.split_first() {
            Some((first, rest)) if is_mode(first) => (first.as_str(), rest),
            _ => ("NOTICE", args),
        };
        let text = parts.concat();

        match mode {
            "STATUS" => ctx.output(&format!("-- {}", text)),
            "NOTICE" => ctx.output(&text),
            "WARNING" => ctx.issue(Severity::Warning, text),
            "AUTHOR_WARNING" => ctx.issue(Severity::AuthorWarning, text),
            "DEPRECATION" => ctx.issue(Severity::Deprecation, text),
            "SEND_ERROR" => ctx.issue_error(text),
            "FATAL_ERROR" => return Err(Error::command("message", text)),
            "VERBOSE" | "DEBUG" => debug!(message = %text, "message"),
            _ => trace!(message = %text, "message"),
        }
        Ok(ExecStatus::Normal)
    }
}

fn is_mode(word: &str) -> bool {
    matches!(
        word,
        "STATUS"
            | "NOTICE"
            | "WARNING"
            | "AUTHOR_WARNING"
            | "DEPRECATION"
            | "SEND_ERROR"
            | "FATAL_ERROR"
            | "VERBOSE"
            | "DEBUG"
            | "TRACE"
    )
}
