//! cmake_language() command

use super::{Command, Context};
use crate::error::Result;
use crate::interpreter::ExecStatus;
use crate::parser::{Argument, Delimiter, Invocation};

/// Commands that open or close blocks and so cannot be called indirectly.
const BLOCK_COMMANDS: &[&str] = &[
    "if",
    "elseif",
    "else",
    "endif",
    "foreach",
    "endforeach",
    "while",
    "endwhile",
    "function",
    "endfunction",
    "macro",
    "endmacro",
];

/// `cmake_language(CALL <cmd> <args>...)`,
/// `cmake_language(DEFER [ID <id>] CALL <cmd> <args>...)`,
/// `cmake_language(EVAL CODE <code>...)`
///
/// A deferred call runs in the final pass of the directory that scheduled
/// it.
#[derive(Clone, Default)]
pub struct CMakeLanguage {
    deferred: Option<Invocation>,
}

impl CMakeLanguage {
    /// Build an invocation whose arguments are passed through verbatim.
    fn call_invocation(
        ctx: &Context<'_>,
        args: &[String],
    ) -> std::result::Result<Invocation, String> {
        let Some((command, rest)) = args.split_first() else {
            return Err("CALL missing command name".into());
        };
        if BLOCK_COMMANDS.contains(&command.to_ascii_lowercase().as_str()) {
            return Err(format!("invalid command specified: {}", command));
        }
        let location = ctx.location().clone();
        let arguments = rest
            .iter()
            .map(|value| Argument::new(value.clone(), Delimiter::Bracket, location.line))
            .collect();
        Ok(Invocation::new(command.clone(), arguments, location))
    }
}

impl Command for CMakeLanguage {
    fn name(&self) -> &str {
        "cmake_language"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(Self::default())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let Some((sub, rest)) = args.split_first() else {
            return Ok(ExecStatus::Error("called with incorrect number of arguments".into()));
        };
        match sub.as_str() {
            "CALL" => match Self::call_invocation(ctx, rest) {
                Ok(invocation) => ctx.execute_invocation(&invocation),
                Err(message) => Ok(ExecStatus::Error(message)),
            },
            "DEFER" => {
                let rest = match rest {
                    [id, _, tail @ ..] if id == "ID" => tail,
                    _ => rest,
                };
                let Some(("CALL", call)) = rest.split_first().map(|(k, v)| (k.as_str(), v)) else {
                    return Ok(ExecStatus::Error("DEFER requires a CALL argument".into()));
                };
                match Self::call_invocation(ctx, call) {
                    Ok(invocation) => {
                        self.deferred = Some(invocation);
                        Ok(ExecStatus::Normal)
                    }
                    Err(message) => Ok(ExecStatus::Error(message)),
                }
            }
            "EVAL" => match rest.split_first() {
                Some((code, parts)) if code == "CODE" => ctx.eval_code(&parts.join(" ")),
                _ => Ok(ExecStatus::Error("EVAL missing CODE keyword".into())),
            },
            other => Ok(ExecStatus::Error(format!("called with unknown meta-operation {}", other))),
        }
    }

    fn has_final_pass(&self) -> bool {
        self.deferred.is_some()
    }

    fn final_pass(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        if let Some(invocation) = self.deferred.take() {
            ctx.execute_invocation(&invocation)?;
        }
        Ok(())
    }
}
