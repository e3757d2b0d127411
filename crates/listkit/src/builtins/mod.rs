//! Built-in commands
//!
//! This module provides the [`Command`] trait for implementing commands and
//! re-exports the [`Context`] they run against.
//!
//! # Custom Commands
//!
//! Implement the [`Command`] trait to create custom commands:
//!
//! ```rust
//! use listkit::{Command, Context, ExecStatus};
//!
//! #[derive(Clone)]
//! struct Greet;
//!
//! impl Command for Greet {
//!     fn name(&self) -> &str {
//!         "greet"
//!     }
//!
//!     fn clone_command(&self) -> Box<dyn Command> {
//!         Box::new(self.clone())
//!     }
//!
//!     fn is_scriptable(&self) -> bool {
//!         true
//!     }
//!
//!     fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> listkit::Result<ExecStatus> {
//!         let who = args.first().map(String::as_str).unwrap_or("world");
//!         ctx.output(&format!("hello {}", who));
//!         Ok(ExecStatus::Normal)
//!     }
//! }
//! ```
//!
//! Register via [`ListkitBuilder::command`](crate::ListkitBuilder::command).

mod condition;
mod flow;
mod functions;
mod include;
mod language;
mod list;
mod loops;
mod message;
mod policy;
mod project;
mod registry;
mod strings;
mod targets;
mod vars;

pub use condition::evaluate_condition;
pub use flow::{Break, Continue, If, Return, StrayCloser};
pub use functions::{
    FunctionCommand, MacroCommand, UserCommand, UserCommandCall, UserCommandKind, UserCommands,
};
pub use include::{AddSubdirectory, Include};
pub use language::CMakeLanguage;
pub use list::List;
pub use loops::{Foreach, While};
pub use message::Message;
pub use policy::{CMakeMinimumRequired, CMakePolicy};
pub use project::Project;
pub use registry::Registry;
pub use strings::StringCommand;
pub use targets::{
    AddCustomTarget, AddDependencies, AddExecutable, AddLibrary, GetTargetProperty,
    SetTargetProperties, TargetCompileDefinitions, TargetIncludeDirectories, TargetLinkLibraries,
    TargetSources,
};
pub use vars::{OptionCommand, Set, Unset};

pub use crate::interpreter::Context;

use crate::error::Result;
use crate::interpreter::ExecStatus;
use crate::parser::Invocation;

/// Trait for implementing commands.
///
/// The registry holds one prototype per command and clones it for every
/// invocation, so an instance may keep state between its initial and final
/// pass. Implementations must be `Send + Sync` so a registry can be shared
/// between runs on different threads.
///
/// # Return Values
///
/// Return [`ExecStatus::Normal`] on success, or [`ExecStatus::Error`] for a
/// failure that project processing can survive (reported, then the run
/// continues). Return `Err` for a fatal failure that stops the run.
pub trait Command: Send + Sync {
    /// Name the command is registered under (case-insensitive).
    fn name(&self) -> &str;

    /// Fresh instance for one invocation.
    fn clone_command(&self) -> Box<dyn Command>;

    /// Execute the command.
    ///
    /// # Arguments
    ///
    /// * `args` - Expanded arguments; empty when
    ///   [`expands_arguments`](Command::expands_arguments) is false
    /// * `ctx` - The interpreter state visible to the command
    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus>;

    /// Whether [`final_pass`](Command::final_pass) should run once the
    /// current directory's listfile is done.
    fn has_final_pass(&self) -> bool {
        false
    }

    fn final_pass(&mut self, _ctx: &mut Context<'_>) -> Result<()> {
        Ok(())
    }

    /// Whether the command may run in script mode. Commands opt in;
    /// anything that only makes sense while configuring a project keeps
    /// the default.
    fn is_scriptable(&self) -> bool {
        false
    }

    fn should_appear_in_documentation(&self) -> bool {
        true
    }

    /// Whether the interpreter expands arguments before the call. Commands
    /// that need the raw arguments (`if`, `while`) read them from
    /// [`Context::invocation`].
    fn expands_arguments(&self) -> bool {
        true
    }
}

/// A recorder for a block construct (`if`, `foreach`, `function`, ...).
///
/// The opening command installs a blocker; the interpreter records every
/// following invocation of the same frame until the matching closer, then
/// hands the recorded body back through [`replay`](FunctionBlocker::replay).
pub trait FunctionBlocker: Send + Sync {
    /// Lowercase name of the opening command, for nesting.
    fn opener(&self) -> &'static str;

    /// Lowercase name of the closing command.
    fn closer(&self) -> &'static str;

    /// Act on the recorded body. Errors are reported at the opening
    /// invocation.
    fn replay(self: Box<Self>, body: Vec<Invocation>, ctx: &mut Context<'_>) -> Result<ExecStatus>;
}

/// Split `args` at keyword positions.
///
/// Returns the leading arguments before any keyword, then each keyword with
/// the arguments following it.
pub(crate) fn split_keywords<'s>(
    args: &'s [String],
    keywords: &[&str],
) -> (&'s [String], Vec<(&'s str, &'s [String])>) {
    let positions: Vec<usize> = args
        .iter()
        .enumerate()
        .filter(|(_, a)| keywords.contains(&a.as_str()))
        .map(|(i, _)| i)
        .collect();
    let head_end = positions.first().copied().unwrap_or(args.len());
    let mut sections = Vec::with_capacity(positions.len());
    for (n, &start) in positions.iter().enumerate() {
        let end = positions.get(n + 1).copied().unwrap_or(args.len());
        sections.push((args[start].as_str(), &args[start + 1..end]));
    }
    (&args[..head_end], sections)
}

/// CMake truthiness of a constant: `1`, `ON`, `YES`, `TRUE`, `Y` and non-zero
/// numbers are true.
pub(crate) fn is_on(value: &str) -> bool {
    let upper = value.to_ascii_uppercase();
    match upper.as_str() {
        "1" | "ON" | "YES" | "TRUE" | "Y" => true,
        _ => value.parse::<f64>().map(|n| n != 0.0).unwrap_or(false),
    }
}

/// `0`, `OFF`, `NO`, `FALSE`, `N`, `IGNORE`, `NOTFOUND`, the empty string
/// and anything ending in `-NOTFOUND` are false constants.
pub(crate) fn is_off(value: &str) -> bool {
    let upper = value.to_ascii_uppercase();
    matches!(
        upper.as_str(),
        "" | "0" | "OFF" | "NO" | "FALSE" | "N" | "IGNORE" | "NOTFOUND"
    ) || upper.ends_with("-NOTFOUND")
}
