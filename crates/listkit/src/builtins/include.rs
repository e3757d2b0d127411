//! Listfile composition: include() and add_subdirectory()

use std::path::{Path, PathBuf};

use super::{Command, Context, split_keywords};
use crate::error::Result;
use crate::interpreter::{ExecStatus, LISTFILE_NAME};

/// `include(<file|module> [OPTIONAL] [RESULT_VARIABLE <var>] [NO_POLICY_SCOPE])`
#[derive(Clone)]
pub struct Include;

impl Command for Include {
    fn name(&self) -> &str {
        "include"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let (head, options) = split_keywords(args, &["OPTIONAL", "RESULT_VARIABLE", "NO_POLICY_SCOPE"]);
        let [name] = head else {
            return Ok(ExecStatus::Error("called with wrong number of arguments.".into()));
        };

        let mut optional = false;
        let mut no_policy_scope = false;
        let mut result_var = None;
        for (keyword, values) in options {
            match (keyword, values) {
                ("OPTIONAL", []) => optional = true,
                ("NO_POLICY_SCOPE", []) => no_policy_scope = true,
                ("RESULT_VARIABLE", [var]) => result_var = Some(var.clone()),
                _ => {
                    return Ok(ExecStatus::Error(format!(
                        "called with invalid argument after {}",
                        keyword
                    )));
                }
            }
        }

        let Some(path) = find_include(ctx, name) else {
            if let Some(var) = &result_var {
                ctx.set(var, "NOTFOUND");
            }
            if optional {
                return Ok(ExecStatus::Normal);
            }
            return Ok(ExecStatus::Error(format!(
                "could not find requested file:\n  {}",
                name
            )));
        };

        if let Some(var) = &result_var {
            let value = ctx.path_string(&path);
            ctx.set(var, value);
        }
        ctx.include_file(&path, no_policy_scope)?;
        Ok(ExecStatus::Normal)
    }
}

/// A path names a file; a bare name is a module looked up as
/// `<name>.cmake` in `CMAKE_MODULE_PATH`.
fn find_include(ctx: &Context<'_>, name: &str) -> Option<PathBuf> {
    let fs = ctx.fs();
    let is_module = !name.contains('/') && !name.ends_with(".cmake");
    if is_module {
        let file = format!("{}.cmake", name);
        for dir in ctx.get_list("CMAKE_MODULE_PATH") {
            let candidate = resolve_from(ctx, &dir).join(&file);
            if fs.is_file(&candidate) {
                return Some(candidate);
            }
        }
    }
    let candidate = resolve_from(ctx, name);
    fs.is_file(&candidate).then_some(candidate)
}

/// Resolve against the directory of the current listfile.
fn resolve_from(ctx: &Context<'_>, path: &str) -> PathBuf {
    if Path::new(path).is_absolute() {
        return ctx.resolve_path(path);
    }
    match ctx.current_list_file().and_then(Path::parent) {
        Some(dir) => {
            let joined = dir.join(path);
            ctx.resolve_path(&ctx.path_string(&joined))
        }
        None => ctx.resolve_path(path),
    }
}

/// `add_subdirectory(<source_dir> [<binary_dir>] [EXCLUDE_FROM_ALL] [SYSTEM])`
#[derive(Clone)]
pub struct AddSubdirectory;

impl Command for AddSubdirectory {
    fn name(&self) -> &str {
        "add_subdirectory"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let (head, flags) = split_keywords(args, &["EXCLUDE_FROM_ALL", "SYSTEM"]);
        let Some(source) = head.first() else {
            return Ok(ExecStatus::Error("called with incorrect number of arguments".into()));
        };
        if head.len() > 2 {
            return Ok(ExecStatus::Error("called with incorrect number of arguments".into()));
        }
        let exclude = flags.iter().any(|(keyword, _)| *keyword == "EXCLUDE_FROM_ALL");

        let dir = ctx.resolve_path(source);
        let fs = ctx.fs();
        if !fs.is_dir(&dir) || !fs.is_file(&dir.join(LISTFILE_NAME)) {
            return Ok(ExecStatus::Error(format!(
                "given source \"{}\" which is not an existing directory.",
                source
            )));
        }
        if ctx.graph().find_directory(&dir).is_some() {
            return Ok(ExecStatus::Error(format!(
                "The binary directory for \"{}\" is already used to build a source directory.",
                source
            )));
        }

        ctx.add_subdirectory(&dir)?;

        if exclude {
            let targets: Vec<String> = ctx
                .graph()
                .find_directory(&dir)
                .and_then(|index| ctx.graph().directory(index))
                .map(|d| d.targets.clone())
                .unwrap_or_default();
            for name in targets {
                if let Some(target) = ctx.graph_mut().target_mut(&name) {
                    target.exclude_from_all = true;
                }
            }
        }
        Ok(ExecStatus::Normal)
    }
}
