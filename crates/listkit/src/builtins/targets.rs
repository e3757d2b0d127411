//! Target declaration commands
//!
//! These only record into the build graph; nothing is built. All of them
//! need a project directory and are rejected in script mode.

use tracing::debug;

use super::{Command, Context, is_on};
use crate::error::Result;
use crate::graph::{ScopedItem, Target, TargetKind, Visibility};
use crate::interpreter::{ExecStatus, join_list, split_list};
use crate::policy::{CMP0002, CMP0004};

fn fail(message: impl Into<String>) -> Result<ExecStatus> {
    Ok(ExecStatus::Error(message.into()))
}

fn valid_target_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'+' | b'-'))
}

/// Add a target to the graph for the current directory.
///
/// A duplicate name is an error within one directory. Across directories
/// CMP0002 decides; under OLD the first declaration is kept.
fn declare(ctx: &mut Context<'_>, target: Target) -> Result<ExecStatus> {
    let name = target.name.clone();
    if !valid_target_name(&name) {
        return fail(format!(
            "The target name \"{}\" is reserved or not valid for certain CMake features.",
            name
        ));
    }
    let existing = ctx.graph().target(&name).map(|t| t.directory);
    if let Some(existing) = existing {
        if existing == target.directory || ctx.policy(CMP0002)?.is_new() {
            return fail(format!(
                "cannot create target \"{}\" because another target with the same name already exists.",
                name
            ));
        }
        return Ok(ExecStatus::Normal);
    }
    debug!(target = %name, kind = target.kind.type_name(), "target declared");
    ctx.graph_mut().add_target(target);
    Ok(ExecStatus::Normal)
}

/// `add_executable(<name> [WIN32] [MACOSX_BUNDLE] [EXCLUDE_FROM_ALL] <source>...)`
#[derive(Clone)]
pub struct AddExecutable;

impl Command for AddExecutable {
    fn name(&self) -> &str {
        "add_executable"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let Some((name, rest)) = args.split_first() else {
            return fail("called with incorrect number of arguments");
        };
        let Some(directory) = ctx.directory_index() else {
            return fail("called outside of a project directory");
        };
        let mut target = Target::new(name.as_str(), TargetKind::Executable, directory);
        for arg in rest {
            match arg.as_str() {
                "WIN32" | "MACOSX_BUNDLE" => {}
                "EXCLUDE_FROM_ALL" => target.exclude_from_all = true,
                "IMPORTED" | "ALIAS" => return fail(format!("{} executables are not supported", arg)),
                source => target.sources.push(source.to_string()),
            }
        }
        declare(ctx, target)
    }
}

/// `add_library(<name> [STATIC|SHARED|MODULE|OBJECT|INTERFACE] [EXCLUDE_FROM_ALL] <source>...)`
///
/// Without a type the library is shared when `BUILD_SHARED_LIBS` is on,
/// static otherwise.
#[derive(Clone)]
pub struct AddLibrary;

impl Command for AddLibrary {
    fn name(&self) -> &str {
        "add_library"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let Some((name, rest)) = args.split_first() else {
            return fail("called with incorrect number of arguments");
        };
        let Some(directory) = ctx.directory_index() else {
            return fail("called outside of a project directory");
        };

        let mut kind = None;
        let mut exclude = false;
        let mut sources = Vec::new();
        for arg in rest {
            let explicit = match arg.as_str() {
                "STATIC" => Some(TargetKind::StaticLibrary),
                "SHARED" => Some(TargetKind::SharedLibrary),
                "MODULE" => Some(TargetKind::ModuleLibrary),
                "OBJECT" => Some(TargetKind::ObjectLibrary),
                "INTERFACE" => Some(TargetKind::InterfaceLibrary),
                "EXCLUDE_FROM_ALL" => {
                    exclude = true;
                    continue;
                }
                "IMPORTED" | "ALIAS" | "UNKNOWN" => {
                    return fail(format!("{} libraries are not supported", arg));
                }
                source => {
                    sources.push(source.to_string());
                    continue;
                }
            };
            if kind.is_some() || !sources.is_empty() {
                return fail(format!("given unexpected library type {}", arg));
            }
            kind = explicit;
        }

        let kind = kind.unwrap_or_else(|| {
            if is_on(ctx.get("BUILD_SHARED_LIBS")) {
                TargetKind::SharedLibrary
            } else {
                TargetKind::StaticLibrary
            }
        });
        let mut target = Target::new(name.as_str(), kind, directory);
        target.sources = sources;
        target.exclude_from_all = exclude;
        declare(ctx, target)
    }
}

/// `add_custom_target(<name> [ALL] [<command>] [COMMAND <command>]...
///                    [DEPENDS <dep>...] [SOURCES <src>...] ...)`
///
/// Custom targets are excluded from the default build unless `ALL` is
/// given.
#[derive(Clone)]
pub struct AddCustomTarget;

impl Command for AddCustomTarget {
    fn name(&self) -> &str {
        "add_custom_target"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let Some((name, rest)) = args.split_first() else {
            return fail("called with incorrect number of arguments");
        };
        let Some(directory) = ctx.directory_index() else {
            return fail("called outside of a project directory");
        };

        enum Section {
            Command,
            Depends,
            Sources,
            Value,
            Flag,
        }

        let mut target = Target::new(name.as_str(), TargetKind::Utility, directory);
        target.exclude_from_all = true;
        let mut rest = rest;
        if rest.first().is_some_and(|a| a == "ALL") {
            target.exclude_from_all = false;
            rest = &rest[1..];
        }

        let mut section = Section::Command;
        let mut current: Vec<String> = Vec::new();
        for arg in rest {
            let next = match arg.as_str() {
                "COMMAND" => Some(Section::Command),
                "DEPENDS" => Some(Section::Depends),
                "SOURCES" => Some(Section::Sources),
                "COMMENT" | "WORKING_DIRECTORY" | "BYPRODUCTS" | "JOB_POOL" => Some(Section::Value),
                "VERBATIM" | "USES_TERMINAL" | "COMMAND_EXPAND_LISTS" | "JOB_SERVER_AWARE" => {
                    Some(Section::Flag)
                }
                _ => None,
            };
            match next {
                Some(next) => {
                    if !current.is_empty() {
                        target.commands.push(std::mem::take(&mut current));
                    }
                    section = next;
                }
                None => match section {
                    Section::Command => current.push(arg.clone()),
                    Section::Depends => {
                        target.dependencies.insert(arg.clone());
                    }
                    Section::Sources => target.sources.push(arg.clone()),
                    Section::Value | Section::Flag => {}
                },
            }
        }
        if !current.is_empty() {
            target.commands.push(current);
        }
        declare(ctx, target)
    }
}

/// `add_dependencies(<target> <dep>...)`
#[derive(Clone)]
pub struct AddDependencies;

impl Command for AddDependencies {
    fn name(&self) -> &str {
        "add_dependencies"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let Some((name, deps)) = args.split_first() else {
            return fail("called with incorrect number of arguments");
        };
        let Some(target) = ctx.graph_mut().target_mut(name) else {
            return fail(format!(
                "Cannot add target-level dependencies to non-existent target \"{}\".",
                name
            ));
        };
        target.dependencies.extend(deps.iter().cloned());
        Ok(ExecStatus::Normal)
    }
}

/// Split `[PUBLIC|PRIVATE|INTERFACE] item...` groups. Items before any
/// keyword get `default`; `None` means a keyword is required.
fn scoped_items(
    args: &[String],
    default: Option<Visibility>,
) -> std::result::Result<Vec<ScopedItem>, String> {
    let mut visibility = default;
    let mut items = Vec::new();
    for arg in args {
        if let Some(keyword) = Visibility::parse(arg) {
            visibility = Some(keyword);
            continue;
        }
        match visibility {
            Some(visibility) => items.push(ScopedItem::new(arg.as_str(), visibility)),
            None => {
                return Err(format!(
                    "called with invalid arguments: \"{}\" is not a PUBLIC, PRIVATE or INTERFACE keyword",
                    arg
                ));
            }
        }
    }
    Ok(items)
}

/// Resolve the target for a `target_*` command and reject non-INTERFACE
/// items on interface libraries.
fn check_target(
    ctx: &Context<'_>,
    command: &str,
    name: &str,
    items: &[ScopedItem],
) -> std::result::Result<(), String> {
    let Some(target) = ctx.graph().target(name) else {
        return Err(format!(
            "Cannot specify {} for target \"{}\" which is not built by this project.",
            command, name
        ));
    };
    if target.kind == TargetKind::InterfaceLibrary
        && items.iter().any(|i| i.visibility != Visibility::Interface)
    {
        return Err("INTERFACE library can only be used with the INTERFACE keyword".into());
    }
    Ok(())
}

/// `target_link_libraries(<target> [PUBLIC|PRIVATE|INTERFACE] <item>...)`
///
/// Items given without a keyword are public.
#[derive(Clone)]
pub struct TargetLinkLibraries;

impl Command for TargetLinkLibraries {
    fn name(&self) -> &str {
        "target_link_libraries"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let Some((name, rest)) = args.split_first() else {
            return fail("called with incorrect number of arguments");
        };
        let default = match ctx.graph().target(name).map(|t| t.kind) {
            Some(TargetKind::InterfaceLibrary) => Visibility::Interface,
            _ => Visibility::Public,
        };
        let items = match scoped_items(rest, Some(default)) {
            Ok(items) => items,
            Err(message) => return fail(message),
        };
        if let Err(message) = check_target(ctx, "link libraries", name, &items) {
            return fail(message);
        }

        let mut cleaned = Vec::with_capacity(items.len());
        for item in items {
            let trimmed = item.value.trim();
            if trimmed.len() != item.value.len() {
                if ctx.policy(CMP0004)?.is_new() {
                    return fail(format!(
                        "Target \"{}\" links to item \"{}\" which has leading or trailing whitespace.",
                        name, item.value
                    ));
                }
                cleaned.push(ScopedItem::new(trimmed, item.visibility));
            } else {
                cleaned.push(item);
            }
        }

        if let Some(target) = ctx.graph_mut().target_mut(name) {
            target.link_libraries.extend(cleaned);
        }
        Ok(ExecStatus::Normal)
    }
}

/// `target_sources(<target> <PUBLIC|PRIVATE|INTERFACE> <source>...)`
///
/// Private and public sources join `SOURCES`; interface and public ones
/// join `INTERFACE_SOURCES`.
#[derive(Clone)]
pub struct TargetSources;

impl Command for TargetSources {
    fn name(&self) -> &str {
        "target_sources"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let Some((name, rest)) = args.split_first() else {
            return fail("called with incorrect number of arguments");
        };
        let items = match scoped_items(rest, None) {
            Ok(items) => items,
            Err(message) => return fail(message),
        };
        if let Err(message) = check_target(ctx, "sources", name, &items) {
            return fail(message);
        }
        let Some(target) = ctx.graph_mut().target_mut(name) else {
            return Ok(ExecStatus::Normal);
        };
        let mut interface = target
            .properties
            .get("INTERFACE_SOURCES")
            .map(|v| split_list(v, false))
            .unwrap_or_default();
        for item in items {
            if item.visibility != Visibility::Interface {
                target.sources.push(item.value.clone());
            }
            if item.visibility != Visibility::Private {
                interface.push(item.value);
            }
        }
        if !interface.is_empty() {
            target
                .properties
                .insert("INTERFACE_SOURCES".into(), join_list(&interface));
        }
        Ok(ExecStatus::Normal)
    }
}

/// `target_include_directories(<target> [SYSTEM] [AFTER|BEFORE] <PUBLIC|PRIVATE|INTERFACE> <dir>...)`
///
/// Relative directories resolve against the current source directory.
#[derive(Clone)]
pub struct TargetIncludeDirectories;

impl Command for TargetIncludeDirectories {
    fn name(&self) -> &str {
        "target_include_directories"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let Some((name, mut rest)) = args.split_first() else {
            return fail("called with incorrect number of arguments");
        };
        let mut before = false;
        while let Some((flag, tail)) = rest.split_first() {
            match flag.as_str() {
                "SYSTEM" | "AFTER" => {}
                "BEFORE" => before = true,
                _ => break,
            }
            rest = tail;
        }
        let items = match scoped_items(rest, None) {
            Ok(items) => items,
            Err(message) => return fail(message),
        };
        if let Err(message) = check_target(ctx, "include directories", name, &items) {
            return fail(message);
        }
        let items: Vec<ScopedItem> = items
            .into_iter()
            .map(|item| {
                let dir = ctx.path_string(&ctx.resolve_path(&item.value));
                ScopedItem::new(dir, item.visibility)
            })
            .collect();
        if let Some(target) = ctx.graph_mut().target_mut(name) {
            if before {
                target.include_directories.splice(0..0, items);
            } else {
                target.include_directories.extend(items);
            }
        }
        Ok(ExecStatus::Normal)
    }
}

/// `target_compile_definitions(<target> <PUBLIC|PRIVATE|INTERFACE> <def>...)`
///
/// A leading `-D` is dropped.
#[derive(Clone)]
pub struct TargetCompileDefinitions;

impl Command for TargetCompileDefinitions {
    fn name(&self) -> &str {
        "target_compile_definitions"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let Some((name, rest)) = args.split_first() else {
            return fail("called with incorrect number of arguments");
        };
        let items = match scoped_items(rest, None) {
            Ok(items) => items,
            Err(message) => return fail(message),
        };
        if let Err(message) = check_target(ctx, "compile definitions", name, &items) {
            return fail(message);
        }
        let items = items.into_iter().filter_map(|item| {
            let value = item.value.strip_prefix("-D").unwrap_or(&item.value);
            (!value.is_empty()).then(|| ScopedItem::new(value, item.visibility))
        });
        if let Some(target) = ctx.graph_mut().target_mut(name) {
            target.compile_definitions.extend(items);
        }
        Ok(ExecStatus::Normal)
    }
}

/// `set_target_properties(<target>... PROPERTIES <prop> <value>...)`
#[derive(Clone)]
pub struct SetTargetProperties;

impl Command for SetTargetProperties {
    fn name(&self) -> &str {
        "set_target_properties"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let Some(split) = args.iter().position(|a| a == "PROPERTIES") else {
            return fail("called with incorrect number of arguments.");
        };
        let (names, pairs) = (&args[..split], &args[split + 1..]);
        if pairs.is_empty() || pairs.len() % 2 != 0 {
            return fail("called with incorrect number of arguments.");
        }
        if let Some(missing) = names.iter().find(|n| !ctx.graph().has_target(n)) {
            return fail(format!("Can not find target to add properties to: {}", missing));
        }
        for name in names {
            let Some(target) = ctx.graph_mut().target_mut(name) else {
                continue;
            };
            for pair in pairs.chunks(2) {
                let (key, value) = (&pair[0], &pair[1]);
                if key == "EXCLUDE_FROM_ALL" {
                    target.exclude_from_all = is_on(value);
                }
                target.properties.insert(key.clone(), value.clone());
            }
        }
        Ok(ExecStatus::Normal)
    }
}

/// `get_target_property(<var> <target> <property>)`
///
/// An unset property yields `<var>-NOTFOUND`.
#[derive(Clone)]
pub struct GetTargetProperty;

impl Command for GetTargetProperty {
    fn name(&self) -> &str {
        "get_target_property"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let [var, name, property] = args else {
            return fail("called with incorrect number of arguments");
        };
        let Some(target) = ctx.graph().target(name) else {
            return fail(format!(
                "could not find target \"{}\".  Perhaps it has not yet been created.",
                name
            ));
        };
        let value = target
            .property(property)
            .unwrap_or_else(|| format!("{}-NOTFOUND", var));
        ctx.set(var, value);
        Ok(ExecStatus::Normal)
    }
}
