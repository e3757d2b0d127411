//! Listkit - embeddable interpreter for CMake-style listfiles
//!
//! Listkit parses and executes `CMakeLists.txt` projects and `-P` style
//! scripts: variable scoping, control flow, user functions and macros,
//! the policy mechanism, and a build graph of the declared targets.
//! Nothing is compiled; the graph is the result.
//!
//! # Example
//!
//! ```rust
//! use listkit::Listkit;
//!
//! let listkit = Listkit::new();
//! let result = listkit.run_str(r#"
//!     cmake_minimum_required(VERSION 3.28)
//!     set(greeting "hello")
//!     message(STATUS "${greeting} world")
//! "#);
//! assert!(result.is_success());
//! assert_eq!(result.output, "-- hello world\n");
//! ```

mod builtins;
mod diagnostics;
mod error;
mod fs;
mod graph;
mod interpreter;
mod limits;
mod logging_impl;
mod parser;
mod policy;

pub use builtins::{
    Command, Context, FunctionBlocker, Registry, UserCommand, UserCommandKind, evaluate_condition,
};
pub use diagnostics::{Diagnostic, Severity};
pub use error::{Error, Result};
pub use fs::{FileSystem, InMemoryFs, RealFs, normalize_path};
pub use graph::{BuildGraph, Directory, Project, ScopedItem, Target, TargetKind, Visibility};
pub use interpreter::{
    ExecStatus, ExecutionMode, ExpandError, Expander, LISTFILE_NAME, RunResult, ScopeKind,
    ScopeStack, SetScope, join_list, split_list,
};
pub use limits::{ExecutionLimits, LimitExceeded, LoopGuard};
pub use logging_impl::LogConfig;
pub use parser::{Argument, Delimiter, Invocation, Location, parse};
pub use policy::{
    CATALOG, Policy, PolicyBehavior, PolicyId, PolicyStatus, TOOL_VERSION, Version,
    lookup as lookup_policy,
};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use interpreter::{Interpreter, Settings};

/// Main entry point for Listkit.
///
/// A `Listkit` holds configuration only. Every run starts from a fresh
/// interpreter, so one instance can serve any number of runs.
pub struct Listkit {
    fs: Arc<dyn FileSystem>,
    registry: Arc<Registry>,
    mode: ExecutionMode,
    limits: ExecutionLimits,
    log_config: LogConfig,
    cancel: Option<Arc<AtomicBool>>,
    env: BTreeMap<String, String>,
    defines: Vec<(String, String)>,
    policies: Vec<(PolicyId, PolicyStatus)>,
}

impl Default for Listkit {
    fn default() -> Self {
        Self::new()
    }
}

impl Listkit {
    /// Script mode over an empty in-memory filesystem.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ListkitBuilder {
        ListkitBuilder::default()
    }

    pub fn fs(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.fs)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Configure the project whose `CMakeLists.txt` is in `source_dir`.
    /// Always runs in project mode.
    pub fn run_project(&self, source_dir: impl AsRef<Path>) -> RunResult {
        let listfile = source_dir.as_ref().join(LISTFILE_NAME);
        self.interpreter(ExecutionMode::Project).run_file(&listfile)
    }

    /// Process a script file. Always runs in script mode.
    pub fn run_script(&self, path: impl AsRef<Path>) -> RunResult {
        self.interpreter(ExecutionMode::Script).run_file(path.as_ref())
    }

    /// Run listfile text in the configured mode. The text is treated as
    /// `/CMakeLists.txt` in project mode and `/script.cmake` in script
    /// mode.
    pub fn run_str(&self, text: &str) -> RunResult {
        let path = match self.mode {
            ExecutionMode::Project => PathBuf::from("/").join(LISTFILE_NAME),
            ExecutionMode::Script => PathBuf::from("/script.cmake"),
        };
        self.run_source(path, text)
    }

    /// Run `text` as if it were the contents of `path`, in the configured
    /// mode. Relative includes resolve against `path`'s directory.
    pub fn run_source(&self, path: impl AsRef<Path>, text: &str) -> RunResult {
        self.interpreter(self.mode).run_text(path.as_ref(), text)
    }

    fn interpreter(&self, mode: ExecutionMode) -> Interpreter {
        Interpreter::new(Settings {
            fs: Arc::clone(&self.fs),
            registry: Arc::clone(&self.registry),
            mode,
            limits: self.limits.clone(),
            log_config: self.log_config.clone(),
            cancel: self.cancel.clone(),
            env: self.env.clone(),
            defines: self.defines.clone(),
            policy_defaults: self.policies.clone(),
        })
    }
}

/// Builder for customized Listkit configuration.
#[derive(Default)]
pub struct ListkitBuilder {
    fs: Option<Arc<dyn FileSystem>>,
    registry: Option<Arc<Registry>>,
    commands: Vec<Box<dyn Command>>,
    mode: ExecutionMode,
    limits: ExecutionLimits,
    log_config: LogConfig,
    cancel: Option<Arc<AtomicBool>>,
    env: BTreeMap<String, String>,
    defines: Vec<(String, String)>,
    policies: Vec<(PolicyId, PolicyStatus)>,
}

impl ListkitBuilder {
    /// Set the filesystem listfiles are read from.
    pub fn fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// Mode used by [`Listkit::run_str`] and [`Listkit::run_source`].
    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Pre-seed a process-scope variable, like `-D NAME=VALUE`.
    pub fn define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.push((name.into(), value.into()));
        self
    }

    /// Set an entry visible to `$ENV{...}`.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn log_config(mut self, config: LogConfig) -> Self {
        self.log_config = config;
        self
    }

    /// Root-level setting for a policy. This is the only way to pin a
    /// policy to [`PolicyStatus::Error`].
    pub fn policy(mut self, id: PolicyId, status: PolicyStatus) -> Self {
        self.policies.push((id, status));
        self
    }

    /// Replace the built-in command registry.
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Register an additional command, replacing a built-in of the same
    /// name.
    pub fn command(mut self, command: Box<dyn Command>) -> Self {
        self.commands.push(command);
        self
    }

    /// Flag checked before every invocation; setting it cancels the run.
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn build(self) -> Listkit {
        let fs = self.fs.unwrap_or_else(|| Arc::new(InMemoryFs::new()));
        let registry = match (self.registry, self.commands.is_empty()) {
            (Some(registry), true) => registry,
            (None, true) => Arc::new(Registry::with_builtins()),
            (base, false) => {
                let mut registry = match base {
                    Some(base) => Arc::unwrap_or_clone(base),
                    None => Registry::with_builtins(),
                };
                for command in self.commands {
                    registry.register(command);
                }
                Arc::new(registry)
            }
        };

        Listkit {
            fs,
            registry,
            mode: self.mode,
            limits: self.limits,
            log_config: self.log_config,
            cancel: self.cancel,
            env: self.env,
            defines: self.defines,
            policies: self.policies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    const PRELUDE: &str = "cmake_minimum_required(VERSION 3.28)\n";

    fn script(body: &str) -> RunResult {
        Listkit::new().run_str(&format!("{}{}", PRELUDE, body))
    }

    #[test]
    fn test_message_status() {
        let result = script("message(STATUS \"hello\")");
        assert!(result.is_success());
        assert_eq!(result.output, "-- hello\n");
    }

    #[test]
    fn test_variable_expansion() {
        let result = script("set(name world)\nmessage(\"hello ${name}\")");
        assert_eq!(result.output, "hello world\n");
    }

    #[test]
    fn test_define_seeds_process_scope() {
        let listkit = Listkit::builder().define("GREETING", "hi").build();
        let result = listkit.run_str("message(\"${GREETING}\")");
        assert_eq!(result.output, "hi\n");
    }

    #[test]
    fn test_env_lookup() {
        let listkit = Listkit::builder().env("HOME", "/home/user").build();
        let result = listkit.run_str("message(\"$ENV{HOME}\")");
        assert_eq!(result.output, "/home/user\n");
    }

    #[test]
    fn test_fatal_error_stops_run() {
        let result = script("message(FATAL_ERROR \"boom\")\nmessage(after)");
        assert!(!result.is_success());
        assert!(matches!(result.error, Some(Error::At { .. })));
        assert_eq!(result.output, "");
    }

    #[test]
    fn test_unknown_command() {
        let result = script("set(X 1)\nmessage(\"${X}\")\nfrobnicate(a b)\nset(X 2)\nmessage(\"${X}\")");
        assert!(!result.is_success());
        assert_eq!(result.output, "1\n");
        assert_eq!(result.errors().len(), 1);
        let error = result.error.unwrap();
        assert!(error.to_string().contains("frobnicate"));
        assert_eq!(error.location().map(|l| l.line), Some(4));
    }

    #[test]
    fn test_project_commands_rejected_in_script_mode() {
        let result = script("add_executable(app main.c)");
        assert!(!result.is_success());
    }

    #[test]
    fn test_run_project() {
        let fs = Arc::new(InMemoryFs::new());
        fs.add_file(
            "/src/CMakeLists.txt",
            "cmake_minimum_required(VERSION 3.28)\nproject(demo)\nadd_executable(app main.c)\n",
        );
        let listkit = Listkit::builder().fs(fs).build();
        let result = listkit.run_project("/src");
        assert!(result.is_success(), "{:?}", result.diagnostics);
        let app = result.graph.target("app").unwrap();
        assert_eq!(app.kind, TargetKind::Executable);
        assert_eq!(app.sources, vec!["main.c"]);
        assert_eq!(
            result.graph.directories[0].project.as_ref().map(|p| p.name.as_str()),
            Some("demo")
        );
    }

    #[test]
    fn test_custom_command() {
        #[derive(Clone)]
        struct Shout;

        impl Command for Shout {
            fn name(&self) -> &str {
                "shout"
            }

            fn clone_command(&self) -> Box<dyn Command> {
                Box::new(self.clone())
            }

            fn is_scriptable(&self) -> bool {
                true
            }

            fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
                ctx.output(&args.join(" ").to_uppercase());
                Ok(ExecStatus::Normal)
            }
        }

        let listkit = Listkit::builder().command(Box::new(Shout)).build();
        let result = listkit.run_str("set(x quiet)\nshout(${x} words)");
        assert_eq!(result.output, "QUIET WORDS\n");
    }

    #[test]
    fn test_custom_command_not_scriptable_by_default() {
        #[derive(Clone)]
        struct Declare;

        impl Command for Declare {
            fn name(&self) -> &str {
                "declare_thing"
            }

            fn clone_command(&self) -> Box<dyn Command> {
                Box::new(self.clone())
            }

            fn initial_pass(&mut self, _args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
                ctx.output("declared");
                Ok(ExecStatus::Normal)
            }
        }

        let listkit = Listkit::builder().command(Box::new(Declare)).build();
        let result = listkit.run_str("declare_thing()");
        assert!(!result.is_success());
        assert!(result.error.unwrap().to_string().contains("not scriptable"));
        assert_eq!(result.output, "");

        let listkit = Listkit::builder()
            .mode(ExecutionMode::Project)
            .command(Box::new(Declare))
            .build();
        let result = listkit.run_str("declare_thing()");
        assert!(result.is_success(), "{:?}", result.diagnostics);
        assert_eq!(result.output, "declared\n");
    }

    #[test]
    fn test_cancel_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        flag.store(true, Ordering::SeqCst);
        let listkit = Listkit::builder().cancel_flag(flag).build();
        let result = listkit.run_str("message(never)");
        assert!(matches!(result.error, Some(Error::Cancelled)));
        assert_eq!(result.output, "");
    }

    #[test]
    fn test_instance_is_reusable() {
        let listkit = Listkit::new();
        let first = listkit.run_str("set(x 1)\nmessage(\"${x}\")");
        let second = listkit.run_str("message(\"[${x}]\")");
        assert_eq!(first.output, "1\n");
        assert_eq!(second.output, "[]\n");
    }
}
