//! Interpreter for listfiles
//!
//! Owns everything one run mutates: the variable scope stack, the policy
//! stack, user-defined commands, the build graph and the diagnostics.
//! Invocations are expanded, dispatched to a fresh command instance and
//! their [`ExecStatus`] acted upon. Conditionals, loops and user commands
//! re-enter the same loop over a recorded body, bounded by the call depth
//! limit.

mod context;
mod expand;
mod scope;
mod state;

pub use context::Context;
pub use expand::{ExpandError, Expander, has_reference, join_list, split_list};
pub use scope::{NoParentScope, ScopeKind, ScopeStack, SetScope};
pub use state::{ExecStatus, RunResult};

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, trace, warn};

use crate::builtins::{Command, FunctionBlocker, Registry, UserCommand, UserCommandKind, UserCommands};
use crate::diagnostics::{Diagnostic, Severity};
use crate::error::{Error, Result};
use crate::fs::{FileSystem, normalize_path};
use crate::graph::BuildGraph;
use crate::limits::{ExecutionCounters, ExecutionLimits, LimitExceeded};
use crate::logging_impl::LogConfig;
use crate::parser::{self, Argument, Invocation, Location};
use crate::policy::{
    CMP0010, CMP0011, PolicyBehavior, PolicyId, PolicyScopeKind, PolicyStack, PolicyStatus, TOOL_VERSION,
    lookup,
};

/// Name of the listfile read from every project directory.
pub const LISTFILE_NAME: &str = "CMakeLists.txt";

/// Which commands a run accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Full project configuration; build-graph commands are available
    Project,
    /// Script processing; only scriptable commands may run
    #[default]
    Script,
}

/// Everything a run is configured with.
pub(crate) struct Settings {
    pub fs: Arc<dyn FileSystem>,
    pub registry: Arc<Registry>,
    pub mode: ExecutionMode,
    pub limits: ExecutionLimits,
    pub log_config: LogConfig,
    pub cancel: Option<Arc<AtomicBool>>,
    pub env: BTreeMap<String, String>,
    pub defines: Vec<(String, String)>,
    pub policy_defaults: Vec<(PolicyId, PolicyStatus)>,
}

/// One activation of the invocation loop (file, body replay, call).
#[derive(Default)]
struct Frame {
    recorder: Option<Recorder>,
}

/// An open block capturing invocations until its closer.
struct Recorder {
    blocker: Box<dyn FunctionBlocker>,
    opened_at: Location,
    opener: String,
    /// Nested openers of the same kind seen so far
    depth: usize,
    body: Vec<Invocation>,
}

enum Step {
    Dispatch,
    Captured,
    Closed(Recorder, Invocation),
}

struct FileState {
    path: PathBuf,
    policy_base: usize,
}

struct DirectoryState {
    graph_index: Option<usize>,
    source_dir: PathBuf,
    final_passes: Vec<(Box<dyn Command>, Invocation)>,
}

/// Stack heights to restore when a call, include or directory ends,
/// whether it finished or failed.
struct Marks {
    vars: usize,
    policies: usize,
    call_stack: usize,
    directories: usize,
    commands: usize,
    call_depth: usize,
}

/// The execution state of one run.
pub(crate) struct Interpreter {
    fs: Arc<dyn FileSystem>,
    registry: Arc<Registry>,
    mode: ExecutionMode,
    limits: ExecutionLimits,
    log_config: LogConfig,
    cancel: Option<Arc<AtomicBool>>,
    env: BTreeMap<String, String>,

    vars: ScopeStack,
    policies: PolicyStack,
    commands: UserCommands,
    graph: BuildGraph,
    counters: ExecutionCounters,

    frames: Vec<Frame>,
    files: Vec<FileState>,
    directories: Vec<DirectoryState>,
    call_stack: Vec<Location>,
    loop_depth: usize,
    propagate: Option<Vec<String>>,

    output: String,
    diagnostics: Vec<Diagnostic>,
    warned: HashSet<(PolicyId, Location)>,
    fatal_backtrace: Option<Vec<Location>>,
}

impl Interpreter {
    pub(crate) fn new(settings: Settings) -> Self {
        let mut policies = PolicyStack::new();
        for (id, status) in settings.policy_defaults {
            policies.set_default(id, status);
        }

        let mut vars = ScopeStack::new();
        vars.set_current("CMAKE_VERSION", TOOL_VERSION.to_string());
        vars.set_current("CMAKE_MAJOR_VERSION", TOOL_VERSION.major.to_string());
        vars.set_current("CMAKE_MINOR_VERSION", TOOL_VERSION.minor.to_string());
        vars.set_current("CMAKE_PATCH_VERSION", TOOL_VERSION.patch.to_string());
        for (name, value) in &settings.defines {
            trace!(name = %name, value = %settings.log_config.named_value(name, value), "define");
            vars.set_process(name, value.clone());
        }
        for (name, value) in &settings.env {
            trace!(name = %name, value = %settings.log_config.named_value(name, value), "environment entry");
        }

        Self {
            fs: settings.fs,
            registry: settings.registry,
            mode: settings.mode,
            limits: settings.limits,
            log_config: settings.log_config,
            cancel: settings.cancel,
            env: settings.env,
            vars,
            policies,
            commands: UserCommands::new(),
            graph: BuildGraph::new(),
            counters: ExecutionCounters::new(),
            frames: Vec::new(),
            files: Vec::new(),
            directories: Vec::new(),
            call_stack: Vec::new(),
            loop_depth: 0,
            propagate: None,
            output: String::new(),
            diagnostics: Vec::new(),
            warned: HashSet::new(),
            fatal_backtrace: None,
        }
    }

    /// Run a listfile read through the filesystem as the top-level file.
    pub(crate) fn run_file(mut self, listfile: &Path) -> RunResult {
        let listfile = normalize_path(listfile);
        let result = self
            .fs
            .read_to_string(&listfile)
            .and_then(|text| self.run_top(&listfile, &text));
        self.finish(result)
    }

    /// Run `text` as the top-level listfile `listfile`.
    pub(crate) fn run_text(mut self, listfile: &Path, text: &str) -> RunResult {
        let listfile = normalize_path(listfile);
        let result = self.run_top(&listfile, text);
        self.finish(result)
    }

    fn run_top(&mut self, listfile: &Path, text: &str) -> Result<()> {
        let source_dir = parent_dir(listfile);
        info!(mode = ?self.mode, file = %listfile.display(), "run started");

        self.vars
            .set_current("CMAKE_SOURCE_DIR", path_string(&source_dir));
        if self.mode == ExecutionMode::Script {
            self.vars
                .set_current("CMAKE_SCRIPT_MODE_FILE", path_string(listfile));
        }

        let invocations = self.parse_listfile(listfile, text)?;
        self.run_directory(&source_dir, listfile, &invocations, None)
    }

    fn finish(mut self, result: Result<()>) -> RunResult {
        let error = match result {
            Ok(()) => {
                info!(
                    invocations = self.counters.invocations,
                    max_depth = self.counters.max_call_depth_seen,
                    "run finished"
                );
                None
            }
            Err(err) => {
                error!(error = %err, "run failed");
                let backtrace = self.fatal_backtrace.take().unwrap_or_default();
                let mut diagnostic =
                    Diagnostic::new(Severity::Error, err.message()).with_backtrace(backtrace);
                if let Some(location) = err.location() {
                    diagnostic = diagnostic.at(location);
                }
                self.diagnostics.push(diagnostic);
                Some(err)
            }
        };

        RunResult {
            output: self.output,
            diagnostics: self.diagnostics,
            graph: self.graph,
            error,
        }
    }

    fn parse_listfile(&self, path: &Path, text: &str) -> Result<Vec<Invocation>> {
        debug!(
            file = %path.display(),
            content = %self.log_config.listfile(text),
            "parsing listfile"
        );
        parser::parse(text, &path_string(path))
    }

    fn read_listfile(&self, path: &Path) -> Result<Vec<Invocation>> {
        let text = self.fs.read_to_string(path)?;
        self.parse_listfile(path, &text)
    }

    // ------------------------------------------------------------------
    // Invocation loop
    // ------------------------------------------------------------------

    /// Run invocations in a fresh frame. Blocks opened in the frame must
    /// close in it.
    fn run_frame(&mut self, invocations: &[Invocation]) -> Result<ExecStatus> {
        self.frames.push(Frame::default());
        let result = self.run_invocations(invocations);
        let frame = self.frames.pop();
        let status = result?;

        if let Some(recorder) = frame.and_then(|f| f.recorder) {
            self.note_backtrace();
            return Err(Error::command(
                &recorder.opener,
                format!(
                    "block opened here is not closed: missing {}()",
                    recorder.blocker.closer()
                ),
            )
            .located(&recorder.opened_at));
        }
        Ok(status)
    }

    fn run_invocations(&mut self, invocations: &[Invocation]) -> Result<ExecStatus> {
        for invocation in invocations {
            let status = match self.record(invocation) {
                Step::Captured => continue,
                Step::Dispatch => self.execute_invocation(invocation)?,
                Step::Closed(recorder, closer) => self.replay(recorder, &closer)?,
            };
            if status.interrupts() {
                return Ok(status);
            }
        }
        Ok(ExecStatus::Normal)
    }

    /// Feed an invocation to the frame's open block, if any.
    fn record(&mut self, invocation: &Invocation) -> Step {
        let Some(frame) = self.frames.last_mut() else {
            return Step::Dispatch;
        };
        let Some(recorder) = frame.recorder.as_mut() else {
            return Step::Dispatch;
        };

        let name = invocation.lookup_name();
        if name == recorder.blocker.opener() {
            recorder.depth += 1;
        } else if name == recorder.blocker.closer() {
            if recorder.depth == 0 {
                return match frame.recorder.take() {
                    Some(recorder) => Step::Closed(recorder, invocation.clone()),
                    None => Step::Dispatch,
                };
            }
            recorder.depth -= 1;
        }
        recorder.body.push(invocation.clone());
        Step::Captured
    }

    /// Start recording the current frame's invocations into `blocker`.
    pub(crate) fn open_block(
        &mut self,
        blocker: Box<dyn FunctionBlocker>,
        invocation: &Invocation,
    ) -> Result<()> {
        let Some(frame) = self.frames.last_mut() else {
            return Err(Error::Internal("block opened outside of a frame".into()));
        };
        frame.recorder = Some(Recorder {
            blocker,
            opened_at: invocation.location.clone(),
            opener: invocation.name.clone(),
            depth: 0,
            body: Vec::new(),
        });
        Ok(())
    }

    fn replay(&mut self, recorder: Recorder, closer: &Invocation) -> Result<ExecStatus> {
        self.check_cancelled()?;
        debug!(
            block = %recorder.opener,
            line = recorder.opened_at.line,
            invocations = recorder.body.len(),
            "replaying block"
        );
        let opened_at = recorder.opened_at.clone();
        let opener = recorder.opener.clone();
        let mut ctx = Context::new(self, closer);
        let result = recorder.blocker.replay(recorder.body, &mut ctx);
        let status = result.map_err(|e| {
            self.note_backtrace();
            e.located(&opened_at)
        })?;
        self.settle(status, &opener, &opened_at)
    }

    /// Expand, dispatch and settle one invocation.
    pub(crate) fn execute_invocation(&mut self, invocation: &Invocation) -> Result<ExecStatus> {
        self.check_cancelled()?;
        self.counters.tick_invocation();

        let name = invocation.lookup_name();
        let Some(mut command) = self.resolve_command(&name) else {
            self.note_backtrace();
            return Err(Error::Dispatch(invocation.name.clone()).located(&invocation.location));
        };

        let status = match self.dispatch(command.as_mut(), invocation) {
            Ok(status) => status,
            Err(err) => {
                self.note_backtrace();
                return Err(err.located(&invocation.location));
            }
        };

        if command.has_final_pass() {
            if let Some(dir) = self.directories.last_mut() {
                dir.final_passes.push((command, invocation.clone()));
            }
        }
        self.settle(status, &invocation.name, &invocation.location)
    }

    fn dispatch(&mut self, command: &mut dyn Command, invocation: &Invocation) -> Result<ExecStatus> {
        if self.mode == ExecutionMode::Script && !command.is_scriptable() {
            return Err(Error::command(
                &invocation.name,
                "command is not scriptable",
            ));
        }

        let args = if command.expands_arguments() {
            self.expand_arguments(&invocation.arguments, &invocation.location)?
        } else {
            Vec::new()
        };
        debug!(command = %invocation.name, line = invocation.line(), "dispatch");
        trace!(args = %self.log_config.arguments(&args), "expanded arguments");

        let mut ctx = Context::new(self, invocation);
        command.initial_pass(&args, &mut ctx)
    }

    /// Act on a command-reported failure: recoverable in project mode,
    /// fatal in script mode.
    fn settle(&mut self, status: ExecStatus, name: &str, location: &Location) -> Result<ExecStatus> {
        match status {
            ExecStatus::Error(message) => match self.mode {
                ExecutionMode::Project => {
                    self.report(
                        Severity::Error,
                        format!("{}: {}", name, message),
                        Some(location.clone()),
                    );
                    Ok(ExecStatus::Normal)
                }
                ExecutionMode::Script => {
                    self.note_backtrace();
                    Err(Error::command(name, message).located(location))
                }
            },
            other => Ok(other),
        }
    }

    fn resolve_command(&self, name: &str) -> Option<Box<dyn Command>> {
        self.commands
            .instantiate(name)
            .or_else(|| self.registry.instantiate(name))
            .or_else(|| {
                self.overridden_builtin(name)
                    .and_then(|base| self.registry.instantiate(base))
            })
    }

    /// `_name` reaches the built-in `name` once a user command replaced it.
    fn overridden_builtin<'n>(&self, name: &'n str) -> Option<&'n str> {
        name.strip_prefix('_')
            .filter(|base| self.commands.contains(base) && self.registry.contains(base))
    }

    pub(crate) fn has_command(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.commands.contains(&name)
            || self.registry.contains(&name)
            || self.overridden_builtin(&name).is_some()
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Nested execution
    // ------------------------------------------------------------------

    fn marks(&self) -> Marks {
        Marks {
            vars: self.vars.depth(),
            policies: self.policies.depth(),
            call_stack: self.call_stack.len(),
            directories: self.directories.len(),
            commands: self.commands.depth(),
            call_depth: self.counters.call_depth,
        }
    }

    fn restore(&mut self, marks: Marks) {
        self.vars.truncate(marks.vars);
        self.policies.truncate(marks.policies);
        self.call_stack.truncate(marks.call_stack);
        self.directories.truncate(marks.directories);
        self.commands.truncate(marks.commands);
        self.counters.call_depth = marks.call_depth;
    }

    fn push_frame(&mut self) -> Result<()> {
        self.counters
            .push_frame(&self.limits)
            .map_err(Error::ResourceLimit)
    }

    /// Replay a recorded body in a new frame.
    pub(crate) fn execute_body(&mut self, body: &[Invocation]) -> Result<ExecStatus> {
        self.push_frame()?;
        let result = self.run_frame(body);
        self.counters.pop_frame();
        result
    }

    pub(crate) fn execute_loop_body(&mut self, body: &[Invocation]) -> Result<ExecStatus> {
        self.loop_depth += 1;
        let result = self.execute_body(body);
        self.loop_depth -= 1;
        result
    }

    /// Invoke a user-defined function or macro.
    pub(crate) fn call_user(
        &mut self,
        def: &UserCommand,
        args: &[String],
        call_site: &Location,
    ) -> Result<ExecStatus> {
        let marks = self.marks();
        let result = self.call_user_inner(def, args, call_site);
        self.restore(marks);
        result
    }

    fn call_user_inner(
        &mut self,
        def: &UserCommand,
        args: &[String],
        call_site: &Location,
    ) -> Result<ExecStatus> {
        self.push_frame()?;
        self.call_stack.push(call_site.clone());
        self.policies
            .push_snapshot(PolicyScopeKind::Function, &def.policies);
        debug!(command = %def.name, kind = ?def.kind, args = args.len(), "calling user command");

        match def.kind {
            UserCommandKind::Function => {
                self.vars.push_scope(ScopeKind::Function);
                def.bind_arguments(&mut self.vars, args);

                let saved_loop_depth = std::mem::take(&mut self.loop_depth);
                let result = self.run_frame(&def.body);
                self.loop_depth = saved_loop_depth;

                let propagate = self.propagate.take();
                let status = result?;
                if status == ExecStatus::Return {
                    if let Some(names) = propagate {
                        self.propagate_to_parent(&names)?;
                    }
                }
                Ok(ExecStatus::Normal)
            }
            // Macro bodies run in the caller's scope; `return()` inside a
            // macro returns from the caller, so every status passes through.
            UserCommandKind::Macro => {
                let body = def.substitute_body(args);
                self.run_frame(&body)
            }
        }
    }

    fn propagate_to_parent(&mut self, names: &[String]) -> Result<()> {
        for name in names {
            let written = match self.vars.definition(name).map(str::to_string) {
                Some(value) => self.vars.set(name, value, SetScope::Parent),
                None => self.vars.unset(name, SetScope::Parent),
            };
            written.map_err(|e| Error::Internal(e.to_string()))?;
        }
        Ok(())
    }

    /// Run another listfile in the current variable scope.
    ///
    /// A policy scope is pushed around the file under CMP0011 NEW unless
    /// `no_policy_scope`; the policy is only consulted when the file sets
    /// policies at all.
    pub(crate) fn include_file(
        &mut self,
        path: &Path,
        no_policy_scope: bool,
        call_site: &Location,
    ) -> Result<()> {
        let invocations = self.read_listfile(path)?;
        let sets_policies = invocations.iter().any(|i| {
            matches!(
                i.lookup_name().as_str(),
                "cmake_policy" | "cmake_minimum_required"
            )
        });
        let push_policy_scope =
            !no_policy_scope && sets_policies && self.policy_at(CMP0011, call_site)?.is_new();

        let marks = self.marks();
        let result = self.push_frame().and_then(|()| {
            self.call_stack.push(call_site.clone());
            if push_policy_scope {
                self.policies.push(PolicyScopeKind::Include);
            }
            self.run_listfile(path, &invocations)
        });
        // return(PROPAGATE) has no scope to leave from an include
        self.propagate = None;
        // Without a pushed scope, policy settings made by the file stay
        // with the includer: keep them by restoring only above the marks.
        self.restore(marks);
        result.map(|_| ())
    }

    /// Process `source_dir/CMakeLists.txt` as a child directory.
    pub(crate) fn add_subdirectory(&mut self, source_dir: &Path, call_site: &Location) -> Result<()> {
        let listfile = source_dir.join(LISTFILE_NAME);
        let invocations = self.read_listfile(&listfile)?;
        self.run_directory(source_dir, &listfile, &invocations, Some(call_site))
    }

    /// Parse and run `code` in the current scope (`cmake_language(EVAL)`).
    pub(crate) fn eval_code(&mut self, code: &str, location: &Location) -> Result<ExecStatus> {
        let invocations = parser::parse(code, &location.file)?;
        self.execute_body(&invocations)
    }

    fn run_directory(
        &mut self,
        source_dir: &Path,
        listfile: &Path,
        invocations: &[Invocation],
        call_site: Option<&Location>,
    ) -> Result<()> {
        let marks = self.marks();
        let result = self
            .enter_directory(source_dir, call_site)
            .and_then(|()| self.run_directory_body(listfile, invocations, call_site.is_some()));
        self.propagate = None;
        self.restore(marks);
        info!(dir = %source_dir.display(), "leaving directory");
        result
    }

    fn enter_directory(&mut self, source_dir: &Path, call_site: Option<&Location>) -> Result<()> {
        if let Some(site) = call_site {
            self.push_frame()?;
            self.call_stack.push(site.clone());
            self.vars.push_scope(ScopeKind::Directory);
            self.commands.push_layer();
        }
        self.policies.push(PolicyScopeKind::Directory);

        let parent = self.directories.last().and_then(|d| d.graph_index);
        let graph_index = match self.mode {
            ExecutionMode::Project => Some(self.graph.add_directory(source_dir, parent)),
            ExecutionMode::Script => None,
        };
        self.directories.push(DirectoryState {
            graph_index,
            source_dir: source_dir.to_path_buf(),
            final_passes: Vec::new(),
        });
        self.vars
            .set_current("CMAKE_CURRENT_SOURCE_DIR", path_string(source_dir));
        info!(dir = %source_dir.display(), "entering directory");
        Ok(())
    }

    fn run_directory_body(
        &mut self,
        listfile: &Path,
        invocations: &[Invocation],
        has_parent: bool,
    ) -> Result<()> {
        let status = self.run_listfile(listfile, invocations)?;
        self.run_final_passes()?;
        let propagate = self.propagate.take();
        if status == ExecStatus::Return && has_parent {
            if let Some(names) = propagate {
                self.propagate_to_parent(&names)?;
            }
        }
        Ok(())
    }

    /// Run a parsed listfile with file bookkeeping: list-file variables
    /// and the `cmake_policy(PUSH/POP)` barrier.
    fn run_listfile(&mut self, path: &Path, invocations: &[Invocation]) -> Result<ExecStatus> {
        const LIST_VARS: [&str; 2] = ["CMAKE_CURRENT_LIST_FILE", "CMAKE_CURRENT_LIST_DIR"];
        let saved: Vec<Option<String>> = LIST_VARS
            .iter()
            .map(|name| self.vars.definition(name).map(str::to_string))
            .collect();
        self.vars
            .set_current("CMAKE_CURRENT_LIST_FILE", path_string(path));
        self.vars
            .set_current("CMAKE_CURRENT_LIST_DIR", path_string(&parent_dir(path)));

        let policy_base = self.policies.depth();
        self.files.push(FileState {
            path: path.to_path_buf(),
            policy_base,
        });
        info!(file = %path.display(), invocations = invocations.len(), "entering listfile");

        let result = self.run_frame(invocations).and_then(|status| {
            if self.policies.user_scopes_above(policy_base) > 0 {
                let end = Location::new(
                    path_string(path),
                    invocations.last().map(Invocation::line).unwrap_or(1),
                );
                return Err(Error::command(
                    "cmake_policy",
                    "PUSH without matching POP",
                )
                .located(&end));
            }
            Ok(status)
        });

        self.files.pop();
        self.policies.truncate(policy_base);
        for (name, value) in LIST_VARS.iter().zip(saved) {
            match value {
                Some(value) => self.vars.set_current(name, value),
                None => self.vars.unset_current(name),
            }
        }
        result
    }

    fn run_final_passes(&mut self) -> Result<()> {
        loop {
            let pending = match self.directories.last_mut() {
                Some(dir) => std::mem::take(&mut dir.final_passes),
                None => return Ok(()),
            };
            if pending.is_empty() {
                return Ok(());
            }
            for (mut command, invocation) in pending {
                self.check_cancelled()?;
                debug!(command = %invocation.name, line = invocation.line(), "final pass");
                let mut ctx = Context::new(self, &invocation);
                let result = command.final_pass(&mut ctx);
                if let Err(err) = result {
                    self.note_backtrace();
                    return Err(err.located(&invocation.location));
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Expansion
    // ------------------------------------------------------------------

    pub(crate) fn expand_arguments(
        &mut self,
        args: &[Argument],
        location: &Location,
    ) -> Result<Vec<String>> {
        let mut expanded = Vec::with_capacity(args.len());
        for arg in args {
            expanded.extend(self.expand_with(arg, location, |e, a| e.expand_argument(a))?);
        }
        Ok(expanded)
    }

    fn expand_with<T>(
        &mut self,
        arg: &Argument,
        location: &Location,
        expand: impl Fn(&Expander<'_>, &Argument) -> std::result::Result<T, ExpandError>,
    ) -> Result<T> {
        let computed = [("CMAKE_CURRENT_LIST_LINE", location.line.to_string())];
        let strict = {
            let expander = Expander::new(&self.vars, &self.env, self.limits.max_expansion_depth)
                .with_computed(&computed);
            expand(&expander, arg)
        };

        match strict {
            Ok(value) => Ok(value),
            Err(ExpandError::Unterminated(text)) => {
                if self.policy_at(CMP0010, location)?.is_new() {
                    return Err(Error::Expansion(
                        ExpandError::Unterminated(text).to_string(),
                    ));
                }
                let expander =
                    Expander::new(&self.vars, &self.env, self.limits.max_expansion_depth)
                        .with_computed(&computed)
                        .lenient(true);
                expand(&expander, arg).map_err(expansion_error)
            }
            Err(err) => Err(expansion_error(err)),
        }
    }

    // ------------------------------------------------------------------
    // Policies and diagnostics
    // ------------------------------------------------------------------

    /// Resolve a policy for an invocation at `location`. `WARN` reports
    /// once per (policy, location) and yields the old behavior; `ERROR`
    /// fails the invocation.
    pub(crate) fn policy_at(&mut self, id: PolicyId, location: &Location) -> Result<PolicyBehavior> {
        let policy = lookup(id).ok_or_else(|| Error::Internal(format!("unknown policy {}", id)))?;
        match self.policies.get(id) {
            PolicyStatus::Old => Ok(PolicyBehavior::Old),
            PolicyStatus::New => Ok(PolicyBehavior::New),
            PolicyStatus::Warn => {
                if self.warned.insert((id, location.clone())) {
                    self.report(
                        Severity::AuthorWarning,
                        policy.warning_message(),
                        Some(location.clone()),
                    );
                }
                Ok(PolicyBehavior::Old)
            }
            PolicyStatus::Error => Err(Error::Policy {
                id,
                message: policy.error_message(),
            }),
        }
    }

    pub(crate) fn report(&mut self, severity: Severity, message: String, location: Option<Location>) {
        match severity {
            Severity::Error => error!(message = %message, "error reported"),
            _ => warn!(message = %message, "warning reported"),
        }
        let mut diagnostic = Diagnostic::new(severity, message).with_backtrace(self.backtrace());
        if let Some(location) = location {
            diagnostic = diagnostic.at(location);
        }
        self.diagnostics.push(diagnostic);
    }

    fn backtrace(&self) -> Vec<Location> {
        self.call_stack.iter().rev().cloned().collect()
    }

    /// Remember the call stack of the innermost failing invocation.
    fn note_backtrace(&mut self) {
        if self.fatal_backtrace.is_none() {
            self.fatal_backtrace = Some(self.backtrace());
        }
    }

    /// `cmake_policy(POP)`: only scopes pushed by the current file may go.
    pub(crate) fn pop_user_policy_scope(&mut self) -> bool {
        let base = self.files.last().map(|f| f.policy_base).unwrap_or(1);
        if self.policies.depth() > base && self.policies.top_kind() == PolicyScopeKind::User {
            self.policies.pop();
            true
        } else {
            false
        }
    }

    pub(crate) fn current_list_file(&self) -> Option<&Path> {
        self.files.last().map(|f| f.path.as_path())
    }

    pub(crate) fn current_source_dir(&self) -> PathBuf {
        self.directories
            .last()
            .map(|d| d.source_dir.clone())
            .unwrap_or_else(|| PathBuf::from("/"))
    }
}

fn expansion_error(err: ExpandError) -> Error {
    match err {
        ExpandError::TooDeep(limit) => {
            Error::Expansion(LimitExceeded::MaxExpansionDepth(limit).to_string())
        }
        other => Error::Expansion(other.to_string()),
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"))
}

pub(crate) fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Listkit;

    #[test]
    fn test_unknown_command_leaves_state_untouched() {
        let mut interp = Listkit::new().interpreter(ExecutionMode::Script);
        let text = "set(X 1)\nfrobnicate(X 2)\nset(X 3)\n";
        let err = match interp.run_top(Path::new("/script.cmake"), text) {
            Ok(()) => panic!("unknown command ran"),
            Err(err) => err,
        };
        assert!(matches!(err.kind(), Error::Dispatch(name) if name == "frobnicate"));
        assert_eq!(err.location().map(|l| l.line), Some(2));
        assert_eq!(interp.vars.get("X"), "1");
        assert_eq!(interp.output, "");
        assert!(interp.diagnostics.is_empty());
    }
}
