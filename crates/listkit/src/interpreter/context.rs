//! Execution context handed to commands
//!
//! A [`Context`] is the only view a command gets of the interpreter: the
//! invocation being run plus the state a command may read or mutate.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{ExecStatus, ExecutionMode, Interpreter, ScopeStack, SetScope, path_string};
use crate::builtins::{FunctionBlocker, UserCommand};
use crate::diagnostics::Severity;
use crate::error::{Error, Result};
use crate::fs::{FileSystem, normalize_path};
use crate::graph::BuildGraph;
use crate::limits::{ExecutionLimits, LoopGuard};
use crate::parser::{Argument, Invocation, Location};
use crate::policy::{PolicyBehavior, PolicyId, PolicyScopeKind, PolicyStack};

/// The interpreter as seen by one command invocation.
pub struct Context<'a> {
    interp: &'a mut Interpreter,
    invocation: &'a Invocation,
}

impl<'a> Context<'a> {
    pub(crate) fn new(interp: &'a mut Interpreter, invocation: &'a Invocation) -> Self {
        Self { interp, invocation }
    }

    /// The invocation being executed, with its unexpanded arguments.
    pub fn invocation(&self) -> &Invocation {
        self.invocation
    }

    pub fn location(&self) -> &Location {
        &self.invocation.location
    }

    pub fn mode(&self) -> ExecutionMode {
        self.interp.mode
    }

    pub fn limits(&self) -> &ExecutionLimits {
        &self.interp.limits
    }

    // --- variables ---

    pub fn vars(&self) -> &ScopeStack {
        &self.interp.vars
    }

    pub fn vars_mut(&mut self) -> &mut ScopeStack {
        &mut self.interp.vars
    }

    /// Value of a variable; unset reads as empty.
    pub fn get(&self, name: &str) -> &str {
        self.interp.vars.get(name)
    }

    pub fn get_list(&self, name: &str) -> Vec<String> {
        self.interp.vars.get_list(name)
    }

    pub fn definition(&self, name: &str) -> Option<&str> {
        self.interp.vars.definition(name)
    }

    /// Bind in the current scope.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.interp.vars.set_current(name, value);
    }

    /// Unset in the current scope.
    pub fn unset(&mut self, name: &str) {
        self.interp.vars.unset_current(name);
    }

    pub fn set_in(&mut self, name: &str, value: impl Into<String>, scope: SetScope) -> Result<()> {
        self.interp
            .vars
            .set(name, value, scope)
            .map_err(|e| Error::command(&self.invocation.name, e.to_string()))
    }

    pub fn unset_in(&mut self, name: &str, scope: SetScope) -> Result<()> {
        self.interp
            .vars
            .unset(name, scope)
            .map_err(|e| Error::command(&self.invocation.name, e.to_string()))
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.interp.env
    }

    /// `set(ENV{name} value)`; visible to `$ENV{}` for the rest of the run.
    pub fn set_env(&mut self, name: &str, value: impl Into<String>) {
        self.interp.env.insert(name.to_string(), value.into());
    }

    pub fn unset_env(&mut self, name: &str) {
        self.interp.env.remove(name);
    }

    // --- policies ---

    /// Resolve a policy at this invocation. See [`Interpreter::policy_at`].
    pub fn policy(&mut self, id: PolicyId) -> Result<PolicyBehavior> {
        let location = self.invocation.location.clone();
        self.interp.policy_at(id, &location)
    }

    /// Resolve a policy for a construct at `location` (e.g. an `elseif`).
    pub fn policy_at(&mut self, id: PolicyId, location: &Location) -> Result<PolicyBehavior> {
        self.interp.policy_at(id, location)
    }

    pub fn policies(&self) -> &PolicyStack {
        &self.interp.policies
    }

    pub fn policies_mut(&mut self) -> &mut PolicyStack {
        &mut self.interp.policies
    }

    /// `cmake_policy(PUSH)`
    pub fn push_policy_scope(&mut self) {
        self.interp.policies.push(PolicyScopeKind::User);
    }

    /// `cmake_policy(POP)`; false if the current file pushed nothing.
    pub fn pop_policy_scope(&mut self) -> bool {
        self.interp.pop_user_policy_scope()
    }

    // --- output and diagnostics ---

    /// Append a line to the run's output.
    pub fn output(&mut self, line: &str) {
        self.interp.output.push_str(line);
        self.interp.output.push('\n');
    }

    /// Record a diagnostic at this invocation.
    pub fn issue(&mut self, severity: Severity, message: impl Into<String>) {
        let location = self.invocation.location.clone();
        self.interp.report(severity, message.into(), Some(location));
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.issue(Severity::Warning, message);
    }

    /// Record a non-fatal error: processing continues, the run fails.
    pub fn issue_error(&mut self, message: impl Into<String>) {
        self.issue(Severity::Error, message);
    }

    // --- build graph and files ---

    pub fn graph(&self) -> &BuildGraph {
        &self.interp.graph
    }

    pub fn graph_mut(&mut self) -> &mut BuildGraph {
        &mut self.interp.graph
    }

    /// Graph node of the directory being processed (project mode only).
    pub fn directory_index(&self) -> Option<usize> {
        self.interp.directories.last().and_then(|d| d.graph_index)
    }

    /// Whether this is the top-level directory.
    pub fn is_top_directory(&self) -> bool {
        self.interp.directories.len() <= 1
    }

    pub fn fs(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.interp.fs)
    }

    pub fn current_list_file(&self) -> Option<&Path> {
        self.interp.current_list_file()
    }

    pub fn current_source_dir(&self) -> PathBuf {
        self.interp.current_source_dir()
    }

    /// Resolve `path` against the current source directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            normalize_path(path)
        } else {
            normalize_path(&self.current_source_dir().join(path))
        }
    }

    pub fn path_string(&self, path: &Path) -> String {
        path_string(path)
    }

    // --- control flow ---

    /// Start recording the following invocations of this frame.
    pub fn add_blocker(&mut self, blocker: Box<dyn FunctionBlocker>) -> Result<()> {
        self.interp.open_block(blocker, self.invocation)
    }

    /// Run a recorded body in a nested frame.
    pub fn execute_body(&mut self, body: &[Invocation]) -> Result<ExecStatus> {
        self.interp.execute_body(body)
    }

    /// Run one iteration of a loop body.
    pub fn execute_loop_body(&mut self, body: &[Invocation]) -> Result<ExecStatus> {
        self.interp.execute_loop_body(body)
    }

    /// Dispatch a single invocation as if it appeared in the listfile.
    pub fn execute_invocation(&mut self, invocation: &Invocation) -> Result<ExecStatus> {
        self.interp.execute_invocation(invocation)
    }

    /// Whether a `foreach`/`while` body is running in the current function.
    pub fn in_loop(&self) -> bool {
        self.interp.loop_depth > 0
    }

    /// Count a loop iteration against the iteration limit.
    pub fn tick_loop(&mut self, guard: &mut LoopGuard) -> Result<()> {
        guard.tick(&self.interp.limits).map_err(Error::ResourceLimit)
    }

    /// Variables `return(PROPAGATE ...)` copies to the caller.
    pub fn set_return_propagate(&mut self, names: Vec<String>) {
        self.interp.propagate = Some(names);
    }

    // --- expansion ---

    pub fn expand_arguments(&mut self, args: &[Argument]) -> Result<Vec<String>> {
        let location = self.invocation.location.clone();
        self.interp.expand_arguments(args, &location)
    }

    /// Expand raw arguments recorded at `location`.
    pub fn expand_arguments_at(
        &mut self,
        args: &[Argument],
        location: &Location,
    ) -> Result<Vec<String>> {
        self.interp.expand_arguments(args, location)
    }

    // --- commands ---

    pub fn has_command(&self, name: &str) -> bool {
        self.interp.has_command(name)
    }

    /// Define a user command in the current directory.
    pub fn define_command(&mut self, command: UserCommand) {
        self.interp.commands.define(command);
    }

    pub fn call_user(&mut self, def: &UserCommand, args: &[String]) -> Result<ExecStatus> {
        let location = self.invocation.location.clone();
        self.interp.call_user(def, args, &location)
    }

    pub fn include_file(&mut self, path: &Path, no_policy_scope: bool) -> Result<()> {
        let location = self.invocation.location.clone();
        self.interp.include_file(path, no_policy_scope, &location)
    }

    pub fn add_subdirectory(&mut self, source_dir: &Path) -> Result<()> {
        let location = self.invocation.location.clone();
        self.interp.add_subdirectory(source_dir, &location)
    }

    pub fn eval_code(&mut self, code: &str) -> Result<ExecStatus> {
        let location = self.invocation.location.clone();
        self.interp.eval_code(code, &location)
    }
}
