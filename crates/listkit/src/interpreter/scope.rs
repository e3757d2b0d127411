//! Variable scope stack
//!
//! Scopes are pushed for directories and function calls. Reads walk from
//! the innermost scope outward, so a child sees its parent's bindings;
//! writes land in the innermost scope only and vanish when it is popped.
//! The process scope sits behind every scope and survives directory
//! boundaries for the rest of the run.

use std::collections::{BTreeMap, HashMap};

use super::expand::split_list;

/// Why a variable scope was pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Bottom scope of a run
    Root,
    /// A subdirectory
    Directory,
    /// A function call
    Function,
}

/// Target of a `set`/`unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetScope {
    Current,
    /// The scope that pushed the current one
    Parent,
    /// Visible everywhere for the remainder of the run
    Process,
}

/// `set(... PARENT_SCOPE)` with no enclosing scope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot set \"{0}\": current scope has no parent.")]
pub struct NoParentScope(pub String);

#[derive(Debug, Clone)]
struct Scope {
    kind: ScopeKind,
    /// `None` is an explicit unset that hides outer bindings.
    vars: HashMap<String, Option<String>>,
}

impl Scope {
    fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            vars: HashMap::new(),
        }
    }
}

/// Nested variable bindings plus the process scope.
#[derive(Debug, Clone)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
    process: BTreeMap<String, String>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Root)],
            process: BTreeMap::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn top_kind(&self) -> ScopeKind {
        self.scopes
            .last()
            .map(|s| s.kind)
            .unwrap_or(ScopeKind::Root)
    }

    pub fn push_scope(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope::new(kind));
    }

    /// Pop the innermost scope. The root scope is never popped.
    pub fn pop_scope(&mut self) -> Option<ScopeKind> {
        if self.scopes.len() <= 1 {
            return None;
        }
        self.scopes.pop().map(|s| s.kind)
    }

    /// Pop scopes until `depth` remain.
    pub fn truncate(&mut self, depth: usize) {
        self.scopes.truncate(depth.max(1));
    }

    /// Normal binding visible from the innermost scope.
    fn lookup_normal(&self, name: &str) -> Option<Option<&str>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.vars.get(name))
            .map(|v| v.as_deref())
    }

    /// Value of a variable, normal bindings first, then the process scope.
    pub fn definition(&self, name: &str) -> Option<&str> {
        match self.lookup_normal(name) {
            Some(Some(value)) => Some(value),
            _ => self.process.get(name).map(String::as_str),
        }
    }

    /// Value of a variable; unset reads as empty.
    pub fn get(&self, name: &str) -> &str {
        self.definition(name).unwrap_or("")
    }

    /// Value split into list elements; unset reads as an empty list.
    pub fn get_list(&self, name: &str) -> Vec<String> {
        split_list(self.get(name), false)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.definition(name).is_some()
    }

    /// Whether a normal (non-process) binding exists.
    pub fn has_normal(&self, name: &str) -> bool {
        matches!(self.lookup_normal(name), Some(Some(_)))
    }

    /// Process-scope value only.
    pub fn process_value(&self, name: &str) -> Option<&str> {
        self.process.get(name).map(String::as_str)
    }

    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<String>,
        scope: SetScope,
    ) -> Result<(), NoParentScope> {
        self.write(name, Some(value.into()), scope)
    }

    pub fn unset(&mut self, name: &str, scope: SetScope) -> Result<(), NoParentScope> {
        self.write(name, None, scope)
    }

    /// Bind in the innermost scope.
    pub fn set_current(&mut self, name: &str, value: impl Into<String>) {
        if let Some(top) = self.scopes.last_mut() {
            top.vars.insert(name.to_string(), Some(value.into()));
        }
    }

    /// Unset in the innermost scope, hiding outer bindings.
    pub fn unset_current(&mut self, name: &str) {
        if let Some(top) = self.scopes.last_mut() {
            top.vars.insert(name.to_string(), None);
        }
    }

    /// Bind in the process scope.
    pub fn set_process(&mut self, name: &str, value: impl Into<String>) {
        self.process.insert(name.to_string(), value.into());
    }

    fn write(
        &mut self,
        name: &str,
        value: Option<String>,
        scope: SetScope,
    ) -> Result<(), NoParentScope> {
        match scope {
            SetScope::Current => {
                if let Some(top) = self.scopes.last_mut() {
                    top.vars.insert(name.to_string(), value);
                }
                Ok(())
            }
            SetScope::Parent => {
                let len = self.scopes.len();
                if len < 2 {
                    return Err(NoParentScope(name.to_string()));
                }
                // Pin the current scope's view first so the write below
                // does not leak into it through the outward lookup.
                let visible = self.lookup_normal(name).map(|v| v.map(str::to_string));
                if let Some(top) = self.scopes.last_mut() {
                    if !top.vars.contains_key(name) {
                        top.vars.insert(name.to_string(), visible.flatten());
                    }
                }
                if let Some(parent) = self.scopes.get_mut(len - 2) {
                    parent.vars.insert(name.to_string(), value);
                }
                Ok(())
            }
            SetScope::Process => {
                match value {
                    Some(v) => self.process.insert(name.to_string(), v),
                    None => self.process.remove(name),
                };
                Ok(())
            }
        }
    }

    /// Every variable name visible from the innermost scope, sorted.
    pub fn visible_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .scopes
            .iter()
            .flat_map(|scope| scope.vars.keys())
            .chain(self.process.keys())
            .filter(|name| self.is_defined(name))
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Snapshot of every visible binding, for determinism checks and debugging.
    pub fn visible_bindings(&self) -> BTreeMap<String, String> {
        self.visible_names()
            .into_iter()
            .filter_map(|name| {
                let value = self.definition(&name)?.to_string();
                Some((name, value))
            })
            .collect()
    }
}
