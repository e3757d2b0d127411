//! Scoped policy settings

use std::collections::{BTreeMap, HashMap};

use super::catalog::{CATALOG, lookup};
use super::{PolicyId, PolicyStatus, Version};

/// Explicit policy settings captured at one point, e.g. when a function is
/// defined.
pub type PolicyMap = BTreeMap<PolicyId, PolicyStatus>;

/// Why a policy scope was pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyScopeKind {
    /// Run-level settings (embedder overrides)
    Root,
    /// A directory (`add_subdirectory`, top-level listfile)
    Directory,
    /// A function or macro call, seeded from its definition site
    Function,
    /// An `include()` under CMP0011 NEW
    Include,
    /// `cmake_policy(PUSH)`
    User,
}

#[derive(Debug, Clone)]
struct PolicyScope {
    kind: PolicyScopeKind,
    /// `Some` pins a setting, `None` resets the policy to its default and
    /// hides settings from outer scopes.
    settings: HashMap<PolicyId, Option<PolicyStatus>>,
}

impl PolicyScope {
    fn new(kind: PolicyScopeKind) -> Self {
        Self {
            kind,
            settings: HashMap::new(),
        }
    }
}

/// Stack of policy scopes, innermost last.
#[derive(Debug, Clone)]
pub struct PolicyStack {
    scopes: Vec<PolicyScope>,
    /// Run-wide replacements for catalog defaults
    defaults: HashMap<PolicyId, PolicyStatus>,
}

impl Default for PolicyStack {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyStack {
    /// A stack holding only the root scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![PolicyScope::new(PolicyScopeKind::Root)],
            defaults: HashMap::new(),
        }
    }

    /// Replace the default used when nothing on the stack sets `id`.
    /// Unlike [`set`](Self::set) this survives version baselines, which
    /// only reset policies to their defaults.
    pub fn set_default(&mut self, id: PolicyId, status: PolicyStatus) {
        self.defaults.insert(id, status);
    }

    /// Default for `id`: the run-wide override, else the catalog default.
    pub fn default_for(&self, id: PolicyId) -> PolicyStatus {
        self.defaults
            .get(&id)
            .copied()
            .or_else(|| lookup(id).map(|p| p.default))
            .unwrap_or(PolicyStatus::Warn)
    }

    /// Number of scopes, root included.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Kind of the innermost scope.
    pub fn top_kind(&self) -> PolicyScopeKind {
        self.scopes
            .last()
            .map(|s| s.kind)
            .unwrap_or(PolicyScopeKind::Root)
    }

    pub fn push(&mut self, kind: PolicyScopeKind) {
        self.scopes.push(PolicyScope::new(kind));
    }

    /// Push a scope that reproduces `settings` exactly: policies missing
    /// from the map resolve to their defaults regardless of outer scopes.
    pub fn push_snapshot(&mut self, kind: PolicyScopeKind, settings: &PolicyMap) {
        let mut scope = PolicyScope::new(kind);
        for policy in CATALOG {
            scope
                .settings
                .insert(policy.id, settings.get(&policy.id).copied());
        }
        self.scopes.push(scope);
    }

    /// Pop the innermost scope. The root scope is never popped.
    pub fn pop(&mut self) -> Option<PolicyScopeKind> {
        if self.scopes.len() <= 1 {
            return None;
        }
        self.scopes.pop().map(|s| s.kind)
    }

    /// Pop scopes until `depth` remain.
    pub fn truncate(&mut self, depth: usize) {
        self.scopes.truncate(depth.max(1));
    }

    /// Count of `cmake_policy(PUSH)` scopes above `depth`.
    pub fn user_scopes_above(&self, depth: usize) -> usize {
        self.scopes
            .iter()
            .skip(depth)
            .filter(|s| s.kind == PolicyScopeKind::User)
            .count()
    }

    /// Pin a policy in the innermost scope.
    pub fn set(&mut self, id: PolicyId, status: PolicyStatus) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.settings.insert(id, Some(status));
        }
    }

    /// The explicit setting visible from the innermost scope, if any.
    pub fn explicit(&self, id: PolicyId) -> Option<PolicyStatus> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.settings.get(&id))
            .copied()
            .flatten()
    }

    /// Effective setting: the innermost explicit setting, else the default.
    pub fn get(&self, id: PolicyId) -> PolicyStatus {
        self.explicit(id).unwrap_or_else(|| self.default_for(id))
    }

    /// Apply a compatibility baseline: every policy introduced at or
    /// before `version` is set to NEW; newer ones are reset to their
    /// defaults in this scope.
    pub fn apply_version(&mut self, version: Version) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        for policy in CATALOG {
            let setting = (policy.introduced <= version).then_some(PolicyStatus::New);
            scope.settings.insert(policy.id, setting);
        }
    }

    /// Capture every explicit setting currently visible.
    pub fn snapshot(&self) -> PolicyMap {
        CATALOG
            .iter()
            .filter_map(|p| self.explicit(p.id).map(|s| (p.id, s)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{CMP0010, CMP0054, CMP0124, CMP0140};

    #[test]
    fn test_unset_policy_uses_default() {
        let stack = PolicyStack::new();
        assert_eq!(stack.get(CMP0054), PolicyStatus::Warn);
        assert_eq!(stack.get(CMP0124), PolicyStatus::Old);
        assert_eq!(stack.explicit(CMP0054), None);
    }

    #[test]
    fn test_outer_setting_visible_until_popped() {
        let mut stack = PolicyStack::new();
        stack.push(PolicyScopeKind::Directory);
        stack.set(CMP0054, PolicyStatus::New);

        stack.push(PolicyScopeKind::Directory);
        assert_eq!(stack.get(CMP0054), PolicyStatus::New);

        stack.set(CMP0054, PolicyStatus::Old);
        assert_eq!(stack.get(CMP0054), PolicyStatus::Old);

        stack.pop();
        assert_eq!(stack.get(CMP0054), PolicyStatus::New);

        stack.pop();
        assert_eq!(stack.get(CMP0054), PolicyStatus::Warn);
    }

    #[test]
    fn test_root_never_popped() {
        let mut stack = PolicyStack::new();
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_apply_version_floor() {
        let mut stack = PolicyStack::new();
        stack.push(PolicyScopeKind::Directory);
        stack.apply_version(Version::new(3, 5, 0));

        assert_eq!(stack.get(CMP0010), PolicyStatus::New);
        assert_eq!(stack.get(CMP0054), PolicyStatus::New);
        // introduced after the floor: default applies
        assert_eq!(stack.get(CMP0140), PolicyStatus::Warn);
    }

    #[test]
    fn test_apply_version_resets_outer_newer_settings() {
        let mut stack = PolicyStack::new();
        stack.set(CMP0140, PolicyStatus::New);
        stack.push(PolicyScopeKind::Directory);
        stack.apply_version(Version::new(3, 0, 0));
        assert_eq!(stack.get(CMP0140), PolicyStatus::Warn);
    }

    #[test]
    fn test_snapshot_replays_exactly() {
        let mut stack = PolicyStack::new();
        stack.set(CMP0054, PolicyStatus::New);
        let snap = stack.snapshot();

        let mut caller = PolicyStack::new();
        caller.set(CMP0010, PolicyStatus::New);
        caller.push_snapshot(PolicyScopeKind::Function, &snap);

        assert_eq!(caller.get(CMP0054), PolicyStatus::New);
        // caller's own setting is not visible inside the function
        assert_eq!(caller.get(CMP0010), PolicyStatus::Warn);

        caller.pop();
        assert_eq!(caller.get(CMP0010), PolicyStatus::New);
    }

    #[test]
    fn test_default_override_survives_version_baseline() {
        let mut stack = PolicyStack::new();
        stack.set_default(CMP0140, PolicyStatus::Error);
        stack.push(PolicyScopeKind::Directory);
        stack.apply_version(Version::new(3, 0, 0));
        assert_eq!(stack.get(CMP0140), PolicyStatus::Error);

        stack.apply_version(Version::new(3, 25, 0));
        assert_eq!(stack.get(CMP0140), PolicyStatus::New);
    }

    #[test]
    fn test_user_scope_count() {
        let mut stack = PolicyStack::new();
        let base = stack.depth();
        stack.push(PolicyScopeKind::User);
        stack.push(PolicyScopeKind::Include);
        stack.push(PolicyScopeKind::User);
        assert_eq!(stack.user_scopes_above(base), 2);
        stack.truncate(base);
        assert_eq!(stack.depth(), base);
    }
}
