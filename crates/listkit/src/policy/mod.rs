//! Policy table
//!
//! A policy is an identified behavioral change with OLD and NEW semantics.
//! Commands that changed behavior over time query the effective setting of
//! the relevant policy and branch on it, so projects written against older
//! semantics keep working until they opt in to the new behavior.
//!
//! Settings resolve through a [`PolicyStack`] that mirrors directory,
//! function and include nesting; unset policies fall back to the catalog
//! default, which is always backward-compatible (`OLD` or `WARN`).

mod catalog;
mod stack;

pub use catalog::{
    CATALOG, CMP0002, CMP0004, CMP0010, CMP0011, CMP0012, CMP0054, CMP0055, CMP0057, CMP0124,
    CMP0126, CMP0140, TOOL_VERSION, lookup,
};
pub use stack::{PolicyMap, PolicyScopeKind, PolicyStack};

use std::fmt;
use std::str::FromStr;

/// Policy identifier, displayed as `CMP0054`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolicyId(pub u16);

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CMP{:04}", self.0)
    }
}

impl FromStr for PolicyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("CMP")
            .filter(|d| d.len() == 4 && d.chars().all(|c| c.is_ascii_digit()))
            .ok_or_else(|| format!("invalid policy identifier \"{}\"", s))?;
        digits
            .parse()
            .map(PolicyId)
            .map_err(|_| format!("invalid policy identifier \"{}\"", s))
    }
}

/// Effective setting of a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyStatus {
    /// Use the old behavior silently
    Old,
    /// Use the old behavior and report a warning once per location
    Warn,
    /// Use the new behavior
    New,
    /// Refuse to pick a behavior: the invocation fails
    Error,
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PolicyStatus::Old => "OLD",
            PolicyStatus::Warn => "WARN",
            PolicyStatus::New => "NEW",
            PolicyStatus::Error => "ERROR",
        };
        f.write_str(s)
    }
}

impl FromStr for PolicyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OLD" => Ok(PolicyStatus::Old),
            "WARN" => Ok(PolicyStatus::Warn),
            "NEW" => Ok(PolicyStatus::New),
            "ERROR" => Ok(PolicyStatus::Error),
            other => Err(format!("invalid policy setting \"{}\"", other)),
        }
    }
}

/// The behavior a command should execute after resolving a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyBehavior {
    Old,
    New,
}

impl PolicyBehavior {
    pub fn is_new(self) -> bool {
        self == PolicyBehavior::New
    }
}

/// A tool version (`major.minor.patch`), used for policy baselines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `major[.minor[.patch[.tweak]]]`. The tweak component is ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().map(str::parse).transpose().ok()?.unwrap_or(0);
        let patch = parts.next().map(str::parse).transpose().ok()?.unwrap_or(0);
        if let Some(tweak) = parts.next() {
            tweak.parse::<u32>().ok()?;
        }
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(major, minor, patch))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    pub id: PolicyId,
    pub description: &'static str,
    pub old_behavior: &'static str,
    pub new_behavior: &'static str,
    /// First tool version that knows the policy; version baselines at or
    /// above it switch the policy to NEW.
    pub introduced: Version,
    /// Setting used when nothing on the stack sets the policy.
    pub default: PolicyStatus,
}

impl Policy {
    /// Warning text for a `WARN` resolution.
    pub fn warning_message(&self) -> String {
        format!(
            "Policy {} is not set: {} Old behavior: {} New behavior: {} \
             Use the cmake_policy command to set the policy and suppress this warning.",
            self.id, self.description, self.old_behavior, self.new_behavior
        )
    }

    /// Error text for an `ERROR` resolution.
    pub fn error_message(&self) -> String {
        format!(
            "{} The old behavior ({}) is no longer allowed in this run; \
             update the project to the new behavior ({}).",
            self.description, self.old_behavior, self.new_behavior
        )
    }

    /// Long help text used by `--help-policy`.
    pub fn help(&self) -> String {
        format!(
            "{}\n\n{}\n\nOLD: {}\nNEW: {}\n\nIntroduced in version {}. Default when unset: {}.",
            self.id,
            self.description,
            self.old_behavior,
            self.new_behavior,
            self.introduced,
            self.default
        )
    }
}
