//! Accumulated build graph
//!
//! The graph is the externally observable result of a successful project
//! run: one node per processed directory and the targets declared in
//! them. Generator backends consume it as-is; it serializes with `serde`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::interpreter::join_list;

/// A processed source directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directory {
    pub source_dir: PathBuf,
    /// Index of the directory that added this one
    pub parent: Option<usize>,
    pub project: Option<Project>,
    /// Targets declared in this directory, in declaration order
    pub targets: Vec<String>,
    pub subdirectories: Vec<usize>,
}

/// Settings recorded by `project()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Executable,
    StaticLibrary,
    SharedLibrary,
    ModuleLibrary,
    ObjectLibrary,
    InterfaceLibrary,
    /// `add_custom_target()`
    Utility,
}

impl TargetKind {
    /// Value of the `TYPE` target property.
    pub fn type_name(self) -> &'static str {
        match self {
            TargetKind::Executable => "EXECUTABLE",
            TargetKind::StaticLibrary => "STATIC_LIBRARY",
            TargetKind::SharedLibrary => "SHARED_LIBRARY",
            TargetKind::ModuleLibrary => "MODULE_LIBRARY",
            TargetKind::ObjectLibrary => "OBJECT_LIBRARY",
            TargetKind::InterfaceLibrary => "INTERFACE_LIBRARY",
            TargetKind::Utility => "UTILITY",
        }
    }
}

/// Usage requirement scope of a target item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
    Interface,
}

impl Visibility {
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword {
            "PUBLIC" => Some(Visibility::Public),
            "PRIVATE" => Some(Visibility::Private),
            "INTERFACE" => Some(Visibility::Interface),
            _ => None,
        }
    }
}

/// A value attached to a target with its visibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopedItem {
    pub value: String,
    pub visibility: Visibility,
}

impl ScopedItem {
    pub fn new(value: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            value: value.into(),
            visibility,
        }
    }
}

/// A declared build target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub name: String,
    pub kind: TargetKind,
    /// Index of the declaring directory
    pub directory: usize,
    pub sources: Vec<String>,
    pub link_libraries: Vec<ScopedItem>,
    /// Target-level dependencies (`add_dependencies`, custom target `DEPENDS`)
    pub dependencies: BTreeSet<String>,
    pub include_directories: Vec<ScopedItem>,
    pub compile_definitions: Vec<ScopedItem>,
    /// Properties set with `set_target_properties()`
    pub properties: BTreeMap<String, String>,
    pub exclude_from_all: bool,
    /// Command lines of a custom target
    pub commands: Vec<Vec<String>>,
}

impl Target {
    pub fn new(name: impl Into<String>, kind: TargetKind, directory: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            directory,
            sources: Vec::new(),
            link_libraries: Vec::new(),
            dependencies: BTreeSet::new(),
            include_directories: Vec::new(),
            compile_definitions: Vec::new(),
            properties: BTreeMap::new(),
            exclude_from_all: false,
            commands: Vec::new(),
        }
    }

    /// Read a property. Built-in properties are derived from the target's
    /// fields; explicit properties win over derived ones.
    pub fn property(&self, name: &str) -> Option<String> {
        if let Some(value) = self.properties.get(name) {
            return Some(value.clone());
        }
        let non_interface = |items: &[ScopedItem]| {
            let values: Vec<&str> = items
                .iter()
                .filter(|i| i.visibility != Visibility::Interface)
                .map(|i| i.value.as_str())
                .collect();
            join_list(&values)
        };
        let interface = |items: &[ScopedItem]| {
            let values: Vec<&str> = items
                .iter()
                .filter(|i| i.visibility != Visibility::Private)
                .map(|i| i.value.as_str())
                .collect();
            join_list(&values)
        };

        let value = match name {
            "NAME" => self.name.clone(),
            "TYPE" => self.kind.type_name().to_string(),
            "SOURCES" => join_list(&self.sources),
            "LINK_LIBRARIES" => non_interface(&self.link_libraries),
            "INTERFACE_LINK_LIBRARIES" => interface(&self.link_libraries),
            "INCLUDE_DIRECTORIES" => non_interface(&self.include_directories),
            "INTERFACE_INCLUDE_DIRECTORIES" => interface(&self.include_directories),
            "COMPILE_DEFINITIONS" => non_interface(&self.compile_definitions),
            "INTERFACE_COMPILE_DEFINITIONS" => interface(&self.compile_definitions),
            "MANUALLY_ADDED_DEPENDENCIES" => {
                join_list(&self.dependencies.iter().collect::<Vec<_>>())
            }
            "EXCLUDE_FROM_ALL" => {
                let flag = if self.exclude_from_all { "TRUE" } else { "FALSE" };
                flag.to_string()
            }
            _ => return None,
        };
        Some(value)
    }
}

/// Directories and targets declared by a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildGraph {
    pub directories: Vec<Directory>,
    pub targets: BTreeMap<String, Target>,
}

impl BuildGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory node and link it to its parent.
    pub fn add_directory(&mut self, source_dir: impl Into<PathBuf>, parent: Option<usize>) -> usize {
        let index = self.directories.len();
        self.directories.push(Directory {
            source_dir: source_dir.into(),
            parent,
            project: None,
            targets: Vec::new(),
            subdirectories: Vec::new(),
        });
        if let Some(parent) = parent.and_then(|p| self.directories.get_mut(p)) {
            parent.subdirectories.push(index);
        }
        index
    }

    pub fn directory(&self, index: usize) -> Option<&Directory> {
        self.directories.get(index)
    }

    pub fn directory_mut(&mut self, index: usize) -> Option<&mut Directory> {
        self.directories.get_mut(index)
    }

    pub fn find_directory(&self, source_dir: &Path) -> Option<usize> {
        self.directories
            .iter()
            .position(|d| d.source_dir == source_dir)
    }

    pub fn has_target(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }

    pub fn target_mut(&mut self, name: &str) -> Option<&mut Target> {
        self.targets.get_mut(name)
    }

    /// Insert a target and record it on its directory. An existing target
    /// of the same name is kept.
    pub fn add_target(&mut self, target: Target) -> bool {
        if self.targets.contains_key(&target.name) {
            return false;
        }
        if let Some(dir) = self.directories.get_mut(target.directory) {
            dir.targets.push(target.name.clone());
        }
        self.targets.insert(target.name.clone(), target);
        true
    }

    /// Pretty-printed JSON for generator hand-off.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_lib() -> BuildGraph {
        let mut graph = BuildGraph::new();
        let root = graph.add_directory("/src", None);
        let mut lib = Target::new("core", TargetKind::StaticLibrary, root);
        lib.sources.push("a.c".into());
        lib.sources.push("b.c".into());
        lib.include_directories
            .push(ScopedItem::new("/src/include", Visibility::Public));
        lib.include_directories
            .push(ScopedItem::new("/src/private", Visibility::Private));
        assert!(graph.add_target(lib));
        graph
    }

    #[test]
    fn test_directory_tree() {
        let mut graph = BuildGraph::new();
        let root = graph.add_directory("/src", None);
        let sub = graph.add_directory("/src/lib", Some(root));
        assert_eq!(graph.directory(root).unwrap().subdirectories, vec![sub]);
        assert_eq!(graph.find_directory(Path::new("/src/lib")), Some(sub));
        assert_eq!(graph.find_directory(Path::new("/elsewhere")), None);
    }

    #[test]
    fn test_duplicate_target_keeps_first() {
        let mut graph = graph_with_lib();
        let dup = Target::new("core", TargetKind::Executable, 0);
        assert!(!graph.add_target(dup));
        assert_eq!(graph.target("core").unwrap().kind, TargetKind::StaticLibrary);
        assert_eq!(graph.directory(0).unwrap().targets, vec!["core"]);
    }

    #[test]
    fn test_derived_properties() {
        let graph = graph_with_lib();
        let lib = graph.target("core").unwrap();
        assert_eq!(lib.property("TYPE").as_deref(), Some("STATIC_LIBRARY"));
        assert_eq!(lib.property("SOURCES").as_deref(), Some("a.c;b.c"));
        assert_eq!(
            lib.property("INCLUDE_DIRECTORIES").as_deref(),
            Some("/src/include;/src/private")
        );
        assert_eq!(
            lib.property("INTERFACE_INCLUDE_DIRECTORIES").as_deref(),
            Some("/src/include")
        );
        assert_eq!(lib.property("OUTPUT_NAME"), None);
    }

    #[test]
    fn test_explicit_property_wins() {
        let mut graph = graph_with_lib();
        let lib = graph.target_mut("core").unwrap();
        lib.properties.insert("OUTPUT_NAME".into(), "corelib".into());
        assert_eq!(lib.property("OUTPUT_NAME").as_deref(), Some("corelib"));
    }

    #[test]
    fn test_json_shape() {
        let graph = graph_with_lib();
        let json: serde_json::Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();
        assert_eq!(json["targets"]["core"]["kind"], "static_library");
        assert_eq!(json["directories"][0]["source_dir"], "/src");
    }
}
