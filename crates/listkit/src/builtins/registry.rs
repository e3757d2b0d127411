//! Command registry

use std::collections::HashMap;
use std::fmt;

use super::*;

/// Prototypes of every registered command, keyed by lowercase name.
pub struct Registry {
    commands: HashMap<String, Box<dyn Command>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// A registry with every built-in command.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        // Control flow
        registry.register(Box::new(If));
        registry.register(Box::new(Foreach));
        registry.register(Box::new(While));
        registry.register(Box::new(Break));
        registry.register(Box::new(Continue));
        registry.register(Box::new(Return));
        registry.register(Box::new(FunctionCommand));
        registry.register(Box::new(MacroCommand));
        for closer in StrayCloser::ALL {
            registry.register(Box::new(StrayCloser::new(closer)));
        }

        // Variables and values
        registry.register(Box::new(Set));
        registry.register(Box::new(Unset));
        registry.register(Box::new(OptionCommand));
        registry.register(Box::new(List));
        registry.register(Box::new(StringCommand));
        registry.register(Box::new(Message));

        // Policies and listfiles
        registry.register(Box::new(CMakeMinimumRequired));
        registry.register(Box::new(CMakePolicy));
        registry.register(Box::new(Include));
        registry.register(Box::new(AddSubdirectory));
        registry.register(Box::new(CMakeLanguage::default()));

        // Build graph
        registry.register(Box::new(Project));
        registry.register(Box::new(AddExecutable));
        registry.register(Box::new(AddLibrary));
        registry.register(Box::new(AddCustomTarget));
        registry.register(Box::new(AddDependencies));
        registry.register(Box::new(TargetLinkLibraries));
        registry.register(Box::new(TargetSources));
        registry.register(Box::new(TargetIncludeDirectories));
        registry.register(Box::new(TargetCompileDefinitions));
        registry.register(Box::new(SetTargetProperties));
        registry.register(Box::new(GetTargetProperty));

        registry
    }

    /// Add or replace a command. Returns the prototype it replaced.
    pub fn register(&mut self, command: Box<dyn Command>) -> Option<Box<dyn Command>> {
        let key = command.name().to_ascii_lowercase();
        self.commands.insert(key, command)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands
            .get(&name.to_ascii_lowercase())
            .map(|c| c.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_ascii_lowercase())
    }

    /// Every registered name, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Names of the commands meant for documentation listings, sorted.
    pub fn documented(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .commands
            .iter()
            .filter(|(_, c)| c.should_appear_in_documentation())
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Fresh instance of a command for one invocation.
    pub fn instantiate(&self, name: &str) -> Option<Box<dyn Command>> {
        self.get(name).map(|c| c.clone_command())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl Clone for Registry {
    fn clone(&self) -> Self {
        let commands = self
            .commands
            .iter()
            .map(|(name, command)| (name.clone(), command.clone_command()))
            .collect();
        Self { commands }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("commands", &self.names())
            .finish()
    }
}
