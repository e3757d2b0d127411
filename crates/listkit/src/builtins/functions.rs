//! User-defined commands: function() and macro()

use std::collections::HashMap;
use std::sync::Arc;

use super::{Command, Context, FunctionBlocker};
use crate::error::Result;
use crate::interpreter::{ExecStatus, ScopeStack, join_list};
use crate::parser::{Argument, Delimiter, Invocation, Location};
use crate::policy::PolicyMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommandKind {
    /// Runs in its own variable scope
    Function,
    /// Runs in the caller's scope with its parameters substituted as text
    Macro,
}

/// A command defined by the listfile itself.
#[derive(Debug, Clone)]
pub struct UserCommand {
    pub name: String,
    pub kind: UserCommandKind,
    pub params: Vec<String>,
    pub body: Vec<Invocation>,
    /// Policy settings in effect at the definition
    pub policies: PolicyMap,
    pub defined_at: Location,
}

impl UserCommand {
    /// Name/value pairs bound for a call with `args`.
    fn bindings(&self, args: &[String]) -> Vec<(String, String)> {
        let mut bindings = Vec::with_capacity(self.params.len() + args.len() + 3);
        for (param, value) in self.params.iter().zip(args) {
            bindings.push((param.clone(), value.clone()));
        }
        bindings.push(("ARGC".to_string(), args.len().to_string()));
        bindings.push(("ARGV".to_string(), join_list(args)));
        let rest = args.get(self.params.len()..).unwrap_or(&[]);
        bindings.push(("ARGN".to_string(), join_list(rest)));
        for (n, value) in args.iter().enumerate() {
            bindings.push((format!("ARGV{}", n), value.clone()));
        }
        bindings
    }

    /// Bind parameters and the `ARG*` variables in the function's scope.
    pub(crate) fn bind_arguments(&self, vars: &mut ScopeStack, args: &[String]) {
        for (name, value) in self.bindings(args) {
            vars.set_current(&name, value);
        }
        vars.set_current("CMAKE_CURRENT_FUNCTION", self.name.clone());
        vars.set_current("CMAKE_CURRENT_FUNCTION_LIST_FILE", self.defined_at.file.to_string());
        vars.set_current(
            "CMAKE_CURRENT_FUNCTION_LIST_LINE",
            self.defined_at.line.to_string(),
        );
    }

    /// Macro body with `${param}` and `${ARG*}` references replaced by the
    /// call's argument text.
    pub(crate) fn substitute_body(&self, args: &[String]) -> Vec<Invocation> {
        let bindings: HashMap<String, String> = self.bindings(args).into_iter().collect();
        self.body
            .iter()
            .map(|invocation| {
                let arguments = invocation
                    .arguments
                    .iter()
                    .map(|arg| match arg.delimiter {
                        Delimiter::Bracket => arg.clone(),
                        _ => Argument::new(
                            substitute(&arg.value, &bindings),
                            arg.delimiter,
                            arg.line,
                        ),
                    })
                    .collect();
                Invocation::new(invocation.name.clone(), arguments, invocation.location.clone())
            })
            .collect()
    }
}

/// Replace `${name}` for every bound name, leaving other references alone.
fn substitute(text: &str, bindings: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let replaced = after.find('}').and_then(|end| {
            let name = &after[..end];
            bindings.get(name).map(|value| (value, end))
        });
        match replaced {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push_str("${");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// User command tables, one layer per directory being processed.
///
/// A definition is visible in its directory and the directories it adds
/// afterwards; it is dropped when its directory finishes.
#[derive(Debug)]
pub struct UserCommands {
    layers: Vec<HashMap<String, Arc<UserCommand>>>,
}

impl Default for UserCommands {
    fn default() -> Self {
        Self::new()
    }
}

impl UserCommands {
    pub fn new() -> Self {
        Self {
            layers: vec![HashMap::new()],
        }
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn push_layer(&mut self) {
        self.layers.push(HashMap::new());
    }

    pub fn truncate(&mut self, depth: usize) {
        self.layers.truncate(depth.max(1));
    }

    /// Define a command. A definition it replaces stays callable as `_name`.
    pub fn define(&mut self, command: UserCommand) {
        let key = command.name.to_ascii_lowercase();
        let previous = self.get(&key);
        let Some(top) = self.layers.last_mut() else {
            return;
        };
        if let Some(previous) = previous {
            top.insert(format!("_{}", key), previous);
        }
        top.insert(key, Arc::new(command));
    }

    pub fn get(&self, name: &str) -> Option<Arc<UserCommand>> {
        let key = name.to_ascii_lowercase();
        self.layers
            .iter()
            .rev()
            .find_map(|layer| layer.get(&key))
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn instantiate(&self, name: &str) -> Option<Box<dyn Command>> {
        self.get(name)
            .map(|def| Box::new(UserCommandCall { def }) as Box<dyn Command>)
    }
}

/// An invocation of a user-defined command.
#[derive(Clone)]
pub struct UserCommandCall {
    def: Arc<UserCommand>,
}

impl Command for UserCommandCall {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        if args.len() < self.def.params.len() {
            let what = match self.def.kind {
                UserCommandKind::Function => "function",
                UserCommandKind::Macro => "macro",
            };
            return Ok(ExecStatus::Error(format!(
                "{} invoked with incorrect arguments for {} named: {}",
                capitalize(what),
                what,
                self.def.name
            )));
        }
        let def = Arc::clone(&self.def);
        ctx.call_user(&def, args)
    }

    fn should_appear_in_documentation(&self) -> bool {
        false
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Records a definition body until its closer.
struct DefinitionBlocker {
    kind: UserCommandKind,
    name: String,
    params: Vec<String>,
    policies: PolicyMap,
    defined_at: Location,
}

impl FunctionBlocker for DefinitionBlocker {
    fn opener(&self) -> &'static str {
        match self.kind {
            UserCommandKind::Function => "function",
            UserCommandKind::Macro => "macro",
        }
    }

    fn closer(&self) -> &'static str {
        match self.kind {
            UserCommandKind::Function => "endfunction",
            UserCommandKind::Macro => "endmacro",
        }
    }

    fn replay(self: Box<Self>, body: Vec<Invocation>, ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let this = *self;
        tracing::debug!(name = %this.name, kind = ?this.kind, invocations = body.len(), "defining command");
        ctx.define_command(UserCommand {
            name: this.name,
            kind: this.kind,
            params: this.params,
            body,
            policies: this.policies,
            defined_at: this.defined_at,
        });
        Ok(ExecStatus::Normal)
    }
}

fn open_definition(
    kind: UserCommandKind,
    args: &[String],
    ctx: &mut Context<'_>,
) -> Result<ExecStatus> {
    let Some((name, params)) = args.split_first() else {
        return Ok(ExecStatus::Error("called with incorrect number of arguments".into()));
    };
    let policies = ctx.policies().snapshot();
    ctx.add_blocker(Box::new(DefinitionBlocker {
        kind,
        name: name.clone(),
        params: params.to_vec(),
        policies,
        defined_at: ctx.location().clone(),
    }))?;
    Ok(ExecStatus::Normal)
}

/// `function(<name> [<param>...])`
#[derive(Clone)]
pub struct FunctionCommand;

impl Command for FunctionCommand {
    fn name(&self) -> &str {
        "function"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        open_definition(UserCommandKind::Function, args, ctx)
    }
}

/// `macro(<name> [<param>...])`
#[derive(Clone)]
pub struct MacroCommand;

impl Command for MacroCommand {
    fn name(&self) -> &str {
        "macro"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        open_definition(UserCommandKind::Macro, args, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn macro_def(params: &[&str], body: &str) -> UserCommand {
        UserCommand {
            name: "m".into(),
            kind: UserCommandKind::Macro,
            params: strings(params),
            body: parse(body, "test.cmake").unwrap(),
            policies: PolicyMap::new(),
            defined_at: Location::new("test.cmake", 1),
        }
    }

    #[test]
    fn test_substitute_only_bound_names() {
        let mut bindings = HashMap::new();
        bindings.insert("x".to_string(), "1".to_string());
        assert_eq!(substitute("${x}-${y}-${x", &bindings), "1-${y}-${x");
    }

    #[test]
    fn test_macro_substitution() {
        let def = macro_def(&["a"], "message(\"${a} ${ARGC} ${ARGN} ${ARGV1}\")\nset(v [[${a}]])");
        let body = def.substitute_body(&strings(&["x", "y", "z"]));
        assert_eq!(body[0].arguments[0].value, "x 3 y;z y");
        assert_eq!(body[1].arguments[1].value, "${a}");
    }

    #[test]
    fn test_function_bindings() {
        let mut def = macro_def(&["a", "b"], "");
        def.kind = UserCommandKind::Function;
        let mut vars = ScopeStack::new();
        def.bind_arguments(&mut vars, &strings(&["1", "2", "3"]));
        assert_eq!(vars.get("a"), "1");
        assert_eq!(vars.get("b"), "2");
        assert_eq!(vars.get("ARGC"), "3");
        assert_eq!(vars.get("ARGV"), "1;2;3");
        assert_eq!(vars.get("ARGN"), "3");
        assert_eq!(vars.get("ARGV2"), "3");
        assert_eq!(vars.get("CMAKE_CURRENT_FUNCTION"), "m");
    }

    #[test]
    fn test_redefinition_keeps_previous() {
        let mut commands = UserCommands::new();
        let mut first = macro_def(&[], "");
        first.params = strings(&["first"]);
        commands.define(first);
        commands.define(macro_def(&[], ""));

        assert!(commands.get("M").unwrap().params.is_empty());
        assert_eq!(commands.get("_m").unwrap().params, strings(&["first"]));
    }

    #[test]
    fn test_layers_drop_definitions() {
        let mut commands = UserCommands::new();
        commands.push_layer();
        commands.define(macro_def(&[], ""));
        assert!(commands.contains("m"));
        commands.truncate(1);
        assert!(!commands.contains("m"));
    }
}
