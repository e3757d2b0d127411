//! project() command

use tracing::info;

use super::{Command, Context, split_keywords};
use crate::error::Result;
use crate::graph::Project as ProjectInfo;
use crate::interpreter::ExecStatus;

const COMPONENTS: [&str; 4] = ["MAJOR", "MINOR", "PATCH", "TWEAK"];

/// `project(<name> [VERSION <v>] [DESCRIPTION <text>] [LANGUAGES <lang>...])`
///
/// `project(<name> <lang>...)` is the short form for `LANGUAGES`.
#[derive(Clone)]
pub struct Project;

impl Command for Project {
    fn name(&self) -> &str {
        "project"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> Result<ExecStatus> {
        let (head, options) = split_keywords(args, &["VERSION", "DESCRIPTION", "LANGUAGES"]);
        let Some((name, short_languages)) = head.split_first() else {
            return Ok(ExecStatus::Error("PROJECT called with incorrect number of arguments".into()));
        };

        let mut version = None;
        let mut description = None;
        let mut languages: Vec<String> = short_languages.to_vec();
        for (keyword, values) in options {
            match (keyword, values) {
                ("VERSION", [v]) => version = Some(v.clone()),
                ("DESCRIPTION", [d]) => description = Some(d.clone()),
                ("LANGUAGES", langs) => languages.extend(langs.iter().cloned()),
                _ => {
                    return Ok(ExecStatus::Error(format!(
                        "{} keyword requires exactly one value",
                        keyword
                    )));
                }
            }
        }
        if languages.is_empty() {
            languages = vec!["C".into(), "CXX".into()];
        }
        if let Some(v) = &version {
            let valid = v.split('.').count() <= COMPONENTS.len()
                && v.split('.').all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
            if !valid {
                return Ok(ExecStatus::Error(format!(
                    "VERSION \"{}\" format invalid.",
                    v
                )));
            }
        }

        let source_dir = ctx.path_string(&ctx.current_source_dir());
        ctx.set("PROJECT_NAME", name.as_str());
        ctx.set("PROJECT_SOURCE_DIR", source_dir.as_str());
        ctx.set(&format!("{}_SOURCE_DIR", name), source_dir);
        if ctx.is_top_directory() {
            ctx.set("CMAKE_PROJECT_NAME", name.as_str());
        }
        set_version(ctx, "PROJECT", version.as_deref());
        set_version(ctx, name, version.as_deref());
        ctx.set("PROJECT_DESCRIPTION", description.clone().unwrap_or_default());

        info!(project = %name, "project declared");
        if let Some(index) = ctx.directory_index() {
            if let Some(dir) = ctx.graph_mut().directory_mut(index) {
                dir.project = Some(ProjectInfo {
                    name: name.clone(),
                    version,
                    description,
                    languages,
                });
            }
        }
        Ok(ExecStatus::Normal)
    }
}

/// `<prefix>_VERSION` and its components; missing components are empty.
fn set_version(ctx: &mut Context<'_>, prefix: &str, version: Option<&str>) {
    let version = version.unwrap_or_default();
    ctx.set(&format!("{}_VERSION", prefix), version);
    let mut parts = version.split('.').filter(|p| !p.is_empty());
    for component in COMPONENTS {
        let value = parts.next().unwrap_or_default();
        ctx.set(&format!("{}_VERSION_{}", prefix, component), value);
    }
}
