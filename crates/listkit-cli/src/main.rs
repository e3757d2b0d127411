//! Listkit CLI - Command line interface for listfile processing
//!
//! Usage:
//!   listkit -S <dir>                  # Configure the project in <dir>
//!   listkit -P script.cmake           # Process a script
//!   listkit -S <dir> --graph-json     # Dump the build graph on success
//!   listkit --help-policy CMP0054     # Describe a policy
//!   listkit --list-policies           # List every known policy

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use listkit::{CATALOG, Listkit, PolicyId, PolicyStatus, RealFs, RunResult, lookup_policy};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Listkit - CMake-style listfile interpreter
#[derive(Parser, Debug)]
#[command(name = "listkit")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configure the project whose CMakeLists.txt is in this directory
    #[arg(short = 'S', value_name = "DIR", conflicts_with = "script")]
    source_dir: Option<PathBuf>,

    /// Process a script file
    #[arg(short = 'P', value_name = "FILE")]
    script: Option<PathBuf>,

    /// Pre-seed a variable (NAME=VALUE or NAME:TYPE=VALUE)
    #[arg(short = 'D', value_name = "NAME=VALUE", value_parser = parse_define)]
    defines: Vec<(String, String)>,

    /// Root-level policy setting
    #[arg(long = "policy", value_name = "CMPNNNN=OLD|NEW|WARN|ERROR", value_parser = parse_policy)]
    policies: Vec<(PolicyId, PolicyStatus)>,

    /// Print the build graph as JSON after a successful project run
    #[arg(long)]
    graph_json: bool,

    /// Describe one policy and exit
    #[arg(long, value_name = "ID")]
    help_policy: Option<String>,

    /// List every known policy and exit
    #[arg(long)]
    list_policies: bool,
}

fn parse_define(text: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got \"{}\"", text))?;
    let name = name.split_once(':').map(|(n, _)| n).unwrap_or(name);
    if name.is_empty() {
        return Err(format!("empty variable name in \"{}\"", text));
    }
    Ok((name.to_string(), value.to_string()))
}

fn parse_policy(text: &str) -> std::result::Result<(PolicyId, PolicyStatus), String> {
    let (id, setting) = text
        .split_once('=')
        .ok_or_else(|| format!("expected CMPNNNN=SETTING, got \"{}\"", text))?;
    let id: PolicyId = id.parse()?;
    if lookup_policy(id).is_none() {
        return Err(format!("unknown policy {}", id));
    }
    Ok((id, setting.parse()?))
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("LISTKIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("listkit: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<bool> {
    if args.list_policies {
        for policy in CATALOG {
            println!("{}  {}", policy.id, policy.description);
        }
        return Ok(true);
    }
    if let Some(id) = &args.help_policy {
        let id: PolicyId = id.parse().map_err(anyhow::Error::msg)?;
        let policy = lookup_policy(id).with_context(|| format!("unknown policy {}", id))?;
        println!("{}", policy.help());
        return Ok(true);
    }

    let mut builder = Listkit::builder().fs(Arc::new(RealFs::new()));
    for (key, value) in std::env::vars() {
        builder = builder.env(key, value);
    }
    for (name, value) in args.defines {
        builder = builder.define(name, value);
    }
    for (id, status) in args.policies {
        builder = builder.policy(id, status);
    }
    let listkit = builder.build();

    let result = match (args.source_dir, args.script) {
        (Some(dir), None) => {
            let dir = std::fs::canonicalize(&dir)
                .with_context(|| format!("Failed to open source directory: {}", dir.display()))?;
            listkit.run_project(dir)
        }
        (None, Some(script)) => {
            let script = std::fs::canonicalize(&script)
                .with_context(|| format!("Failed to open script: {}", script.display()))?;
            listkit.run_script(script)
        }
        _ => bail!("either -S <dir> or -P <file> is required"),
    };

    report(&result);
    if result.is_success() && args.graph_json {
        let json = result.graph.to_json().context("Failed to serialize build graph")?;
        println!("{}", json);
    }
    Ok(result.is_success())
}

fn report(result: &RunResult) {
    print!("{}", result.output);
    for diagnostic in &result.diagnostics {
        eprintln!("CMake {}\n", diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_define() {
        assert_eq!(parse_define("A=1").unwrap(), ("A".into(), "1".into()));
        assert_eq!(parse_define("A:BOOL=ON").unwrap(), ("A".into(), "ON".into()));
        assert_eq!(parse_define("A=x=y").unwrap(), ("A".into(), "x=y".into()));
        assert!(parse_define("A").is_err());
        assert!(parse_define("=1").is_err());
    }

    #[test]
    fn test_parse_policy() {
        let (id, status) = parse_policy("CMP0054=NEW").unwrap();
        assert_eq!(id, PolicyId(54));
        assert_eq!(status, PolicyStatus::New);
        assert!(parse_policy("CMP0054").is_err());
        assert!(parse_policy("CMP0054=MAYBE").is_err());
        assert!(parse_policy("CMP9999=NEW").is_err());
    }

    #[test]
    fn test_script_on_real_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("hello.cmake");
        std::fs::write(
            &script,
            "cmake_minimum_required(VERSION 3.28)\nmessage(STATUS \"hi\")\n",
        )
        .unwrap();
        let result = Listkit::builder()
            .fs(Arc::new(RealFs::new()))
            .build()
            .run_script(&script);
        assert!(result.is_success());
        assert_eq!(result.output, "-- hi\n");
    }

    #[test]
    fn test_project_on_real_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("CMakeLists.txt"),
            "cmake_minimum_required(VERSION 3.28)\nproject(demo)\nadd_library(core STATIC a.c)\n",
        )
        .unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        let result = Listkit::builder()
            .fs(Arc::new(RealFs::new()))
            .build()
            .run_project(&root);
        assert!(result.is_success(), "{:?}", result.diagnostics);
        assert!(result.graph.has_target("core"));
    }
}
