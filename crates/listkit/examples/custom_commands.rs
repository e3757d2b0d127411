//! Custom Commands Example
//!
//! Demonstrates how to extend listkit with embedder commands. Commands see
//! their expanded arguments and the run's variables, policies and graph.
//!
//! Run with: cargo run --example custom_commands

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use listkit::{Command, Context, ExecStatus, Listkit};

/// `greet([name])` prints a greeting
#[derive(Clone)]
struct Greet {
    default_name: String,
}

impl Command for Greet {
    fn name(&self) -> &str {
        "greet"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> listkit::Result<ExecStatus> {
        let name = args.first().unwrap_or(&self.default_name);
        ctx.output(&format!("Hello, {}!", name));
        Ok(ExecStatus::Normal)
    }
}

/// `count_calls(<var>)` stores a counter shared by every run in `<var>`
#[derive(Clone)]
struct CountCalls {
    count: Arc<AtomicU64>,
}

impl Command for CountCalls {
    fn name(&self) -> &str {
        "count_calls"
    }

    fn clone_command(&self) -> Box<dyn Command> {
        Box::new(self.clone())
    }

    fn is_scriptable(&self) -> bool {
        true
    }

    fn initial_pass(&mut self, args: &[String], ctx: &mut Context<'_>) -> listkit::Result<ExecStatus> {
        let Some(var) = args.first() else {
            return Ok(ExecStatus::Error("count_calls requires a variable name".into()));
        };
        let value = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        ctx.set(var, value.to_string());
        Ok(ExecStatus::Normal)
    }
}

fn main() -> anyhow::Result<()> {
    let count = Arc::new(AtomicU64::new(0));
    let listkit = Listkit::builder()
        .command(Box::new(Greet {
            default_name: "stranger".into(),
        }))
        .command(Box::new(CountCalls {
            count: Arc::clone(&count),
        }))
        .build();

    let script = r#"
        cmake_minimum_required(VERSION 3.28)
        greet()
        greet(listkit)
        count_calls(n)
        message("call number ${n}")
    "#;

    for _ in 0..2 {
        let result = listkit.run_str(script);
        print!("{}", result.output);
    }
    println!("Total calls: {}", count.load(Ordering::SeqCst));

    // Custom commands can be wrapped by user functions of the same name
    let result = listkit.run_str(
        r#"
        cmake_minimum_required(VERSION 3.28)
        function(greet)
          message("(wrapped)")
          _greet(${ARGN})
        endfunction()
        greet(again)
        "#,
    );
    print!("{}", result.output);

    Ok(())
}
