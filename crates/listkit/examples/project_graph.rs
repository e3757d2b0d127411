//! Configure a small project held in memory and print its build graph
//!
//! Run with: cargo run --example project_graph

use std::sync::Arc;

use listkit::{InMemoryFs, Listkit};

fn main() -> anyhow::Result<()> {
    let fs = Arc::new(InMemoryFs::new());
    fs.add_file(
        "/demo/CMakeLists.txt",
        r#"cmake_minimum_required(VERSION 3.28)
project(demo VERSION 1.0 LANGUAGES C)
option(WITH_TOOLS "Build the tools" ON)
add_subdirectory(lib)
if(WITH_TOOLS)
  add_executable(tool main.c)
  target_link_libraries(tool PRIVATE core)
endif()
"#,
    );
    fs.add_file(
        "/demo/lib/CMakeLists.txt",
        r#"add_library(core STATIC core.c util.c)
target_include_directories(core PUBLIC include)
target_compile_definitions(core PRIVATE -DCORE_BUILD)
"#,
    );

    let listkit = Listkit::builder().fs(fs).build();
    let result = listkit.run_project("/demo");

    for diagnostic in &result.diagnostics {
        eprintln!("{}", diagnostic);
    }
    if let Some(error) = result.error {
        return Err(error.into());
    }

    for (name, target) in &result.graph.targets {
        println!("{} ({})", name, target.kind.type_name());
    }
    println!("{}", result.graph.to_json()?);

    Ok(())
}
