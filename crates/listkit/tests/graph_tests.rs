//! Project-mode tests
//!
//! Directory traversal, target declarations and what ends up in the
//! build graph.

use std::sync::Arc;

use listkit::{InMemoryFs, Listkit, RunResult, ScopedItem, TargetKind, Visibility};
use pretty_assertions::assert_eq;

fn configure(files: &[(&str, &str)]) -> RunResult {
    let fs = Arc::new(InMemoryFs::new());
    for (path, content) in files {
        fs.add_file(path, *content);
    }
    Listkit::builder().fs(fs).build().run_project("/proj")
}

fn configure_top(body: &str) -> RunResult {
    let text = format!(
        "cmake_minimum_required(VERSION 3.28)\nproject(demo VERSION 1.2.3 LANGUAGES C)\n{}",
        body
    );
    configure(&[("/proj/CMakeLists.txt", text.as_str())])
}

fn assert_ok(result: &RunResult) {
    assert!(
        result.is_success(),
        "run failed: {:?} {:?}",
        result.error,
        result.diagnostics
    );
}

#[test]
fn test_project_variables() {
    let result = configure_top(
        r#"message("${PROJECT_NAME} ${CMAKE_PROJECT_NAME} ${PROJECT_VERSION}")
message("${demo_VERSION_MAJOR}.${PROJECT_VERSION_MINOR}.${PROJECT_VERSION_PATCH} [${PROJECT_VERSION_TWEAK}]")
message("${PROJECT_SOURCE_DIR} ${demo_SOURCE_DIR}")
"#,
    );
    assert_ok(&result);
    assert_eq!(
        result.output,
        "demo demo 1.2.3\n1.2.3 []\n/proj /proj\n"
    );
    let project = result.graph.directories[0].project.as_ref().unwrap();
    assert_eq!(project.version.as_deref(), Some("1.2.3"));
    assert_eq!(project.languages, vec!["C"]);
}

#[test]
fn test_project_default_languages() {
    let result = configure(&[(
        "/proj/CMakeLists.txt",
        "cmake_minimum_required(VERSION 3.28)\nproject(plain)\n",
    )]);
    assert_ok(&result);
    let project = result.graph.directories[0].project.as_ref().unwrap();
    assert_eq!(project.languages, vec!["C", "CXX"]);
    assert_eq!(project.version, None);
}

#[test]
fn test_target_kinds() {
    let result = configure_top(
        r#"add_executable(app main.c)
add_library(st STATIC a.c)
add_library(sh SHARED b.c)
add_library(obj OBJECT c.c)
add_library(iface INTERFACE)
add_library(plain d.c)
set(BUILD_SHARED_LIBS ON)
add_library(now_shared e.c)
add_custom_target(docs COMMAND doxygen Doxyfile)
"#,
    );
    assert_ok(&result);
    let kind = |name: &str| result.graph.target(name).map(|t| t.kind);
    assert_eq!(kind("app"), Some(TargetKind::Executable));
    assert_eq!(kind("st"), Some(TargetKind::StaticLibrary));
    assert_eq!(kind("sh"), Some(TargetKind::SharedLibrary));
    assert_eq!(kind("obj"), Some(TargetKind::ObjectLibrary));
    assert_eq!(kind("iface"), Some(TargetKind::InterfaceLibrary));
    assert_eq!(kind("plain"), Some(TargetKind::StaticLibrary));
    assert_eq!(kind("now_shared"), Some(TargetKind::SharedLibrary));
    assert_eq!(kind("docs"), Some(TargetKind::Utility));
    assert_eq!(
        result.graph.directories[0].targets,
        vec!["app", "st", "sh", "obj", "iface", "plain", "now_shared", "docs"]
    );
}

#[test]
fn test_custom_target_sections() {
    let result = configure_top(
        r#"add_executable(gen gen.c)
add_custom_target(codegen ALL
  COMMAND gen --out a.h
  COMMAND touch stamp
  DEPENDS gen
  COMMENT "generating"
  VERBATIM
  SOURCES notes.txt)
"#,
    );
    assert_ok(&result);
    let target = result.graph.target("codegen").unwrap();
    assert!(!target.exclude_from_all);
    assert_eq!(
        target.commands,
        vec![
            vec!["gen".to_string(), "--out".into(), "a.h".into()],
            vec!["touch".to_string(), "stamp".into()],
        ]
    );
    assert!(target.dependencies.contains("gen"));
    assert_eq!(target.sources, vec!["notes.txt"]);
}

#[test]
fn test_usage_requirements() {
    let result = configure_top(
        r#"add_library(core STATIC core.c)
add_library(headers INTERFACE)
add_executable(app main.c)
target_include_directories(core PUBLIC include PRIVATE src)
target_include_directories(core BEFORE PRIVATE /first)
target_compile_definitions(core PUBLIC -DUSE_CORE PRIVATE INTERNAL=1)
target_include_directories(headers INTERFACE api)
target_link_libraries(app PRIVATE core headers)
target_link_libraries(core m)
"#,
    );
    assert_ok(&result);
    let core = result.graph.target("core").unwrap();
    assert_eq!(
        core.include_directories,
        vec![
            ScopedItem::new("/first", Visibility::Private),
            ScopedItem::new("/proj/include", Visibility::Public),
            ScopedItem::new("/proj/src", Visibility::Private),
        ]
    );
    assert_eq!(
        core.compile_definitions,
        vec![
            ScopedItem::new("USE_CORE", Visibility::Public),
            ScopedItem::new("INTERNAL=1", Visibility::Private),
        ]
    );
    assert_eq!(
        core.link_libraries,
        vec![ScopedItem::new("m", Visibility::Public)]
    );
    let app = result.graph.target("app").unwrap();
    assert_eq!(
        app.link_libraries,
        vec![
            ScopedItem::new("core", Visibility::Private),
            ScopedItem::new("headers", Visibility::Private),
        ]
    );
}

#[test]
fn test_interface_library_rejects_private_items() {
    let result = configure_top(
        "add_library(headers INTERFACE)\ntarget_include_directories(headers PRIVATE inc)\n",
    );
    assert!(!result.is_success());
    assert_eq!(result.errors().len(), 1);
    assert!(result.errors()[0].contains("INTERFACE"));
}

#[test]
fn test_target_properties() {
    let result = configure_top(
        r#"add_library(core STATIC a.c b.c)
target_link_libraries(core PRIVATE m INTERFACE dl)
target_sources(core PRIVATE c.c INTERFACE api.h)
set_target_properties(core PROPERTIES OUTPUT_NAME corelib VERSION 2)
get_target_property(out core OUTPUT_NAME)
get_target_property(type core TYPE)
get_target_property(srcs core SOURCES)
get_target_property(links core LINK_LIBRARIES)
get_target_property(ilinks core INTERFACE_LINK_LIBRARIES)
get_target_property(isrcs core INTERFACE_SOURCES)
get_target_property(missing core NO_SUCH_PROPERTY)
message("${out} ${type}")
message("${srcs} | ${links} | ${ilinks} | ${isrcs}")
message("${missing}")
"#,
    );
    assert_ok(&result);
    assert_eq!(
        result.output,
        "corelib STATIC_LIBRARY\na.c;b.c;c.c | m | dl | api.h\nmissing-NOTFOUND\n"
    );
    let core = result.graph.target("core").unwrap();
    assert_eq!(core.properties.get("VERSION").map(String::as_str), Some("2"));
}

#[test]
fn test_target_commands_need_existing_target() {
    let result = configure_top(
        r#"target_link_libraries(ghost PRIVATE m)
add_dependencies(ghost other)
get_target_property(v ghost TYPE)
set_target_properties(ghost PROPERTIES A B)
message(reached)
"#,
    );
    assert_eq!(result.output, "reached\n");
    assert_eq!(result.errors().len(), 4);
    assert!(result.error.is_none());
    assert!(!result.is_success());
}

#[test]
fn test_command_errors_are_recoverable_in_project_mode() {
    let result = configure_top(
        r#"add_executable("bad name" main.c)
add_executable(good main.c)
"#,
    );
    assert!(!result.is_success());
    assert!(result.error.is_none());
    assert!(result.graph.has_target("good"));
    assert!(!result.graph.has_target("bad name"));
    let error = &result.diagnostics_of(listkit::Severity::Error).next().unwrap();
    assert_eq!(error.location.as_ref().map(|l| l.line), Some(3));
}

#[test]
fn test_duplicate_target_in_same_directory() {
    let result = configure_top("add_executable(app a.c)\nadd_executable(app b.c)\n");
    assert!(!result.is_success());
    assert_eq!(result.graph.target("app").unwrap().sources, vec!["a.c"]);
}

fn duplicate_across_directories(version: &str) -> RunResult {
    let top = format!(
        "cmake_minimum_required(VERSION {})\nproject(dup)\nadd_library(util STATIC top.c)\nadd_subdirectory(sub)\n",
        version
    );
    configure(&[
        ("/proj/CMakeLists.txt", top.as_str()),
        ("/proj/sub/CMakeLists.txt", "add_library(util STATIC sub.c)\n"),
    ])
}

#[test]
fn test_duplicate_target_across_directories_cmp0002() {
    let new = duplicate_across_directories("3.28");
    assert!(!new.is_success());
    assert_eq!(new.errors().len(), 1);

    let old = duplicate_across_directories("2.4");
    assert!(old.is_success(), "{:?}", old.diagnostics);
    assert_eq!(old.graph.target("util").unwrap().sources, vec!["top.c"]);
}

#[test]
fn test_subdirectories_build_a_tree() {
    let result = configure(&[
        (
            "/proj/CMakeLists.txt",
            r#"cmake_minimum_required(VERSION 3.28)
project(tree)
add_subdirectory(lib)
add_subdirectory(tools EXCLUDE_FROM_ALL)
add_executable(app main.c)
target_link_libraries(app PRIVATE core)
"#,
        ),
        (
            "/proj/lib/CMakeLists.txt",
            "add_library(core STATIC core.c)\nmessage(\"${PROJECT_NAME}\")\n",
        ),
        (
            "/proj/tools/CMakeLists.txt",
            "add_executable(tool tool.c)\n",
        ),
    ]);
    assert_ok(&result);
    assert_eq!(result.output, "tree\n");

    let graph = &result.graph;
    assert_eq!(graph.directories.len(), 3);
    assert_eq!(graph.directories[0].subdirectories, vec![1, 2]);
    assert_eq!(graph.directories[1].parent, Some(0));
    assert_eq!(graph.directories[1].targets, vec!["core"]);
    assert_eq!(graph.target("core").unwrap().directory, 1);
    assert!(graph.target("tool").unwrap().exclude_from_all);
    assert!(!graph.target("app").unwrap().exclude_from_all);
}

#[test]
fn test_missing_subdirectory() {
    let result = configure_top("add_subdirectory(nowhere)\nmessage(after)\n");
    assert!(!result.is_success());
    assert_eq!(result.output, "after\n");
    assert!(result.errors()[0].contains("not an existing directory"));
}

#[test]
fn test_same_subdirectory_twice() {
    let result = configure(&[
        (
            "/proj/CMakeLists.txt",
            "cmake_minimum_required(VERSION 3.28)\nproject(twice)\nadd_subdirectory(a)\nadd_subdirectory(a)\n",
        ),
        ("/proj/a/CMakeLists.txt", "message(entered)\n"),
    ]);
    assert!(!result.is_success());
    assert_eq!(result.output, "entered\n");
}

#[test]
fn test_fatal_error_in_subdirectory_reports_call_stack() {
    let result = configure(&[
        (
            "/proj/CMakeLists.txt",
            "cmake_minimum_required(VERSION 3.28)\nproject(deep)\nadd_subdirectory(sub)\nmessage(unreached)\n",
        ),
        ("/proj/sub/CMakeLists.txt", "\nmessage(FATAL_ERROR \"stop\")\n"),
    ]);
    assert!(!result.is_success());
    assert_eq!(result.output, "");
    let error = result.error.as_ref().unwrap();
    let location = error.location().unwrap();
    assert_eq!(&*location.file, "/proj/sub/CMakeLists.txt");
    assert_eq!(location.line, 2);
    let last = result.diagnostics.last().unwrap();
    assert_eq!(last.backtrace.len(), 1);
    assert_eq!(last.backtrace[0].line, 3);
}

#[test]
fn test_deferred_call_runs_at_directory_end() {
    let result = configure_top(
        r#"cmake_language(DEFER CALL add_executable late late.c)
add_library(early STATIC early.c)
"#,
    );
    assert_ok(&result);
    assert_eq!(result.graph.directories[0].targets, vec!["early", "late"]);
}

#[test]
fn test_graph_serializes_to_json() {
    let result = configure_top(
        "add_library(core STATIC core.c)\ntarget_compile_definitions(core PRIVATE X)\n",
    );
    assert_ok(&result);
    let json: serde_json::Value = serde_json::from_str(&result.graph.to_json().unwrap()).unwrap();
    assert_eq!(json["targets"]["core"]["kind"], "static_library");
    assert_eq!(json["targets"]["core"]["compile_definitions"][0]["value"], "X");
    assert_eq!(
        json["targets"]["core"]["compile_definitions"][0]["visibility"],
        "private"
    );
    assert_eq!(json["directories"][0]["project"]["name"], "demo");
}
