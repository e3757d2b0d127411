//! Script-mode execution tests
//!
//! End-to-end runs of listfile text covering variables, lists, strings,
//! control flow, user commands, includes and error reporting.

use std::sync::Arc;

use listkit::{
    Error, ExecutionLimits, InMemoryFs, LimitExceeded, Listkit, Location, RunResult, Severity,
};
use pretty_assertions::assert_eq;

const PRELUDE: &str = "cmake_minimum_required(VERSION 3.28)\n";

fn run(body: &str) -> RunResult {
    Listkit::new().run_str(&format!("{}{}", PRELUDE, body))
}

fn output(body: &str) -> String {
    let result = run(body);
    assert!(
        result.is_success(),
        "run failed: {:?} {:?}",
        result.error,
        result.diagnostics
    );
    result.output
}

// ============================================================================
// Variables, lists and strings
// ============================================================================

#[test]
fn test_list_operations() {
    let out = output(
        r#"
set(l a b c)
list(APPEND l d)
list(LENGTH l n)
list(GET l -1 last)
list(REVERSE l)
list(JOIN l "," joined)
message("${n} ${last} ${joined}")
"#,
    );
    assert_eq!(out, "4 d d,c,b,a\n");
}

#[test]
fn test_unquoted_arguments_split_on_semicolons() {
    let out = output(
        r#"
set(l "x;y;z")
foreach(item ${l})
  message("<${item}>")
endforeach()
message("${l}")
"#,
    );
    assert_eq!(out, "<x>\n<y>\n<z>\nx;y;z\n");
}

#[test]
fn test_string_operations() {
    let out = output(
        r#"
string(TOUPPER "abc" up)
string(REGEX REPLACE "([a-z]+)-([0-9]+)" "\\2:\\1" swapped "abc-42")
string(SUBSTRING "hello" 1 3 sub)
string(FIND "banana" "an" first)
string(FIND "banana" "an" last REVERSE)
message("${up} ${swapped} ${sub} ${first} ${last}")
"#,
    );
    assert_eq!(out, "ABC 42:abc ell 1 3\n");
}

#[test]
fn test_nested_variable_reference() {
    let out = output(
        r#"
set(which inner)
set(inner_value found)
message("${${which}_value}")
"#,
    );
    assert_eq!(out, "found\n");
}

#[test]
fn test_current_list_line() {
    let out = output("message(\"${CMAKE_CURRENT_LIST_LINE}\")\n");
    assert_eq!(out, "2\n");
}

#[test]
fn test_bracket_argument_is_literal() {
    let out = output("set(v 1)\nmessage([=[${v} stays]=])\n");
    assert_eq!(out, "${v} stays\n");
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_if_elseif_else() {
    let out = output(
        r#"
set(x 5)
if(x LESS 3)
  message(small)
elseif(x LESS 10)
  message(medium)
else()
  message(large)
endif()
"#,
    );
    assert_eq!(out, "medium\n");
}

#[test]
fn test_nested_if_inside_branch() {
    let out = output(
        r#"
if(TRUE)
  if(FALSE)
    message(inner-true)
  else()
    message(inner-false)
  endif()
else()
  message(outer-false)
endif()
"#,
    );
    assert_eq!(out, "inner-false\n");
}

#[test]
fn test_foreach_range_with_break_and_continue() {
    let out = output(
        r#"
foreach(i RANGE 1 6)
  if(i EQUAL 2)
    continue()
  endif()
  if(i GREATER 4)
    break()
  endif()
  message(${i})
endforeach()
"#,
    );
    assert_eq!(out, "1\n3\n4\n");
}

#[test]
fn test_foreach_in_lists_and_items() {
    let out = output(
        r#"
set(a 1 2)
foreach(v IN LISTS a ITEMS x)
  message(${v})
endforeach()
"#,
    );
    assert_eq!(out, "1\n2\nx\n");
}

#[test]
fn test_while_loop() {
    let out = output(
        r#"
set(acc "")
while(NOT acc STREQUAL "xxx")
  string(APPEND acc x)
endwhile()
message(${acc})
"#,
    );
    assert_eq!(out, "xxx\n");
}

#[test]
fn test_matches_sets_capture_groups() {
    let out = output(
        r#"
if("version-1.4" MATCHES "([0-9]+)\\.([0-9]+)")
  message("${CMAKE_MATCH_0} ${CMAKE_MATCH_1} ${CMAKE_MATCH_2} ${CMAKE_MATCH_COUNT}")
endif()
"#,
    );
    assert_eq!(out, "1.4 1 4 2\n");
}

// ============================================================================
// Functions and macros
// ============================================================================

#[test]
fn test_function_arguments() {
    let out = output(
        r#"
function(collect out first)
  set(${out} "${first}|${ARGN}|${ARGC}" PARENT_SCOPE)
endfunction()
collect(res a b c)
message("${res}")
"#,
    );
    assert_eq!(out, "a|b;c|4\n");
}

#[test]
fn test_function_scope_is_isolated() {
    let out = output(
        r#"
set(v outer)
function(f)
  set(v inner)
  message(${v})
endfunction()
f()
message(${v})
"#,
    );
    assert_eq!(out, "inner\nouter\n");
}

#[test]
fn test_macro_parameters_do_not_leak() {
    let out = output(
        r#"
macro(show value)
  message("${value}")
endmacro()
show(hello)
if(DEFINED value)
  message(leaked)
endif()
"#,
    );
    assert_eq!(out, "hello\n");
}

#[test]
fn test_macro_sets_in_caller_scope() {
    let out = output(
        r#"
macro(assign name)
  set(${name} assigned)
endmacro()
function(wrapper)
  assign(local)
  message(${local})
endfunction()
wrapper()
message("[${local}]")
"#,
    );
    assert_eq!(out, "assigned\n[]\n");
}

#[test]
fn test_return_propagate() {
    let out = output(
        r#"
function(f)
  set(r 1)
  return(PROPAGATE r)
  set(r 2)
endfunction()
f()
message(${r})
"#,
    );
    assert_eq!(out, "1\n");
}

#[test]
fn test_redefinition_keeps_previous_as_underscore() {
    let out = output(
        r#"
function(greet)
  message(first)
endfunction()
function(greet)
  message(second)
  _greet()
endfunction()
greet()
"#,
    );
    assert_eq!(out, "second\nfirst\n");
}

#[test]
fn test_commands_are_case_insensitive() {
    let out = output("function(Hello)\nMESSAGE(hi)\nendfunction()\nHELLO()\n");
    assert_eq!(out, "hi\n");
}

#[test]
fn test_cmake_language_call_eval_defer() {
    let out = output(
        r#"
cmake_language(CALL message STATUS "called")
cmake_language(EVAL CODE "set(z 7)")
message(${z})
cmake_language(DEFER CALL message "deferred")
message("direct")
"#,
    );
    assert_eq!(out, "-- called\n7\ndirect\ndeferred\n");
}

#[test]
fn test_cmake_language_rejects_block_commands() {
    let result = run("cmake_language(CALL if TRUE)\n");
    assert!(!result.is_success());
}

// ============================================================================
// include()
// ============================================================================

fn project_fs() -> Arc<InMemoryFs> {
    let fs = Arc::new(InMemoryFs::new());
    fs.add_file("/proj/cmake/Helpers.cmake", "set(HELPER_LOADED yes)\n");
    fs.add_file(
        "/proj/sub/defs.cmake",
        "set(DEFS_DIR \"${CMAKE_CURRENT_LIST_DIR}\")\n",
    );
    fs
}

#[test]
fn test_include_module_and_relative_file() {
    let fs = project_fs();
    fs.add_file(
        "/proj/script.cmake",
        r#"cmake_minimum_required(VERSION 3.28)
list(APPEND CMAKE_MODULE_PATH "${CMAKE_CURRENT_LIST_DIR}/cmake")
include(Helpers RESULT_VARIABLE where)
message("${HELPER_LOADED} ${where}")
include(sub/defs.cmake)
message("${DEFS_DIR} ${CMAKE_CURRENT_LIST_DIR}")
include(missing OPTIONAL RESULT_VARIABLE nope)
message("${nope}")
"#,
    );
    let result = Listkit::builder()
        .fs(fs)
        .build()
        .run_script("/proj/script.cmake");
    assert!(result.is_success(), "{:?}", result.diagnostics);
    assert_eq!(
        result.output,
        "yes /proj/cmake/Helpers.cmake\n/proj/sub /proj\nNOTFOUND\n"
    );
}

#[test]
fn test_missing_include_is_an_error() {
    let result = run("include(does_not_exist)\n");
    assert!(!result.is_success());
    assert_eq!(result.error.and_then(|e| e.location()).map(|l| l.line), Some(2));
}

// ============================================================================
// Errors and diagnostics
// ============================================================================

#[test]
fn test_fatal_error_location_and_backtrace() {
    let result = run(
        r#"function(fail_here)
  message(FATAL_ERROR "nope")
endfunction()
fail_here()
"#,
    );
    assert!(!result.is_success());
    let error = result.error.as_ref().unwrap();
    assert_eq!(error.location(), Some(Location::new("/script.cmake", 3)));
    assert!(matches!(error.kind(), Error::Command { .. }));

    let last = result.diagnostics.last().unwrap();
    assert_eq!(last.severity, Severity::Error);
    assert_eq!(last.backtrace, vec![Location::new("/script.cmake", 5)]);
}

#[test]
fn test_send_error_continues_but_fails() {
    let result = run("message(SEND_ERROR \"bad\")\nmessage(after)\n");
    assert_eq!(result.output, "after\n");
    assert!(!result.is_success());
    assert!(result.error.is_none());
    assert_eq!(result.errors(), vec!["bad"]);
}

#[test]
fn test_warning_keeps_run_successful() {
    let result = run("message(WARNING \"careful\")\n");
    assert!(result.is_success());
    assert_eq!(result.warnings(), vec!["careful"]);
}

#[test]
fn test_unclosed_block_reports_opener() {
    let result = run("if(TRUE)\n  message(x)\n");
    assert!(!result.is_success());
    let error = result.error.unwrap();
    assert_eq!(error.location().map(|l| l.line), Some(2));
    assert!(error.to_string().contains("endif"));
}

#[test]
fn test_stray_closer_is_an_error() {
    let result = run("message(before)\nendforeach()\n");
    assert_eq!(result.output, "before\n");
    assert!(!result.is_success());
}

#[test]
fn test_parse_error_runs_nothing() {
    let result = run("message(first)\nmessage(\"unterminated\n");
    assert_eq!(result.output, "");
    assert!(matches!(result.error, Some(Error::Parse { .. })));
}

#[test]
fn test_reference_cycle_is_an_error() {
    let result = run(
        r#"set(a "\${b}")
set(b "\${a}")
message("${a}")
"#,
    );
    assert!(!result.is_success());
    assert!(matches!(result.error.unwrap().kind(), Error::Expansion(_)));
}

#[test]
fn test_recursion_limit() {
    let listkit = Listkit::builder()
        .limits(ExecutionLimits::new().max_call_depth(20))
        .build();
    let result = listkit.run_str(&format!(
        "{}function(recurse)\n  recurse()\nendfunction()\nrecurse()\n",
        PRELUDE
    ));
    assert!(matches!(
        result.error.unwrap().kind(),
        Error::ResourceLimit(LimitExceeded::MaxCallDepth(20))
    ));
}

#[test]
fn test_loop_iteration_limit() {
    let listkit = Listkit::builder()
        .limits(ExecutionLimits::new().max_loop_iterations(50))
        .build();
    let result = listkit.run_str(&format!("{}while(TRUE)\nendwhile()\n", PRELUDE));
    assert!(matches!(
        result.error.unwrap().kind(),
        Error::ResourceLimit(LimitExceeded::MaxLoopIterations(50))
    ));
}

#[test]
fn test_foreach_range_up_to_largest_integer() {
    let out = output(
        r#"
foreach(i RANGE 9223372036854775806 9223372036854775807)
  message("${i}")
endforeach()
"#,
    );
    assert_eq!(out, "9223372036854775806\n9223372036854775807\n");
}

#[test]
fn test_huge_foreach_range_hits_loop_limit() {
    let listkit = Listkit::builder()
        .limits(ExecutionLimits::new().max_loop_iterations(10))
        .build();
    let result = listkit.run_str(&format!(
        "{}foreach(i RANGE 9223372036854775807)\nendforeach()\n",
        PRELUDE
    ));
    assert!(matches!(
        result.error.unwrap().kind(),
        Error::ResourceLimit(LimitExceeded::MaxLoopIterations(10))
    ));
}

#[test]
fn test_command_failure_is_fatal_in_script_mode() {
    let result = run("set(l a)\nlist(GET l 5 out)\nmessage(unreached)\n");
    assert_eq!(result.output, "");
    assert!(result.error.is_some());
}
