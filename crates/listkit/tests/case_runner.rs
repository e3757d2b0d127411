//! Listfile case runner
//!
//! Case file format (.test.cmake):
//! ```text
//! ### case_name
//! # Description of what this checks
//! set(x 1)
//! message("${x}")
//! ### expect
//! 1
//! ### end
//! ```
//!
//! Directives between the name and `### end`:
//! - `### baseline: <version>|none` - policy baseline prepended to the
//!   body (default `3.28`; `none` runs the body as written)
//! - `### error: <text>` - the run must fail with `<text>` in its error
//! - `### warnings: <n>` - exact number of warning diagnostics
//! - `### skip: <reason>` - not run
//!
//! Multiple cases per file supported.

use listkit::Listkit;
use std::fs;
use std::path::Path;

const DEFAULT_BASELINE: &str = "3.28";

/// A single case parsed from a .test.cmake file
#[derive(Debug, Clone, Default)]
pub struct Case {
    pub name: String,
    pub description: String,
    pub body: String,
    pub expected_output: String,
    pub baseline: Option<String>,
    pub expected_error: Option<String>,
    pub expected_warnings: Option<usize>,
    pub skip: bool,
}

/// Result of running a case
#[derive(Debug)]
pub struct CaseResult {
    pub name: String,
    pub passed: bool,
    pub output: String,
    pub expected_output: String,
    pub error: Option<String>,
    pub warnings: usize,
    pub problem: Option<String>,
}

impl Case {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            baseline: Some(DEFAULT_BASELINE.to_string()),
            ..Self::default()
        }
    }

    /// Listfile text with the baseline prepended.
    pub fn source(&self) -> String {
        match &self.baseline {
            Some(version) => format!("cmake_minimum_required(VERSION {})\n{}\n", version, self.body),
            None => format!("{}\n", self.body),
        }
    }
}

fn finish(case: Option<Case>, body: &mut Vec<String>, expect: &mut Vec<String>, cases: &mut Vec<Case>) {
    if let Some(mut case) = case {
        case.body = body.join("\n");
        case.expected_output = expect.join("\n");
        if !case.expected_output.is_empty() {
            case.expected_output.push('\n');
        }
        cases.push(case);
    }
    body.clear();
    expect.clear();
}

/// Parse cases from a .test.cmake file
pub fn parse_case_file(content: &str) -> Vec<Case> {
    let mut cases = Vec::new();
    let mut current: Option<Case> = None;
    let mut in_body = false;
    let mut in_expect = false;
    let mut body = Vec::new();
    let mut expect = Vec::new();

    for line in content.lines() {
        if let Some(directive) = line.strip_prefix("### ") {
            let directive = directive.trim();

            if directive == "expect" {
                in_body = false;
                in_expect = true;
            } else if directive == "end" {
                finish(current.take(), &mut body, &mut expect, &mut cases);
                in_body = false;
                in_expect = false;
            } else if let Some(version) = directive.strip_prefix("baseline:") {
                if let Some(ref mut case) = current {
                    case.baseline = match version.trim() {
                        "none" => None,
                        v => Some(v.to_string()),
                    };
                }
            } else if let Some(text) = directive.strip_prefix("error:") {
                if let Some(ref mut case) = current {
                    case.expected_error = Some(text.trim().to_string());
                }
            } else if let Some(count) = directive.strip_prefix("warnings:") {
                if let Some(ref mut case) = current {
                    case.expected_warnings = count.trim().parse().ok();
                }
            } else if directive.starts_with("skip") {
                if let Some(ref mut case) = current {
                    case.skip = true;
                }
            } else {
                finish(current.take(), &mut body, &mut expect, &mut cases);
                current = Some(Case::new(directive));
                in_body = true;
                in_expect = false;
            }
        } else if let Some(comment) = line.strip_prefix("# ") {
            if in_body && body.is_empty() {
                if let Some(ref mut case) = current {
                    if case.description.is_empty() {
                        case.description = comment.to_string();
                        continue;
                    }
                }
            }
            if in_body {
                body.push(line.to_string());
            } else if in_expect {
                expect.push(line.to_string());
            }
        } else if in_body {
            body.push(line.to_string());
        } else if in_expect {
            expect.push(line.to_string());
        }
    }

    // File may not end with ### end
    finish(current.take(), &mut body, &mut expect, &mut cases);
    cases
}

/// Run a single case in script mode
pub fn run_case(case: &Case) -> CaseResult {
    let result = Listkit::new().run_str(&case.source());
    let error = result.error.as_ref().map(|e| e.to_string());
    let warnings = result.warnings().len();

    let problem = match (&case.expected_error, &error) {
        (None, Some(err)) => Some(format!("unexpected error: {}", err)),
        (None, None) if !result.is_success() => {
            Some(format!("errors reported: {:?}", result.errors()))
        }
        (Some(want), None) => Some(format!("expected an error containing {:?}", want)),
        (Some(want), Some(err)) if !err.contains(want.as_str()) => {
            Some(format!("error {:?} does not contain {:?}", err, want))
        }
        _ => None,
    }
    .or_else(|| {
        (result.output != case.expected_output).then(|| "output differs".to_string())
    })
    .or_else(|| match case.expected_warnings {
        Some(want) if want != warnings => {
            Some(format!("expected {} warnings, got {}", want, warnings))
        }
        _ => None,
    });

    CaseResult {
        name: case.name.clone(),
        passed: problem.is_none(),
        output: result.output,
        expected_output: case.expected_output.clone(),
        error,
        warnings,
        problem,
    }
}

/// Load all case files from a directory, sorted by file name
pub fn load_cases(dir: &Path) -> Vec<(String, Vec<Case>)> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.to_string_lossy().ends_with(".test.cmake"))
        .collect();
    files.sort();

    files
        .into_iter()
        .filter_map(|path| {
            let content = fs::read_to_string(&path).ok()?;
            let name = path.file_name()?.to_string_lossy().to_string();
            Some((name, parse_case_file(&content)))
        })
        .collect()
}

/// Summary of a case run
#[derive(Debug, Default)]
pub struct CaseSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl CaseSummary {
    pub fn add(&mut self, result: &CaseResult) {
        self.total += 1;
        if result.passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn skip(&mut self) {
        self.total += 1;
        self.skipped += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_file() {
        let content = r#"### simple
# A plain message
message(hello)
### expect
hello
### end

### failing
### baseline: none
### error: boom
message(FATAL_ERROR boom)
### end
"#;
        let cases = parse_case_file(content);
        assert_eq!(cases.len(), 2);

        assert_eq!(cases[0].name, "simple");
        assert_eq!(cases[0].description, "A plain message");
        assert_eq!(cases[0].body, "message(hello)");
        assert_eq!(cases[0].expected_output, "hello\n");
        assert_eq!(cases[0].baseline.as_deref(), Some("3.28"));

        assert_eq!(cases[1].baseline, None);
        assert_eq!(cases[1].expected_error.as_deref(), Some("boom"));
        assert_eq!(cases[1].expected_output, "");
    }
}
