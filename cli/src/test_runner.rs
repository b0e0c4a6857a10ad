use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use renderer::{BlockRenderOptions, BuildMode, RenderOptions, RenderTree, RenderWarning};

const FIXTURE_SUFFIX: &str = ".test.toml";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedWarning {
    /// Substring that must appear in the warning message.
    pub contains: String,

    /// If set, the warning must be about this block id.
    #[serde(default)]
    pub block: Option<String>,
}

/// One render fixture. `record_map` holds the document as a JSON string.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    #[serde(default)]
    pub description: Option<String>,

    /// Root block id or page URL. Defaults to the first block.
    #[serde(default)]
    pub root: Option<String>,

    pub record_map: String,

    /// Render options; `build_mode` defaults to development so warnings count.
    #[serde(default)]
    pub options: RenderOptions,

    #[serde(default)]
    pub hide_block_id: bool,

    /// Expected HTML (trimmed comparison).
    #[serde(default)]
    pub expect_output: Option<String>,

    /// Fragments the HTML must contain.
    #[serde(default)]
    pub expect_contains: Vec<String>,

    /// If true, the record map is expected not to load.
    #[serde(default)]
    pub expect_parse_error: bool,

    /// If present (even empty), warning count and content are checked in order.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedWarning>>,
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_suffix(FIXTURE_SUFFIX))
                .unwrap_or("?")
        })
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let (description, outcome) = match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str::<Fixture>(&content) {
            Ok(fixture) => (fixture.description.clone(), check_fixture(fixture)),
            Err(e) => (None, Err(format!("fixture error: {}", e))),
        },
        Err(e) => (None, Err(format!("cannot read file: {}", e))),
    };
    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: match outcome {
            Ok(()) => TestOutcome::Pass,
            Err(reason) => TestOutcome::Fail(reason),
        },
    }
}

/// Load, render and compare one fixture. `Err` carries the failure reason.
fn check_fixture(fixture: Fixture) -> Result<(), String> {
    let loaded = recordmap::parser::Parser::new(fixture.record_map, 0).parse();

    if fixture.expect_parse_error {
        return match loaded {
            Err(_) => Ok(()),
            Ok(_) => Err("expected the record map not to load, but it loaded".into()),
        };
    }

    let record_map = loaded.map_err(|errs| {
        let msgs: Vec<String> = errs.iter().map(|e| e.message.clone()).collect();
        format!("record map did not load: {}", msgs.join("; "))
    })?;

    let root = fixture.root.as_deref().map(|query| {
        record_map
            .find_block_id(query)
            .unwrap_or(query)
            .to_string()
    });

    let mut options = fixture.options;
    options.build_mode.get_or_insert(BuildMode::Development);
    let rendered = RenderTree::new(record_map, options)
        .with_block_options(BlockRenderOptions {
            hide_block_id: fixture.hide_block_id,
            ..BlockRenderOptions::default()
        })
        .render(root.as_deref());
    let html = rendered.to_html();

    if let Some(expected) = &fixture.expect_output {
        let expected = expected.trim();
        if html.trim() != expected {
            return Err(format!(
                "output mismatch\n  expected: {}\n  actual:   {}",
                expected,
                html.trim()
            ));
        }
    }

    for fragment in &fixture.expect_contains {
        if !html.contains(fragment.as_str()) {
            return Err(format!(
                "output does not contain \"{}\"\n  actual: {}",
                fragment, html
            ));
        }
    }

    match &fixture.expect_warnings {
        Some(expected) => check_warnings(&rendered.diagnostics, expected),
        None => Ok(()),
    }
}

/// Check that actual warnings match expectations, in order.
fn check_warnings(actual: &[RenderWarning], expected: &[ExpectedWarning]) -> Result<(), String> {
    if actual.len() != expected.len() {
        let actual_msgs: Vec<String> = actual.iter().map(|w| format!("  - {}", w)).collect();
        return Err(format!(
            "expected {} warning(s), got {}\n  actual warnings:\n{}",
            expected.len(),
            actual.len(),
            if actual_msgs.is_empty() {
                "    (none)".to_string()
            } else {
                actual_msgs.join("\n")
            }
        ));
    }

    for (i, (warning, expected)) in actual.iter().zip(expected).enumerate() {
        let msg = warning.to_string();
        if !msg.contains(&expected.contains) {
            return Err(format!(
                "warning[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, msg
            ));
        }
        if let Some(block) = &expected.block {
            if warning.block_id() != Some(block.as_str()) {
                return Err(format!(
                    "warning[{}]: expected to concern block {}, got: {}",
                    i, block, msg
                ));
            }
        }
    }

    Ok(())
}

/// Discover fixtures grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(FIXTURE_SUFFIX))
        {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

/// Keep the requested categories (and their subcategories).
fn select_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a [PathBuf]> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
    }
    let mut selected = BTreeMap::new();
    for req in requested {
        let req = req.trim_matches('/');
        let prefix = format!("{}/", req);
        let before = selected.len();
        for (cat, files) in all {
            if cat == req || cat.starts_with(&prefix) {
                selected.insert(cat.as_str(), files.as_slice());
            }
        }
        if selected.len() == before {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| category_label(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    selected
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// List available categories for the given fixture path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(cat), files.len());
    }
}

struct Palette {
    no_color: bool,
}

impl Palette {
    fn paint(&self, text: &str, code: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        }
    }

    fn pass(&self) -> String {
        self.paint("PASS", "32")
    }

    fn fail(&self) -> String {
        self.paint("FAIL", "31")
    }

    fn bold(&self, text: &str) -> String {
        self.paint(text, "1")
    }
}

/// Run every fixture under `path` (or a single file).
/// If `categories` is non-empty, only run fixtures in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let palette = Palette { no_color };

    let groups: Vec<(String, Vec<PathBuf>)> = if path.is_file() {
        vec![(String::new(), vec![path.to_path_buf()])]
    } else {
        let all = discover_categorized(path);
        if all.is_empty() {
            eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
            return 1;
        }
        let selected = select_categories(&all, categories);
        if selected.is_empty() {
            eprintln!("no matching categories found");
            return 1;
        }
        selected
            .into_iter()
            .map(|(cat, files)| (cat.to_string(), files.to_vec()))
            .collect()
    };
    let single_file = path.is_file();

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &groups {
        if !single_file {
            eprintln!();
            eprintln!("{}", palette.bold(category_label(cat)));
        }
        for file in files {
            let result = run_single_test(file);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", palette.pass(), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", palette.fail(), result.label());
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!(
            "test result: {}. {} passed, 0 failed",
            palette.paint("ok", "32"),
            passed
        );
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            palette.paint("FAILED", "31"),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
description = "missing child"
record_map = '''
{"block": {
  "p": {"value": {"id": "p", "type": "page", "content": ["a", "gone"]}},
  "a": {"value": {"id": "a", "type": "text", "properties": {"title": [["hi"]]}}}
}}
'''
hide_block_id = true
expect_contains = ['<div class="notion-text">hi</div>']

[[expect_warnings]]
contains = "missing block"
block = "gone"
"#;

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dirs");
        }
        std::fs::write(&path, content).expect("write fixture");
        path
    }

    #[test]
    fn passing_fixture() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(dir.path(), "blocks/missing.test.toml", FIXTURE);
        let result = run_single_test(&path);
        if let TestOutcome::Fail(reason) = &result.outcome {
            panic!("fixture failed: {reason}");
        }
        assert_eq!(result.label(), "missing child");
    }

    #[test]
    fn warning_count_mismatch_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fixture = FIXTURE.replace(", \"gone\"]", "]");
        let path = write(dir.path(), "missing.test.toml", &fixture);
        let result = run_single_test(&path);
        let TestOutcome::Fail(reason) = result.outcome else {
            panic!("fixture should fail");
        };
        assert!(reason.contains("expected 1 warning(s), got 0"), "{reason}");
    }

    #[test]
    fn parse_error_expectation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(
            dir.path(),
            "broken.test.toml",
            "record_map = '{\"block\": ['\nexpect_parse_error = true\n",
        );
        assert!(matches!(run_single_test(&path).outcome, TestOutcome::Pass));
        assert_eq!(run_single_test(&path).label(), "broken");
    }

    #[test]
    fn discovers_by_subfolder() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "top.test.toml", FIXTURE);
        write(dir.path(), "assets/file.test.toml", FIXTURE);
        write(dir.path(), "assets/pdf/pdf.test.toml", FIXTURE);
        write(dir.path(), "assets/notes.md", "ignored");
        let found = discover_categorized(dir.path());
        assert_eq!(
            found.keys().map(String::as_str).collect::<Vec<_>>(),
            ["", "assets", "assets/pdf"]
        );

        let selected = select_categories(&found, &["assets".to_string()]);
        assert_eq!(selected.keys().copied().collect::<Vec<_>>(), ["assets", "assets/pdf"]);
        assert_eq!(run_tests(dir.path(), true, &[]), 0);
    }
}
