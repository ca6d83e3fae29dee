//! Checks the Go fixture packages end to end.

use std::fs;
use std::path::PathBuf;

use gostable_core::{PolicyTable, Severity, Violation};
use gostable_go::{GoUnit, ParseError};

fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load(package: &str) -> GoUnit {
    let dir = fixture_root().join(package);
    let mut paths: Vec<PathBuf> = fs::read_dir(&dir)
        .expect("fixture directory")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|p| p.extension().is_some_and(|e| e == "go"))
        .collect();
    paths.sort();

    let mut unit = GoUnit::new();
    for path in paths {
        let source = fs::read_to_string(&path).expect("fixture source");
        unit.add_source(&path, &source).expect("fixture parses");
    }
    unit
}

fn line_of(package: &str, file: &str, needle: &str) -> usize {
    let source = fs::read_to_string(fixture_root().join(package).join(file)).expect("fixture source");
    source
        .lines()
        .position(|l| l.contains(needle))
        .map(|i| i + 1)
        .unwrap_or_else(|| panic!("{needle} not found in {file}"))
}

fn at<'v>(violations: &'v [Violation], code: &str, file: &str, line: usize) -> Vec<&'v Violation> {
    violations
        .iter()
        .filter(|v| {
            v.code == code
                && v.location.line == line
                && v.location.file.file_name().is_some_and(|f| f == file)
        })
        .collect()
}

#[test]
fn report_package_hits_every_rule() {
    let violations = load("report").check(&PolicyTable::stable_api_v1());

    let distinct = line_of("report", "report.go", "r.users.Distinct");
    let found = at(&violations, "GS001", "report.go", distinct);
    assert_eq!(found.len(), 1, "{violations:#?}");
    assert_eq!(
        found[0].message,
        "use of Collection.Distinct is not supported by the MongoDB Stable API"
    );

    let search = line_of("report", "report.go", "\"$search\"");
    let found = at(&violations, "GS003", "report.go", search);
    assert_eq!(found.len(), 1, "{violations:#?}");
    assert_eq!(
        found[0].message,
        "Aggregation stage '$search' is not supported by the MongoDB Stable API"
    );

    let group = line_of("report", "report.go", "\"$sum\"");
    let found = at(&violations, "GS004", "report.go", group);
    assert_eq!(found.len(), 1, "{violations:#?}");
    assert_eq!(
        found[0].message,
        "Operator '$sum' in stage '$group' is not supported by the MongoDB Stable API"
    );

    let command = line_of("report", "report.go", "\"serverStatus\"");
    let found = at(&violations, "GS005", "report.go", command);
    assert_eq!(found.len(), 1, "{violations:#?}");
    assert_eq!(
        found[0].message,
        "Command 'serverStatus' is not supported by the MongoDB Stable API"
    );

    let run = line_of("report", "report.go", "r.db.RunCommand(ctx, cmd)");
    let found = at(&violations, "GS006", "report.go", run);
    assert_eq!(found.len(), 1, "{violations:#?}");
    assert_eq!(found[0].severity, Severity::Warning);

    let tail = line_of("report", "options.go", "SetCursorType");
    assert_eq!(at(&violations, "GS001", "options.go", tail).len(), 1);
    let found = at(&violations, "GS007", "options.go", tail);
    assert_eq!(found.len(), 1, "{violations:#?}");
    assert_eq!(
        found[0].message,
        "CursorType.TailableAwait is not supported by the MongoDB Stable API"
    );

    let capped = line_of("report", "options.go", "Capped:");
    let found = at(&violations, "GS002", "options.go", capped);
    assert_eq!(found.len(), 1, "{violations:#?}");
    assert_eq!(
        found[0].message,
        "CreateCollectionOptions.Capped is not supported by the MongoDB Stable API"
    );
    let collation = line_of("report", "options.go", "Collation:");
    assert!(at(&violations, "GS002", "options.go", collation).is_empty());
}

#[test]
fn stable_commands_only_need_review() {
    let violations = load("report").check(&PolicyTable::stable_api_v1());
    let ping = line_of("report", "report.go", "\"ping\"");

    assert!(at(&violations, "GS005", "report.go", ping).is_empty());
    let review = at(&violations, "GS006", "report.go", ping);
    assert_eq!(review.len(), 1);
    assert_eq!(
        review[0].message,
        "Database.RunCommand runs an arbitrary command and requires manual review against the MongoDB Stable API"
    );
}

#[test]
fn clean_package_has_no_violations() {
    let violations = load("clean").check(&PolicyTable::stable_api_v1());
    assert!(violations.is_empty(), "{violations:#?}");
}

#[test]
fn results_are_sorted_and_repeatable() {
    let unit = load("report");
    let policy = PolicyTable::stable_api_v1();
    let first = unit.check(&policy);
    let second = unit.check(&policy);
    assert_eq!(first, second);

    let keys: Vec<_> = first
        .iter()
        .map(|v| (v.location.file.clone(), v.location.line, v.location.column))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn broken_source_is_rejected_without_touching_the_unit() {
    let mut unit = load("clean");
    let before = unit.tree().len();
    let err = unit
        .add_source("broken.go", "package clean\n\nfunc f() {\n\treturn (\n}\n")
        .unwrap_err();
    let ParseError::Syntax { line, .. } = &err else {
        panic!("expected a syntax error, got {err}");
    };
    assert!(*line >= 3);
    assert_eq!(unit.tree().len(), before);
    assert_eq!(unit.files().len(), 1);
}
