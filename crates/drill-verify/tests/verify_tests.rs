//! End-to-end verification over the shipped lessons and their solved versions

use drill_catalog::Catalog;
use drill_core::Value;
use drill_verify::{VerificationStatus, Verifier};
use std::path::PathBuf;

fn fixture(name: &str) -> Catalog {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    Catalog::load(path.to_str().unwrap()).unwrap()
}

// ============================================================================
// Shipped lessons
// ============================================================================

#[test]
fn test_shipped_phase0_fails_only_on_placeholders() {
    let catalogs = drill_catalog::builtin().unwrap();
    let report = Verifier::with_filter("^phase0\\.").unwrap().run(&catalogs);

    assert_eq!(report.total, 23);
    assert_eq!(report.passed, 16);
    assert_eq!(report.failed, 7);
    assert_eq!(report.errors, 0);

    for failure in report.failures() {
        assert_eq!(failure.expected, "FIX_ME", "{}", failure.exercise_id);
        assert!(failure.message.as_deref().unwrap().contains("FIX_ME"));
    }

    let sum = report.get("phase0.stream01.sum").unwrap();
    assert_eq!(sum.actual, Some(Value::int(6)));
}

#[test]
fn test_shipped_phase1_fails_only_on_exercises() {
    let catalogs = drill_catalog::builtin().unwrap();
    let report = Verifier::with_filter("^phase1\\.").unwrap().run(&catalogs);

    assert_eq!(report.total, 18);
    assert_eq!(report.errors, 0);
    let failing: Vec<&str> = report.failures().map(|r| r.exercise_id.as_str()).collect();
    assert_eq!(failing, vec!["phase1.x00", "phase1.x01", "phase1.x02", "phase1.x03"]);

    let x00 = report.get("phase1.x00").unwrap();
    assert_eq!(x00.actual, Some(Value::int(12)));
    assert_eq!(x00.expected, "2");

    let x03 = report.get("phase1.x03").unwrap();
    assert_eq!(x03.expected, "every element is_green");
    assert_eq!(
        x03.message.as_deref(),
        Some("element 0 (Color::RED) does not satisfy is_green")
    );
}

#[test]
fn test_report_records_provenance() {
    let catalogs = drill_catalog::builtin().unwrap();
    let report = Verifier::new().run(&catalogs);

    assert_eq!(report.total, 41);
    assert_eq!(report.catalogs.len(), 2);
    assert_eq!(report.catalogs[0].digest, catalogs[0].digest());
    assert_eq!(report.run_id.len(), 36);
    assert!(report.filter.is_none());
}

// ============================================================================
// Solved lessons
// ============================================================================

#[test]
fn test_solved_lessons_pass() {
    let catalogs = vec![fixture("phase0_solved.yaml"), fixture("phase1_solved.yaml")];
    let report = Verifier::new().run(&catalogs);

    let failing: Vec<(&str, Option<&str>)> = report
        .failures()
        .map(|r| (r.exercise_id.as_str(), r.message.as_deref()))
        .collect();
    assert!(failing.is_empty(), "{:?}", failing);
    assert_eq!(report.total, 41);
    assert!(report.all_passed());
}

#[test]
fn test_three_thirds_are_one() {
    let catalogs = vec![fixture("phase0_solved.yaml")];
    let report = Verifier::with_filter("doubles").unwrap().run(&catalogs);
    assert_eq!(report.total, 1);
    assert_eq!(report.results[0].actual, Some(Value::float(1.0)));
}

// ============================================================================
// Broken exercises
// ============================================================================

const BROKEN: &str = r#"
version: "1"
functions:
  predicates:
    is_huge: "gt(1000"
exercises:
  - id: broken.before
    input: [1, 2, 3]
    steps: [sum]
    expect: 6
  - id: broken.operator
    input: []
    steps: ["reduce(average, 0)"]
    expect: 0
  - id: broken.definition
    input: [1, 2000]
    steps: ["filter(is_huge)", count]
    expect: 1
  - id: broken.types
    input: [taco, sushi]
    steps: ["filter(is_even)"]
    expect: []
  - id: broken.record
    input: [1]
    steps: ["limit(-1)"]
    expect: 1
  - id: broken.after
    input: { range_closed: [1, 100] }
    steps: ["reduce(sum, 0)"]
    expect: 5050
"#;

#[test]
fn test_broken_exercises_do_not_stop_the_batch() {
    let catalog = Catalog::from_yaml("broken.yaml", BROKEN).unwrap();
    let report = Verifier::new().run(&[catalog]);

    let statuses: Vec<(&str, VerificationStatus)> = report
        .results
        .iter()
        .map(|r| (r.exercise_id.as_str(), r.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("broken.before", VerificationStatus::Passed),
            ("broken.operator", VerificationStatus::Error),
            ("broken.definition", VerificationStatus::Error),
            ("broken.types", VerificationStatus::Error),
            ("broken.record", VerificationStatus::Error),
            ("broken.after", VerificationStatus::Passed),
        ]
    );

    let definition = report.get("broken.definition").unwrap();
    assert!(definition.message.as_deref().unwrap().contains("is_huge"));
}

const MISSPELLED: &str = r#"
version: "1"
enums:
  Color: [RED, GREEN, YELLOW]
functions:
  predicates:
    is_yellow: "eq(Color::YELLOW)"
  transforms:
    green_to_yellow: "replace(Color::GREEN, Color::YELOW)"
exercises:
  - id: misspelled.definition
    input: ["Color::GREEN", "Color::RED"]
    steps: ["map(green_to_yellow)", "filter(is_yellow)", count]
    expect: 1
  - id: misspelled.input
    input: ["Color::YELOW"]
    steps: [count]
    expect: 1
"#;

#[test]
fn test_misspelled_variant_in_definition_is_an_error() {
    let catalog = Catalog::from_yaml("misspelled.yaml", MISSPELLED).unwrap();
    let report = Verifier::new().run(&[catalog]);

    assert_eq!(report.errors, 2);
    for id in ["misspelled.definition", "misspelled.input"] {
        let result = report.get(id).unwrap();
        assert_eq!(result.status, VerificationStatus::Error, "{}", id);
        assert!(
            result
                .message
                .as_deref()
                .unwrap()
                .contains("enum Color has no variant YELOW"),
            "{}: {:?}",
            id,
            result.message
        );
    }
}
