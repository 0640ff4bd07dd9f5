//! Human-readable output
//!
//! ```text
//! 16/23 exercises passed
//! FAIL  phase0.stream01.sum: expected FIX_ME, got 6 (replace FIX_ME with the expected result)
//! ```

use drill_verify::{VerificationReport, VerificationResult, VerificationStatus};
use std::fmt::Write;

/// Summary line followed by one line per failed or errored exercise.
/// With `verbose`, passing exercises are listed too.
pub fn format_results(results: &[VerificationResult], verbose: bool) -> String {
    let passed = results.iter().filter(|r| r.passed).count();
    let mut out = format!("{}/{} exercises passed\n", passed, results.len());

    for result in results.iter().filter(|r| verbose || !r.passed) {
        out.push_str(&result_line(result));
        out.push('\n');
    }

    out
}

/// Results plus run provenance (run id, start time and catalogs) when verbose
pub fn format_report(report: &VerificationReport, verbose: bool) -> String {
    let mut out = String::new();

    if verbose {
        let _ = writeln!(out, "run {} started {}", report.run_id, report.started_at.to_rfc3339());
        if let Some(filter) = &report.filter {
            let _ = writeln!(out, "filter {}", filter);
        }
        for catalog in &report.catalogs {
            let _ = writeln!(
                out,
                "catalog {} ({} exercises) {}",
                catalog.name, catalog.exercises, catalog.digest
            );
        }
    }

    out.push_str(&format_results(&report.results, verbose));

    if report.errors > 0 {
        let _ = writeln!(
            out,
            "{} of {} exercises could not be evaluated",
            report.errors, report.total
        );
    }

    out
}

fn result_line(result: &VerificationResult) -> String {
    let label = result.status.to_string();
    let mut line = format!("{:<5} {}", label, result.exercise_id);

    match result.status {
        VerificationStatus::Passed => {
            if let Some(actual) = &result.actual {
                let _ = write!(line, ": {}", actual);
            }
        }
        VerificationStatus::Failed | VerificationStatus::Error => {
            let actual = result
                .actual
                .as_ref()
                .map(|a| a.to_string())
                .unwrap_or_else(|| "no result".to_string());
            let _ = write!(line, ": expected {}, got {}", result.expected, actual);
            if let Some(message) = &result.message {
                let _ = write!(line, " ({})", message);
            }
        }
    }

    line
}
