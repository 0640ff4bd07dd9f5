//! JSON Output

use drill_verify::VerificationReport;

/// Pretty-printed JSON of the full report
pub fn format_json(report: &VerificationReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
