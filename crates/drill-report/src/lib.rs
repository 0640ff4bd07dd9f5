//! streamdrill reports
//!
//! Output formats:
//! - Text (summary line and one line per failure)
//! - JSON (the full report, machine-readable)
//!
//! Formatting is pure: callers decide where the output goes.

mod json;
mod text;

pub use json::format_json;
pub use text::{format_report, format_results};

use drill_verify::VerificationReport;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable terminal output
    #[default]
    Text,
    /// JSON with the full report
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "human" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Render a report in the requested format
pub fn render(
    report: &VerificationReport,
    format: OutputFormat,
    verbose: bool,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(format_report(report, verbose)),
        OutputFormat::Json => format_json(report).map(|mut json| {
            json.push('\n');
            json
        }),
    }
}
