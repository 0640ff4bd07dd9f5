//! streamdrill verification: run exercises, judge results, build reports.
//!
//! # Example
//!
//! ```ignore
//! use drill_verify::Verifier;
//!
//! let catalogs = drill_catalog::builtin()?;
//! let report = Verifier::with_filter("^phase0")?.run(&catalogs);
//! println!("{}/{}", report.passed, report.total);
//! ```

pub mod report;
pub mod result;
pub mod verifier;

pub use report::{CatalogSummary, VerificationReport};
pub use result::{VerificationResult, VerificationStatus};
pub use verifier::{verify, Verifier};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Invalid exercise filter '{pattern}': {source}")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
