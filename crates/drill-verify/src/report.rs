//! Verification report: the ordered results of one run plus provenance

use crate::result::{VerificationResult, VerificationStatus};
use chrono::{DateTime, Utc};
use drill_catalog::Catalog;
use drill_core::{RunContext, DRILL_VERSION};
use serde::{Deserialize, Serialize};

/// Catalog a run read its exercises from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub digest: String,
    pub exercises: usize,
}

impl From<&Catalog> for CatalogSummary {
    fn from(catalog: &Catalog) -> Self {
        Self {
            name: catalog.name().to_string(),
            title: catalog.title().map(str::to_string),
            digest: catalog.digest().to_string(),
            exercises: catalog.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub version: String,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub catalogs: Vec<CatalogSummary>,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub total: usize,
    pub results: Vec<VerificationResult>,
}

impl VerificationReport {
    pub fn new(ctx: RunContext, catalogs: &[Catalog], results: Vec<VerificationResult>) -> Self {
        let count =
            |status: VerificationStatus| results.iter().filter(|r| r.status == status).count();
        let passed = count(VerificationStatus::Passed);
        let failed = count(VerificationStatus::Failed);
        let errors = count(VerificationStatus::Error);

        Self {
            version: DRILL_VERSION.to_string(),
            run_id: ctx.run_id,
            started_at: ctx.started_at,
            filter: ctx.filter,
            catalogs: catalogs.iter().map(CatalogSummary::from).collect(),
            passed,
            failed,
            errors,
            total: results.len(),
            results,
        }
    }

    /// True when every selected exercise passed. An empty selection passes.
    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }

    /// Failed and errored results, in run order
    pub fn failures(&self) -> impl Iterator<Item = &VerificationResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    pub fn get(&self, exercise_id: &str) -> Option<&VerificationResult> {
        self.results.iter().find(|r| r.exercise_id == exercise_id)
    }
}
