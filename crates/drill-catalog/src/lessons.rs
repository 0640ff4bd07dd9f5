//! Lesson catalogs embedded in the binary.
//!
//! Phase 0 covers counting, summing, ranges and distinct/skip/limit. Phase 1
//! covers predicates, filter, map and collecting into sequences. Both ship
//! with the learner's placeholders still in place.

use crate::catalog::Catalog;
use crate::CatalogError;

/// Name and YAML source of every embedded lesson, in teaching order
pub const LESSONS: &[(&str, &str)] = &[
    (
        "lessons/phase0_streams.yaml",
        include_str!("../../../lessons/phase0_streams.yaml"),
    ),
    (
        "lessons/phase1_lambda.yaml",
        include_str!("../../../lessons/phase1_lambda.yaml"),
    ),
];

/// Compile every embedded lesson
pub fn builtin() -> Result<Vec<Catalog>, CatalogError> {
    LESSONS
        .iter()
        .map(|(name, yaml)| Catalog::from_yaml(name, yaml))
        .collect()
}
