//! Verifier: runs exercises and judges their results
//!
//! Exercises share no mutable state, so a broken exercise only ever
//! produces its own Error result and the rest of the batch still runs.

use crate::report::VerificationReport;
use crate::result::VerificationResult;
use crate::VerifyError;
use drill_catalog::{Catalog, CatalogEntry, PLACEHOLDER};
use drill_core::registry::PredicateFn;
use drill_core::{
    EngineError, ExerciseSpec, Expectation, FunctionRegistry, PipelineEvaluator, RunContext, Value,
};
use regex::Regex;
use tracing::{debug, info};

/// Selects and verifies exercises
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    filter: Option<Regex>,
}

impl Verifier {
    /// Verifier that selects every exercise
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifier that selects exercise ids matching `pattern`
    pub fn with_filter(pattern: &str) -> Result<Self, VerifyError> {
        let filter = Regex::new(pattern).map_err(|source| VerifyError::InvalidFilter {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { filter: Some(filter) })
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_ref().map(Regex::as_str)
    }

    pub fn selects(&self, exercise_id: &str) -> bool {
        self.filter.as_ref().map_or(true, |re| re.is_match(exercise_id))
    }

    /// Selected entries of a catalog, in catalog order
    pub fn select<'a>(
        &'a self,
        catalog: &'a Catalog,
    ) -> impl Iterator<Item = &'a CatalogEntry> + 'a {
        catalog.entries().iter().filter(move |entry| self.selects(entry.id()))
    }

    /// Verify one catalog entry against the catalog's registry
    pub fn verify_entry(
        &self,
        entry: &CatalogEntry,
        registry: &FunctionRegistry,
    ) -> VerificationResult {
        match entry {
            CatalogEntry::Ready(spec) => verify(spec, registry),
            CatalogEntry::Invalid { id, error } => {
                VerificationResult::error(id.as_str(), "?", None, error)
            }
        }
    }

    /// Verify the selected exercises of every catalog, in order
    pub fn run(&self, catalogs: &[Catalog]) -> VerificationReport {
        let mut ctx = RunContext::new();
        if let Some(filter) = self.filter() {
            ctx = ctx.with_filter(filter);
        }
        info!(run_id = %ctx.run_id, catalogs = catalogs.len(), "verification run started");

        let mut results = Vec::new();
        for catalog in catalogs {
            for entry in self.select(catalog) {
                let result = self.verify_entry(entry, catalog.registry());
                debug!(
                    run_id = %ctx.run_id,
                    exercise = %result.exercise_id,
                    status = %result.status,
                    "exercise verified"
                );
                results.push(result);
            }
        }

        let report = VerificationReport::new(ctx, catalogs, results);
        info!(
            run_id = %report.run_id,
            passed = report.passed,
            total = report.total,
            "verification run finished"
        );
        report
    }
}

/// Run one exercise and compare its result with the expectation
pub fn verify(spec: &ExerciseSpec, registry: &FunctionRegistry) -> VerificationResult {
    let expected = spec.expected.to_string();

    // Expectation predicates are resolved up front like step functions.
    let check = match Check::resolve(&spec.expected, registry) {
        Ok(check) => check,
        Err(err) => return VerificationResult::error(spec.id.as_str(), expected, None, &err),
    };

    let evaluator = PipelineEvaluator::new(registry);
    let actual = match evaluator.evaluate(&spec.input, &spec.steps, spec.mixed) {
        Ok(actual) => actual,
        Err(err) => return VerificationResult::error(spec.id.as_str(), expected, None, &err),
    };

    match check.judge(&actual) {
        Ok(None) => VerificationResult::passed(spec.id.as_str(), expected, actual),
        Ok(Some(message)) => {
            VerificationResult::failed(spec.id.as_str(), expected, actual, message)
        }
        Err(err) => VerificationResult::error(spec.id.as_str(), expected, Some(actual), &err),
    }
}

/// An expectation with its predicate resolved
enum Check<'e> {
    Equals(&'e Value),
    Every(&'e str, PredicateFn),
    Any(&'e str, PredicateFn),
    NoneOf(&'e str, PredicateFn),
    Satisfies(&'e str, PredicateFn),
    Placeholder,
}

impl<'e> Check<'e> {
    fn resolve(
        expectation: &'e Expectation,
        registry: &FunctionRegistry,
    ) -> Result<Self, EngineError> {
        Ok(match expectation {
            Expectation::Equals(value) => Check::Equals(value),
            Expectation::Every(p) => Check::Every(p, registry.predicate(p)?),
            Expectation::Any(p) => Check::Any(p, registry.predicate(p)?),
            Expectation::NoneOf(p) => Check::NoneOf(p, registry.predicate(p)?),
            Expectation::Satisfies(p) => Check::Satisfies(p, registry.predicate(p)?),
            Expectation::Placeholder => Check::Placeholder,
        })
    }

    /// `Ok(None)` on success, `Ok(Some(message))` on a mismatch
    fn judge(&self, actual: &Value) -> Result<Option<String>, EngineError> {
        match self {
            Check::Equals(expected) => Ok(equality_mismatch(expected, actual)),
            Check::Placeholder => Ok(Some(format!(
                "replace {} with the expected result",
                PLACEHOLDER
            ))),
            Check::Satisfies(name, predicate) => Ok(if predicate(actual)? {
                None
            } else {
                Some(format!("result does not satisfy {}", name))
            }),
            Check::Every(name, predicate) => {
                let items = elements(&format!("every({})", name), actual)?;
                for (index, item) in items.iter().enumerate() {
                    if !predicate(item)? {
                        return Ok(Some(format!(
                            "element {} ({}) does not satisfy {}",
                            index, item, name
                        )));
                    }
                }
                Ok(None)
            }
            Check::Any(name, predicate) => {
                for item in elements(&format!("any({})", name), actual)? {
                    if predicate(item)? {
                        return Ok(None);
                    }
                }
                Ok(Some(format!("no element satisfies {}", name)))
            }
            Check::NoneOf(name, predicate) => {
                let items = elements(&format!("none({})", name), actual)?;
                for (index, item) in items.iter().enumerate() {
                    if predicate(item)? {
                        return Ok(Some(format!(
                            "element {} ({}) satisfies {}",
                            index, item, name
                        )));
                    }
                }
                Ok(None)
            }
        }
    }
}

fn elements<'v>(context: &str, actual: &'v Value) -> Result<&'v [Value], EngineError> {
    actual.as_seq().ok_or_else(|| EngineError::TypeMismatch {
        context: context.to_string(),
        expected: "seq".to_string(),
        found: actual.tag().to_string(),
    })
}

/// Describe how `actual` differs from `expected`, if it does
fn equality_mismatch(expected: &Value, actual: &Value) -> Option<String> {
    if expected == actual {
        return None;
    }

    if expected.tag() != actual.tag() {
        return Some(format!("expected a result of type {}, got {}", expected.tag(), actual.tag()));
    }

    if let (Value::Seq(want), Value::Seq(got)) = (expected, actual) {
        if want.len() != got.len() {
            return Some(format!("expected {} elements, got {}", want.len(), got.len()));
        }
        if let Some(index) = want.iter().zip(got).position(|(w, g)| w != g) {
            return Some(format!(
                "element {} differs: expected {}, got {}",
                index, want[index], got[index]
            ));
        }
    }

    Some("values differ".to_string())
}
