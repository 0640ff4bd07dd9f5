//! Unified Error Model
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("CONFIG/unknown predicate '{0}'")]
    UnknownPredicate(String),

    #[error("CONFIG/unknown transform '{0}'")]
    UnknownTransform(String),

    #[error("CONFIG/unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("CONFIG/{0}")]
    MalformedSpec(String),

    #[error("TYPE/{context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: String,
        found: String,
    },

    #[error("TYPE/{step}: expected a sequence, found {found}")]
    NotASequence { step: String, found: String },

    #[error("ARITH/{0} overflowed")]
    Overflow(String),
}

/// The two ways an exercise can go wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The exercise itself cannot be evaluated (unknown id, bad shape, bad types)
    Configuration,
    /// The exercise evaluated but the result differs from the expectation
    AssertionMismatch,
}

impl EngineError {
    /// Every engine error is fatal to its own exercise only.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }

    pub(crate) fn mismatch(
        context: impl Into<String>,
        expected: impl Into<String>,
        found: &crate::value::Value,
    ) -> Self {
        EngineError::TypeMismatch {
            context: context.into(),
            expected: expected.into(),
            found: found.tag().to_string(),
        }
    }
}
