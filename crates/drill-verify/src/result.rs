//! Verification results
//!
//! A result is either Passed, Failed (the pipeline ran but the result does
//! not meet the expectation) or Error (the exercise could not be evaluated).

use drill_core::{EngineError, ErrorKind, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Passed,
    Failed,
    Error,
}

impl VerificationStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, VerificationStatus::Passed)
    }

    /// How the exercise went wrong, if it did
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            VerificationStatus::Passed => None,
            VerificationStatus::Failed => Some(ErrorKind::AssertionMismatch),
            VerificationStatus::Error => Some(ErrorKind::Configuration),
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VerificationStatus::Passed => write!(f, "PASS"),
            VerificationStatus::Failed => write!(f, "FAIL"),
            VerificationStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Outcome of verifying one exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub exercise_id: String,
    pub passed: bool,
    pub status: VerificationStatus,
    /// What the pipeline produced; absent when it could not run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
    /// Rendered expectation
    pub expected: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VerificationResult {
    pub fn passed(
        exercise_id: impl Into<String>,
        expected: impl Into<String>,
        actual: Value,
    ) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            passed: true,
            status: VerificationStatus::Passed,
            actual: Some(actual),
            expected: expected.into(),
            message: None,
        }
    }

    pub fn failed(
        exercise_id: impl Into<String>,
        expected: impl Into<String>,
        actual: Value,
        message: impl Into<String>,
    ) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            passed: false,
            status: VerificationStatus::Failed,
            actual: Some(actual),
            expected: expected.into(),
            message: Some(message.into()),
        }
    }

    pub fn error(
        exercise_id: impl Into<String>,
        expected: impl Into<String>,
        actual: Option<Value>,
        error: &EngineError,
    ) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            passed: false,
            status: VerificationStatus::Error,
            actual,
            expected: expected.into(),
            message: Some(error.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == VerificationStatus::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_kinds() {
        assert_eq!(VerificationStatus::Passed.kind(), None);
        assert_eq!(VerificationStatus::Failed.kind(), Some(ErrorKind::AssertionMismatch));
        assert_eq!(VerificationStatus::Error.kind(), Some(ErrorKind::Configuration));
    }

    #[test]
    fn test_error_result_carries_message() {
        let err = EngineError::UnknownOperator("average".to_string());
        let result = VerificationResult::error("phase0.x", "0", None, &err);
        assert!(!result.passed);
        assert!(result.is_error());
        assert_eq!(result.message.as_deref(), Some("CONFIG/unknown operator 'average'"));
    }

    #[test]
    fn test_serialized_status() {
        let result = VerificationResult::passed("phase0.stream04", "3", Value::int(3));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "passed");
        assert_eq!(json["passed"], true);
        assert!(json.get("message").is_none());
    }
}
