//! Exercise Spec: input fixture, pipeline and expected outcome
use crate::step::PipelineStep;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One verifiable unit of a lesson
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSpec {
    /// Unique id (ex: "phase0.stream04")
    pub id: String,
    /// Short note on what the exercise teaches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson: Option<String>,
    pub input: Vec<Value>,
    /// Allows sequences whose elements carry different tags
    #[serde(default)]
    pub mixed: bool,
    pub steps: Vec<PipelineStep>,
    pub expected: Expectation,
}

/// What the pipeline result must be or satisfy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// Structurally equal to the value
    Equals(Value),
    /// Result is a sequence whose elements all satisfy the predicate
    Every(String),
    /// Result is a sequence with at least one element satisfying the predicate
    Any(String),
    /// Result is a sequence with no element satisfying the predicate
    NoneOf(String),
    /// The predicate holds for the result itself
    Satisfies(String),
    /// The learner has not filled in the expected value yet
    Placeholder,
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expectation::Equals(value) => write!(f, "{}", value),
            Expectation::Every(p) => write!(f, "every element {}", p),
            Expectation::Any(p) => write!(f, "some element {}", p),
            Expectation::NoneOf(p) => write!(f, "no element {}", p),
            Expectation::Satisfies(p) => write!(f, "a result that {}", p),
            Expectation::Placeholder => write!(f, "FIX_ME"),
        }
    }
}

impl ExerciseSpec {
    pub fn new(
        id: impl Into<String>,
        input: Vec<Value>,
        steps: Vec<PipelineStep>,
        expected: Expectation,
    ) -> Self {
        Self {
            id: id.into(),
            lesson: None,
            input,
            mixed: false,
            steps,
            expected,
        }
    }

    pub fn with_lesson(mut self, lesson: impl Into<String>) -> Self {
        self.lesson = Some(lesson.into());
        self
    }

    pub fn allow_mixed(mut self) -> Self {
        self.mixed = true;
        self
    }

    /// Steps joined for display (ex: "distinct → count")
    pub fn pipeline_text(&self) -> String {
        self.steps
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_text() {
        let spec = ExerciseSpec::new(
            "phase0.stream04",
            vec![Value::int(0), Value::int(1)],
            vec![PipelineStep::Distinct, PipelineStep::Count],
            Expectation::Equals(Value::int(2)),
        );
        assert_eq!(spec.pipeline_text(), "distinct → count");
        assert!(!spec.mixed);
    }

    #[test]
    fn test_expectation_display() {
        assert_eq!(Expectation::Equals(Value::int(3)).to_string(), "3");
        assert_eq!(Expectation::Every("is_green".into()).to_string(), "every element is_green");
        assert_eq!(Expectation::Placeholder.to_string(), "FIX_ME");
    }
}
