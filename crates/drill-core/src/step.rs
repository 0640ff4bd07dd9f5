//! Pipeline Steps: one transformation applied to a sequence of values
//!
//! Steps have a textual form used by catalogs, e.g. `filter(is_even)`,
//! `skip(3)` or `reduce(sum, 0)`. `Display` and `FromStr` agree on it.
//! `FromStr` knows no enums; catalogs parse with [`PipelineStep::parse_with`]
//! so that a `reduce` identity like `Color::RED` resolves to the declared enum.

use crate::error::EngineError;
use crate::value::{EnumDecls, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PipelineStep {
    /// Keep elements satisfying the named predicate
    Filter(String),
    /// Apply the named transform to every element
    Map(String),
    /// Drop structural duplicates, keeping first occurrences
    Distinct,
    Skip(usize),
    Limit(usize),
    /// Left fold with the named operator, starting from `identity`
    Reduce { operator: String, identity: Value },
    Count,
    Sum,
    First,
    At(usize),
    AnyMatch(String),
    AllMatch(String),
    NoneMatch(String),
}

impl PipelineStep {
    pub fn filter(predicate: impl Into<String>) -> Self {
        PipelineStep::Filter(predicate.into())
    }

    pub fn map(transform: impl Into<String>) -> Self {
        PipelineStep::Map(transform.into())
    }

    pub fn reduce(operator: impl Into<String>, identity: Value) -> Self {
        PipelineStep::Reduce {
            operator: operator.into(),
            identity,
        }
    }

    /// Step name as written in catalogs
    pub fn name(&self) -> &'static str {
        match self {
            PipelineStep::Filter(_) => "filter",
            PipelineStep::Map(_) => "map",
            PipelineStep::Distinct => "distinct",
            PipelineStep::Skip(_) => "skip",
            PipelineStep::Limit(_) => "limit",
            PipelineStep::Reduce { .. } => "reduce",
            PipelineStep::Count => "count",
            PipelineStep::Sum => "sum",
            PipelineStep::First => "first",
            PipelineStep::At(_) => "at",
            PipelineStep::AnyMatch(_) => "any_match",
            PipelineStep::AllMatch(_) => "all_match",
            PipelineStep::NoneMatch(_) => "none_match",
        }
    }

    /// Whether the step collapses the sequence into a single value
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            PipelineStep::Filter(_)
                | PipelineStep::Map(_)
                | PipelineStep::Distinct
                | PipelineStep::Skip(_)
                | PipelineStep::Limit(_)
        )
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PipelineStep::Filter(id)
            | PipelineStep::Map(id)
            | PipelineStep::AnyMatch(id)
            | PipelineStep::AllMatch(id)
            | PipelineStep::NoneMatch(id) => write!(f, "{}({})", self.name(), id),
            PipelineStep::Skip(n) | PipelineStep::Limit(n) | PipelineStep::At(n) => {
                write!(f, "{}({})", self.name(), n)
            }
            PipelineStep::Reduce { operator, identity } => {
                write!(f, "reduce({}, {})", operator, identity)
            }
            PipelineStep::Distinct
            | PipelineStep::Count
            | PipelineStep::Sum
            | PipelineStep::First => write!(f, "{}", self.name()),
        }
    }
}

impl FromStr for PipelineStep {
    type Err = EngineError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        Self::parse_with(src, &EnumDecls::new())
    }
}

impl PipelineStep {
    /// Parse a step, resolving literal arguments against declared enums
    pub fn parse_with(src: &str, enums: &EnumDecls) -> Result<Self, EngineError> {
        let (name, args) = parse_call(src)?;
        let args = match args {
            Some(inner) => split_args(inner),
            None => Vec::new(),
        };

        let step = match (name, args.as_slice()) {
            ("distinct", []) => PipelineStep::Distinct,
            ("count", []) => PipelineStep::Count,
            ("sum", []) => PipelineStep::Sum,
            ("first", []) => PipelineStep::First,
            ("filter", [id]) => PipelineStep::Filter(identifier(id)?),
            ("map", [id]) => PipelineStep::Map(identifier(id)?),
            ("any_match", [id]) => PipelineStep::AnyMatch(identifier(id)?),
            ("all_match", [id]) => PipelineStep::AllMatch(identifier(id)?),
            ("none_match", [id]) => PipelineStep::NoneMatch(identifier(id)?),
            ("skip", [n]) => PipelineStep::Skip(count_arg(name, n)?),
            ("limit", [n]) => PipelineStep::Limit(count_arg(name, n)?),
            ("at", [n]) => PipelineStep::At(count_arg(name, n)?),
            ("reduce", [op, identity]) => PipelineStep::Reduce {
                operator: identifier(op)?,
                identity: Value::parse_literal(identity, enums)?,
            },
            _ => {
                return Err(EngineError::MalformedSpec(format!(
                    "invalid step '{}'",
                    src.trim()
                )))
            }
        };

        Ok(step)
    }
}

impl TryFrom<String> for PipelineStep {
    type Error = EngineError;

    fn try_from(src: String) -> Result<Self, Self::Error> {
        src.parse()
    }
}

impl From<PipelineStep> for String {
    fn from(step: PipelineStep) -> Self {
        step.to_string()
    }
}

/// Splits `name(args)` into its name and raw argument text.
/// A bare `name` has no argument list.
pub fn parse_call(src: &str) -> Result<(&str, Option<&str>), EngineError> {
    let src = src.trim();
    match src.find('(') {
        None => Ok((src, None)),
        Some(open) => {
            if !src.ends_with(')') {
                return Err(EngineError::MalformedSpec(format!(
                    "unbalanced parentheses in '{}'",
                    src
                )));
            }
            let name = src[..open].trim();
            Ok((name, Some(&src[open + 1..src.len() - 1])))
        }
    }
}

/// Splits an argument list on top-level commas, honoring quotes and
/// nested parentheses.
pub fn split_args(src: &str) -> Vec<&str> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in src.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                args.push(src[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    let last = src[start..].trim();
    if !last.is_empty() || !args.is_empty() {
        args.push(last);
    }
    args
}

fn identifier(src: &str) -> Result<String, EngineError> {
    let id = src.trim();
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '-');
    if valid {
        Ok(id.to_string())
    } else {
        Err(EngineError::MalformedSpec(format!("invalid function id '{}'", id)))
    }
}

fn count_arg(step: &str, src: &str) -> Result<usize, EngineError> {
    src.trim().parse::<usize>().map_err(|_| {
        EngineError::MalformedSpec(format!(
            "{} expects a non-negative count, got '{}'",
            step,
            src.trim()
        ))
    })
}
