//! Pipeline Evaluator: applies steps left to right over an input sequence
//!
//! Every function id is resolved before the first element is touched, so an
//! unknown id fails even on an empty input and no partial result ever
//! escapes: the pipeline either yields one value or one error.

use crate::error::EngineError;
use crate::registry::{FunctionRegistry, OperatorFn, PredicateFn, TransformFn};
use crate::step::PipelineStep;
use crate::value::{mixed_tags, Value};
use std::collections::HashSet;
use tracing::debug;

/// A step with its function ids resolved against a registry
enum ResolvedStep<'s> {
    Filter(PredicateFn),
    Map(TransformFn),
    Distinct,
    Skip(usize),
    Limit(usize),
    Reduce(OperatorFn, &'s Value),
    Count,
    Sum,
    First,
    At(usize),
    AnyMatch(PredicateFn),
    AllMatch(PredicateFn),
    NoneMatch(PredicateFn),
}

/// Intermediate state between steps
enum Stream {
    Seq(Vec<Value>),
    Scalar(Value),
}

pub struct PipelineEvaluator<'r> {
    registry: &'r FunctionRegistry,
}

impl<'r> PipelineEvaluator<'r> {
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self { registry }
    }

    /// Evaluator over the built-in registry
    pub fn builtin() -> PipelineEvaluator<'static> {
        PipelineEvaluator::new(FunctionRegistry::builtin())
    }

    /// Run `steps` over `input`.
    ///
    /// Unless `mixed` is set, the input and every mapped sequence must be
    /// homogeneous in element tag.
    pub fn evaluate(
        &self,
        input: &[Value],
        steps: &[PipelineStep],
        mixed: bool,
    ) -> Result<Value, EngineError> {
        let resolved = steps
            .iter()
            .map(|step| self.resolve(step))
            .collect::<Result<Vec<_>, _>>()?;

        if !mixed {
            check_homogeneous("input", input)?;
        }

        let mut current = Stream::Seq(input.to_vec());

        for (step, resolved) in steps.iter().zip(&resolved) {
            let items = match current {
                Stream::Seq(items) => items,
                Stream::Scalar(value) => {
                    return Err(EngineError::NotASequence {
                        step: step.to_string(),
                        found: value.tag().to_string(),
                    })
                }
            };

            debug!(step = %step, len = items.len(), "applying step");
            current = apply(resolved, items)?;

            if let (Stream::Seq(items), PipelineStep::Map(_), false) = (&current, step, mixed) {
                check_homogeneous(&step.to_string(), items)?;
            }
        }

        Ok(match current {
            Stream::Seq(items) => Value::Seq(items),
            Stream::Scalar(value) => value,
        })
    }

    fn resolve<'s>(&self, step: &'s PipelineStep) -> Result<ResolvedStep<'s>, EngineError> {
        Ok(match step {
            PipelineStep::Filter(id) => ResolvedStep::Filter(self.registry.predicate(id)?),
            PipelineStep::Map(id) => ResolvedStep::Map(self.registry.transform(id)?),
            PipelineStep::Distinct => ResolvedStep::Distinct,
            PipelineStep::Skip(n) => ResolvedStep::Skip(*n),
            PipelineStep::Limit(n) => ResolvedStep::Limit(*n),
            PipelineStep::Reduce { operator, identity } => {
                ResolvedStep::Reduce(self.registry.operator(operator)?, identity)
            }
            PipelineStep::Count => ResolvedStep::Count,
            PipelineStep::Sum => ResolvedStep::Sum,
            PipelineStep::First => ResolvedStep::First,
            PipelineStep::At(n) => ResolvedStep::At(*n),
            PipelineStep::AnyMatch(id) => ResolvedStep::AnyMatch(self.registry.predicate(id)?),
            PipelineStep::AllMatch(id) => ResolvedStep::AllMatch(self.registry.predicate(id)?),
            PipelineStep::NoneMatch(id) => ResolvedStep::NoneMatch(self.registry.predicate(id)?),
        })
    }
}

fn apply(step: &ResolvedStep<'_>, items: Vec<Value>) -> Result<Stream, EngineError> {
    let stream = match step {
        ResolvedStep::Filter(predicate) => {
            let mut kept = Vec::with_capacity(items.len());
            for item in items {
                if predicate(&item)? {
                    kept.push(item);
                }
            }
            Stream::Seq(kept)
        }
        ResolvedStep::Map(transform) => Stream::Seq(
            items
                .iter()
                .map(|item| transform(item))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        ResolvedStep::Distinct => {
            let mut seen = HashSet::with_capacity(items.len());
            Stream::Seq(items.into_iter().filter(|item| seen.insert(item.clone())).collect())
        }
        ResolvedStep::Skip(n) => Stream::Seq(items.into_iter().skip(*n).collect()),
        ResolvedStep::Limit(n) => Stream::Seq(items.into_iter().take(*n).collect()),
        ResolvedStep::Reduce(operator, identity) => {
            let mut acc = (*identity).clone();
            for item in &items {
                acc = operator(&acc, item)?;
            }
            Stream::Scalar(acc)
        }
        ResolvedStep::Count => Stream::Scalar(Value::Int(items.len() as i64)),
        ResolvedStep::Sum => Stream::Scalar(sum(&items)?),
        ResolvedStep::First => Stream::Scalar(optional(items.into_iter().next())),
        ResolvedStep::At(n) => Stream::Scalar(optional(items.into_iter().nth(*n))),
        ResolvedStep::AnyMatch(predicate) => {
            let mut found = false;
            for item in &items {
                if predicate(item)? {
                    found = true;
                    break;
                }
            }
            Stream::Scalar(Value::Bool(found))
        }
        ResolvedStep::AllMatch(predicate) => {
            let mut all = true;
            for item in &items {
                if !predicate(item)? {
                    all = false;
                    break;
                }
            }
            Stream::Scalar(Value::Bool(all))
        }
        ResolvedStep::NoneMatch(predicate) => {
            let mut none = true;
            for item in &items {
                if predicate(item)? {
                    none = false;
                    break;
                }
            }
            Stream::Scalar(Value::Bool(none))
        }
    };

    Ok(stream)
}

fn optional(item: Option<Value>) -> Value {
    Value::Optional(item.map(Box::new))
}

/// Sum of an integer or float sequence. An empty sequence sums to `0`.
///
/// Integer sums fail on overflow instead of wrapping. Float sums use
/// compensated summation, as the stream library being taught does, so that
/// e.g. three thirds add up to exactly `1.0`.
pub fn sum(items: &[Value]) -> Result<Value, EngineError> {
    match items.first() {
        None => Ok(Value::Int(0)),
        Some(Value::Int(_)) => {
            let mut total: i64 = 0;
            for item in items {
                let i = item
                    .as_int()
                    .ok_or_else(|| EngineError::mismatch("sum", "int", item))?;
                total = total
                    .checked_add(i)
                    .ok_or_else(|| EngineError::Overflow("sum".to_string()))?;
            }
            Ok(Value::Int(total))
        }
        Some(Value::Float(_)) => {
            let mut total = 0.0_f64;
            let mut compensation = 0.0_f64;
            let mut simple = 0.0_f64;
            for item in items {
                let x = item
                    .as_float()
                    .ok_or_else(|| EngineError::mismatch("sum", "float", item))?;
                simple += x;
                let y = x - compensation;
                let t = total + y;
                compensation = (t - total) - y;
                total = t;
            }
            let result = total - compensation;
            // Compensation turns overflow to infinity into NaN; the plain sum keeps the sign.
            if result.is_nan() && simple.is_infinite() {
                Ok(Value::Float(simple))
            } else {
                Ok(Value::Float(result))
            }
        }
        Some(other) => Err(EngineError::mismatch("sum", "int or float", other)),
    }
}

fn check_homogeneous(context: &str, items: &[Value]) -> Result<(), EngineError> {
    match mixed_tags(items) {
        None => Ok(()),
        Some((first, other)) => Err(EngineError::TypeMismatch {
            context: context.to_string(),
            expected: format!("only {} elements", first),
            found: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: Value, steps: &[&str]) -> Result<Value, EngineError> {
        let steps: Vec<PipelineStep> = steps.iter().map(|s| s.parse().unwrap()).collect();
        let items = input.as_seq().unwrap().to_vec();
        PipelineEvaluator::builtin().evaluate(&items, &steps, false)
    }

    #[test]
    fn test_distinct_count() {
        let result = run(Value::ints([0, 1, 1, 1, 2, 2, 2]), &["distinct", "count"]).unwrap();
        assert_eq!(result, Value::int(3));

        let words = Value::texts(["taco", "taco", "taco", "sushi"]);
        assert_eq!(run(words, &["distinct", "count"]).unwrap(), Value::int(2));
    }

    #[test]
    fn test_reduce_sum_of_range() {
        let result = run(Value::ints(1..=100), &["reduce(sum, 0)"]).unwrap();
        assert_eq!(result, Value::int(5050));
    }

    #[test]
    fn test_reduce_identity_on_empty() {
        assert_eq!(run(Value::ints([]), &["reduce(sum, 0)"]).unwrap(), Value::int(0));
        assert_eq!(run(Value::ints([]), &["sum"]).unwrap(), Value::int(0));
        assert_eq!(run(Value::ints([]), &["reduce(count, 0)"]).unwrap(), Value::int(0));
    }

    #[test]
    fn test_filter_preserves_order() {
        let result = run(Value::ints(0..=10), &["filter(is_even)"]).unwrap();
        assert_eq!(result, Value::ints([0, 2, 4, 6, 8, 10]));
    }

    #[test]
    fn test_limit_and_skip_partition() {
        let items: Vec<i64> = vec![5, 3, 3, 9, 0, 1, 7];
        for n in 0..=items.len() {
            let limit = format!("limit({})", n);
            let skip = format!("skip({})", n);
            let head = run(Value::ints(items.clone()), &[limit.as_str()]).unwrap();
            let tail = run(Value::ints(items.clone()), &[skip.as_str()]).unwrap();
            let mut joined = head.as_seq().unwrap().to_vec();
            joined.extend_from_slice(tail.as_seq().unwrap());
            assert_eq!(Value::Seq(joined), Value::ints(items.clone()), "n = {}", n);
        }
    }

    #[test]
    fn test_skip_and_limit_past_the_end() {
        assert_eq!(run(Value::ints(0..3), &["skip(10)"]).unwrap(), Value::ints([]));
        assert_eq!(run(Value::ints(0..3), &["limit(10)"]).unwrap(), Value::ints(0..3));
        assert_eq!(run(Value::ints(0..10), &["skip(8)", "sum"]).unwrap(), Value::int(17));
    }

    #[test]
    fn test_distinct_is_idempotent() {
        let input = Value::texts(["b", "a", "b", "c", "a"]);
        let once = run(input.clone(), &["distinct"]).unwrap();
        let twice = run(input, &["distinct", "distinct"]).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, Value::texts(["b", "a", "c"]));
    }

    #[test]
    fn test_three_thirds_sum_to_one() {
        let third = 1.0 / 3.0;
        let items = vec![Value::float(third); 3];
        assert_eq!(sum(&items).unwrap(), Value::float(1.0));
    }

    #[test]
    fn test_sum_overflow_and_mixed_types() {
        assert!(matches!(
            run(Value::ints([i64::MAX, 1]), &["sum"]),
            Err(EngineError::Overflow(_))
        ));
        assert!(matches!(
            sum(&[Value::int(1), Value::float(1.0)]),
            Err(EngineError::TypeMismatch { .. })
        ));
        assert!(matches!(sum(&[Value::text("a")]), Err(EngineError::TypeMismatch { .. })));
    }

    #[test]
    fn test_reduce_sum_identity_must_match_elements() {
        let floats = Value::seq(vec![Value::float(1.5), Value::float(1.5)]);
        assert_eq!(run(floats.clone(), &["reduce(sum, 0.0)"]).unwrap(), Value::float(3.0));
        assert!(matches!(
            run(floats, &["reduce(sum, 0)"]),
            Err(EngineError::TypeMismatch { .. })
        ));
        assert!(matches!(
            run(Value::ints([1, 2]), &["reduce(sum, 0.0)"]),
            Err(EngineError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_operator_fails_even_on_empty_input() {
        let result = run(Value::ints([]), &["reduce(average, 0)"]);
        assert_eq!(result, Err(EngineError::UnknownOperator("average".to_string())));
        let result = run(Value::ints([]), &["filter(is_prime)", "count"]);
        assert_eq!(result, Err(EngineError::UnknownPredicate("is_prime".to_string())));
    }

    #[test]
    fn test_step_after_terminal_fails() {
        let result = run(Value::ints([1, 2]), &["count", "limit(1)"]);
        assert!(matches!(result, Err(EngineError::NotASequence { .. })));
    }

    #[test]
    fn test_first_and_at() {
        assert_eq!(run(Value::ints([4, 5]), &["first"]).unwrap(), Value::present(Value::int(4)));
        assert_eq!(run(Value::ints([]), &["first"]).unwrap(), Value::absent());
        assert_eq!(run(Value::ints(0..10), &["at(9)"]).unwrap(), Value::present(Value::int(9)));
        assert_eq!(run(Value::ints(0..10), &["at(10)"]).unwrap(), Value::absent());
    }

    #[test]
    fn test_match_steps() {
        assert_eq!(run(Value::ints([1, 3]), &["any_match(is_even)"]).unwrap(), Value::bool(false));
        assert_eq!(run(Value::ints([2, 4]), &["all_match(is_even)"]).unwrap(), Value::bool(true));
        assert_eq!(run(Value::ints([]), &["all_match(is_even)"]).unwrap(), Value::bool(true));
        assert_eq!(run(Value::ints([]), &["none_match(is_even)"]).unwrap(), Value::bool(true));
    }

    #[test]
    fn test_map_to_parity() {
        let result = run(Value::ints(0..4), &["map(parity)"]).unwrap();
        assert_eq!(result, Value::texts(["even", "odd", "even", "odd"]));
    }

    #[test]
    fn test_heterogeneous_input_requires_mixed() {
        let input = vec![Value::int(1), Value::text("one")];
        let steps = vec![PipelineStep::Count];
        let evaluator = PipelineEvaluator::builtin();
        assert!(matches!(
            evaluator.evaluate(&input, &steps, false),
            Err(EngineError::TypeMismatch { .. })
        ));
        assert_eq!(evaluator.evaluate(&input, &steps, true).unwrap(), Value::int(2));
    }

    #[test]
    fn test_type_error_aborts_whole_pipeline() {
        let result = run(Value::texts(["a", "b"]), &["filter(is_even)", "count"]);
        assert!(matches!(result, Err(EngineError::TypeMismatch { .. })));
    }
}
