//! Function Registry: named pure functions referenced by pipeline steps
//!
//! Exercises never embed code. A step names a predicate, transform or
//! operator, and the evaluator resolves that name here. The built-in
//! registry is initialized once and is immutable afterwards; catalogs layer
//! their own derived definitions over a clone of it.
//!
//! Derived definitions use a small combinator syntax:
//!
//! ```text
//! predicates: eq(lit)  ne(lit)  lt(lit)  gt(lit)  not(pred)  <pred>
//! transforms: constant(lit)  replace(from, to)  add(n)  then(t1, t2)  <transform>
//! ```
//!
//! Literals resolve against the catalog's declared enums. A definition may
//! not reuse the id of a built-in function.

use crate::error::EngineError;
use crate::step::{parse_call, split_args};
use crate::value::{EnumDecls, Value};
use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type PredicateFn = Arc<dyn Fn(&Value) -> Result<bool, EngineError> + Send + Sync>;
pub type TransformFn = Arc<dyn Fn(&Value) -> Result<Value, EngineError> + Send + Sync>;
pub type OperatorFn = Arc<dyn Fn(&Value, &Value) -> Result<Value, EngineError> + Send + Sync>;

/// The three kinds of registered functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Predicate,
    Transform,
    Operator,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Namespace::Predicate => write!(f, "predicate"),
            Namespace::Transform => write!(f, "transform"),
            Namespace::Operator => write!(f, "operator"),
        }
    }
}

static BUILTIN: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::with_builtins);

#[derive(Clone, Default)]
pub struct FunctionRegistry {
    predicates: HashMap<String, PredicateFn>,
    transforms: HashMap<String, TransformFn>,
    operators: HashMap<String, OperatorFn>,
    /// Derived definitions that failed to build, reported on lookup
    broken: HashMap<(Namespace, String), EngineError>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("predicates", &self.ids(Namespace::Predicate))
            .field("transforms", &self.ids(Namespace::Transform))
            .field("operators", &self.ids(Namespace::Operator))
            .field("broken", &self.broken.len())
            .finish()
    }
}

impl FunctionRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared built-in registry
    pub fn builtin() -> &'static FunctionRegistry {
        &BUILTIN
    }

    /// A fresh registry holding every built-in function
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins::register(&mut registry);
        registry
    }

    pub fn register_predicate<F>(&mut self, id: impl Into<String>, f: F)
    where
        F: Fn(&Value) -> Result<bool, EngineError> + Send + Sync + 'static,
    {
        let id = id.into();
        self.broken.remove(&(Namespace::Predicate, id.clone()));
        self.predicates.insert(id, Arc::new(f));
    }

    pub fn register_transform<F>(&mut self, id: impl Into<String>, f: F)
    where
        F: Fn(&Value) -> Result<Value, EngineError> + Send + Sync + 'static,
    {
        let id = id.into();
        self.broken.remove(&(Namespace::Transform, id.clone()));
        self.transforms.insert(id, Arc::new(f));
    }

    pub fn register_operator<F>(&mut self, id: impl Into<String>, f: F)
    where
        F: Fn(&Value, &Value) -> Result<Value, EngineError> + Send + Sync + 'static,
    {
        let id = id.into();
        self.broken.remove(&(Namespace::Operator, id.clone()));
        self.operators.insert(id, Arc::new(f));
    }

    /// Resolve a predicate id
    pub fn predicate(&self, id: &str) -> Result<PredicateFn, EngineError> {
        if let Some(err) = self.broken.get(&(Namespace::Predicate, id.to_string())) {
            return Err(err.clone());
        }
        self.predicates
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownPredicate(id.to_string()))
    }

    /// Resolve a transform id
    pub fn transform(&self, id: &str) -> Result<TransformFn, EngineError> {
        if let Some(err) = self.broken.get(&(Namespace::Transform, id.to_string())) {
            return Err(err.clone());
        }
        self.transforms
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownTransform(id.to_string()))
    }

    /// Resolve an operator id
    pub fn operator(&self, id: &str) -> Result<OperatorFn, EngineError> {
        if let Some(err) = self.broken.get(&(Namespace::Operator, id.to_string())) {
            return Err(err.clone());
        }
        self.operators
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownOperator(id.to_string()))
    }

    /// Sorted ids registered in a namespace
    pub fn ids(&self, namespace: Namespace) -> Vec<&str> {
        let mut ids: Vec<&str> = match namespace {
            Namespace::Predicate => self.predicates.keys().map(String::as_str).collect(),
            Namespace::Transform => self.transforms.keys().map(String::as_str).collect(),
            Namespace::Operator => self.operators.keys().map(String::as_str).collect(),
        };
        ids.sort_unstable();
        ids
    }

    /// Define a predicate from combinator syntax (ex: `eq(Color::BLUE)`).
    ///
    /// On failure the id is remembered as broken so that every exercise
    /// referring to it fails with the same error.
    pub fn define_predicate(
        &mut self,
        id: &str,
        definition: &str,
        enums: &EnumDecls,
    ) -> Result<(), EngineError> {
        let built = not_builtin(Namespace::Predicate, id)
            .and_then(|_| self.build_predicate(definition, enums));
        match built {
            Ok(f) => {
                self.broken.remove(&(Namespace::Predicate, id.to_string()));
                self.predicates.insert(id.to_string(), f);
                Ok(())
            }
            Err(err) => {
                let err = definition_error(Namespace::Predicate, id, err);
                self.predicates.remove(id);
                self.broken.insert((Namespace::Predicate, id.to_string()), err.clone());
                Err(err)
            }
        }
    }

    /// Define a transform from combinator syntax (ex: `replace(Color::GREEN, Color::YELLOW)`)
    pub fn define_transform(
        &mut self,
        id: &str,
        definition: &str,
        enums: &EnumDecls,
    ) -> Result<(), EngineError> {
        let built = not_builtin(Namespace::Transform, id)
            .and_then(|_| self.build_transform(definition, enums));
        match built {
            Ok(f) => {
                self.broken.remove(&(Namespace::Transform, id.to_string()));
                self.transforms.insert(id.to_string(), f);
                Ok(())
            }
            Err(err) => {
                let err = definition_error(Namespace::Transform, id, err);
                self.transforms.remove(id);
                self.broken.insert((Namespace::Transform, id.to_string()), err.clone());
                Err(err)
            }
        }
    }

    fn build_predicate(
        &self,
        definition: &str,
        enums: &EnumDecls,
    ) -> Result<PredicateFn, EngineError> {
        let (name, args) = parse_call(definition)?;
        let args = args.map(split_args).unwrap_or_default();

        let f: PredicateFn = match (name, args.as_slice()) {
            ("eq", [lit]) => {
                let expected = Value::parse_literal(lit, enums)?;
                predicate_fn(move |v: &Value| Ok(*v == expected))
            }
            ("ne", [lit]) => {
                let expected = Value::parse_literal(lit, enums)?;
                predicate_fn(move |v: &Value| Ok(*v != expected))
            }
            ("lt", [lit]) => {
                let bound = Value::parse_literal(lit, enums)?;
                predicate_fn(move |v: &Value| Ok(compare("lt", v, &bound)? == Ordering::Less))
            }
            ("gt", [lit]) => {
                let bound = Value::parse_literal(lit, enums)?;
                predicate_fn(move |v: &Value| Ok(compare("gt", v, &bound)? == Ordering::Greater))
            }
            ("not", [inner]) => {
                let inner = self.build_predicate(inner, enums)?;
                predicate_fn(move |v: &Value| Ok(!inner(v)?))
            }
            (id, []) => self.predicate(id)?,
            _ => {
                return Err(EngineError::MalformedSpec(format!(
                    "invalid predicate definition '{}'",
                    definition.trim()
                )))
            }
        };

        Ok(f)
    }

    fn build_transform(
        &self,
        definition: &str,
        enums: &EnumDecls,
    ) -> Result<TransformFn, EngineError> {
        let (name, args) = parse_call(definition)?;
        let args = args.map(split_args).unwrap_or_default();

        let f: TransformFn = match (name, args.as_slice()) {
            ("constant", [lit]) => {
                let value = Value::parse_literal(lit, enums)?;
                transform_fn(move |_: &Value| Ok(value.clone()))
            }
            ("replace", [from, to]) => {
                let from = Value::parse_literal(from, enums)?;
                let to = Value::parse_literal(to, enums)?;
                transform_fn(move |v: &Value| Ok(if *v == from { to.clone() } else { v.clone() }))
            }
            ("add", [lit]) => {
                let amount = Value::parse_literal(lit, enums)?;
                transform_fn(move |v: &Value| {
                    builtins::add("add", v, &builtins::widen_like(&amount, v))
                })
            }
            ("then", [first, second]) => {
                let first = self.build_transform(first, enums)?;
                let second = self.build_transform(second, enums)?;
                transform_fn(move |v: &Value| second(&first(v)?))
            }
            (id, []) => self.transform(id)?,
            _ => {
                return Err(EngineError::MalformedSpec(format!(
                    "invalid transform definition '{}'",
                    definition.trim()
                )))
            }
        };

        Ok(f)
    }
}

fn predicate_fn<F>(f: F) -> PredicateFn
where
    F: Fn(&Value) -> Result<bool, EngineError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn transform_fn<F>(f: F) -> TransformFn
where
    F: Fn(&Value) -> Result<Value, EngineError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn definition_error(namespace: Namespace, id: &str, cause: EngineError) -> EngineError {
    EngineError::MalformedSpec(format!(
        "{} '{}' is not defined correctly: {}",
        namespace, id, cause
    ))
}

fn not_builtin(namespace: Namespace, id: &str) -> Result<(), EngineError> {
    let builtin = FunctionRegistry::builtin();
    let taken = match namespace {
        Namespace::Predicate => builtin.predicates.contains_key(id),
        Namespace::Transform => builtin.transforms.contains_key(id),
        Namespace::Operator => builtin.operators.contains_key(id),
    };
    if taken {
        Err(EngineError::MalformedSpec(format!(
            "'{}' is a built-in {} and cannot be redefined",
            id, namespace
        )))
    } else {
        Ok(())
    }
}

/// Orders two values of the same numeric or text tag
pub fn compare(context: &str, a: &Value, b: &Value) -> Result<Ordering, EngineError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::Float(x), Value::Float(y)) => Ok(x.total_cmp(y)),
        (Value::Text(x), Value::Text(y)) => Ok(x.cmp(y)),
        (Value::Int(_), other) | (Value::Float(_), other) | (Value::Text(_), other) => {
            Err(EngineError::mismatch(context, a.tag().to_string(), other))
        }
        (other, _) => Err(EngineError::mismatch(context, "int, float or text", other)),
    }
}

mod builtins {
    use super::*;

    pub(super) fn register(registry: &mut FunctionRegistry) {
        // Predicates
        registry.register_predicate("is_even", |v: &Value| Ok(int_arg("is_even", v)? % 2 == 0));
        registry.register_predicate("is_odd", |v: &Value| Ok(int_arg("is_odd", v)? % 2 != 0));
        registry.register_predicate("is_short_string", |v: &Value| {
            Ok(text_arg("is_short_string", v)?.chars().count() < SHORT_STRING_LEN)
        });
        registry.register_predicate("is_long_string", |v: &Value| {
            Ok(text_arg("is_long_string", v)?.chars().count() >= SHORT_STRING_LEN)
        });
        registry.register_predicate("is_positive", |v: &Value| Ok(signum("is_positive", v)? > 0));
        registry.register_predicate("is_negative", |v: &Value| Ok(signum("is_negative", v)? < 0));
        registry.register_predicate("is_zero", |v: &Value| Ok(signum("is_zero", v)? == 0));
        registry.register_predicate("always", |_: &Value| Ok(true));
        registry.register_predicate("never", |_: &Value| Ok(false));

        // Transforms
        registry.register_transform("identity", |v: &Value| Ok(v.clone()));
        registry.register_transform("increment", |v: &Value| {
            add("increment", v, &widen_like(&Value::Int(1), v))
        });
        registry.register_transform("decrement", |v: &Value| {
            add("decrement", v, &widen_like(&Value::Int(-1), v))
        });
        registry.register_transform("double", |v: &Value| add("double", v, v));
        registry.register_transform("square", |v: &Value| multiply("square", v, v));
        registry.register_transform("negate", |v: &Value| match v {
            Value::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| EngineError::Overflow("negate".to_string())),
            Value::Float(x) => Ok(Value::Float(-x)),
            other => Err(EngineError::mismatch("negate", "int or float", other)),
        });
        registry.register_transform("to_string", |v: &Value| {
            Ok(Value::Text(match v {
                Value::Text(s) => s.clone(),
                Value::Enum(tag) => tag.variant.clone(),
                Value::Int(i) => i.to_string(),
                Value::Float(x) => format!("{:?}", x),
                Value::Bool(b) => b.to_string(),
                other => return Err(EngineError::mismatch("to_string", "scalar", other)),
            }))
        });
        registry.register_transform("parity", |v: &Value| {
            let label = if int_arg("parity", v)? % 2 == 0 { "even" } else { "odd" };
            Ok(Value::text(label))
        });
        registry.register_transform("length", |v: &Value| match v {
            Value::Text(s) => Ok(Value::Int(s.chars().count() as i64)),
            Value::Seq(items) => Ok(Value::Int(items.len() as i64)),
            other => Err(EngineError::mismatch("length", "text or seq", other)),
        });
        registry.register_transform("to_upper", |v: &Value| {
            Ok(Value::text(text_arg("to_upper", v)?.to_uppercase()))
        });
        registry.register_transform("to_lower", |v: &Value| {
            Ok(Value::text(text_arg("to_lower", v)?.to_lowercase()))
        });
        registry.register_transform("to_float", |v: &Value| match v {
            Value::Int(i) => Ok(Value::Float(*i as f64)),
            Value::Float(x) => Ok(Value::Float(*x)),
            other => Err(EngineError::mismatch("to_float", "int or float", other)),
        });

        // Operators
        registry.register_operator("sum", |acc: &Value, v: &Value| add("sum", acc, v));
        registry.register_operator("count", |acc: &Value, _: &Value| {
            add("count", acc, &widen_like(&Value::Int(1), acc))
        });
        registry.register_operator("product", |acc: &Value, v: &Value| multiply("product", acc, v));
        registry.register_operator("min", |acc: &Value, v: &Value| {
            let smaller = compare("min", v, acc)? == Ordering::Less;
            Ok(if smaller { v.clone() } else { acc.clone() })
        });
        registry.register_operator("max", |acc: &Value, v: &Value| {
            let larger = compare("max", v, acc)? == Ordering::Greater;
            Ok(if larger { v.clone() } else { acc.clone() })
        });
        registry.register_operator("concat", |acc: &Value, v: &Value| {
            let mut joined = text_arg("concat", acc)?.to_string();
            joined.push_str(text_arg("concat", v)?);
            Ok(Value::Text(joined))
        });
    }

    /// Strings shorter than this many characters are "short"
    const SHORT_STRING_LEN: usize = 8;

    fn int_arg(context: &str, v: &Value) -> Result<i64, EngineError> {
        v.as_int().ok_or_else(|| EngineError::mismatch(context, "int", v))
    }

    fn text_arg<'v>(context: &str, v: &'v Value) -> Result<&'v str, EngineError> {
        v.as_text().ok_or_else(|| EngineError::mismatch(context, "text", v))
    }

    fn signum(context: &str, v: &Value) -> Result<i8, EngineError> {
        match v {
            Value::Int(i) => Ok(i.signum() as i8),
            Value::Float(x) if *x > 0.0 => Ok(1),
            Value::Float(x) if *x < 0.0 => Ok(-1),
            Value::Float(_) => Ok(0),
            other => Err(EngineError::mismatch(context, "int or float", other)),
        }
    }

    /// An integer constant written in a definition takes the element's float
    /// type; elements themselves are never widened.
    pub(super) fn widen_like(amount: &Value, element: &Value) -> Value {
        match (amount, element) {
            (Value::Int(n), Value::Float(_)) => Value::Float(*n as f64),
            _ => amount.clone(),
        }
    }

    /// Int and Float never mix, in either operand order
    pub(super) fn add(context: &str, a: &Value, b: &Value) -> Result<Value, EngineError> {
        match (a, b) {
            (Value::Int(x), Value::Int(y)) => x
                .checked_add(*y)
                .map(Value::Int)
                .ok_or_else(|| EngineError::Overflow(context.to_string())),
            (Value::Float(x), Value::Float(y)) => Ok(Value::Float(x + y)),
            (Value::Int(_), other) => Err(EngineError::mismatch(context, "int", other)),
            (Value::Float(_), other) => Err(EngineError::mismatch(context, "float", other)),
            (other, _) => Err(EngineError::mismatch(context, "int or float", other)),
        }
    }

    fn multiply(context: &str, a: &Value, b: &Value) -> Result<Value, EngineError> {
        match (a, b) {
            (Value::Int(x), Value::Int(y)) => x
                .checked_mul(*y)
                .map(Value::Int)
                .ok_or_else(|| EngineError::Overflow(context.to_string())),
            (Value::Float(x), Value::Float(y)) => Ok(Value::Float(x * y)),
            (Value::Int(_), other) => Err(EngineError::mismatch(context, "int", other)),
            (Value::Float(_), other) => Err(EngineError::mismatch(context, "float", other)),
            (other, _) => Err(EngineError::mismatch(context, "int or float", other)),
        }
    }
}
