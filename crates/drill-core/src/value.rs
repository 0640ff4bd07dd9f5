//! Value Model: the typed values exercises consume and produce
//!
//! Equality is structural. Floats compare by their exact bit pattern, so two
//! sums are equal only when they round to the very same double; no tolerance
//! is ever applied.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Enum(EnumTag),
    Bool(bool),
    /// Present (`Some`) or absent (`None`) result of `first`/`at`
    Optional(Option<Box<Value>>),
    Seq(Vec<Value>),
}

/// A variant of a declared enumeration (ex: `Color::RED`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumTag {
    #[serde(rename = "type")]
    pub type_name: String,
    pub variant: String,
}

/// Tag of a value, used for homogeneity checks and diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementTag {
    Int,
    Float,
    Text,
    Enum(String),
    Bool,
    Optional,
    Seq,
}

impl fmt::Display for ElementTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ElementTag::Int => write!(f, "int"),
            ElementTag::Float => write!(f, "float"),
            ElementTag::Text => write!(f, "text"),
            ElementTag::Enum(name) => write!(f, "enum:{}", name),
            ElementTag::Bool => write!(f, "bool"),
            ElementTag::Optional => write!(f, "optional"),
            ElementTag::Seq => write!(f, "seq"),
        }
    }
}

impl Value {
    pub fn int(value: i64) -> Self {
        Value::Int(value)
    }

    pub fn float(value: f64) -> Self {
        Value::Float(value)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn enum_tag(type_name: impl Into<String>, variant: impl Into<String>) -> Self {
        Value::Enum(EnumTag {
            type_name: type_name.into(),
            variant: variant.into(),
        })
    }

    pub fn bool(value: bool) -> Self {
        Value::Bool(value)
    }

    pub fn present(value: Value) -> Self {
        Value::Optional(Some(Box::new(value)))
    }

    pub fn absent() -> Self {
        Value::Optional(None)
    }

    pub fn seq(items: Vec<Value>) -> Self {
        Value::Seq(items)
    }

    /// Sequence of integers
    pub fn ints(items: impl IntoIterator<Item = i64>) -> Self {
        Value::Seq(items.into_iter().map(Value::Int).collect())
    }

    /// Sequence of texts
    pub fn texts<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Self {
        Value::Seq(items.into_iter().map(|s| Value::Text(s.into())).collect())
    }

    pub fn tag(&self) -> ElementTag {
        match self {
            Value::Int(_) => ElementTag::Int,
            Value::Float(_) => ElementTag::Float,
            Value::Text(_) => ElementTag::Text,
            Value::Enum(tag) => ElementTag::Enum(tag.type_name.clone()),
            Value::Bool(_) => ElementTag::Bool,
            Value::Optional(_) => ElementTag::Optional,
            Value::Seq(_) => ElementTag::Seq,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Parse a literal as written inside step arguments and function
    /// definitions: `42`, `-1.5`, `true`, `"quoted text"`, `Color::RED`.
    /// Any other bare word is text, resolved against `enums` like catalog data.
    pub fn parse_literal(src: &str, enums: &EnumDecls) -> Result<Value, EngineError> {
        let src = src.trim();
        if src.is_empty() {
            return Err(EngineError::MalformedSpec("empty literal".to_string()));
        }

        if let Some(quoted) = unquote(src) {
            return Ok(Value::Text(quoted.to_string()));
        }
        if let Ok(i) = src.parse::<i64>() {
            return Ok(Value::Int(i));
        }
        if looks_numeric(src) {
            if let Ok(x) = src.parse::<f64>() {
                return Ok(Value::Float(x));
            }
        }
        match src {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => enums.text(src),
        }
    }
}

/// Declared enumerations, by type name, variants in declaration order.
///
/// `Type::VARIANT` is an enum literal only when `Type` is declared here; an
/// undeclared type leaves the text as it is, and an unknown variant of a
/// declared type is an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnumDecls(BTreeMap<String, Vec<String>>);

impl EnumDecls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare<S: Into<String>>(
        &mut self,
        type_name: impl Into<String>,
        variants: impl IntoIterator<Item = S>,
    ) {
        self.0
            .insert(type_name.into(), variants.into_iter().map(Into::into).collect());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All variants of a declared enum
    pub fn variants(&self, type_name: &str) -> Result<Vec<Value>, EngineError> {
        let variants = self
            .0
            .get(type_name)
            .ok_or_else(|| EngineError::MalformedSpec(format!("unknown enum '{}'", type_name)))?;
        Ok(variants
            .iter()
            .map(|variant| Value::enum_tag(type_name, variant.as_str()))
            .collect())
    }

    /// Resolve unquoted text: a declared `Type::VARIANT` or plain text
    pub fn text(&self, s: &str) -> Result<Value, EngineError> {
        let declared = split_enum_path(s).and_then(|(type_name, variant)| {
            self.0
                .get(type_name)
                .map(|variants| (type_name, variant, variants))
        });

        match declared {
            None => Ok(Value::text(s)),
            Some((type_name, variant, variants)) => {
                if variants.iter().any(|v| v == variant) {
                    Ok(Value::enum_tag(type_name, variant))
                } else {
                    Err(EngineError::MalformedSpec(format!(
                        "enum {} has no variant {}",
                        type_name, variant
                    )))
                }
            }
        }
    }
}

/// First pair of differing element tags, if the items are not homogeneous
pub fn mixed_tags(items: &[Value]) -> Option<(ElementTag, ElementTag)> {
    let first = items.first()?.tag();
    items
        .iter()
        .map(Value::tag)
        .find(|tag| *tag != first)
        .map(|other| (first, other))
}

/// Splits `Type::VARIANT` when both halves are identifiers
pub fn split_enum_path(src: &str) -> Option<(&str, &str)> {
    let (type_name, variant) = src.split_once("::")?;
    if is_identifier(type_name) && is_identifier(variant) {
        Some((type_name, variant))
    } else {
        None
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn unquote(src: &str) -> Option<&str> {
    for quote in ['"', '\''] {
        if src.len() >= 2 && src.starts_with(quote) && src.ends_with(quote) {
            return Some(&src[1..src.len() - 1]);
        }
    }
    None
}

fn looks_numeric(src: &str) -> bool {
    src.chars()
        .next()
        .map(|c| c.is_ascii_digit() || c == '-' || c == '+' || c == '.')
        .unwrap_or(false)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Optional(a), Value::Optional(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Int(i) => i.hash(state),
            Value::Float(x) => x.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
            Value::Enum(tag) => tag.hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Optional(inner) => inner.hash(state),
            Value::Seq(items) => items.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Enum(tag) => write!(f, "{}::{}", tag.type_name, tag.variant),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Optional(Some(inner)) => write!(f, "Some({})", inner),
            Value::Optional(None) => write!(f, "None"),
            Value::Seq(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Seq(items)
    }
}
