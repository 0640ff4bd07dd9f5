//! Catalog file format.
//!
//! ```yaml
//! version: "1"
//! enums:
//!   Color: [RED, GREEN, BLUE]
//! fixtures:
//!   lights: ["Color::RED", "Color::BLUE"]
//! functions:
//!   predicates: { is_blue: "eq(Color::BLUE)" }
//! exercises:
//!   - id: phase0.stream04
//!     input: [0, 1, 1, 1, 2, 2, 2]
//!     steps: [distinct, count]
//!     expect: 3
//! ```

use drill_core::{EngineError, EnumDecls, Expectation, Value};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Placeholder the learner replaces with the expected value
pub const PLACEHOLDER: &str = "FIX_ME";

/// Top-level catalog file structure
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFile {
    pub version: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub enums: EnumDecls,
    #[serde(default)]
    pub fixtures: BTreeMap<String, InputDef>,
    #[serde(default)]
    pub functions: FunctionDefs,
    /// Kept raw so that one malformed record does not reject the file
    #[serde(default)]
    pub exercises: Vec<serde_yaml::Value>,
}

/// Derived function definitions, in combinator syntax
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionDefs {
    #[serde(default)]
    pub predicates: BTreeMap<String, String>,
    #[serde(default)]
    pub transforms: BTreeMap<String, String>,
}

/// A single exercise record
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExerciseRecord {
    pub id: String,
    #[serde(default)]
    pub lesson: Option<String>,
    pub input: InputDef,
    #[serde(default)]
    pub mixed: bool,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub expect: Option<Literal>,
    #[serde(default)]
    pub validate: Option<String>,
}

/// Input fixture: a literal list or one of the generator forms
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InputDef {
    List(Vec<Literal>),
    Form(InputForm),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputForm {
    #[serde(default)]
    pub values: Option<Vec<Literal>>,
    /// Half-open integer range `[start, end)`
    #[serde(default)]
    pub range: Option<[i64; 2]>,
    /// Closed integer range `[start, end]`
    #[serde(default)]
    pub range_closed: Option<[i64; 2]>,
    /// UTF-16 code units of a string
    #[serde(default)]
    pub chars: Option<String>,
    /// Name of a catalog fixture
    #[serde(default)]
    pub fixture: Option<String>,
    /// Every variant of a declared enum, in declaration order
    #[serde(default)]
    pub enum_values: Option<String>,
}

/// A literal value as written in YAML
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Literal>),
    Optional(OptionalLiteral),
}

/// `{optional: X}` is a present optional, `{optional: null}` an absent one
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionalLiteral {
    pub optional: Option<Box<Literal>>,
}

impl Literal {
    /// Convert to a value, resolving `Type::VARIANT` text against `enums`
    pub fn to_value(&self, enums: &EnumDecls) -> Result<Value, EngineError> {
        Ok(match self {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::Int(*i),
            Literal::Float(x) => Value::Float(*x),
            Literal::Text(s) => enums.text(s)?,
            Literal::List(items) => Value::Seq(
                items
                    .iter()
                    .map(|item| item.to_value(enums))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Literal::Optional(OptionalLiteral { optional: None }) => Value::absent(),
            Literal::Optional(OptionalLiteral { optional: Some(inner) }) => {
                Value::present(inner.to_value(enums)?)
            }
        })
    }
}

impl InputDef {
    /// Materialize the input sequence
    pub fn values(
        &self,
        enums: &EnumDecls,
        fixtures: &BTreeMap<String, InputDef>,
    ) -> Result<Vec<Value>, EngineError> {
        match self {
            InputDef::List(items) => items.iter().map(|item| item.to_value(enums)).collect(),
            InputDef::Form(form) => form.values(enums, fixtures),
        }
    }
}

impl InputForm {
    fn values(
        &self,
        enums: &EnumDecls,
        fixtures: &BTreeMap<String, InputDef>,
    ) -> Result<Vec<Value>, EngineError> {
        let forms = [
            self.values.is_some(),
            self.range.is_some(),
            self.range_closed.is_some(),
            self.chars.is_some(),
            self.fixture.is_some(),
            self.enum_values.is_some(),
        ];
        if forms.iter().filter(|set| **set).count() != 1 {
            return Err(EngineError::MalformedSpec(format!(
                "input needs exactly one of {}",
                "values, range, range_closed, chars, fixture, enum_values"
            )));
        }

        if let Some(items) = &self.values {
            return items.iter().map(|item| item.to_value(enums)).collect();
        }
        if let Some([start, end]) = self.range {
            return Ok((start..end).map(Value::Int).collect());
        }
        if let Some([start, end]) = self.range_closed {
            return Ok((start..=end).map(Value::Int).collect());
        }
        if let Some(text) = &self.chars {
            return Ok(text.encode_utf16().map(|unit| Value::Int(unit as i64)).collect());
        }
        if let Some(type_name) = &self.enum_values {
            return enums.variants(type_name);
        }

        let name = self.fixture.as_deref().unwrap_or_default();
        match fixtures.get(name) {
            // fixtures may not refer to other fixtures
            Some(InputDef::Form(InputForm { fixture: Some(_), .. })) => {
                Err(EngineError::MalformedSpec(format!(
                    "fixture '{}' refers to another fixture",
                    name
                )))
            }
            Some(def) => def.values(enums, fixtures),
            None => Err(EngineError::MalformedSpec(format!("unknown fixture '{}'", name))),
        }
    }
}

/// Build the expectation of a record from `expect` or `validate`
pub fn expectation(
    expect: Option<&Literal>,
    validate: Option<&str>,
    enums: &EnumDecls,
) -> Result<Expectation, EngineError> {
    match (expect, validate) {
        (Some(Literal::Text(s)), None) if s == PLACEHOLDER => Ok(Expectation::Placeholder),
        (Some(literal), None) => Ok(Expectation::Equals(literal.to_value(enums)?)),
        (None, Some(rule)) => validation(rule),
        (Some(_), Some(_)) => Err(EngineError::MalformedSpec(
            "use either expect or validate, not both".to_string(),
        )),
        (None, None) => Err(EngineError::MalformedSpec(
            "missing expect or validate".to_string(),
        )),
    }
}

fn validation(rule: &str) -> Result<Expectation, EngineError> {
    let (name, arg) = drill_core::step::parse_call(rule)?;
    let predicate = arg
        .map(str::trim)
        .filter(|p| !p.is_empty() && !p.contains(&['(', ',', ' '][..]))
        .ok_or_else(|| {
            EngineError::MalformedSpec(format!("invalid validation '{}'", rule.trim()))
        })?
        .to_string();

    match name {
        "every" => Ok(Expectation::Every(predicate)),
        "any" => Ok(Expectation::Any(predicate)),
        "none" => Ok(Expectation::NoneOf(predicate)),
        "satisfies" => Ok(Expectation::Satisfies(predicate)),
        other => Err(EngineError::MalformedSpec(format!(
            "unknown validation '{}' (expected every, any, none or satisfies)",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors() -> EnumDecls {
        let mut enums = EnumDecls::new();
        enums.declare("Color", ["RED", "GREEN"]);
        enums
    }

    #[test]
    fn test_literals_from_yaml() {
        let literals: Vec<Literal> = serde_yaml::from_str(
            "[3, 1.0, true, taco, [1, 2], {optional: 4}, {optional: null}]",
        )
        .unwrap();
        assert_eq!(literals[0], Literal::Int(3));
        assert_eq!(literals[1], Literal::Float(1.0));
        assert_eq!(literals[2], Literal::Bool(true));
        assert_eq!(literals[3], Literal::Text("taco".to_string()));
        assert_eq!(literals[4], Literal::List(vec![Literal::Int(1), Literal::Int(2)]));

        let enums = EnumDecls::new();
        assert_eq!(literals[5].to_value(&enums).unwrap(), Value::present(Value::int(4)));
        assert_eq!(literals[6].to_value(&enums).unwrap(), Value::absent());
    }

    #[test]
    fn test_enum_literals_need_declaration() {
        let enums = colors();
        assert_eq!(
            Literal::Text("Color::RED".into()).to_value(&enums).unwrap(),
            Value::enum_tag("Color", "RED")
        );
        assert!(Literal::Text("Color::PURPLE".into()).to_value(&enums).is_err());
        assert_eq!(
            Literal::Text("Size::XL".into()).to_value(&enums).unwrap(),
            Value::text("Size::XL")
        );
    }

    #[test]
    fn test_input_forms() {
        let enums = colors();
        let fixtures = BTreeMap::new();

        let range: InputDef = serde_yaml::from_str("{range: [0, 4]}").unwrap();
        assert_eq!(
            range.values(&enums, &fixtures).unwrap(),
            Value::ints(0..4).as_seq().unwrap()
        );

        let closed: InputDef = serde_yaml::from_str("{range_closed: [1, 10]}").unwrap();
        assert_eq!(closed.values(&enums, &fixtures).unwrap().len(), 10);

        let chars: InputDef = serde_yaml::from_str("{chars: bolton}").unwrap();
        assert_eq!(chars.values(&enums, &fixtures).unwrap().len(), 6);

        let colors: InputDef = serde_yaml::from_str("{enum_values: Color}").unwrap();
        assert_eq!(
            colors.values(&enums, &fixtures).unwrap(),
            vec![Value::enum_tag("Color", "RED"), Value::enum_tag("Color", "GREEN")]
        );

        let both: InputDef = serde_yaml::from_str("{range: [0, 4], chars: abc}").unwrap();
        assert!(both.values(&enums, &fixtures).is_err());

        let missing: InputDef = serde_yaml::from_str("{fixture: lights}").unwrap();
        assert!(missing.values(&enums, &fixtures).is_err());
    }

    #[test]
    fn test_chars_yields_utf16_code_units() {
        let enums = EnumDecls::new();
        let fixtures = BTreeMap::new();

        // U+1F32E lies outside the BMP and takes a surrogate pair
        let taco: InputDef = serde_yaml::from_str("{chars: \"a\\U0001F32E\"}").unwrap();
        assert_eq!(
            taco.values(&enums, &fixtures).unwrap(),
            vec![Value::int(0x61), Value::int(0xD83C), Value::int(0xDF2E)]
        );
    }

    #[test]
    fn test_expectations() {
        let enums = EnumDecls::new();
        assert_eq!(
            expectation(Some(&Literal::Text(PLACEHOLDER.into())), None, &enums).unwrap(),
            Expectation::Placeholder
        );
        assert_eq!(
            expectation(Some(&Literal::Int(3)), None, &enums).unwrap(),
            Expectation::Equals(Value::int(3))
        );
        assert_eq!(
            expectation(None, Some("every(is_green)"), &enums).unwrap(),
            Expectation::Every("is_green".to_string())
        );
        assert!(expectation(None, Some("most(is_green)"), &enums).is_err());
        assert!(expectation(None, Some("every()"), &enums).is_err());
        assert!(expectation(Some(&Literal::Int(3)), Some("any(is_even)"), &enums).is_err());
        assert!(expectation(None, None, &enums).is_err());
    }
}
