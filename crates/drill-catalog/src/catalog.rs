//! Catalog loading and compilation.
//!
//! A catalog compiles into its exercises plus a function registry that
//! layers the catalog's derived definitions over the built-ins. Records that
//! cannot be compiled are kept as invalid entries so the verifier can report
//! them next to the rest of the batch.

use crate::format::{expectation, CatalogFile, ExerciseRecord, FunctionDefs, InputDef};
use crate::CatalogError;
use drill_core::value::mixed_tags;
use drill_core::{EngineError, EnumDecls, ExerciseSpec, FunctionRegistry, PipelineStep};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Catalog format versions this loader understands
const SUPPORTED_VERSIONS: &[&str] = &["1"];

/// One exercise slot of a catalog
#[derive(Debug, Clone)]
pub enum CatalogEntry {
    Ready(ExerciseSpec),
    Invalid { id: String, error: EngineError },
}

impl CatalogEntry {
    pub fn id(&self) -> &str {
        match self {
            CatalogEntry::Ready(spec) => &spec.id,
            CatalogEntry::Invalid { id, .. } => id,
        }
    }

    pub fn spec(&self) -> Option<&ExerciseSpec> {
        match self {
            CatalogEntry::Ready(spec) => Some(spec),
            CatalogEntry::Invalid { .. } => None,
        }
    }
}

/// A compiled catalog, immutable once loaded
#[derive(Debug, Clone)]
pub struct Catalog {
    name: String,
    title: Option<String>,
    digest: String,
    entries: Vec<CatalogEntry>,
    registry: FunctionRegistry,
}

impl Catalog {
    /// Load and compile a catalog from a YAML file
    pub fn load(path: &str) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(path, &content)
    }

    /// Compile a catalog from YAML content
    pub fn from_yaml(name: &str, yaml: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(yaml).map_err(|source| CatalogError::Yaml {
            name: name.to_string(),
            source,
        })?;

        if !SUPPORTED_VERSIONS.contains(&file.version.as_str()) {
            return Err(CatalogError::UnsupportedVersion {
                name: name.to_string(),
                version: file.version,
            });
        }

        let registry = compile_functions(name, &file.functions, &file.enums);

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(file.exercises.len());

        for (index, raw) in file.exercises.iter().enumerate() {
            let entry = match compile_record(raw, &file.enums, &file.fixtures) {
                Ok(spec) if !seen.insert(spec.id.clone()) => CatalogEntry::Invalid {
                    error: EngineError::MalformedSpec(format!(
                        "duplicate exercise id '{}'",
                        spec.id
                    )),
                    id: spec.id,
                },
                Ok(spec) => CatalogEntry::Ready(spec),
                Err(error) => {
                    let id = record_id(raw).unwrap_or_else(|| format!("{}#{}", name, index + 1));
                    CatalogEntry::Invalid { id, error }
                }
            };

            if let CatalogEntry::Invalid { id, error } = &entry {
                warn!(catalog = name, exercise = %id, %error, "invalid exercise");
            }
            entries.push(entry);
        }

        debug!(catalog = name, exercises = entries.len(), "catalog compiled");

        Ok(Catalog {
            name: name.to_string(),
            title: file.title,
            digest: format!("blake3:{}", blake3::hash(yaml.as_bytes())),
            entries,
            registry,
        })
    }

    /// Where the catalog came from (file path or embedded name)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Content hash of the catalog source
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Built-ins plus this catalog's derived functions
    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.id() == id)
    }
}

/// Define derived functions, retrying until no definition makes progress so
/// definitions may refer to each other in any order.
fn compile_functions(catalog: &str, defs: &FunctionDefs, enums: &EnumDecls) -> FunctionRegistry {
    let builtin = FunctionRegistry::builtin();
    let mut registry = FunctionRegistry::with_builtins();
    let mut pending_predicates: Vec<(&String, &String)> = defs.predicates.iter().collect();
    let mut pending_transforms: Vec<(&String, &String)> = defs.transforms.iter().collect();

    // Redefinitions of built-ins run first; they always fail and leave the
    // id broken for every later definition.
    pending_predicates.sort_by_key(|(id, _)| builtin.predicate(id).is_err());
    pending_transforms.sort_by_key(|(id, _)| builtin.transform(id).is_err());

    loop {
        let before = pending_predicates.len() + pending_transforms.len();
        pending_predicates.retain(|(id, def)| registry.define_predicate(id, def, enums).is_err());
        pending_transforms.retain(|(id, def)| registry.define_transform(id, def, enums).is_err());
        let after = pending_predicates.len() + pending_transforms.len();
        if after == 0 || after == before {
            break;
        }
    }

    for (id, def) in pending_predicates.iter().chain(pending_transforms.iter()) {
        warn!(catalog, function = %id, definition = %def, "function definition rejected");
    }

    registry
}

fn compile_record(
    raw: &serde_yaml::Value,
    enums: &EnumDecls,
    fixtures: &BTreeMap<String, InputDef>,
) -> Result<ExerciseSpec, EngineError> {
    let record: ExerciseRecord = serde_yaml::from_value(raw.clone())
        .map_err(|e| EngineError::MalformedSpec(format!("invalid exercise record: {}", e)))?;

    let input = record.input.values(enums, fixtures)?;
    if !record.mixed {
        if let Some((first, other)) = mixed_tags(&input) {
            return Err(EngineError::MalformedSpec(format!(
                "input mixes {} and {} elements; mark the exercise mixed: true to allow it",
                first, other
            )));
        }
    }

    let steps = record
        .steps
        .iter()
        .map(|s| PipelineStep::parse_with(s, enums))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(pos) = steps.iter().position(PipelineStep::is_terminal) {
        if pos + 1 < steps.len() {
            return Err(EngineError::MalformedSpec(format!(
                "step '{}' ends the pipeline but is followed by '{}'",
                steps[pos],
                steps[pos + 1]
            )));
        }
    }

    let expected = expectation(record.expect.as_ref(), record.validate.as_deref(), enums)?;

    Ok(ExerciseSpec {
        id: record.id,
        lesson: record.lesson,
        input,
        mixed: record.mixed,
        steps,
        expected,
    })
}

fn record_id(raw: &serde_yaml::Value) -> Option<String> {
    raw.get("id").and_then(|id| id.as_str()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::{Expectation, Value};

    const SAMPLE: &str = r#"
version: "1"
title: Sample
enums:
  Color: [RED, GREEN, BLUE]
fixtures:
  lights: ["Color::RED", "Color::BLUE", "Color::BLUE"]
functions:
  predicates:
    not_blue: "not(is_blue)"
    is_blue: "eq(Color::BLUE)"
    is_odd_color: "eq(Color::PURPLE"
exercises:
  - id: sample.count
    input: [0, 1, 1, 1, 2, 2, 2]
    steps: [distinct, count]
    expect: 3
  - id: sample.blue
    input: { fixture: lights }
    steps: ["filter(is_blue)", count]
    expect: 2
  - id: sample.bad_step
    input: [1]
    steps: ["sorted"]
    expect: 1
  - id: sample.count
    input: [1]
    steps: [count]
    expect: 1
  - input: [1]
    steps: [count]
  - id: sample.terminal
    input: [1, 2]
    steps: [count, "limit(1)"]
    expect: 1
  - id: sample.mixed
    input: [1, "one"]
    steps: [count]
    expect: 2
"#;

    #[test]
    fn test_compile_sample() {
        let catalog = Catalog::from_yaml("sample.yaml", SAMPLE).unwrap();
        assert_eq!(catalog.title(), Some("Sample"));
        assert_eq!(catalog.len(), 7);
        assert!(catalog.digest().starts_with("blake3:"));

        let ready: Vec<&str> = catalog
            .entries()
            .iter()
            .filter_map(CatalogEntry::spec)
            .map(|spec| spec.id.as_str())
            .collect();
        assert_eq!(ready, vec!["sample.count", "sample.blue"]);

        let blue = catalog.get("sample.blue").and_then(CatalogEntry::spec).unwrap();
        assert_eq!(blue.input.len(), 3);
        assert_eq!(blue.expected, Expectation::Equals(Value::int(2)));
    }

    #[test]
    fn test_invalid_entries_keep_ids() {
        let catalog = Catalog::from_yaml("sample.yaml", SAMPLE).unwrap();
        let invalid: Vec<&str> = catalog
            .entries()
            .iter()
            .filter(|entry| entry.spec().is_none())
            .map(CatalogEntry::id)
            .collect();
        assert_eq!(
            invalid,
            vec![
                "sample.bad_step",
                "sample.count",
                "sample.yaml#5",
                "sample.terminal",
                "sample.mixed",
            ]
        );
    }

    #[test]
    fn test_derived_functions_in_any_order() {
        let catalog = Catalog::from_yaml("sample.yaml", SAMPLE).unwrap();
        let registry = catalog.registry();
        assert!(registry.predicate("is_blue").is_ok());
        assert!(registry.predicate("not_blue").is_ok());
        assert!(matches!(
            registry.predicate("is_odd_color"),
            Err(EngineError::MalformedSpec(_))
        ));
    }

    const DEFINITIONS: &str = r#"
version: "1"
enums:
  Color: [RED, GREEN, YELLOW]
functions:
  predicates:
    aa_not_even: "not(is_even)"
    is_even: "not(is_odd)"
    is_xl: "eq(Size::XL)"
    is_yellow: "eq(Color::YELLOW)"
    zz_not_even: "not(is_even)"
  transforms:
    green_to_yellow: "replace(Color::GREEN, Color::YELOW)"
exercises:
  - id: defs.typo_in_definition
    input: ["Color::GREEN", "Color::RED"]
    steps: ["map(green_to_yellow)", "filter(is_yellow)", count]
    expect: 1
  - id: defs.undeclared_enum_is_text
    input: ["Size::XL", "Size::S"]
    steps: ["filter(is_xl)", count]
    expect: 1
  - id: defs.reduce_identity
    input: ["Color::GREEN"]
    steps: ["reduce(max, Color::YELOW)"]
    expect: "Color::GREEN"
"#;

    #[test]
    fn test_definition_literals_use_declared_enums() {
        let catalog = Catalog::from_yaml("defs.yaml", DEFINITIONS).unwrap();
        let registry = catalog.registry();

        match registry.transform("green_to_yellow") {
            Err(EngineError::MalformedSpec(msg)) => {
                assert!(msg.contains("enum Color has no variant YELOW"), "{}", msg)
            }
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("misspelled variant accepted"),
        }

        let is_xl = registry.predicate("is_xl").unwrap();
        assert!(is_xl(&Value::text("Size::XL")).unwrap());
        let spec = catalog
            .get("defs.undeclared_enum_is_text")
            .and_then(CatalogEntry::spec)
            .unwrap();
        assert_eq!(spec.input[0], Value::text("Size::XL"));

        // a misspelled variant in a reduce identity makes the record invalid
        let reduce = catalog.get("defs.reduce_identity").unwrap();
        assert!(reduce.spec().is_none());
    }

    #[test]
    fn test_builtins_cannot_be_shadowed() {
        let catalog = Catalog::from_yaml("defs.yaml", DEFINITIONS).unwrap();
        let registry = catalog.registry();

        for id in ["is_even", "aa_not_even", "zz_not_even"] {
            assert!(
                matches!(registry.predicate(id), Err(EngineError::MalformedSpec(_))),
                "{} resolved",
                id
            );
        }
        assert!(registry.predicate("is_odd").is_ok());
        assert!(FunctionRegistry::builtin().predicate("is_even").is_ok());
    }

    #[test]
    fn test_rejects_unknown_version() {
        let err = Catalog::from_yaml("v2.yaml", "version: \"2\"\nexercises: []\n").unwrap_err();
        assert!(matches!(err, CatalogError::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_yaml_syntax_error_fails_load() {
        let err = Catalog::from_yaml("broken.yaml", "version: [\n").unwrap_err();
        assert!(matches!(err, CatalogError::Yaml { .. }));
    }
}
