//! streamdrill core: value model, pipeline steps, function registry and evaluator.
//!
//! ```text
//! ExerciseSpec ─→ PipelineEvaluator ─→ Value
//!                     ↑
//!              FunctionRegistry (predicates, transforms, operators)
//! ```

pub mod context;
pub mod error;
pub mod evaluator;
pub mod exercise;
pub mod registry;
pub mod step;
pub mod value;

pub use context::RunContext;
pub use error::{EngineError, ErrorKind};
pub use evaluator::PipelineEvaluator;
pub use exercise::{ExerciseSpec, Expectation};
pub use registry::{FunctionRegistry, Namespace};
pub use step::PipelineStep;
pub use value::{ElementTag, EnumDecls, EnumTag, Value};

/// Engine version
pub const DRILL_VERSION: &str = "1.0.0";
