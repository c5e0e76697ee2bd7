pub mod document;
pub mod error;
pub mod expand;
pub mod glossary;
pub mod interpreter;
pub mod pipeline;
pub mod structure;
pub mod validate;

pub use document::{NormalizedPatternDocument, PatternMetadata, Side, StepKind, StepRecord};
pub use error::{ContinuityError, ExpandError, GlossaryError, Result, StitchflowError};
pub use expand::Expander;
pub use glossary::{Glossary, GlossaryEntry};
pub use interpreter::{extract_json, InterpreterError, PatternInterpreter, RuleScanner};
pub use pipeline::{
    NoopProgress, Pipeline, PipelineConfig, ProcessingContext, ProgressReporter, RunOutcome,
};
pub use structure::{RepeatSpec, Section, SpecialInstruction, SpecialKind, StructureModel};
pub use validate::check_continuity;
