use std::fmt;

use thiserror::Error;

use crate::error::{ContinuityError, ExpandError};
use crate::interpreter::{InterpreterError, ResponseError};

/// The four pipeline passes, in execution order. The wire name (snake_case)
/// is what failure outcomes report as the failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    StructureAnalysis,
    GlossaryBuilding,
    SectionProcessing,
    ValidationAssembly,
}

impl Pass {
    pub fn as_str(self) -> &'static str {
        match self {
            Pass::StructureAnalysis => "structure_analysis",
            Pass::GlossaryBuilding => "glossary_building",
            Pass::SectionProcessing => "section_processing",
            Pass::ValidationAssembly => "validation_assembly",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything that can fail inside a pass.
#[derive(Error, Debug)]
pub enum PassError {
    #[error(transparent)]
    Interpreter(#[from] InterpreterError),

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error(transparent)]
    Expand(#[from] ExpandError),

    #[error(transparent)]
    Continuity(#[from] ContinuityError),
}

/// A pass failure tagged with the pass that raised it.
#[derive(Error, Debug)]
#[error("pass '{pass}' failed: {source}")]
pub struct PipelineError {
    pub pass: Pass,
    #[source]
    pub source: PassError,
}
