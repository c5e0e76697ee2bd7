use thiserror::Error;

#[derive(Error, Debug)]
pub enum StitchflowError {
    #[error("Glossary error: {0}")]
    Glossary(#[from] GlossaryError),

    #[error("Expansion error: {0}")]
    Expand(#[from] ExpandError),

    #[error("Continuity error: {0}")]
    Continuity(#[from] ContinuityError),

    #[error("Interpreter error: {0}")]
    Interpreter(#[from] crate::interpreter::InterpreterError),

    #[error("Interpreter response error: {0}")]
    Response(#[from] crate::interpreter::ResponseError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GlossaryError {
    #[error("unknown abbreviation '{0}'")]
    UnknownAbbreviation(String),

    #[error("glossary entry '{abbrev}': {reason}")]
    Schema { abbrev: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpandError {
    #[error("no cast-on instruction with a stitch count; cannot initialize the running count")]
    Initialization,

    #[error("row {row}: cannot resolve '{placeholder}': {reason}")]
    VariableResolution {
        row: u32,
        placeholder: String,
        reason: String,
    },

    #[error("row {row}: unknown abbreviation '{abbrev}'")]
    UnknownAbbreviation { row: u32, abbrev: String },

    #[error("row {row}: repeat group '{group}': {reason}")]
    UnresolvedRepeat {
        row: u32,
        group: String,
        reason: String,
    },

    #[error("row {row}: arithmetic underflow ({current} sts on needle, row consumes {consumed})")]
    NegativeCount {
        row: u32,
        current: u32,
        consumed: u32,
    },

    #[error("step {step}: regular step is missing stitch counts")]
    MissingCounts { step: u32 },

    #[error(
        "step {step}: interpreter arithmetic disagrees with the glossary \
         (claimed ending {claimed}, derived {derived})"
    )]
    CountMismatch { step: u32, claimed: u32, derived: u32 },
}

/// Running-count mismatch between two adjacent steps. Reported for the first
/// violating pair only; the validator does not scan past it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "stitch count mismatch between steps {step_a} and {step_b}: \
     ending {ending} != starting {starting}"
)]
pub struct ContinuityError {
    pub step_a: u32,
    pub step_b: u32,
    pub ending: u32,
    pub starting: u32,
}

pub type Result<T> = std::result::Result<T, StitchflowError>;
