use crate::document::{PatternMetadata, StepRecord};
use crate::glossary::Glossary;
use crate::structure::StructureModel;

/// Accumulated state of one normalization run. Returned alongside the
/// outcome so hosts can persist or inspect intermediates even on failure.
pub struct ProcessingContext {
    // Input
    pub original_text: String,
    pub metadata: PatternMetadata,

    // Pass 1 result — Some after structure analysis
    pub structure: Option<StructureModel>,

    // Pass 2 result — Some after glossary building
    pub glossary: Option<Glossary>,

    // Pass 3 result — Some after section processing
    pub steps: Option<Vec<StepRecord>>,
}

impl ProcessingContext {
    pub fn new(original_text: impl Into<String>, metadata: PatternMetadata) -> Self {
        Self {
            original_text: original_text.into(),
            metadata,
            structure: None,
            glossary: None,
            steps: None,
        }
    }
}
