//! Strict parse-then-validate boundary for interpreter replies. Untyped JSON
//! never crosses this module: replies decode into typed models or fail with
//! an error naming exactly what was malformed.

use serde_json::Value;
use thiserror::Error;

use crate::document::{StepKind, StepRecord};
use crate::error::GlossaryError;
use crate::glossary::{Glossary, GlossaryEntry};
use crate::structure::{Section, StructureModel};

use super::extract_json;

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("reply is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("reply has unexpected shape: {0}")]
    UnexpectedShape(String),

    #[error("sections '{first}' and '{second}' have overlapping line ranges")]
    SectionOverlap { first: String, second: String },

    #[error(transparent)]
    Schema(#[from] GlossaryError),

    #[error("step {index}: missing required field '{field}'")]
    StepMissingField { index: usize, field: String },

    #[error("step numbering error: expected {expected}, got {got}")]
    StepNumbering { expected: u32, got: u64 },

    #[error("step {step}: regular step is missing stitch counts")]
    StepMissingCounts { step: u32 },
}

/// Parses a structure-analysis reply. Missing optional top-level arrays
/// default to empty; a reply that cannot decode as the expected shape fails,
/// as does one whose sections cover overlapping line ranges.
pub fn parse_structure(reply: &str) -> Result<StructureModel, ResponseError> {
    let model: StructureModel = serde_json::from_str(extract_json(reply))?;
    check_section_ranges(&model.sections)?;
    Ok(model)
}

/// Sections must cover disjoint line ranges: the expander walks each range
/// independently, so a shared line would emit its rows once per covering
/// section and the duplicates would still pass continuity.
fn check_section_ranges(sections: &[Section]) -> Result<(), ResponseError> {
    let mut ordered: Vec<&Section> = sections.iter().collect();
    ordered.sort_by_key(|s| s.start_line);
    for pair in ordered.windows(2) {
        // end_line 0 means "through the end of the document"
        let end = if pair[0].end_line == 0 {
            u32::MAX
        } else {
            pair[0].end_line
        };
        if pair[1].start_line <= end {
            return Err(ResponseError::SectionOverlap {
                first: pair[0].name.clone(),
                second: pair[1].name.clone(),
            });
        }
    }
    Ok(())
}

/// Parses a glossary reply and validates every entry against the schema:
/// all four fields present, counts numeric and non-negative. Partial
/// glossaries are never accepted; the first bad entry fails the whole reply.
pub fn parse_glossary(reply: &str) -> Result<Glossary, ResponseError> {
    let value: Value = serde_json::from_str(extract_json(reply))?;
    let object = value
        .as_object()
        .ok_or_else(|| ResponseError::UnexpectedShape("glossary reply must be an object".into()))?;

    let mut glossary = Glossary::new();
    for (abbrev, entry) in object {
        glossary.insert(abbrev.clone(), validate_entry(abbrev, entry)?);
    }
    Ok(glossary)
}

/// Checks one glossary entry for the four required fields and numeric,
/// non-negative counts.
pub fn validate_entry(abbrev: &str, entry: &Value) -> Result<GlossaryEntry, GlossaryError> {
    let obj = entry.as_object().ok_or_else(|| GlossaryError::Schema {
        abbrev: abbrev.to_string(),
        reason: "entry must be an object".into(),
    })?;

    let text_field = |field: &str| -> Result<String, GlossaryError> {
        obj.get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| GlossaryError::Schema {
                abbrev: abbrev.to_string(),
                reason: format!("missing required field '{field}'"),
            })
    };
    let count_field = |field: &str| -> Result<u32, GlossaryError> {
        let value = obj.get(field).ok_or_else(|| GlossaryError::Schema {
            abbrev: abbrev.to_string(),
            reason: format!("missing required field '{field}'"),
        })?;
        value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| GlossaryError::Schema {
                abbrev: abbrev.to_string(),
                reason: format!("field '{field}' must be a non-negative integer"),
            })
    };

    Ok(GlossaryEntry {
        name: text_field("name")?,
        description: text_field("description")?,
        stitches_used: count_field("stitchesUsed")?,
        stitches_created: count_field("stitchesCreated")?,
    })
}

/// Parses a section-processing reply: an array of step objects, numbered
/// sequentially from 1, with counts present on every regular step.
pub fn parse_steps(reply: &str) -> Result<Vec<StepRecord>, ResponseError> {
    let value: Value = serde_json::from_str(extract_json(reply))?;
    let items = value
        .as_array()
        .ok_or_else(|| ResponseError::UnexpectedShape("steps reply must be an array".into()))?;

    let mut steps = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        for field in ["step", "instruction", "section", "type"] {
            if item.get(field).is_none() {
                return Err(ResponseError::StepMissingField {
                    index: index + 1,
                    field: field.to_string(),
                });
            }
        }

        let expected = index as u32 + 1;
        let got = item["step"].as_u64().unwrap_or(0);
        if got != u64::from(expected) {
            return Err(ResponseError::StepNumbering { expected, got });
        }

        let step: StepRecord = serde_json::from_value(item.clone())?;
        if step.kind == StepKind::Regular
            && (step.starting_stitch_count.is_none() || step.ending_stitch_count.is_none())
        {
            return Err(ResponseError::StepMissingCounts { step: step.step });
        }
        steps.push(step);
    }
    Ok(steps)
}
