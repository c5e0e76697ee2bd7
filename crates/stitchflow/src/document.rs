//! The final normalized artifact and its building blocks. Field names on the
//! wire follow the established pattern-document format (`startingStitchCount`,
//! `maxSteps`, ...), so documents produced here are drop-in for existing
//! consumers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::glossary::Glossary;

/// Which face of the work a row is worked on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Side {
    RS,
    WS,
}

impl Side {
    pub fn flip(self) -> Self {
        match self {
            Side::RS => Side::WS,
            Side::WS => Side::RS,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    Regular,
    SpecialInstruction,
}

/// One fully resolved, enumerated step of the pattern.
///
/// Regular steps always carry both counts and a side. Special-instruction
/// steps carry counts only when they set the running count (cast-on) and
/// never carry a side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub step: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_stitch_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ending_stitch_count: Option<u32>,
    pub instruction: String,
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(rename = "type")]
    pub kind: StepKind,
}

impl StepRecord {
    pub fn regular(
        step: u32,
        starting: u32,
        ending: u32,
        instruction: impl Into<String>,
        section: impl Into<String>,
        side: Side,
    ) -> Self {
        Self {
            step,
            starting_stitch_count: Some(starting),
            ending_stitch_count: Some(ending),
            instruction: instruction.into(),
            section: section.into(),
            side: Some(side),
            kind: StepKind::Regular,
        }
    }

    pub fn special(
        step: u32,
        instruction: impl Into<String>,
        section: impl Into<String>,
        stitch_count: Option<u32>,
    ) -> Self {
        Self {
            step,
            starting_stitch_count: stitch_count,
            ending_stitch_count: stitch_count,
            instruction: instruction.into(),
            section: section.into(),
            side: None,
            kind: StepKind::SpecialInstruction,
        }
    }
}

/// Pattern metadata. Set once at pipeline entry; later passes only add
/// computed fields (`maxSteps` at assembly), never overwrite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatternMetadata {
    pub name: String,
    pub author: String,
    pub craft: String,
    #[serde(default)]
    pub max_steps: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PatternMetadata {
    pub fn new(name: impl Into<String>, author: impl Into<String>, craft: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            author: author.into(),
            craft: craft.into(),
            max_steps: 0,
            extra: Map::new(),
        }
    }
}

/// The final artifact. Immutable once assembled; ownership passes to the
/// host's persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedPatternDocument {
    pub metadata: PatternMetadata,
    pub glossary: Glossary,
    pub steps: Vec<StepRecord>,
}

impl NormalizedPatternDocument {
    /// Merges metadata, glossary and validated steps, setting
    /// `metadata.maxSteps` to the step count. An empty step sequence is
    /// valid and yields `maxSteps = 0`.
    pub fn assemble(
        mut metadata: PatternMetadata,
        glossary: Glossary,
        steps: Vec<StepRecord>,
    ) -> Self {
        metadata.max_steps = steps.len() as u32;
        Self {
            metadata,
            glossary,
            steps,
        }
    }
}
