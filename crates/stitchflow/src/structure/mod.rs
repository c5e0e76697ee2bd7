//! Typed representation of the organization discovered in raw pattern text:
//! sections, repeat constructs, special instructions, and variable
//! placeholders. Built once by the structure-analysis pass and read-only
//! afterward.

use serde::{Deserialize, Serialize};

/// A contiguous part of the pattern, referencing line numbers (1-based,
/// inclusive) in the original text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub name: String,
    #[serde(default)]
    pub start_line: u32,
    #[serde(default)]
    pub end_line: u32,
    #[serde(default)]
    pub description: String,
}

/// A repeat construct: either a row range repeated as a block, or a token
/// sequence repeated within a single row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RepeatSpec {
    /// Re-emit rows `start_row..=end_row` as a block. `times` is the total
    /// emission count, including the first pass.
    #[serde(rename = "row", rename_all = "camelCase")]
    Rows {
        start_row: u32,
        end_row: u32,
        times: u32,
        #[serde(default)]
        instruction: String,
    },
    /// Repeat a token sequence within one row, joined with `", "`.
    #[serde(rename = "within_row", rename_all = "camelCase")]
    Inline {
        sequence: String,
        times: u32,
        #[serde(default)]
        instruction: String,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpecialKind {
    CastOn,
    BindOff,
    Setup,
    #[serde(other)]
    Other,
}

/// A non-row action. Cast-on carries the stitch count that initializes the
/// running count; other kinds usually carry none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SpecialInstruction {
    #[serde(rename = "type")]
    pub kind: SpecialKind,
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stitch_count: Option<u32>,
}

/// Edges, spines, panels and similar positional elements. Informational;
/// the expansion engine does not act on these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StructuralElement {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub position: String,
}

/// A count-dependent placeholder such as "k to end".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub instruction: String,
    #[serde(default)]
    pub context: String,
}

/// Everything the structure-analysis pass discovered. Absence of any feature
/// is valid; every list defaults to empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StructureModel {
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub repeats: Vec<RepeatSpec>,
    #[serde(default)]
    pub structural_elements: Vec<StructuralElement>,
    #[serde(default)]
    pub special_instructions: Vec<SpecialInstruction>,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

impl StructureModel {
    /// The first cast-on instruction, which seeds the running stitch count.
    pub fn cast_on(&self) -> Option<&SpecialInstruction> {
        self.special_instructions
            .iter()
            .find(|s| s.kind == SpecialKind::CastOn)
    }

    /// Row-repeat spec whose range starts at `row`, if any.
    pub fn row_repeat_starting_at(&self, row: u32) -> Option<(u32, u32)> {
        self.repeats.iter().find_map(|r| match r {
            RepeatSpec::Rows {
                start_row,
                end_row,
                times,
                ..
            } if *start_row == row => Some((*end_row, *times)),
            _ => None,
        })
    }

    /// Inline-repeat multiplier for a literal sequence, matched on the
    /// normalized token text.
    pub fn inline_times_for(&self, sequence: &str) -> Option<u32> {
        let wanted = normalize_sequence(sequence);
        self.repeats.iter().find_map(|r| match r {
            RepeatSpec::Inline {
                sequence: s, times, ..
            } if normalize_sequence(s) == wanted => Some(*times),
            _ => None,
        })
    }
}

fn normalize_sequence(s: &str) -> String {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
        .to_lowercase()
}
