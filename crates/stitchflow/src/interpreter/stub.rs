//! Rule-based interpreter: a deterministic [`PatternInterpreter`] built from
//! regex scanning over the raw text. Serves offline runs and tests, and
//! doubles as the reference for what a model-backed interpreter must return.
//!
//! Replies are serialized JSON so they cross the exact same
//! parse-then-validate boundary as any remote collaborator's reply.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::expand::tokens;
use crate::expand::Expander;
use crate::glossary::Glossary;
use crate::structure::{
    RepeatSpec, Section, SpecialInstruction, SpecialKind, StructureModel, Variable,
};

use super::{InterpreterError, PatternInterpreter};

#[derive(Debug, Default, Clone, Copy)]
pub struct RuleScanner;

static RE_CAST_ON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcast\s+on\s+(\d+)\s*(?:sts?|stitches)?\b").unwrap());
static RE_BIND_OFF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bbind\s+off\b").unwrap());
// "Repeat rows 3-4 five more times", "repeat rows 1 and 2 x10"
static RE_ROW_REPEAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\brepeat\s+rows?\s+(\d+)\s*(?:-|–|to|through|&|and)\s*(\d+)\s+(?:x\s*(\d+)|(\d+|[a-z]+)\s+(more\s+)?times?)",
    )
    .unwrap()
});
static RE_INLINE_REPEAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[(\[]([^)\]]+)[)\]]\s*(?:x\s*(\d+)|(\d+|[a-z]+)\s+times)").unwrap()
});
static RE_VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:knit|purl|k|p)\s+to\s+(?:end|marker|last\s+\d+\s+sts?)\b").unwrap()
});
static RE_SECTION_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Za-z' ]{1,30}:?$").unwrap());
// One compiled matcher per single-word glossary key: whole-word match with
// an optional count suffix, so "k2" implies "k" but "knit" does not.
static RE_ABBREVS: LazyLock<HashMap<String, Regex>> = LazyLock::new(|| {
    Glossary::standard()
        .iter()
        .filter(|(abbrev, _)| !abbrev.contains(' '))
        .map(|(abbrev, _)| {
            let re = Regex::new(&format!(r"(?i)\b{}\d*\b", regex::escape(abbrev))).unwrap();
            (abbrev.clone(), re)
        })
        .collect()
});

impl RuleScanner {
    fn scan_structure(&self, raw_text: &str) -> StructureModel {
        let mut model = StructureModel::default();

        for (idx, raw_line) in raw_text.lines().enumerate() {
            let line_no = idx as u32 + 1;
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(caps) = RE_CAST_ON.captures(line) {
                model.special_instructions.push(SpecialInstruction {
                    kind: SpecialKind::CastOn,
                    instruction: line.to_string(),
                    stitch_count: caps[1].parse().ok(),
                });
            } else if let Some(caps) = RE_ROW_REPEAT.captures(line) {
                if let Some(spec) = row_repeat_from(&caps, line) {
                    model.repeats.push(spec);
                }
            } else if RE_BIND_OFF.is_match(line) {
                model.special_instructions.push(SpecialInstruction {
                    kind: SpecialKind::BindOff,
                    instruction: line.to_string(),
                    stitch_count: None,
                });
            } else if RE_SECTION_HEADER.is_match(line) {
                if let Some(prev) = model.sections.last_mut() {
                    prev.end_line = line_no - 1;
                } else if line_no > 1 {
                    // Content before the first header belongs to an implicit
                    // setup section.
                    model.sections.push(Section {
                        name: "Setup".to_string(),
                        start_line: 1,
                        end_line: line_no - 1,
                        description: String::new(),
                    });
                }
                model.sections.push(Section {
                    name: line.trim_end_matches(':').to_string(),
                    start_line: line_no + 1,
                    end_line: 0,
                    description: String::new(),
                });
            }

            for caps in RE_INLINE_REPEAT.captures_iter(line) {
                let times = caps
                    .get(2)
                    .or(caps.get(3))
                    .and_then(|m| tokens::parse_count_word(m.as_str()));
                if let Some(times) = times {
                    model.repeats.push(RepeatSpec::Inline {
                        sequence: caps[1].trim().to_string(),
                        times,
                        instruction: caps[0].to_string(),
                    });
                }
            }

            for caps in RE_VARIABLE.find_iter(line) {
                model.variables.push(Variable {
                    instruction: caps.as_str().to_string(),
                    context: line.to_string(),
                });
            }
        }

        debug!(
            sections = model.sections.len(),
            repeats = model.repeats.len(),
            specials = model.special_instructions.len(),
            variables = model.variables.len(),
            "rule scan complete"
        );
        model
    }

    /// The built-in glossary filtered to abbreviations the text actually
    /// uses. Single-token keys match through the precompiled matcher table;
    /// multi-word keys match as substrings.
    fn scan_glossary(&self, raw_text: &str) -> Glossary {
        let lower = raw_text.to_lowercase();
        Glossary::standard()
            .iter()
            .filter(|(abbrev, _)| {
                if abbrev.contains(' ') {
                    lower.contains(&abbrev.to_lowercase())
                } else {
                    RE_ABBREVS
                        .get(abbrev.as_str())
                        .is_some_and(|re| re.is_match(raw_text))
                }
            })
            .map(|(abbrev, entry)| (abbrev.clone(), entry.clone()))
            .collect()
    }
}

fn row_repeat_from(caps: &regex::Captures<'_>, line: &str) -> Option<RepeatSpec> {
    let start_row: u32 = caps[1].parse().ok()?;
    let end_row: u32 = caps[2].parse().ok()?;
    let count = caps
        .get(3)
        .or(caps.get(4))
        .and_then(|m| tokens::parse_count_word(m.as_str()))?;
    // "N more times" excludes the pass already written out; the model's
    // `times` is the total emission count.
    let times = if caps.get(5).is_some() { count + 1 } else { count };
    Some(RepeatSpec::Rows {
        start_row,
        end_row,
        times,
        instruction: line.to_string(),
    })
}

impl PatternInterpreter for RuleScanner {
    fn analyze_structure(&self, raw_text: &str) -> Result<String, InterpreterError> {
        let model = self.scan_structure(raw_text);
        serde_json::to_string(&model).map_err(|e| InterpreterError::CallFailed(e.to_string()))
    }

    fn build_glossary(
        &self,
        raw_text: &str,
        _structure: &StructureModel,
    ) -> Result<String, InterpreterError> {
        let glossary = self.scan_glossary(raw_text);
        serde_json::to_string(&glossary).map_err(|e| InterpreterError::CallFailed(e.to_string()))
    }

    fn process_sections(
        &self,
        raw_text: &str,
        structure: &StructureModel,
        glossary: &Glossary,
    ) -> Result<String, InterpreterError> {
        let steps = Expander::new(structure, glossary)
            .expand(raw_text)
            .map_err(|e| InterpreterError::CallFailed(e.to_string()))?;
        serde_json::to_string(&steps).map_err(|e| InterpreterError::CallFailed(e.to_string()))
    }
}
