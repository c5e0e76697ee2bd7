//! Contract with the text-understanding collaborator that performs structure
//! discovery, glossary construction and (optionally) row generation.
//!
//! Implementations return their raw textual reply; the pipeline pushes every
//! reply through the strict parse-then-validate boundary in [`response`]
//! before anything typed leaves this module. The collaborator's arithmetic is
//! never trusted: the expansion engine re-derives all stitch counts.

pub mod response;
pub mod stub;

use thiserror::Error;

use crate::glossary::Glossary;
use crate::structure::StructureModel;

pub use response::ResponseError;
pub use stub::RuleScanner;

/// Errors from the collaborator call itself (transport, model, timeout).
/// Shape problems in an otherwise delivered reply are [`ResponseError`]s.
#[derive(Debug, Error)]
pub enum InterpreterError {
    #[error("interpreter call failed: {0}")]
    CallFailed(String),

    #[error("interpreter returned an empty reply")]
    EmptyReply,
}

/// The Text Interpreter collaborator. May be an LLM client, a rule engine,
/// or anything else that can read a pattern; each method returns the raw
/// reply text.
pub trait PatternInterpreter: Send + Sync {
    /// Discover sections, repeats, special instructions and variables.
    fn analyze_structure(&self, raw_text: &str) -> Result<String, InterpreterError>;

    /// Build a glossary entry for every abbreviation the pattern uses.
    fn build_glossary(
        &self,
        raw_text: &str,
        structure: &StructureModel,
    ) -> Result<String, InterpreterError>;

    /// Produce enumerated steps directly. Optional assistance for the
    /// expansion pass; counts in the reply are re-derived, never trusted.
    fn process_sections(
        &self,
        raw_text: &str,
        structure: &StructureModel,
        glossary: &Glossary,
    ) -> Result<String, InterpreterError>;
}

/// Extracts the first complete JSON value (object or array) from a reply,
/// tolerating surrounding prose. Tracks string boundaries and escape
/// sequences so braces inside strings don't confuse the depth count.
pub fn extract_json(reply: &str) -> &str {
    let start = match reply.find(['{', '[']) {
        Some(idx) => idx,
        None => return reply,
    };

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in reply[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => depth += 1,
            '}' | ']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return &reply[start..start + i + c.len_utf8()];
                }
            }
            _ => {}
        }
    }

    &reply[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_strips_surrounding_prose() {
        let reply = "Here is the analysis:\n{\"sections\": []}\nHope this helps!";
        assert_eq!(extract_json(reply), "{\"sections\": []}");
    }

    #[test]
    fn extract_json_handles_arrays() {
        let reply = "Sure!\n[{\"step\": 1}, {\"step\": 2}] done";
        assert_eq!(extract_json(reply), "[{\"step\": 1}, {\"step\": 2}]");
    }

    #[test]
    fn extract_json_ignores_braces_inside_strings() {
        let reply = r#"{"instruction": "k2 } tricky", "times": 2} trailing"#;
        assert_eq!(
            extract_json(reply),
            r#"{"instruction": "k2 } tricky", "times": 2}"#
        );
    }

    #[test]
    fn extract_json_without_json_returns_input() {
        assert_eq!(extract_json("no json here"), "no json here");
    }
}
