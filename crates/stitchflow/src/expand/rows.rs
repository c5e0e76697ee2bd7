//! Row-line extraction: walks a section's line range in the original text
//! and pulls out the instruction rows, their numbers and their explicit
//! side markers.

use std::sync::LazyLock;

use regex::Regex;

use crate::document::Side;

// Accepts "Row 3:", "Rows 5-6:", "MC Row 1 (RS):" and similar; a short
// leading yarn/color tag is part of the label, not the instruction.
static RE_ROW_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:[A-Z]{1,3}\s+)?rows?\s+(\d+)(?:\s*(?:-|–|&|and)\s*(\d+))?\s*(?:\(\s*(RS|WS)\s*\))?\s*:\s*(.*)$",
    )
    .unwrap()
});
static RE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Za-z' ]{1,30}:?$").unwrap());
static RE_NON_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(cast\s+on|bind\s+off|repeat\s+rows?)\b").unwrap());

/// One instruction row as written in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLine {
    /// Row number from the label, if the row was labeled.
    pub number: Option<u32>,
    /// Explicit `(RS)`/`(WS)` marker, if present.
    pub side: Option<Side>,
    /// The instruction body with the label stripped.
    pub body: String,
    /// 1-based line number in the original text.
    pub line: u32,
}

/// Extracts instruction rows from `lines[start_line..=end_line]` (1-based,
/// inclusive; 0 for `end_line` means "through the end").
pub fn extract_rows(lines: &[&str], start_line: u32, end_line: u32) -> Vec<RowLine> {
    let start = start_line.max(1) as usize - 1;
    let end = if end_line == 0 {
        lines.len()
    } else {
        (end_line as usize).min(lines.len())
    };

    let mut rows = Vec::new();
    for (offset, raw) in lines.get(start..end).unwrap_or(&[]).iter().enumerate() {
        let line_no = (start + offset) as u32 + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(caps) = RE_ROW_LABEL.captures(trimmed) {
            let number: Option<u32> = caps[1].parse().ok();
            let range_end: Option<u32> = caps.get(2).and_then(|m| m.as_str().parse().ok());
            let side = caps.get(3).map(|m| match m.as_str().to_uppercase().as_str() {
                "RS" => Side::RS,
                _ => Side::WS,
            });
            let body = caps[4].trim().to_string();
            if body.is_empty() {
                continue;
            }
            match (number, range_end) {
                // A range label ("Rows 1-2:") emits the body once per row,
                // so the step count and side alternation stay true to the
                // text. Only the first row keeps an explicit side marker;
                // the rest alternate.
                (Some(start), Some(end)) if end > start => {
                    for n in start..=end {
                        rows.push(RowLine {
                            number: Some(n),
                            side: if n == start { side } else { None },
                            body: body.clone(),
                            line: line_no,
                        });
                    }
                }
                _ => rows.push(RowLine {
                    number,
                    side,
                    body,
                    line: line_no,
                }),
            }
            continue;
        }

        if is_instruction_line(trimmed) {
            rows.push(RowLine {
                number: None,
                side: None,
                body: trimmed.to_string(),
                line: line_no,
            });
        }
    }
    rows
}

/// Unlabeled lines count as rows unless they are headers, special
/// instructions, or repeat directives (those belong to the structure model).
fn is_instruction_line(line: &str) -> bool {
    !RE_HEADER.is_match(line)
        && !RE_NON_ROW.is_match(line)
        && line.chars().any(|c| c.is_ascii_lowercase())
}
