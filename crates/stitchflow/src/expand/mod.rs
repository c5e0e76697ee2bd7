//! Repeat expansion and variable resolution: turns raw pattern text plus the
//! discovered structure and glossary into a flat, gapless sequence of
//! [`StepRecord`]s with computed running stitch counts.
//!
//! Counts are computed here but NOT checked for the continuity invariant;
//! that is the validator's job, so the two concerns stay separated.

pub mod rows;
pub mod tokens;

use tracing::debug;

use crate::document::{Side, StepKind, StepRecord};
use crate::error::ExpandError;
use crate::glossary::Glossary;
use crate::structure::{Section, SpecialKind, StructureModel};

use rows::RowLine;
use tokens::{GroupCount, RowToken};

pub struct Expander<'a> {
    structure: &'a StructureModel,
    glossary: &'a Glossary,
}

/// A literal token resolved against the glossary.
#[derive(Debug, Clone)]
struct ResolvedTok {
    text: String,
    used: u32,
    delta: i64,
}

/// Flattened row item awaiting count-dependent resolution.
enum Pending {
    Fixed(ResolvedTok),
    Placeholder { base: String, raw: String },
    ToLastGroup { toks: Vec<ResolvedTok>, raw: String },
}

impl<'a> Expander<'a> {
    pub fn new(structure: &'a StructureModel, glossary: &'a Glossary) -> Self {
        Self {
            structure,
            glossary,
        }
    }

    /// Runs the full expansion over the original text. Partial output is
    /// never surfaced: the first failing row aborts the pass.
    pub fn expand(&self, text: &str) -> Result<Vec<StepRecord>, ExpandError> {
        let cast_on = self.structure.cast_on().ok_or(ExpandError::Initialization)?;
        let mut current = cast_on.stitch_count.ok_or(ExpandError::Initialization)?;

        let lines: Vec<&str> = text.lines().collect();
        let sections = self.sections_or_default(lines.len() as u32);
        let first_section = sections
            .first()
            .map(|s| s.name.clone())
            .unwrap_or_else(|| "Setup".to_string());

        let mut steps = Vec::new();
        let mut side = Side::RS;
        steps.push(StepRecord::special(
            1,
            cast_on.instruction.clone(),
            first_section,
            Some(current),
        ));

        for section in &sections {
            let section_rows = rows::extract_rows(&lines, section.start_line, section.end_line);
            let mut i = 0;
            while i < section_rows.len() {
                let row = &section_rows[i];
                let repeat = row
                    .number
                    .and_then(|n| self.structure.row_repeat_starting_at(n));

                if let Some((end_row, times)) = repeat {
                    let mut j = i;
                    while j < section_rows.len()
                        && section_rows[j].number.is_some_and(|n| n <= end_row)
                    {
                        j += 1;
                    }
                    let template = &section_rows[i..j];
                    debug!(
                        section = %section.name,
                        rows = template.len(),
                        times,
                        "expanding row-repeat"
                    );
                    for rep in 1..=times {
                        let label = format!("{} - Repeat {}", section.name, rep);
                        for template_row in template {
                            let (record, next_count, next_side) = self.emit_row(
                                template_row,
                                &label,
                                current,
                                side,
                                steps.len() as u32 + 1,
                            )?;
                            steps.push(record);
                            current = next_count;
                            side = next_side;
                        }
                    }
                    i = j;
                } else {
                    let (record, next_count, next_side) =
                        self.emit_row(row, &section.name, current, side, steps.len() as u32 + 1)?;
                    steps.push(record);
                    current = next_count;
                    side = next_side;
                    i += 1;
                }
            }
        }

        // Remaining special instructions (bind-off and friends) close the
        // sequence; they consume no side and carry no counts.
        for special in &self.structure.special_instructions {
            if special.kind == SpecialKind::CastOn {
                continue;
            }
            steps.push(StepRecord::special(
                steps.len() as u32 + 1,
                special.instruction.clone(),
                "Finishing",
                None,
            ));
        }

        debug!(steps = steps.len(), "expansion complete");
        Ok(steps)
    }

    /// Re-derives stitch counts for interpreter-provided steps and rejects
    /// any arithmetic that disagrees with the glossary. The collaborator's
    /// numbers are never trusted blindly.
    pub fn reconcile(&self, steps: Vec<StepRecord>) -> Result<Vec<StepRecord>, ExpandError> {
        for step in &steps {
            if step.kind != StepKind::Regular {
                continue;
            }
            let (starting, claimed) =
                match (step.starting_stitch_count, step.ending_stitch_count) {
                    (Some(starting), Some(ending)) => (starting, ending),
                    _ => return Err(ExpandError::MissingCounts { step: step.step }),
                };

            let mut consumed = 0u32;
            let mut net = 0i64;
            for token in tokens::tokenize(&step.instruction) {
                match token {
                    RowToken::Literal(text) => {
                        let tok = self.resolve_literal(&text, step.step)?;
                        consumed += tok.used;
                        net += tok.delta;
                    }
                    RowToken::Placeholder { raw, .. } | RowToken::Group { raw, .. } => {
                        return Err(ExpandError::VariableResolution {
                            row: step.step,
                            placeholder: raw,
                            reason: "interpreter step still contains an unresolved construct"
                                .to_string(),
                        });
                    }
                }
            }

            if consumed > starting {
                return Err(ExpandError::NegativeCount {
                    row: step.step,
                    current: starting,
                    consumed,
                });
            }
            let derived = (i64::from(starting) + net) as u32;
            if derived != claimed {
                return Err(ExpandError::CountMismatch {
                    step: step.step,
                    claimed,
                    derived,
                });
            }
        }
        Ok(steps)
    }

    fn sections_or_default(&self, total_lines: u32) -> Vec<Section> {
        if self.structure.sections.is_empty() {
            vec![Section {
                name: "pattern".to_string(),
                start_line: 1,
                end_line: total_lines,
                description: String::new(),
            }]
        } else {
            self.structure.sections.clone()
        }
    }

    /// Expands one row emission: flattens inline repeats, resolves the
    /// count-dependent construct (if any), computes the ending count.
    fn emit_row(
        &self,
        row: &RowLine,
        section: &str,
        current: u32,
        side: Side,
        step_no: u32,
    ) -> Result<(StepRecord, u32, Side), ExpandError> {
        let row_no = row.number.unwrap_or(row.line);
        let pending = self.flatten(tokens::tokenize(&row.body), row_no)?;
        let resolved = self.resolve_pending(pending, row_no, current)?;

        let mut consumed = 0u32;
        let mut net = 0i64;
        for tok in &resolved {
            consumed += tok.used;
            net += tok.delta;
        }
        if consumed > current {
            return Err(ExpandError::NegativeCount {
                row: row_no,
                current,
                consumed,
            });
        }
        let ending = (i64::from(current) + net) as u32;

        let instruction = resolved
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let this_side = row.side.unwrap_or(side);
        let record = StepRecord::regular(step_no, current, ending, instruction, section, this_side);
        Ok((record, ending, this_side.flip()))
    }

    /// Flattens fixed-count groups into literal tokens, leaving placeholders
    /// and to-last groups pending. Inline repeats without a multiplier in
    /// the row text fall back to the structure model's inline specs.
    fn flatten(&self, toks: Vec<RowToken>, row: u32) -> Result<Vec<Pending>, ExpandError> {
        let mut out = Vec::new();
        for token in toks {
            match token {
                RowToken::Literal(text) => {
                    out.push(Pending::Fixed(self.resolve_literal(&text, row)?));
                }
                RowToken::Placeholder { base, raw } => {
                    out.push(Pending::Placeholder { base, raw });
                }
                RowToken::Group { tokens, count, raw } => {
                    let inner = self.resolve_group_tokens(tokens, row, &raw)?;
                    match count {
                        GroupCount::Times(times) => {
                            for _ in 0..times {
                                out.extend(inner.iter().cloned().map(Pending::Fixed));
                            }
                        }
                        GroupCount::ToLast(_) => {
                            out.push(Pending::ToLastGroup { toks: inner, raw });
                        }
                        GroupCount::Unspecified => {
                            let sequence = inner
                                .iter()
                                .map(|t| t.text.as_str())
                                .collect::<Vec<_>>()
                                .join(", ");
                            let times = self.structure.inline_times_for(&sequence).ok_or_else(
                                || ExpandError::UnresolvedRepeat {
                                    row,
                                    group: raw.clone(),
                                    reason: "no multiplier in the row or the structure model"
                                        .to_string(),
                                },
                            )?;
                            for _ in 0..times {
                                out.extend(inner.iter().cloned().map(Pending::Fixed));
                            }
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    /// Group interiors must be fully literal; nested count-dependent
    /// constructs have no defined expansion order.
    fn resolve_group_tokens(
        &self,
        toks: Vec<RowToken>,
        row: u32,
        group_raw: &str,
    ) -> Result<Vec<ResolvedTok>, ExpandError> {
        let mut out = Vec::new();
        for token in toks {
            match token {
                RowToken::Literal(text) => out.push(self.resolve_literal(&text, row)?),
                RowToken::Placeholder { .. } | RowToken::Group { .. } => {
                    return Err(ExpandError::UnresolvedRepeat {
                        row,
                        group: group_raw.to_string(),
                        reason: "repeat group contains a nested count-dependent construct"
                            .to_string(),
                    });
                }
            }
        }
        Ok(out)
    }

    /// Resolves at most one count-dependent construct per row using
    /// `remaining = current − Σ used(before) − Σ used(after)`. Only
    /// `stitchesUsed` counts toward either side; zero-consumption tokens
    /// such as `yo` reserve nothing.
    fn resolve_pending(
        &self,
        pending: Vec<Pending>,
        row: u32,
        current: u32,
    ) -> Result<Vec<ResolvedTok>, ExpandError> {
        let dependent = pending
            .iter()
            .filter(|p| !matches!(p, Pending::Fixed(_)))
            .count();
        if dependent > 1 {
            let raw = pending
                .iter()
                .find_map(|p| match p {
                    Pending::Placeholder { raw, .. } | Pending::ToLastGroup { raw, .. } => {
                        Some(raw.clone())
                    }
                    Pending::Fixed(_) => None,
                })
                .unwrap_or_default();
            return Err(ExpandError::VariableResolution {
                row,
                placeholder: raw,
                reason: "row contains more than one count-dependent construct".to_string(),
            });
        }

        let used_of = |p: &Pending| -> u32 {
            match p {
                Pending::Fixed(t) => t.used,
                _ => 0,
            }
        };

        let mut out = Vec::with_capacity(pending.len());
        for (idx, item) in pending.iter().enumerate() {
            match item {
                Pending::Fixed(tok) => out.push(tok.clone()),
                Pending::Placeholder { base, raw } => {
                    let before: u32 = pending[..idx].iter().map(used_of).sum();
                    let after: u32 = pending[idx + 1..].iter().map(used_of).sum();
                    let remaining = current.checked_sub(before + after).ok_or_else(|| {
                        ExpandError::VariableResolution {
                            row,
                            placeholder: raw.clone(),
                            reason: format!(
                                "needs {} reserved stitches but only {current} are on the needle",
                                before + after
                            ),
                        }
                    })?;
                    if remaining > 0 {
                        let tok = self.resolve_literal(base, row)?;
                        out.push(ResolvedTok {
                            text: format!("{base}{remaining}"),
                            used: tok.used * remaining,
                            delta: tok.delta * i64::from(remaining),
                        });
                    }
                }
                Pending::ToLastGroup { toks, raw } => {
                    let before: u32 = pending[..idx].iter().map(used_of).sum();
                    let after: u32 = pending[idx + 1..].iter().map(used_of).sum();
                    let per_rep: u32 = toks.iter().map(|t| t.used).sum();
                    if per_rep == 0 {
                        return Err(ExpandError::UnresolvedRepeat {
                            row,
                            group: raw.clone(),
                            reason: "group consumes no stitches, repetition count is unbounded"
                                .to_string(),
                        });
                    }
                    let avail = current.checked_sub(before + after).ok_or_else(|| {
                        ExpandError::VariableResolution {
                            row,
                            placeholder: raw.clone(),
                            reason: format!(
                                "needs {} reserved stitches but only {current} are on the needle",
                                before + after
                            ),
                        }
                    })?;
                    if avail % per_rep != 0 {
                        return Err(ExpandError::VariableResolution {
                            row,
                            placeholder: raw.clone(),
                            reason: format!(
                                "{avail} available stitches do not divide evenly by the group's {per_rep}"
                            ),
                        });
                    }
                    for _ in 0..avail / per_rep {
                        out.extend(toks.iter().cloned());
                    }
                }
            }
        }
        Ok(out)
    }

    /// Resolves one literal segment: exact glossary match first, then an
    /// abbreviation-with-count form (`k2` = knit twice).
    fn resolve_literal(&self, text: &str, row: u32) -> Result<ResolvedTok, ExpandError> {
        let text = text.trim();
        if let Some(entry) = self.glossary.get(text) {
            return Ok(ResolvedTok {
                text: text.to_string(),
                used: entry.stitches_used,
                delta: entry.net_change(),
            });
        }

        if let Some((abbrev, reps)) = split_counted(text) {
            if let Some(entry) = self.glossary.get(abbrev) {
                return Ok(ResolvedTok {
                    text: text.to_string(),
                    used: entry.stitches_used * reps,
                    delta: entry.net_change() * i64::from(reps),
                });
            }
        }

        Err(ExpandError::UnknownAbbreviation {
            row,
            abbrev: text.to_string(),
        })
    }
}

/// Splits `k2` / `p 3` into an abbreviation and a repetition count. Tokens
/// with trailing letters after the digits (`k2tog`) do not split; they must
/// match the glossary exactly.
fn split_counted(text: &str) -> Option<(&str, u32)> {
    let digits_at = text.find(|c: char| c.is_ascii_digit())?;
    let (head, digits) = text.split_at(digits_at);
    if digits.chars().all(|c| c.is_ascii_digit()) {
        let reps: u32 = digits.parse().ok()?;
        let head = head.trim_end();
        if !head.is_empty() && reps > 0 {
            return Some((head, reps));
        }
    }
    None
}
