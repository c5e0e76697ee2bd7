//! Token-stream intermediate representation for a single row. Expansion and
//! resolution operate on this structured form, never on regex substitution
//! over the raw string, so repeat expansion and variable resolution cannot
//! race on ordering.

use std::sync::LazyLock;

use regex::Regex;

static RE_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z]+)\s+to\s+(?:end|marker|last\s+\d+\s+sts?)$").unwrap()
});
static RE_GROUP_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:x\s*(\d+)|(\d+|[a-z]+)\s+times|to\s+last\s+(\d+)\s+sts?|to\s+end)$")
        .unwrap()
});

/// Multiplier attached to a bracketed/parenthesized group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupCount {
    /// Explicit repetition count: `(yo, ssk) 6 times`, `[k1, p1] x3`.
    Times(u32),
    /// Repeat until N stitches remain for the trailing tokens:
    /// `[yo, k3tog, yo, k1] to last 3 sts`. `ToLast(0)` is "to end".
    ToLast(u32),
    /// No multiplier in the row text; may still be supplied by the
    /// structure model's inline-repeat specs.
    Unspecified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowToken {
    /// A literal abbreviation segment, e.g. `k2`, `kfb`, `k2tog tbl`.
    Literal(String),
    /// A count-dependent placeholder, e.g. `k to end`, `purl to marker`,
    /// `k to last 2 sts`. `base` is the normalized single-stitch
    /// abbreviation to repeat.
    Placeholder { base: String, raw: String },
    /// A repeated token sequence within the row.
    Group {
        tokens: Vec<RowToken>,
        count: GroupCount,
        raw: String,
    },
}

/// Spelled-out repetition counts as they appear in hand-written patterns.
pub(crate) fn parse_count_word(word: &str) -> Option<u32> {
    const WORDS: &[&str] = &[
        "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
        "twelve",
    ];
    let lower = word.to_lowercase();
    if let Ok(n) = lower.parse() {
        return Some(n);
    }
    WORDS
        .iter()
        .position(|w| *w == lower)
        .map(|i| i as u32 + 1)
}

/// Splits a row body into tokens. Commas inside brackets belong to the
/// group, not the row. A trailing period is noise from the source text.
pub fn tokenize(body: &str) -> Vec<RowToken> {
    let body = body.trim().trim_end_matches('.');
    split_top_level(body)
        .into_iter()
        .filter_map(parse_segment)
        .collect()
}

fn split_top_level(body: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0u32;
    let mut start = 0usize;
    for (i, c) in body.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                segments.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&body[start..]);
    segments
}

fn parse_segment(segment: &str) -> Option<RowToken> {
    let segment = segment.trim();
    if segment.is_empty() {
        return None;
    }

    if let Some(open) = segment.find(['(', '[']) {
        if open == 0 {
            return parse_group(segment);
        }
    }

    if let Some(caps) = RE_PLACEHOLDER.captures(segment) {
        let base = match caps[1].to_lowercase().as_str() {
            "knit" => "k".to_string(),
            "purl" => "p".to_string(),
            other => other.to_string(),
        };
        return Some(RowToken::Placeholder {
            base,
            raw: segment.to_string(),
        });
    }

    Some(RowToken::Literal(segment.to_string()))
}

fn parse_group(segment: &str) -> Option<RowToken> {
    let open = segment.chars().next()?;
    let close = if open == '(' { ')' } else { ']' };

    let mut depth = 0u32;
    let mut close_idx = None;
    for (i, c) in segment.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                close_idx = Some(i);
                break;
            }
        }
    }
    // Unbalanced bracket: fall back to treating the segment as a literal so
    // the glossary lookup reports it instead of silently dropping tokens.
    let close_idx = match close_idx {
        Some(i) => i,
        None => return Some(RowToken::Literal(segment.to_string())),
    };

    let inner = &segment[open.len_utf8()..close_idx];
    let suffix = segment[close_idx + close.len_utf8()..].trim();

    let count = if suffix.is_empty() {
        GroupCount::Unspecified
    } else if let Some(caps) = RE_GROUP_SUFFIX.captures(suffix) {
        if let Some(n) = caps.get(1) {
            n.as_str().parse().map_or(GroupCount::Unspecified, GroupCount::Times)
        } else if let Some(w) = caps.get(2) {
            parse_count_word(w.as_str()).map_or(GroupCount::Unspecified, GroupCount::Times)
        } else if let Some(n) = caps.get(3) {
            n.as_str().parse().map_or(GroupCount::Unspecified, GroupCount::ToLast)
        } else {
            GroupCount::ToLast(0)
        }
    } else {
        GroupCount::Unspecified
    };

    Some(RowToken::Group {
        tokens: tokenize(inner),
        count,
        raw: segment.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_literals_and_placeholder() {
        let toks = tokenize("k2, yo, k to end");
        assert_eq!(toks.len(), 3);
        assert_eq!(toks[0], RowToken::Literal("k2".into()));
        assert_eq!(toks[1], RowToken::Literal("yo".into()));
        assert_eq!(
            toks[2],
            RowToken::Placeholder {
                base: "k".into(),
                raw: "k to end".into()
            }
        );
    }

    #[test]
    fn normalizes_spelled_out_placeholder_bases() {
        let toks = tokenize("knit to end");
        assert_eq!(
            toks[0],
            RowToken::Placeholder {
                base: "k".into(),
                raw: "knit to end".into()
            }
        );
        let toks = tokenize("purl to marker");
        assert!(matches!(&toks[0], RowToken::Placeholder { base, .. } if base == "p"));
    }

    #[test]
    fn to_last_is_a_placeholder() {
        let toks = tokenize("k to last 2 sts, kfb, p1");
        assert_eq!(toks.len(), 3);
        assert!(matches!(&toks[0], RowToken::Placeholder { base, .. } if base == "k"));
    }

    #[test]
    fn parses_group_with_times_suffix() {
        let toks = tokenize("k2, (yo, ssk) 6 times, k2");
        assert_eq!(toks.len(), 3);
        match &toks[1] {
            RowToken::Group { tokens, count, .. } => {
                assert_eq!(tokens.len(), 2);
                assert_eq!(*count, GroupCount::Times(6));
            }
            other => panic!("expected group, got {other:?}"),
        }
    }

    #[test]
    fn parses_group_with_x_multiplier_and_word_counts() {
        let toks = tokenize("[k1, p1] x3");
        assert!(matches!(
            &toks[0],
            RowToken::Group { count: GroupCount::Times(3), .. }
        ));
        let toks = tokenize("[yo, ssk] six times");
        assert!(matches!(
            &toks[0],
            RowToken::Group { count: GroupCount::Times(6), .. }
        ));
    }

    #[test]
    fn parses_group_repeated_to_last() {
        let toks = tokenize("k3, [yo, k3tog, yo, k1] to last 3 sts, yo, k2, p1");
        match &toks[1] {
            RowToken::Group { tokens, count, .. } => {
                assert_eq!(tokens.len(), 4);
                assert_eq!(*count, GroupCount::ToLast(3));
            }
            other => panic!("expected group, got {other:?}"),
        }
    }

    #[test]
    fn group_without_multiplier_is_unspecified() {
        let toks = tokenize("(yo, ssk)");
        assert!(matches!(
            &toks[0],
            RowToken::Group { count: GroupCount::Unspecified, .. }
        ));
    }

    #[test]
    fn trailing_period_is_stripped() {
        let toks = tokenize("k1, kfb, k1.");
        assert_eq!(toks.len(), 3);
        assert_eq!(toks[2], RowToken::Literal("k1".into()));
    }

    #[test]
    fn count_words() {
        assert_eq!(parse_count_word("five"), Some(5));
        assert_eq!(parse_count_word("12"), Some(12));
        assert_eq!(parse_count_word("Twice"), None);
    }
}
