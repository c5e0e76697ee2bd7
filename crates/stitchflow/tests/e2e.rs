//! End-to-end tests for the pattern normalization pipeline.
//!
//! Data-driven: each case is a raw pattern plus the properties its
//! normalized document must satisfy. Adding a case is one entry in the
//! `TEST_CASES` array.

use std::fs;

use tempfile::TempDir;

use stitchflow::{
    check_continuity, NoopProgress, NormalizedPatternDocument, Pipeline, PipelineConfig,
    RuleScanner, StepKind,
};

/// Represents a single end-to-end test case.
struct TestCase {
    /// Unique name for the test case
    name: &'static str,
    /// Raw pattern text as a designer would write it
    pattern: &'static str,
    /// Expected total number of enumerated steps
    expected_steps: u32,
    /// Expected ending count of the last count-bearing step
    expected_final_count: u32,
    /// Instructions that must appear verbatim in the steps
    expected_instructions: &'static [&'static str],
}

const TEST_CASES: &[TestCase] = &[
    TestCase {
        name: "plain_garter_swatch",
        pattern: "Cast on 12 sts\n\
                  Row 1: k12\n\
                  Row 2: k12\n\
                  Bind off all sts.",
        expected_steps: 4,
        expected_final_count: 12,
        expected_instructions: &["k12"],
    },
    TestCase {
        name: "increase_row_with_placeholder",
        pattern: "Cast on 10 sts\n\
                  Row 1 (RS): k2, yo, k to end\n\
                  Row 2 (WS): p to end\n\
                  Bind off all sts.",
        expected_steps: 4,
        expected_final_count: 11,
        expected_instructions: &["k2, yo, k8", "p11"],
    },
    TestCase {
        name: "row_repeat_with_sections",
        pattern: "Cast on 8 sts\n\
                  \n\
                  Main Body:\n\
                  Row 1 (RS): k8\n\
                  Row 2 (WS): p8\n\
                  Repeat rows 1-2 four more times.\n\
                  \n\
                  Bind off all sts.",
        expected_steps: 12,
        expected_final_count: 8,
        expected_instructions: &["k8", "p8"],
    },
    TestCase {
        name: "inline_repeat_lace_row",
        pattern: "Cast on 12 sts\n\
                  Row 1: k2, (yo, ssk) 4 times, k to end\n\
                  Row 2: p to end\n\
                  Bind off all sts.",
        expected_steps: 4,
        expected_final_count: 12,
        expected_instructions: &["k2, yo, ssk, yo, ssk, yo, ssk, yo, ssk, k2"],
    },
    TestCase {
        name: "shaped_edge_to_last",
        pattern: "Cast on 10 sts\n\
                  Row 1: k to last 2 sts, kfb, k1\n\
                  Row 2: p to end\n\
                  Bind off all sts.",
        expected_steps: 4,
        expected_final_count: 11,
        expected_instructions: &["k8, kfb, k1", "p11"],
    },
];

fn normalize(pattern: &str, name: &str) -> NormalizedPatternDocument {
    let pipeline = Pipeline::new(RuleScanner, PipelineConfig::default());
    let (outcome, _ctx) = pipeline.normalize(pattern, name, "Test Author", &NoopProgress);
    assert!(
        outcome.success,
        "{name}: pipeline failed: {:?} in {:?}",
        outcome.error, outcome.failed_pass
    );
    outcome.data.unwrap()
}

#[test]
fn test_cases_normalize_with_expected_shape() {
    for case in TEST_CASES {
        let doc = normalize(case.pattern, case.name);

        assert_eq!(
            doc.metadata.max_steps, case.expected_steps,
            "{}: step count",
            case.name
        );
        assert_eq!(doc.steps.len() as u32, doc.metadata.max_steps, "{}", case.name);

        // gapless numbering from 1
        for (i, step) in doc.steps.iter().enumerate() {
            assert_eq!(step.step, i as u32 + 1, "{}: numbering", case.name);
        }

        // the validated invariant holds on the artifact too
        check_continuity(&doc.steps).unwrap_or_else(|e| panic!("{}: {e}", case.name));

        let last_count = doc
            .steps
            .iter()
            .rev()
            .find_map(|s| s.ending_stitch_count)
            .unwrap();
        assert_eq!(last_count, case.expected_final_count, "{}: final count", case.name);

        for wanted in case.expected_instructions {
            assert!(
                doc.steps.iter().any(|s| s.instruction == *wanted),
                "{}: no step with instruction {wanted:?}",
                case.name
            );
        }
    }
}

#[test]
fn artifact_survives_a_filesystem_round_trip() {
    let doc = normalize(TEST_CASES[1].pattern, "round_trip");
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pattern.json");

    fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
    let reloaded: NormalizedPatternDocument =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(reloaded, doc);
}

#[test]
fn artifact_uses_established_wire_keys() {
    let doc = normalize(TEST_CASES[1].pattern, "wire_keys");
    let json = serde_json::to_value(&doc).unwrap();

    assert_eq!(json["metadata"]["maxSteps"], 4);
    assert_eq!(json["metadata"]["craft"], "knitting");
    assert_eq!(json["steps"][0]["type"], "specialInstruction");
    assert_eq!(json["steps"][1]["type"], "regular");
    assert_eq!(json["steps"][1]["startingStitchCount"], 10);
    assert_eq!(json["steps"][1]["endingStitchCount"], 11);
    assert_eq!(json["glossary"]["yo"]["stitchesUsed"], 0);
    assert_eq!(json["glossary"]["yo"]["stitchesCreated"], 1);
}

#[test]
fn sectioned_repeat_labels_each_pass() {
    let doc = normalize(TEST_CASES[2].pattern, "repeat_labels");
    let labels: Vec<_> = doc
        .steps
        .iter()
        .filter(|s| s.kind == StepKind::Regular)
        .map(|s| s.section.as_str())
        .collect();
    assert_eq!(labels.len(), 10);
    assert_eq!(labels[0], "Main Body - Repeat 1");
    assert_eq!(labels[1], "Main Body - Repeat 1");
    assert_eq!(labels[9], "Main Body - Repeat 5");
}

#[test]
fn bind_off_closes_without_counts() {
    let doc = normalize(TEST_CASES[0].pattern, "bind_off");
    let last = doc.steps.last().unwrap();
    assert_eq!(last.kind, StepKind::SpecialInstruction);
    assert!(last.instruction.to_lowercase().contains("bind off"));
    assert_eq!(last.starting_stitch_count, None);
    assert_eq!(last.ending_stitch_count, None);
    assert_eq!(last.side, None);
}

#[test]
fn broken_arithmetic_is_rejected_not_emitted() {
    // claims don't matter; k2tog on 4 sts after k3 underflows
    let pattern = "Cast on 4 sts\nRow 1: k3, k2tog\nBind off all sts.";
    let pipeline = Pipeline::new(RuleScanner, PipelineConfig::default());
    let (outcome, _) = pipeline.normalize(pattern, "broken", "Test Author", &NoopProgress);
    assert!(!outcome.success);
    assert_eq!(outcome.failed_pass.as_deref(), Some("section_processing"));
}
