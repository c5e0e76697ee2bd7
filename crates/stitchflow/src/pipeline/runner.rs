use serde::Serialize;
use tracing::{debug, info_span, warn};

use crate::document::{NormalizedPatternDocument, PatternMetadata, StepRecord};
use crate::expand::Expander;
use crate::glossary::Glossary;
use crate::interpreter::{response, PatternInterpreter};
use crate::structure::StructureModel;
use crate::validate;

use super::config::PipelineConfig;
use super::context::ProcessingContext;
use super::error::{Pass, PassError, PipelineError};
use super::progress::{ProgressEvent, ProgressReporter};

/// Outcome envelope for one run. Serializes to the established result
/// format: `success`, `data` on success, `error` and the failing `step`
/// on failure.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<NormalizedPatternDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "step", skip_serializing_if = "Option::is_none")]
    pub failed_pass: Option<String>,
}

impl RunOutcome {
    fn success(document: NormalizedPatternDocument) -> Self {
        Self {
            success: true,
            data: Some(document),
            error: None,
            failed_pass: None,
        }
    }

    fn failure(error: &PipelineError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.source.to_string()),
            failed_pass: Some(error.pass.as_str().to_string()),
        }
    }
}

pub struct Pipeline<I: PatternInterpreter> {
    interpreter: I,
    config: PipelineConfig,
}

impl<I: PatternInterpreter> Pipeline<I> {
    pub fn new(interpreter: I, config: PipelineConfig) -> Self {
        Self {
            interpreter,
            config,
        }
    }

    /// Convenience entry point: builds metadata and a fresh context, then
    /// runs the four passes.
    pub fn normalize(
        &self,
        text: &str,
        name: &str,
        author: &str,
        progress: &dyn ProgressReporter,
    ) -> (RunOutcome, ProcessingContext) {
        let metadata = PatternMetadata::new(name, author, self.config.craft.clone());
        self.run(ProcessingContext::new(text, metadata), progress)
    }

    /// Run the full pipeline on one pattern.
    /// Returns a (RunOutcome, ProcessingContext) pair; the context carries
    /// whatever intermediates were produced before any failure.
    pub fn run(
        &self,
        mut ctx: ProcessingContext,
        progress: &dyn ProgressReporter,
    ) -> (RunOutcome, ProcessingContext) {
        let _pipeline_span = info_span!("pipeline", pattern = %ctx.metadata.name).entered();

        // Pass 1: structure analysis
        let structure = {
            let _pass = info_span!("structure_analysis").entered();
            progress.report(ProgressEvent::PassStarted {
                pass: Pass::StructureAnalysis,
            });
            match self.pass_structure(&ctx.original_text) {
                Ok(structure) => structure,
                Err(e) => return self.fail(ctx, Pass::StructureAnalysis, e, progress),
            }
        };
        ctx.structure = Some(structure.clone());

        // Pass 2: glossary building
        let glossary = {
            let _pass = info_span!("glossary_building").entered();
            progress.report(ProgressEvent::PassStarted {
                pass: Pass::GlossaryBuilding,
            });
            match self.pass_glossary(&ctx.original_text, &structure) {
                Ok(glossary) => glossary,
                Err(e) => return self.fail(ctx, Pass::GlossaryBuilding, e, progress),
            }
        };
        ctx.glossary = Some(glossary.clone());

        // Pass 3: section processing
        let steps = {
            let _pass = info_span!("section_processing").entered();
            progress.report(ProgressEvent::PassStarted {
                pass: Pass::SectionProcessing,
            });
            match self.pass_sections(&ctx.original_text, &structure, &glossary) {
                Ok(steps) => steps,
                Err(e) => return self.fail(ctx, Pass::SectionProcessing, e, progress),
            }
        };
        ctx.steps = Some(steps.clone());

        // Pass 4: validation and assembly
        let document = {
            let _pass = info_span!("validation_assembly").entered();
            progress.report(ProgressEvent::PassStarted {
                pass: Pass::ValidationAssembly,
            });
            match self.pass_validate_assemble(ctx.metadata.clone(), glossary, steps) {
                Ok(document) => document,
                Err(e) => return self.fail(ctx, Pass::ValidationAssembly, e, progress),
            }
        };

        progress.report(ProgressEvent::Completed {
            max_steps: document.metadata.max_steps,
        });
        debug!(max_steps = document.metadata.max_steps, "pipeline complete");
        (RunOutcome::success(document), ctx)
    }

    fn fail(
        &self,
        ctx: ProcessingContext,
        pass: Pass,
        source: PassError,
        progress: &dyn ProgressReporter,
    ) -> (RunOutcome, ProcessingContext) {
        let error = PipelineError { pass, source };
        warn!(%error, "pipeline failed");
        progress.report(ProgressEvent::Failed {
            pass,
            error: error.source.to_string(),
        });
        (RunOutcome::failure(&error), ctx)
    }

    fn pass_structure(&self, text: &str) -> Result<StructureModel, PassError> {
        let reply = self.interpreter.analyze_structure(text)?;
        Ok(response::parse_structure(&reply)?)
    }

    fn pass_glossary(
        &self,
        text: &str,
        structure: &StructureModel,
    ) -> Result<Glossary, PassError> {
        let reply = self.interpreter.build_glossary(text, structure)?;
        Ok(response::parse_glossary(&reply)?)
    }

    /// Interpreter-drafted steps are reconciled against the glossary; the
    /// direct path expands without consulting the interpreter at all.
    fn pass_sections(
        &self,
        text: &str,
        structure: &StructureModel,
        glossary: &Glossary,
    ) -> Result<Vec<StepRecord>, PassError> {
        let expander = Expander::new(structure, glossary);
        if self.config.use_interpreter_rows {
            let reply = self
                .interpreter
                .process_sections(text, structure, glossary)?;
            let steps = response::parse_steps(&reply)?;
            Ok(expander.reconcile(steps)?)
        } else {
            Ok(expander.expand(text)?)
        }
    }

    fn pass_validate_assemble(
        &self,
        metadata: PatternMetadata,
        glossary: Glossary,
        steps: Vec<StepRecord>,
    ) -> Result<NormalizedPatternDocument, PassError> {
        validate::check_continuity(&steps)?;
        Ok(NormalizedPatternDocument::assemble(metadata, glossary, steps))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::interpreter::{InterpreterError, RuleScanner};
    use crate::pipeline::NoopProgress;

    const SAMPLE: &str = "\
Cast on 10 sts
Row 1 (RS): k1, kfb, k to end
Row 2 (WS): p to end
Repeat rows 1-2 two more times.
Bind off all sts.";

    /// Records pass starts and the terminal event.
    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }

    impl RecordingProgress {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }

        fn take(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ProgressReporter for RecordingProgress {
        fn report(&self, event: ProgressEvent) {
            let label = match event {
                ProgressEvent::PassStarted { pass } => format!("start:{pass}"),
                ProgressEvent::Completed { max_steps } => format!("done:{max_steps}"),
                ProgressEvent::Failed { pass, .. } => format!("fail:{pass}"),
            };
            self.events.lock().unwrap().push(label);
        }
    }

    /// Interpreter whose structure pass always errors out.
    struct BrokenInterpreter;

    impl PatternInterpreter for BrokenInterpreter {
        fn analyze_structure(&self, _raw_text: &str) -> Result<String, InterpreterError> {
            Err(InterpreterError::CallFailed("connection refused".into()))
        }

        fn build_glossary(
            &self,
            _raw_text: &str,
            _structure: &StructureModel,
        ) -> Result<String, InterpreterError> {
            Err(InterpreterError::EmptyReply)
        }

        fn process_sections(
            &self,
            _raw_text: &str,
            _structure: &StructureModel,
            _glossary: &Glossary,
        ) -> Result<String, InterpreterError> {
            Err(InterpreterError::EmptyReply)
        }
    }

    #[test]
    fn successful_run_produces_document() {
        let pipeline = Pipeline::new(RuleScanner, PipelineConfig::default());
        let (outcome, ctx) = pipeline.normalize(SAMPLE, "Swatch", "Tester", &NoopProgress);

        assert!(outcome.success, "outcome: {outcome:?}");
        let doc = outcome.data.unwrap();
        // cast-on + 3 repeats of 2 rows + bind-off
        assert_eq!(doc.metadata.max_steps, 8);
        assert_eq!(doc.metadata.max_steps as usize, doc.steps.len());
        assert_eq!(doc.metadata.name, "Swatch");
        assert_eq!(doc.metadata.craft, "knitting");

        // intermediates survive in the context
        assert!(ctx.structure.is_some());
        assert!(ctx.glossary.is_some());
        assert_eq!(ctx.steps.map(|s| s.len()), Some(8));
    }

    #[test]
    fn direct_expansion_matches_interpreter_path() {
        let via_interpreter = Pipeline::new(RuleScanner, PipelineConfig::default());
        let direct = Pipeline::new(
            RuleScanner,
            PipelineConfig {
                use_interpreter_rows: false,
                ..Default::default()
            },
        );
        let (a, _) = via_interpreter.normalize(SAMPLE, "S", "T", &NoopProgress);
        let (b, _) = direct.normalize(SAMPLE, "S", "T", &NoopProgress);
        assert_eq!(a.data.unwrap().steps, b.data.unwrap().steps);
    }

    #[test]
    fn progress_reports_every_pass_then_completion() {
        let pipeline = Pipeline::new(RuleScanner, PipelineConfig::default());
        let progress = RecordingProgress::new();
        let (outcome, _) = pipeline.normalize(SAMPLE, "Swatch", "Tester", &progress);
        assert!(outcome.success);
        assert_eq!(
            progress.take(),
            vec![
                "start:structure_analysis",
                "start:glossary_building",
                "start:section_processing",
                "start:validation_assembly",
                "done:8",
            ]
        );
    }

    #[test]
    fn interpreter_failure_names_the_pass() {
        let pipeline = Pipeline::new(BrokenInterpreter, PipelineConfig::default());
        let progress = RecordingProgress::new();
        let (outcome, ctx) = pipeline.normalize(SAMPLE, "Swatch", "Tester", &progress);

        assert!(!outcome.success);
        assert_eq!(outcome.failed_pass.as_deref(), Some("structure_analysis"));
        assert!(outcome.error.unwrap().contains("connection refused"));
        assert!(ctx.structure.is_none());
        assert_eq!(
            progress.take(),
            vec!["start:structure_analysis", "fail:structure_analysis"]
        );
    }

    #[test]
    fn missing_cast_on_fails_section_processing() {
        let pipeline = Pipeline::new(RuleScanner, PipelineConfig::default());
        let text = "Row 1: k10\nRow 2: p10";
        let (outcome, ctx) = pipeline.normalize(text, "No Cast On", "Tester", &NoopProgress);

        assert!(!outcome.success);
        assert_eq!(outcome.failed_pass.as_deref(), Some("section_processing"));
        // earlier passes still populated the context
        assert!(ctx.structure.is_some());
        assert!(ctx.glossary.is_some());
        assert!(ctx.steps.is_none());
    }

    #[test]
    fn failure_outcome_serializes_with_step_field() {
        let pipeline = Pipeline::new(BrokenInterpreter, PipelineConfig::default());
        let (outcome, _) = pipeline.normalize(SAMPLE, "S", "T", &NoopProgress);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["step"], "structure_analysis");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn success_outcome_serializes_document_under_data() {
        let pipeline = Pipeline::new(RuleScanner, PipelineConfig::default());
        let (outcome, _) = pipeline.normalize(SAMPLE, "Swatch", "Tester", &NoopProgress);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["metadata"]["maxSteps"], 8);
        assert!(json.get("error").is_none());
    }
}
