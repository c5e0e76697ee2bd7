/// Knobs for one pipeline instance.
pub struct PipelineConfig {
    /// Craft tag written into the document metadata.
    pub craft: String,
    /// When true, the interpreter drafts the enumerated steps and the
    /// expansion engine only reconciles its arithmetic. When false, the
    /// engine expands directly from the structure model and glossary.
    pub use_interpreter_rows: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            craft: "knitting".to_string(),
            use_interpreter_rows: true,
        }
    }
}
