pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod runner;

pub use config::PipelineConfig;
pub use context::ProcessingContext;
pub use error::{Pass, PassError, PipelineError};
pub use progress::{NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::{Pipeline, RunOutcome};
