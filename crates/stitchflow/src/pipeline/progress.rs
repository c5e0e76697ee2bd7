use super::error::Pass;

/// Events emitted by the pipeline during a run. Step content is omitted
/// from events (can be large); hosts read it from the returned context.
pub enum ProgressEvent {
    PassStarted { pass: Pass },
    Completed { max_steps: u32 },
    Failed { pass: Pass, error: String },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests and batch runs.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}
