//! Continuity validation: every step's ending count must equal the next
//! count-bearing step's starting count.

use crate::document::StepRecord;
use crate::error::ContinuityError;

/// Scans the sequence pairwise and fails fast on the first violation.
///
/// Special-instruction steps without counts (bind-off and similar) do not
/// participate; the last known ending count is carried across them. An empty
/// sequence is vacuously continuous.
pub fn check_continuity(steps: &[StepRecord]) -> Result<(), ContinuityError> {
    let mut last: Option<(u32, u32)> = None;

    for step in steps {
        if let (Some(starting), Some((prev_step, ending))) = (step.starting_stitch_count, last) {
            if ending != starting {
                return Err(ContinuityError {
                    step_a: prev_step,
                    step_b: step.step,
                    ending,
                    starting,
                });
            }
        }
        if let Some(ending) = step.ending_stitch_count {
            last = Some((step.step, ending));
        }
    }

    Ok(())
}
