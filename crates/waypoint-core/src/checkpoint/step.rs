//! Runtime behavior of a checkpoint marker.

use serde_json::Value;
use waypoint_types::chain::{CHECKPOINT_STEP, HANDLER_KWARG, PREDICATE_KWARG, StepSignature};

use crate::chain;
use crate::step::{Step, StepCall, StepContext, StepError, StepOutput};

/// Polls the pause predicate and persists the remaining suffix on a pause
/// verdict.
///
/// A "continue" verdict returns the running value untouched. A pause verdict
/// invokes the handler inline with `(running_value, remaining)` and halts the
/// chain only after the handler returned successfully; a handler error fails
/// the step and the suffix is neither persisted nor discarded.
pub struct CheckpointStep;

impl Step for CheckpointStep {
    fn name(&self) -> &str {
        CHECKPOINT_STEP
    }

    async fn run(&self, call: StepCall, ctx: &StepContext) -> Result<StepOutput, StepError> {
        let predicate: StepSignature = call.kwarg_as(PREDICATE_KWARG)?;
        let handler: StepSignature = call.kwarg_as(HANDLER_KWARG)?;

        let verdict = ctx.invoke(&predicate, call.input.clone(), Vec::new()).await?;
        let pause = match verdict {
            StepOutput::Value(Value::Bool(pause)) => pause,
            StepOutput::Value(other) => {
                return Err(StepError::InvalidInput(format!(
                    "pause predicate '{}' returned {other}, expected a boolean",
                    predicate.step_name
                )));
            }
            StepOutput::Halt => {
                return Err(StepError::InvalidInput(format!(
                    "pause predicate '{}' halted instead of returning a verdict",
                    predicate.step_name
                )));
            }
        };

        if !pause {
            return Ok(StepOutput::Value(call.input));
        }

        let remaining = chain::serialize(ctx.remaining());
        tracing::debug!(
            job_id = %ctx.job_id(),
            position = ctx.position(),
            remaining = ctx.remaining().len(),
            "pause verdict, handing remaining chain to handler"
        );
        ctx.invoke(&handler, call.input, vec![remaining]).await?;

        Ok(StepOutput::Halt)
    }
}
