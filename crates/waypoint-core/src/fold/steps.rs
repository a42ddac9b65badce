use serde_json::json;
use waypoint_types::chain::StepSignature;
use waypoint_types::operation::OperationId;
use waypoint_types::record::Record;

use super::{Tally, TallySpec, build_fold_chain};
use crate::chain::ChainError;
use crate::step::{Step, StepCall, StepContext, StepError, StepOutput};

pub const TALLY_STEP: &str = "tally";
pub const START_PARSING_STEP: &str = "start_parsing";

const GROUP_BY_KWARG: &str = "group_by";
const COUNT_BY_KWARG: &str = "count_by";

fn with_spec(signature: StepSignature, spec: &TallySpec) -> StepSignature {
    signature
        .kwarg(GROUP_BY_KWARG, spec.group_by.as_str())
        .kwarg(COUNT_BY_KWARG, spec.count_by.as_str())
}

fn spec_of(call: &StepCall) -> Result<TallySpec, StepError> {
    Ok(TallySpec::new(
        call.kwarg_as::<String>(GROUP_BY_KWARG)?,
        call.kwarg_as::<String>(COUNT_BY_KWARG)?,
    ))
}

/// `tally(acc, slice)` signature for one fold slice.
pub fn tally(slice: &[Record], spec: &TallySpec) -> Result<StepSignature, ChainError> {
    let slice = serde_json::to_value(slice).map_err(|e| ChainError::Encode(e.to_string()))?;
    Ok(with_spec(StepSignature::new(TALLY_STEP).arg(slice), spec))
}

/// Streaming callback that starts the fold for operation `id`.
pub fn start_parsing(id: OperationId, spec: &TallySpec) -> StepSignature {
    with_spec(StepSignature::new(START_PARSING_STEP).arg(id.0), spec)
}

/// `tally(acc, slice)`: count one slice into the accumulator.
pub struct TallyStep;

impl Step for TallyStep {
    fn name(&self) -> &str {
        TALLY_STEP
    }

    async fn run(&self, call: StepCall, _ctx: &StepContext) -> Result<StepOutput, StepError> {
        let spec = spec_of(&call)?;
        let acc: Tally = call.input_as()?;
        let slice: Vec<Record> = call.arg_as(0)?;

        let acc = spec.apply(acc, &slice);
        serde_json::to_value(acc)
            .map(StepOutput::Value)
            .map_err(|e| StepError::ExecutionFailed(e.to_string()))
    }
}

/// `start_parsing(records, op)`: seed the accumulator and submit the fold
/// chain, split into `parse_chunk_amount` slices and checkpointed every
/// `fold_checkpoint_interval` steps.
pub struct StartParsingStep;

impl Step for StartParsingStep {
    fn name(&self) -> &str {
        START_PARSING_STEP
    }

    async fn run(&self, call: StepCall, ctx: &StepContext) -> Result<StepOutput, StepError> {
        let spec = spec_of(&call)?;
        let records: Vec<Record> = call.input_as()?;
        let id: OperationId = call.arg_as(0)?;
        let config = ctx.config();

        let seed = spec.seed(&records);
        let chain = build_fold_chain(
            &records,
            config.parse_chunk_amount,
            &spec,
            id,
            config.fold_checkpoint_interval,
        )
        .map_err(|e| StepError::Dispatch(e.to_string()))?;
        let seed = serde_json::to_value(seed).map_err(|e| StepError::ExecutionFailed(e.to_string()))?;

        let handle = ctx
            .dispatcher()
            .submit(chain, seed)
            .map_err(|e| StepError::Dispatch(e.to_string()))?;
        tracing::debug!(
            operation_id = %id,
            job_id = %handle.job_id(),
            records = records.len(),
            slices = config.parse_chunk_amount,
            "fold submitted"
        );
        Ok(StepOutput::Value(json!("started parsing")))
    }
}
