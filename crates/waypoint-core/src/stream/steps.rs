use std::path::PathBuf;

use serde_json::{Value, json};
use waypoint_types::chain::{Chain, StepSignature};
use waypoint_types::operation::OperationId;
use waypoint_types::record::ReadProgress;

use super::parser::{parse_records, parse_with_header};
use crate::chunk::{ChunkError, read_chunk};
use crate::operation::steps::checkpointed;
use crate::step::{Step, StepCall, StepContext, StepError, StepOutput};

pub const READ_START_STEP: &str = "read_start";
pub const READ_NEXT_STEP: &str = "read_next";
pub const READ_FINISH_CONTINUE_STEP: &str = "read_finish_continue";

pub fn read_start(source: &str) -> StepSignature {
    StepSignature::new(READ_START_STEP).arg(source)
}

pub fn read_next(source: &str) -> StepSignature {
    StepSignature::new(READ_NEXT_STEP).arg(source)
}

/// `read_finish_continue` bound to the terminal `callback`.
pub fn read_finish_continue(callback: &StepSignature, source: &str, id: OperationId) -> StepSignature {
    StepSignature::new(READ_FINISH_CONTINUE_STEP)
        .arg(callback.to_value())
        .arg(source)
        .arg(id.0)
}

fn read_failed(e: ChunkError) -> StepError {
    StepError::ExecutionFailed(e.to_string())
}

fn to_value(progress: &ReadProgress) -> Result<Value, StepError> {
    serde_json::to_value(progress).map_err(|e| StepError::ExecutionFailed(e.to_string()))
}

// ---------------------------------------------------------------------------
// read_start
// ---------------------------------------------------------------------------

/// `read_start(src)`: read the first window, take its header as schema.
pub struct ReadStartStep;

impl Step for ReadStartStep {
    fn name(&self) -> &str {
        READ_START_STEP
    }

    async fn run(&self, call: StepCall, ctx: &StepContext) -> Result<StepOutput, StepError> {
        let source: PathBuf = call.arg_as(0)?;
        let config = ctx.config();

        let chunk = read_chunk(&source, 0, config.read_chunk_size, config.record_delimiter)
            .await
            .map_err(read_failed)?;
        let (schema, records) = parse_with_header(&chunk.content, config.record_delimiter);

        tracing::debug!(
            source = %source.display(),
            fields = schema.len(),
            records = records.len(),
            next_offset = chunk.next_offset,
            "read started"
        );
        to_value(&ReadProgress::pending(schema, chunk.next_offset, records)).map(StepOutput::Value)
    }
}

// ---------------------------------------------------------------------------
// read_next
// ---------------------------------------------------------------------------

/// `read_next(progress, src)`: read one more window.
///
/// Returns the pending 3-list while input remains and the finished 1-list
/// once a read comes back empty. A finished input is passed through.
pub struct ReadNextStep;

impl Step for ReadNextStep {
    fn name(&self) -> &str {
        READ_NEXT_STEP
    }

    async fn run(&self, call: StepCall, ctx: &StepContext) -> Result<StepOutput, StepError> {
        let progress: ReadProgress = call.input_as()?;
        let source: PathBuf = call.arg_as(0)?;
        let config = ctx.config();

        let ReadProgress::Pending(schema, offset, mut records) = progress else {
            return Ok(StepOutput::Value(call.input));
        };

        let chunk = read_chunk(&source, offset, config.read_chunk_size, config.record_delimiter)
            .await
            .map_err(read_failed)?;
        if chunk.is_end() {
            tracing::debug!(source = %source.display(), records = records.len(), "end of input");
            return to_value(&ReadProgress::finished(records)).map(StepOutput::Value);
        }

        let batch = parse_records(&chunk.content, config.record_delimiter, &schema);
        tracing::trace!(
            source = %source.display(),
            offset,
            next_offset = chunk.next_offset,
            batch = batch.len(),
            "read next window"
        );
        records.extend(batch);
        to_value(&ReadProgress::pending(schema, chunk.next_offset, records)).map(StepOutput::Value)
    }
}

// ---------------------------------------------------------------------------
// read_finish_continue
// ---------------------------------------------------------------------------

/// `read_finish_continue(progress, callback, src, op)`: decide whether to
/// keep reading.
///
/// Pending progress resubmits a checkpointed `read_next | read_finish_continue`
/// chain seeded with that progress. Finished progress submits `callback` with
/// the final records. Either way the follow-up runs as a new chain.
pub struct ReadFinishContinueStep;

impl Step for ReadFinishContinueStep {
    fn name(&self) -> &str {
        READ_FINISH_CONTINUE_STEP
    }

    async fn run(&self, call: StepCall, ctx: &StepContext) -> Result<StepOutput, StepError> {
        let progress: ReadProgress = call.input_as()?;
        let callback: StepSignature = call.arg_as(0)?;
        let source: String = call.arg_as(1)?;
        let id: OperationId = call.arg_as(2)?;
        let interval = ctx.config().checkpoint_interval;

        let (chain, input, status) = match progress {
            ReadProgress::Pending(..) => {
                let chain = Chain::default()
                    .then(read_next(&source))
                    .then(read_finish_continue(&callback, &source, id));
                (chain, call.input, "continuing reading")
            }
            ReadProgress::Finished((records,)) => {
                let records = serde_json::to_value(records)
                    .map_err(|e| StepError::ExecutionFailed(e.to_string()))?;
                (Chain::default().then(callback), records, "finished reading")
            }
        };

        let chain = checkpointed(&chain, id, interval)
            .map_err(|e| StepError::Dispatch(e.to_string()))?;
        let handle = ctx
            .dispatcher()
            .submit(chain, input)
            .map_err(|e| StepError::Dispatch(e.to_string()))?;

        tracing::debug!(
            operation_id = %id,
            job_id = %handle.job_id(),
            status,
            "streaming continuation submitted"
        );
        Ok(StepOutput::Value(json!(status)))
    }
}
