//! Steps bound to an operation id: the pause predicate, the pause handler
//! and the terminal completion step.

use std::sync::Arc;

use serde_json::Value;
use waypoint_types::chain::{Chain, StepSignature};
use waypoint_types::error::RepositoryError;
use waypoint_types::operation::{OperationId, OperationStatus};

use super::{OperationLocks, OperationRepository, PayloadStore};
use crate::chain::ChainError;
use crate::checkpoint;
use crate::step::{Step, StepCall, StepContext, StepError, StepOutput};

pub const SHOULD_PAUSE_STEP: &str = "should_pause";
pub const SAVE_STATE_STEP: &str = "save_state";
pub const COMPLETION_STEP: &str = "completion";

/// Predicate signature polling the status of `id`.
pub fn pause_predicate(id: OperationId) -> StepSignature {
    StepSignature::new(SHOULD_PAUSE_STEP).arg(id.0)
}

/// Handler signature persisting the state of `id`.
pub fn pause_handler(id: OperationId) -> StepSignature {
    StepSignature::new(SAVE_STATE_STEP).arg(id.0)
}

/// Terminal step of every operation chain.
pub fn completion(id: OperationId) -> StepSignature {
    StepSignature::new(COMPLETION_STEP).arg(id.0)
}

/// `chain` with checkpoints for operation `id` every `interval` steps.
pub fn checkpointed(chain: &Chain, id: OperationId, interval: usize) -> Result<Chain, ChainError> {
    checkpoint::inject(chain, &pause_predicate(id), &pause_handler(id), interval)
}

fn persistence(id: OperationId, what: &str, e: RepositoryError) -> StepError {
    tracing::error!(operation_id = %id, error = %e, "failed to {what}");
    StepError::Persistence(format!("operation {id}: failed to {what}: {e}"))
}

// ---------------------------------------------------------------------------
// should_pause
// ---------------------------------------------------------------------------

/// `should_pause(op_id)`: true iff the operation is `REQUESTING_PAUSE` right now.
pub struct ShouldPauseStep<R: OperationRepository> {
    repo: Arc<R>,
}

impl<R: OperationRepository> ShouldPauseStep<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

impl<R: OperationRepository> Step for ShouldPauseStep<R> {
    fn name(&self) -> &str {
        SHOULD_PAUSE_STEP
    }

    async fn run(&self, call: StepCall, _ctx: &StepContext) -> Result<StepOutput, StepError> {
        let id: OperationId = call.arg_as(0)?;
        let operation = self
            .repo
            .get(id)
            .await
            .map_err(|e| persistence(id, "read status", e))?
            .ok_or_else(|| StepError::InvalidInput(format!("operation {id} not found")))?;

        Ok(StepOutput::Value(Value::Bool(
            operation.status == OperationStatus::RequestingPause,
        )))
    }
}

// ---------------------------------------------------------------------------
// save_state
// ---------------------------------------------------------------------------

/// `save_state(running_value, remaining, op_id)`: the pause handler.
///
/// Writes the remaining chain, then the running value, then commits
/// `REQUESTING_PAUSE -> PAUSED` on the record. The record update is the only
/// commit point: if any write fails the status stays `REQUESTING_PAUSE` and
/// the step fails.
pub struct SaveStateStep<R: OperationRepository, P: PayloadStore> {
    repo: Arc<R>,
    payloads: Arc<P>,
    locks: OperationLocks,
}

impl<R: OperationRepository, P: PayloadStore> SaveStateStep<R, P> {
    pub fn new(repo: Arc<R>, payloads: Arc<P>, locks: OperationLocks) -> Self {
        Self {
            repo,
            payloads,
            locks,
        }
    }
}

impl<R: OperationRepository, P: PayloadStore> Step for SaveStateStep<R, P> {
    fn name(&self) -> &str {
        SAVE_STATE_STEP
    }

    async fn run(&self, call: StepCall, _ctx: &StepContext) -> Result<StepOutput, StepError> {
        let remaining: Value = call.arg_as(0)?;
        let id: OperationId = call.arg_as(1)?;
        let _guard = self.locks.acquire(id).await;

        let workflow_location = self
            .payloads
            .save_workflow(id, &remaining)
            .await
            .map_err(|e| persistence(id, "write workflow", e))?;
        let result_location = self
            .payloads
            .save_result(id, &call.input)
            .await
            .map_err(|e| persistence(id, "write running value", e))?;

        let committed = self
            .repo
            .record_pause(id, &workflow_location, &result_location, &call.input)
            .await
            .map_err(|e| persistence(id, "commit pause", e))?;
        if !committed {
            tracing::error!(operation_id = %id, "pause handler ran but operation was not requesting a pause");
            return Err(StepError::Persistence(format!(
                "operation {id} is no longer requesting a pause"
            )));
        }

        tracing::info!(
            operation_id = %id,
            workflow = workflow_location.as_str(),
            "operation paused"
        );
        Ok(StepOutput::Value(Value::Null))
    }
}

// ---------------------------------------------------------------------------
// completion
// ---------------------------------------------------------------------------

/// `completion(result, op_id)`: persist the final result and mark the
/// operation `COMPLETED`. Passes the result through.
pub struct CompletionStep<R: OperationRepository, P: PayloadStore> {
    repo: Arc<R>,
    payloads: Arc<P>,
    locks: OperationLocks,
}

impl<R: OperationRepository, P: PayloadStore> CompletionStep<R, P> {
    pub fn new(repo: Arc<R>, payloads: Arc<P>, locks: OperationLocks) -> Self {
        Self {
            repo,
            payloads,
            locks,
        }
    }
}

impl<R: OperationRepository, P: PayloadStore> Step for CompletionStep<R, P> {
    fn name(&self) -> &str {
        COMPLETION_STEP
    }

    async fn run(&self, call: StepCall, _ctx: &StepContext) -> Result<StepOutput, StepError> {
        let id: OperationId = call.arg_as(0)?;
        let _guard = self.locks.acquire(id).await;

        let location = self
            .payloads
            .save_result(id, &call.input)
            .await
            .map_err(|e| persistence(id, "write result", e))?;
        self.repo
            .record_completion(id, &location, &call.input)
            .await
            .map_err(|e| persistence(id, "commit completion", e))?;

        tracing::info!(operation_id = %id, "operation completed");
        Ok(StepOutput::Value(call.input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::memory::{InMemoryOperationRepository, InMemoryPayloadStore};
    use crate::step::StepRegistry;
    use crate::substrate::Dispatcher;
    use serde_json::json;
    use uuid::Uuid;
    use waypoint_types::config::EngineConfig;

    fn ctx() -> StepContext {
        let (dispatcher, _jobs) = Dispatcher::channel();
        StepContext::new(
            Uuid::nil(),
            0,
            Chain::default(),
            Arc::new(StepRegistry::new()),
            dispatcher,
            Arc::new(EngineConfig::default()),
        )
    }

    fn call(input: Value, args: Vec<Value>) -> StepCall {
        StepCall::new(input, args, serde_json::Map::new())
    }

    #[tokio::test]
    async fn should_pause_polls_live_status() {
        let repo = Arc::new(InMemoryOperationRepository::new());
        let op = repo.create("alice").await.unwrap();
        let step = ShouldPauseStep::new(Arc::clone(&repo));

        let out = step.run(call(json!(1), vec![json!(op.id.0)]), &ctx()).await.unwrap();
        assert_eq!(out, StepOutput::Value(json!(false)));

        repo.transition(op.id, OperationStatus::InProgress, OperationStatus::RequestingPause)
            .await
            .unwrap();
        let out = step.run(call(json!(1), vec![json!(op.id.0)]), &ctx()).await.unwrap();
        assert_eq!(out, StepOutput::Value(json!(true)));
    }

    #[tokio::test]
    async fn should_pause_on_unknown_operation_fails() {
        let step = ShouldPauseStep::new(Arc::new(InMemoryOperationRepository::new()));
        let err = step.run(call(json!(1), vec![json!(7)]), &ctx()).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn save_state_persists_both_payloads_then_pauses() {
        let repo = Arc::new(InMemoryOperationRepository::new());
        let payloads = Arc::new(InMemoryPayloadStore::new());
        let op = repo.create("alice").await.unwrap();
        repo.transition(op.id, OperationStatus::InProgress, OperationStatus::RequestingPause)
            .await
            .unwrap();

        let remaining = json!([{"step_name": "mult", "args": [4], "kwargs": {}}]);
        let step = SaveStateStep::new(Arc::clone(&repo), Arc::clone(&payloads), OperationLocks::new());
        step.run(call(json!(3), vec![remaining.clone(), json!(op.id.0)]), &ctx())
            .await
            .unwrap();

        let paused = repo.get(op.id).await.unwrap().unwrap();
        assert_eq!(paused.status, OperationStatus::Paused);
        assert_eq!(paused.result, Some(json!(3)));
        let workflow = payloads
            .load(paused.pending_workflow_location.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(workflow, remaining);
    }

    #[tokio::test]
    async fn save_state_refuses_when_not_requesting_pause() {
        let repo = Arc::new(InMemoryOperationRepository::new());
        let op = repo.create("alice").await.unwrap();
        let step = SaveStateStep::new(
            Arc::clone(&repo),
            Arc::new(InMemoryPayloadStore::new()),
            OperationLocks::new(),
        );

        let err = step
            .run(call(json!(3), vec![json!([]), json!(op.id.0)]), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::Persistence(_)));
        let stored = repo.get(op.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OperationStatus::InProgress);
    }

    #[tokio::test]
    async fn completion_marks_completed_and_passes_result_through() {
        let repo = Arc::new(InMemoryOperationRepository::new());
        let payloads = Arc::new(InMemoryPayloadStore::new());
        let op = repo.create("alice").await.unwrap();
        let step = CompletionStep::new(Arc::clone(&repo), Arc::clone(&payloads), OperationLocks::new());

        let out = step.run(call(json!(12), vec![json!(op.id.0)]), &ctx()).await.unwrap();
        assert_eq!(out, StepOutput::Value(json!(12)));

        let done = repo.get(op.id).await.unwrap().unwrap();
        assert_eq!(done.status, OperationStatus::Completed);
        assert_eq!(done.result, Some(json!(12)));
        assert!(done.pending_workflow_location.is_none());
        let stored = payloads
            .load(done.pending_result_location.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(stored, json!(12));
    }

    #[test]
    fn checkpointed_binds_operation_id() {
        let chain = Chain::default()
            .then(StepSignature::new("add"))
            .then(completion(OperationId(5)));
        let out = checkpointed(&chain, OperationId(5), 1).unwrap();
        assert_eq!(
            out.steps()[1],
            StepSignature::checkpoint(&pause_predicate(OperationId(5)), &pause_handler(OperationId(5)))
        );
    }
}
