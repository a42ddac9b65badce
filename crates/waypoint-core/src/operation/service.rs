//! Operation control surface.
//!
//! `start` creates the durable record and invokes the checkpointed chain.
//! `pause`, `resume` and `cancel` map onto the status state machine:
//!
//! ```text
//! pause:  IN_PROGRESS -> REQUESTING_PAUSE   (takes effect at the next checkpoint)
//! resume: PAUSED      -> IN_PROGRESS        (re-invokes the persisted chain)
//! cancel: PAUSED      -> CANCELLED
//! ```
//!
//! An invalid transition or an unknown id is never an error: it comes back
//! as a `ControlOutcome` with `success == false` and a reason. Only
//! infrastructure faults surface as `OperationError`.

use std::sync::Arc;

use serde_json::Value;
use waypoint_types::chain::Chain;
use waypoint_types::config::EngineConfig;
use waypoint_types::error::RepositoryError;
use waypoint_types::operation::{ControlOutcome, Operation, OperationId, OperationStatus};

use super::steps::checkpointed;
use super::{OperationLocks, OperationRepository, PayloadStore};
use crate::chain::{self, ChainError};
use crate::step::StepRegistry;
use crate::substrate::{Dispatcher, SubstrateError};

/// Infrastructure failures behind the control surface.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Substrate(#[from] SubstrateError),
}

pub const MSG_INVALID_ID: &str = "invalid operation id";
pub const MSG_NOT_FOUND: &str = "operation not found";
pub const MSG_NOT_IN_PROGRESS: &str = "operation is not in progress";
pub const MSG_NOT_PAUSED: &str = "operation is not paused";
pub const MSG_CANCEL_REQUIRES_PAUSE: &str = "operation must be paused before it can be cancelled";

/// Service driving the operation state machine.
///
/// Generic over the repository and payload ports so waypoint-core never
/// depends on waypoint-infra.
pub struct OperationService<R: OperationRepository, P: PayloadStore> {
    repo: Arc<R>,
    payloads: Arc<P>,
    locks: OperationLocks,
    registry: Arc<StepRegistry>,
    dispatcher: Dispatcher,
    config: Arc<EngineConfig>,
}

impl<R: OperationRepository, P: PayloadStore> Clone for OperationService<R, P> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            payloads: Arc::clone(&self.payloads),
            locks: self.locks.clone(),
            registry: Arc::clone(&self.registry),
            dispatcher: self.dispatcher.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<R: OperationRepository, P: PayloadStore> OperationService<R, P> {
    pub fn new(
        repo: Arc<R>,
        payloads: Arc<P>,
        locks: OperationLocks,
        registry: Arc<StepRegistry>,
        dispatcher: Dispatcher,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            repo,
            payloads,
            locks,
            registry,
            dispatcher,
            config,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn payloads(&self) -> &P {
        &self.payloads
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Create an operation and invoke the chain produced by `build`.
    ///
    /// `build` receives the new id so it can bind steps such as `completion`
    /// to it. A chain without checkpoint markers is injected with
    /// `checkpoint_interval`; a chain that already has markers runs as built.
    pub async fn start(
        &self,
        requester: &str,
        build: impl FnOnce(OperationId) -> Chain,
        input: Value,
    ) -> Result<OperationId, OperationError> {
        let operation = self.repo.create(requester).await?;
        let id = operation.id;

        let chain = build(id);
        let chain = if chain.has_checkpoints() {
            chain
        } else {
            checkpointed(&chain, id, self.config.checkpoint_interval)?
        };

        let span = tracing::info_span!("operation", operation_id = %id, requester);
        let handle = span.in_scope(|| self.dispatcher.submit(chain, input))?;
        tracing::info!(
            operation_id = %id,
            requester,
            job_id = %handle.job_id(),
            "operation started"
        );
        Ok(id)
    }

    /// Request a pause. Takes effect at the next checkpoint.
    pub async fn pause(&self, encoded: &str) -> Result<ControlOutcome, OperationError> {
        let id = match OperationId::decode(encoded) {
            Ok(id) => id,
            Err(_) => return Ok(reject(encoded, MSG_INVALID_ID)),
        };
        let _guard = self.locks.acquire(id).await;

        if self.repo.get(id).await?.is_none() {
            return Ok(reject(encoded, MSG_NOT_FOUND));
        }
        if !self
            .repo
            .transition(id, OperationStatus::InProgress, OperationStatus::RequestingPause)
            .await?
        {
            return Ok(reject(encoded, MSG_NOT_IN_PROGRESS));
        }

        tracing::info!(operation_id = %id, "pause requested");
        Ok(ControlOutcome::accepted(encoded))
    }

    /// Resume a paused operation from its persisted chain and running value.
    ///
    /// A missing or corrupt payload rejects the request and leaves the
    /// operation `PAUSED` so the resume can be retried.
    pub async fn resume(&self, encoded: &str) -> Result<ControlOutcome, OperationError> {
        let id = match OperationId::decode(encoded) {
            Ok(id) => id,
            Err(_) => return Ok(reject(encoded, MSG_INVALID_ID)),
        };
        let _guard = self.locks.acquire(id).await;

        let Some(operation) = self.repo.get(id).await? else {
            return Ok(reject(encoded, MSG_NOT_FOUND));
        };
        if operation.status != OperationStatus::Paused {
            return Ok(reject(encoded, MSG_NOT_PAUSED));
        }

        let (chain, input) = match self.load_paused_state(&operation).await {
            Ok(state) => state,
            Err(reason) => {
                tracing::error!(operation_id = %id, reason = reason.as_str(), "resume failed");
                return Ok(reject(encoded, reason));
            }
        };
        let chain = if chain.has_checkpoints() {
            chain
        } else {
            checkpointed(&chain, id, self.config.checkpoint_interval)?
        };

        if !self.repo.record_resume(id).await? {
            return Ok(reject(encoded, MSG_NOT_PAUSED));
        }

        let span = tracing::info_span!("operation", operation_id = %id, resumed = true);
        match span.in_scope(|| self.dispatcher.submit(chain, input.clone())) {
            Ok(handle) => {
                tracing::info!(operation_id = %id, job_id = %handle.job_id(), "operation resumed");
                Ok(ControlOutcome::accepted(encoded))
            }
            Err(e) => {
                // Put the record back exactly as it was so the resume can be retried.
                self.restore_pause(&operation, &input).await?;
                Err(e.into())
            }
        }
    }

    /// Cancel a paused operation. Running operations must be paused first.
    pub async fn cancel(&self, encoded: &str) -> Result<ControlOutcome, OperationError> {
        let id = match OperationId::decode(encoded) {
            Ok(id) => id,
            Err(_) => return Ok(reject(encoded, MSG_INVALID_ID)),
        };
        let _guard = self.locks.acquire(id).await;

        if self.repo.get(id).await?.is_none() {
            return Ok(reject(encoded, MSG_NOT_FOUND));
        }
        if !self
            .repo
            .transition(id, OperationStatus::Paused, OperationStatus::Cancelled)
            .await?
        {
            return Ok(reject(encoded, MSG_CANCEL_REQUIRES_PAUSE));
        }

        tracing::info!(operation_id = %id, "operation cancelled");
        Ok(ControlOutcome::accepted(encoded))
    }

    pub async fn get(&self, id: OperationId) -> Result<Option<Operation>, OperationError> {
        Ok(self.repo.get(id).await?)
    }

    pub async fn list(&self, requester: Option<&str>) -> Result<Vec<Operation>, OperationError> {
        Ok(self.repo.list(requester).await?)
    }

    /// Load and validate the persisted chain and running value.
    ///
    /// Errors are user-facing reasons.
    async fn load_paused_state(&self, operation: &Operation) -> Result<(Chain, Value), String> {
        let workflow_location = operation
            .pending_workflow_location
            .as_deref()
            .ok_or_else(|| "operation has no persisted workflow".to_string())?;
        let result_location = operation
            .pending_result_location
            .as_deref()
            .ok_or_else(|| "operation has no persisted running value".to_string())?;

        let workflow = self
            .payloads
            .load(workflow_location)
            .await
            .map_err(|e| format!("persisted workflow could not be loaded: {e}"))?;
        let chain = chain::deserialize(workflow, &self.registry)
            .map_err(|e| format!("persisted workflow is corrupt: {e}"))?;
        if chain.is_empty() {
            return Err("persisted workflow is empty".to_string());
        }

        let input = self
            .payloads
            .load(result_location)
            .await
            .map_err(|e| format!("persisted running value could not be loaded: {e}"))?;

        Ok((chain, input))
    }

    async fn restore_pause(&self, operation: &Operation, input: &Value) -> Result<(), OperationError> {
        let (Some(workflow), Some(result)) = (
            operation.pending_workflow_location.as_deref(),
            operation.pending_result_location.as_deref(),
        ) else {
            return Ok(());
        };
        let id = operation.id;
        let restored = self
            .repo
            .transition(id, OperationStatus::InProgress, OperationStatus::RequestingPause)
            .await?
            && self.repo.record_pause(id, workflow, result, input).await?;
        if !restored {
            let status = self
                .repo
                .get(id)
                .await?
                .map_or("missing", |op| op.status.as_str());
            tracing::error!(operation_id = %id, status, "could not restore paused state");
            return Err(RepositoryError::Conflict(format!(
                "operation {id} is {status} instead of IN_PROGRESS while restoring its pause"
            ))
            .into());
        }
        tracing::warn!(operation_id = %id, "resume rolled back, operation is paused again");
        Ok(())
    }
}

fn reject(encoded: &str, reason: impl Into<String>) -> ControlOutcome {
    let outcome = ControlOutcome::rejected(encoded, reason);
    tracing::warn!(
        operation_id = encoded,
        reason = outcome.message.as_deref().unwrap_or_default(),
        "control request rejected"
    );
    outcome
}
