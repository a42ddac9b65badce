//! Execution context handed to every step.
//!
//! Replaces ambient global state: a step reaches the registry, the substrate
//! and the engine configuration only through this value. The substrate also
//! records here the not-yet-executed remainder of the enclosing chain, which
//! is what the checkpoint step persists on a pause verdict.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;
use waypoint_types::chain::{Chain, StepSignature};
use waypoint_types::config::EngineConfig;

use super::{StepCall, StepError, StepOutput, StepRegistry};
use crate::substrate::Dispatcher;

pub struct StepContext {
    job_id: Uuid,
    position: usize,
    remaining: Chain,
    registry: Arc<StepRegistry>,
    dispatcher: Dispatcher,
    config: Arc<EngineConfig>,
}

impl StepContext {
    pub fn new(
        job_id: Uuid,
        position: usize,
        remaining: Chain,
        registry: Arc<StepRegistry>,
        dispatcher: Dispatcher,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            job_id,
            position,
            remaining,
            registry,
            dispatcher,
            config,
        }
    }

    /// ID of the chain job this step runs in.
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// 0-based position of this step in its chain.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Steps of the enclosing chain that have not run yet.
    pub fn remaining(&self) -> &Chain {
        &self.remaining
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Handle for submitting new chains to the substrate.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `signature` inline, to completion, before returning.
    ///
    /// `leading` arguments are placed before the signature's bound arguments,
    /// so `save_state(op_id)` invoked with `[remaining]` receives
    /// `(running_value, remaining, op_id)`.
    pub async fn invoke(
        &self,
        signature: &StepSignature,
        input: Value,
        leading: Vec<Value>,
    ) -> Result<StepOutput, StepError> {
        let step = self
            .registry
            .get(&signature.step_name)
            .ok_or_else(|| StepError::UnknownStep(signature.step_name.clone()))?;

        let mut args = leading;
        args.extend(signature.args.iter().cloned());
        let call = StepCall::new(input, args, signature.kwargs.clone());

        tracing::trace!(
            job_id = %self.job_id,
            step = signature.step_name.as_str(),
            "invoking step inline"
        );

        step.run(call, self).await
    }
}

impl std::fmt::Debug for StepContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepContext")
            .field("job_id", &self.job_id)
            .field("position", &self.position)
            .field("remaining", &self.remaining.step_names())
            .finish()
    }
}
