//! Shared fixtures for the engine tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Semaphore;
use waypoint_core::Engine;
use waypoint_core::operation::memory::{InMemoryOperationRepository, InMemoryPayloadStore};
use waypoint_core::step::{Step, StepCall, StepContext, StepError, StepOutput};
use waypoint_types::chain::{Chain, StepSignature};
use waypoint_types::config::EngineConfig;

pub type MemoryEngine = Engine<InMemoryOperationRepository, InMemoryPayloadStore>;

/// Lets a test hold a step at its entry point and observe that it got there.
#[derive(Clone)]
pub struct Gate {
    entered: Arc<Semaphore>,
    release: Arc<Semaphore>,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            entered: Arc::new(Semaphore::new(0)),
            release: Arc::new(Semaphore::new(0)),
        }
    }

    /// Wait until a gated step has started.
    pub async fn entered(&self) {
        self.entered.acquire().await.unwrap().forget();
    }

    /// Let `n` gated step executions through.
    pub fn release(&self, n: usize) {
        self.release.add_permits(n);
    }

    async fn pass(&self) -> Result<(), StepError> {
        self.entered.add_permits(1);
        self.release
            .acquire()
            .await
            .map_err(|e| StepError::ExecutionFailed(e.to_string()))?
            .forget();
        Ok(())
    }
}

/// Appends its own name to the running list, optionally behind a gate.
pub struct Named {
    name: String,
    gate: Option<Gate>,
}

impl Named {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gate: None,
        }
    }

    pub fn gated(name: impl Into<String>, gate: &Gate) -> Self {
        Self {
            name: name.into(),
            gate: Some(gate.clone()),
        }
    }
}

impl Step for Named {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, call: StepCall, _ctx: &StepContext) -> Result<StepOutput, StepError> {
        if let Some(gate) = &self.gate {
            gate.pass().await?;
        }
        let mut trail = match call.input {
            Value::Null => Vec::new(),
            Value::Array(items) => items,
            other => return Err(StepError::InvalidInput(format!("expected a list, got {other}"))),
        };
        trail.push(Value::String(self.name.clone()));
        Ok(StepOutput::Value(Value::Array(trail)))
    }
}

pub fn chain_of(names: &[&str]) -> Chain {
    names.iter().map(|n| StepSignature::new(*n)).collect()
}

pub fn config(checkpoint_interval: usize) -> EngineConfig {
    EngineConfig {
        checkpoint_interval,
        workers: 2,
        ..EngineConfig::default()
    }
}

pub fn memory_stores() -> (Arc<InMemoryOperationRepository>, Arc<InMemoryPayloadStore>) {
    (
        Arc::new(InMemoryOperationRepository::new()),
        Arc::new(InMemoryPayloadStore::new()),
    )
}
