//! Engine assembly: registry with built-in steps, substrate and service.

use std::sync::Arc;

use waypoint_types::config::EngineConfig;

use crate::checkpoint::CheckpointStep;
use crate::fold::{StartParsingStep, TallyStep};
use crate::operation::steps::{CompletionStep, SaveStateStep, ShouldPauseStep};
use crate::operation::{OperationLocks, OperationRepository, OperationService, PayloadStore};
use crate::step::arith::{AddStep, MultStep};
use crate::step::{Step, StepRegistry};
use crate::stream::{ReadFinishContinueStep, ReadNextStep, ReadStartStep};
use crate::substrate::{Dispatcher, Substrate};

/// Builder for [`Engine`]. Built-in steps are registered up front; steps
/// added with [`EngineBuilder::step`] replace a built-in of the same name.
pub struct EngineBuilder<R: OperationRepository, P: PayloadStore> {
    repo: Arc<R>,
    payloads: Arc<P>,
    locks: OperationLocks,
    config: EngineConfig,
    registry: StepRegistry,
}

impl<R: OperationRepository, P: PayloadStore> EngineBuilder<R, P> {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn step<T: Step + 'static>(mut self, step: T) -> Self {
        self.registry.register(step);
        self
    }

    /// Spawn the worker pool on the current tokio runtime.
    pub fn start(self) -> Engine<R, P> {
        let registry = Arc::new(self.registry);
        let config = Arc::new(self.config);
        let substrate = Substrate::start(Arc::clone(&registry), Arc::clone(&config));
        let service = OperationService::new(
            self.repo,
            self.payloads,
            self.locks,
            registry,
            substrate.dispatcher().clone(),
            config,
        );
        Engine { service, substrate }
    }
}

/// A running engine.
pub struct Engine<R: OperationRepository, P: PayloadStore> {
    service: OperationService<R, P>,
    substrate: Substrate,
}

impl<R: OperationRepository, P: PayloadStore> Engine<R, P> {
    pub fn builder(repo: Arc<R>, payloads: Arc<P>) -> EngineBuilder<R, P> {
        let locks = OperationLocks::new();
        let mut registry = StepRegistry::new();
        registry
            .register(CheckpointStep)
            .register(ShouldPauseStep::new(Arc::clone(&repo)))
            .register(SaveStateStep::new(
                Arc::clone(&repo),
                Arc::clone(&payloads),
                locks.clone(),
            ))
            .register(CompletionStep::new(
                Arc::clone(&repo),
                Arc::clone(&payloads),
                locks.clone(),
            ))
            .register(AddStep)
            .register(MultStep)
            .register(ReadStartStep)
            .register(ReadNextStep)
            .register(ReadFinishContinueStep)
            .register(StartParsingStep)
            .register(TallyStep);

        EngineBuilder {
            repo,
            payloads,
            locks,
            config: EngineConfig::default(),
            registry,
        }
    }

    pub fn service(&self) -> &OperationService<R, P> {
        &self.service
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        self.substrate.dispatcher()
    }

    /// Resolve once no chain is queued or running, follow-up chains included.
    pub async fn wait_idle(&self) {
        self.substrate.dispatcher().wait_idle().await;
    }

    pub async fn shutdown(self) {
        self.substrate.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::memory::{InMemoryOperationRepository, InMemoryPayloadStore};

    #[tokio::test]
    async fn builder_registers_built_in_steps() {
        let engine = Engine::builder(
            Arc::new(InMemoryOperationRepository::new()),
            Arc::new(InMemoryPayloadStore::new()),
        )
        .start();

        let registry = engine.service().registry();
        for name in [
            "waypoint.checkpoint",
            "should_pause",
            "save_state",
            "completion",
            "add",
            "mult",
            "read_start",
            "read_next",
            "read_finish_continue",
            "start_parsing",
            "tally",
        ] {
            assert!(registry.contains(name), "missing built-in step {name}");
        }
        engine.shutdown().await;
    }
}
