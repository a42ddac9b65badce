//! A single substrate worker and the chain execution loop.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;
use waypoint_types::chain::Chain;
use waypoint_types::config::EngineConfig;

use super::{ChainJob, ChainReport, Dispatcher};
use crate::step::{StepCall, StepContext, StepOutput, StepRegistry};

pub(super) struct Worker {
    pub(super) index: usize,
    pub(super) receiver: Arc<Mutex<mpsc::UnboundedReceiver<ChainJob>>>,
    pub(super) registry: Arc<StepRegistry>,
    pub(super) dispatcher: Dispatcher,
    pub(super) config: Arc<EngineConfig>,
    pub(super) shutdown: CancellationToken,
}

impl Worker {
    pub(super) async fn run(self) {
        tracing::debug!(worker = self.index, "worker started");

        loop {
            let job = {
                let mut receiver = self.receiver.lock().await;
                tokio::select! {
                    _ = self.shutdown.cancelled() => None,
                    job = receiver.recv() => job,
                }
            };
            let Some(mut job) = job else {
                break;
            };

            let report_tx = job.report.take();
            let job_id = job.id;

            // Run on its own task so a panicking step cannot take the worker down.
            let span = tracing::info_span!(
                parent: &job.parent,
                "chain",
                job_id = %job_id,
                steps = job.chain.len(),
                worker = self.index
            );
            let execution = tokio::spawn(
                run_chain(
                    job.id,
                    job.chain,
                    job.input,
                    Arc::clone(&self.registry),
                    self.dispatcher.clone(),
                    Arc::clone(&self.config),
                )
                .instrument(span),
            );
            let report = match execution.await {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(job_id = %job_id, error = %e, "chain task panicked");
                    ChainReport::Failed {
                        position: 0,
                        step: String::new(),
                        error: format!("chain task panicked: {e}"),
                    }
                }
            };

            if let Some(tx) = report_tx {
                let _ = tx.send(report);
            }
            self.dispatcher.finish_job();
        }

        tracing::debug!(worker = self.index, "worker stopped");
    }
}

/// Run every step of `chain` in order, threading the running value.
async fn run_chain(
    job_id: Uuid,
    chain: Chain,
    input: Value,
    registry: Arc<StepRegistry>,
    dispatcher: Dispatcher,
    config: Arc<EngineConfig>,
) -> ChainReport {
    let max_attempts = config.max_step_attempts.max(1);
    let mut value = input;

    for (position, signature) in chain.steps().iter().enumerate() {
        let Some(step) = registry.get(&signature.step_name) else {
            tracing::error!(
                job_id = %job_id,
                step = signature.step_name.as_str(),
                position,
                "unknown step"
            );
            return ChainReport::Failed {
                position,
                step: signature.step_name.clone(),
                error: format!("unknown step '{}'", signature.step_name),
            };
        };

        let ctx = StepContext::new(
            job_id,
            position,
            chain.suffix_after(position),
            Arc::clone(&registry),
            dispatcher.clone(),
            Arc::clone(&config),
        );

        let mut attempt = 1;
        let output = loop {
            let call = StepCall::new(
                value.clone(),
                signature.args.clone(),
                signature.kwargs.clone(),
            );
            let span = tracing::info_span!(
                "step",
                step = signature.step_name.as_str(),
                position,
                attempt
            );
            match step.run(call, &ctx).instrument(span).await {
                Ok(output) => break output,
                Err(e) if attempt < max_attempts => {
                    tracing::warn!(
                        job_id = %job_id,
                        step = signature.step_name.as_str(),
                        attempt,
                        error = %e,
                        "step failed, retrying"
                    );
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        job_id = %job_id,
                        step = signature.step_name.as_str(),
                        position,
                        attempts = attempt,
                        error = %e,
                        "step failed"
                    );
                    return ChainReport::Failed {
                        position,
                        step: signature.step_name.clone(),
                        error: e.to_string(),
                    };
                }
            }
        };

        match output {
            StepOutput::Value(next) => {
                tracing::debug!(
                    job_id = %job_id,
                    step = signature.step_name.as_str(),
                    position,
                    "step completed"
                );
                value = next;
            }
            StepOutput::Halt => {
                tracing::debug!(
                    job_id = %job_id,
                    step = signature.step_name.as_str(),
                    position,
                    discarded = chain.len() - position - 1,
                    "chain halted"
                );
                return ChainReport::Halted { position };
            }
        }
    }

    ChainReport::Completed { output: value }
}
