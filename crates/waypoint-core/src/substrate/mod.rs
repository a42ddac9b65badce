//! In-process task substrate: a pool of workers that run chains.
//!
//! A submitted chain becomes a `ChainJob` on a shared queue. Any idle worker
//! picks it up and runs its steps strictly in order, each completing before
//! the next starts. While a step runs, its `StepContext` exposes the
//! remaining suffix of the chain; a step returning `StepOutput::Halt`
//! discards that suffix.
//!
//! Steps may submit further chains through the `Dispatcher` in their context.
//! The dispatcher counts every job from submission until its chain finishes,
//! so `Dispatcher::wait_idle` resolves only once all follow-up work is done.

mod worker;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;
use tokio::sync::{Mutex, Notify, mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use waypoint_types::chain::Chain;
use waypoint_types::config::EngineConfig;

use crate::step::StepRegistry;

// ---------------------------------------------------------------------------
// ChainJob / ChainReport
// ---------------------------------------------------------------------------

/// A chain queued for execution together with its initial value.
#[derive(Debug)]
pub struct ChainJob {
    pub id: Uuid,
    pub chain: Chain,
    pub input: Value,
    /// Span active at submission; the chain span is opened beneath it.
    parent: tracing::Span,
    report: Option<oneshot::Sender<ChainReport>>,
}

/// How a chain job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainReport {
    /// Every step ran; `output` is the last step's return value.
    Completed { output: Value },
    /// The step at `position` discarded the rest of the chain.
    Halted { position: usize },
    /// The step at `position` failed after all attempts.
    Failed {
        position: usize,
        step: String,
        error: String,
    },
}

/// Errors from the substrate itself (not from steps).
#[derive(Debug, thiserror::Error)]
pub enum SubstrateError {
    #[error("task substrate is shut down")]
    Closed,

    #[error("chain job {0} was dropped before reporting")]
    Dropped(Uuid),
}

/// Awaitable report of one submitted chain.
#[derive(Debug)]
pub struct ChainHandle {
    job_id: Uuid,
    report: oneshot::Receiver<ChainReport>,
}

impl ChainHandle {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Wait for the chain to finish.
    pub async fn report(self) -> Result<ChainReport, SubstrateError> {
        self.report
            .await
            .map_err(|_| SubstrateError::Dropped(self.job_id))
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// Cloneable handle for submitting chains to the substrate.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    sender: mpsc::UnboundedSender<ChainJob>,
    in_flight: Arc<InFlight>,
}

impl Dispatcher {
    /// A dispatcher plus the receiving end of its queue.
    ///
    /// `Substrate::start` wires the receiver to its workers; tests can hold
    /// it directly to inspect submitted jobs.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ChainJob>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                in_flight: Arc::new(InFlight::default()),
            },
            receiver,
        )
    }

    /// Invoke `chain` asynchronously with `input`.
    pub fn submit(&self, chain: Chain, input: Value) -> Result<ChainHandle, SubstrateError> {
        let (tx, rx) = oneshot::channel();
        let job = ChainJob {
            id: Uuid::now_v7(),
            chain,
            input,
            parent: tracing::Span::current(),
            report: Some(tx),
        };
        let job_id = job.id;

        self.in_flight.count.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(job).is_err() {
            self.finish_job();
            return Err(SubstrateError::Closed);
        }

        tracing::debug!(job_id = %job_id, "submitted chain");
        Ok(ChainHandle {
            job_id,
            report: rx,
        })
    }

    /// Number of submitted chains that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Resolve once no submitted chain is queued or running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.in_flight.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn finish_job(&self) {
        if self.in_flight.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.in_flight.idle.notify_waiters();
        }
    }
}

// ---------------------------------------------------------------------------
// Substrate
// ---------------------------------------------------------------------------

/// Worker pool executing chains from a shared queue.
pub struct Substrate {
    dispatcher: Dispatcher,
    workers: JoinSet<()>,
    shutdown: CancellationToken,
}

impl Substrate {
    /// Spawn `config.workers` workers (at least one) on the current runtime.
    pub fn start(registry: Arc<StepRegistry>, config: Arc<EngineConfig>) -> Self {
        let (dispatcher, receiver) = Dispatcher::channel();
        let receiver = Arc::new(Mutex::new(receiver));
        let shutdown = CancellationToken::new();
        let mut workers = JoinSet::new();

        let count = config.workers.max(1);
        for index in 0..count {
            let worker = worker::Worker {
                index,
                receiver: Arc::clone(&receiver),
                registry: Arc::clone(&registry),
                dispatcher: dispatcher.clone(),
                config: Arc::clone(&config),
                shutdown: shutdown.clone(),
            };
            workers.spawn(worker.run());
        }

        tracing::info!(workers = count, "task substrate started");

        Self {
            dispatcher,
            workers,
            shutdown,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Stop accepting work and wait for the workers to exit.
    ///
    /// Jobs still queued are dropped; a job already running finishes its
    /// current chain first.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        while let Some(result) = self.workers.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "worker task ended abnormally");
            }
        }
        tracing::info!("task substrate stopped");
    }
}
