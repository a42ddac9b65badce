//! Operations: the durable record, the pause/resume/cancel state machine and
//! the steps that read and write it from inside a running chain.
//!
//! - `repository` -- `OperationRepository` port (durable record, CAS on status)
//! - `payload` -- `PayloadStore` port (serialized chains and running values)
//! - `memory` -- in-memory adapters for both ports
//! - `locks` -- per-operation async lock (single writer per operation)
//! - `steps` -- `should_pause`, `save_state` and `completion`
//! - `service` -- the control surface: start / pause / resume / cancel

pub mod locks;
pub mod memory;
pub mod payload;
pub mod repository;
pub mod service;
pub mod steps;

pub use locks::{OperationGuard, OperationLocks};
pub use payload::PayloadStore;
pub use repository::OperationRepository;
pub use service::{OperationError, OperationService};
