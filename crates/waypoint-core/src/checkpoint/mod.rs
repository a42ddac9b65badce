//! Pausable execution: the checkpoint injector and the checkpoint step.
//!
//! `inject` splices synthetic markers into a chain at a fixed interval.
//! At run time each marker is executed by `CheckpointStep`, which polls its
//! pause predicate and, on a pause verdict, hands the remaining suffix to
//! its pause handler and halts the chain.

pub mod injector;
pub mod step;

pub use injector::inject;
pub use step::CheckpointStep;
