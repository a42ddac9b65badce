//! Checkpointable workflow engine for Waypoint.
//!
//! This crate holds the engine and defines the "ports" (repository and
//! payload-store traits) that the infrastructure layer implements. It depends
//! only on `waypoint-types` -- never on `waypoint-infra` or any database crate.
//!
//! - `chunk` -- delimiter-aligned chunked reads and near-equal partitioning
//! - `chain` -- durable form of chains
//! - `checkpoint` -- checkpoint injection and the checkpoint step
//! - `step` -- the step trait, registry and execution context
//! - `substrate` -- in-process worker pool running chains
//! - `operation` -- durable record ports, state machine and control surface
//! - `stream` -- streaming continuation steps
//! - `fold` -- chunked fold aggregation
//! - `engine` -- assembly of all of the above

pub mod chain;
pub mod checkpoint;
pub mod chunk;
pub mod engine;
pub mod fold;
pub mod operation;
pub mod step;
pub mod stream;
pub mod substrate;

pub use engine::{Engine, EngineBuilder};
