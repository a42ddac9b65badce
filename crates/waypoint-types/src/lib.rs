//! Shared domain types for Waypoint.
//!
//! This crate contains the types exchanged between the engine, its storage
//! adapters and the control surface: operations and their status, step
//! signatures and chains, streamed records, configuration and error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, base64, thiserror.

pub mod chain;
pub mod config;
pub mod error;
pub mod operation;
pub mod record;
