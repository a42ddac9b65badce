//! Durable form of chains.
//!
//! A chain's remaining suffix is persisted as a plain JSON list of
//! `{step_name, args, kwargs}` entries. Deserializing resolves every entry
//! against the step registry so a corrupt or stale payload fails up front
//! instead of halfway through a resumed run.

pub mod serializer;

pub use serializer::{deserialize, from_json_str, serialize, to_json_string};

/// Errors raised while transforming or reconstructing chains.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("checkpoint interval must be at least 1")]
    ZeroInterval,

    #[error("unknown step '{0}' in persisted chain")]
    UnknownStep(String),

    #[error("malformed chain: {0}")]
    Malformed(String),

    #[error("step arguments could not be encoded: {0}")]
    Encode(String),
}
