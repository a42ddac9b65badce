//! Engine configuration types for Waypoint.
//!
//! `EngineConfig` represents the top-level `config.toml` that controls read
//! sizes, fold partitioning, checkpoint intervals and the worker pool.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the Waypoint engine.
///
/// Loaded from `~/.waypoint/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of bytes read from a streamed input per step.
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: u64,

    /// Number of slices the fold stage partitions its input into.
    #[serde(default = "default_parse_chunk_amount")]
    pub parse_chunk_amount: usize,

    /// Original steps between checkpoints for ordinary and streaming chains.
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,

    /// Original steps between checkpoints for fold chains.
    #[serde(default = "default_fold_checkpoint_interval")]
    pub fold_checkpoint_interval: usize,

    /// Number of workers in the in-process task substrate.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Attempts per step before the substrate reports the chain failed.
    #[serde(default = "default_max_step_attempts")]
    pub max_step_attempts: u32,

    /// Record delimiter the chunked reader aligns reads to.
    #[serde(default = "default_record_delimiter")]
    pub record_delimiter: char,
}

fn default_read_chunk_size() -> u64 {
    4096
}

fn default_parse_chunk_amount() -> usize {
    5
}

fn default_checkpoint_interval() -> usize {
    1
}

fn default_fold_checkpoint_interval() -> usize {
    2
}

fn default_workers() -> usize {
    4
}

fn default_max_step_attempts() -> u32 {
    1
}

fn default_record_delimiter() -> char {
    '\n'
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: default_read_chunk_size(),
            parse_chunk_amount: default_parse_chunk_amount(),
            checkpoint_interval: default_checkpoint_interval(),
            fold_checkpoint_interval: default_fold_checkpoint_interval(),
            workers: default_workers(),
            max_step_attempts: default_max_step_attempts(),
            record_delimiter: default_record_delimiter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default_values() {
        let config = EngineConfig::default();
        assert_eq!(config.read_chunk_size, 4096);
        assert_eq!(config.parse_chunk_amount, 5);
        assert_eq!(config.checkpoint_interval, 1);
        assert_eq!(config.fold_checkpoint_interval, 2);
        assert_eq!(config.workers, 4);
        assert_eq!(config.max_step_attempts, 1);
        assert_eq!(config.record_delimiter, '\n');
    }

    #[test]
    fn test_engine_config_deserialize_with_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_engine_config_deserialize_with_values() {
        let toml_str = r#"
read_chunk_size = 64
parse_chunk_amount = 3
fold_checkpoint_interval = 1
workers = 2
record_delimiter = ";"
"#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.read_chunk_size, 64);
        assert_eq!(config.parse_chunk_amount, 3);
        assert_eq!(config.checkpoint_interval, 1);
        assert_eq!(config.fold_checkpoint_interval, 1);
        assert_eq!(config.workers, 2);
        assert_eq!(config.record_delimiter, ';');
    }

    #[test]
    fn test_engine_config_serde_roundtrip() {
        let config = EngineConfig {
            workers: 8,
            ..EngineConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
