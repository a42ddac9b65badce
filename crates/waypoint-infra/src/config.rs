//! Engine configuration loader for Waypoint.
//!
//! Reads `config.toml` from the data directory (`~/.waypoint/` in production)
//! and deserializes it into [`EngineConfig`]. Falls back to sensible defaults
//! when the file is missing or malformed.

use std::path::Path;

use waypoint_types::config::EngineConfig;

/// Load engine configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`EngineConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - Zero values for sizes and intervals are replaced by their defaults.
pub async fn load_engine_config(data_dir: &Path) -> EngineConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return EngineConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return EngineConfig::default();
        }
    };

    match toml::from_str::<EngineConfig>(&content) {
        Ok(config) => sanitize(config),
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            EngineConfig::default()
        }
    }
}

/// Replace zero sizes and intervals with defaults.
pub fn sanitize(mut config: EngineConfig) -> EngineConfig {
    let defaults = EngineConfig::default();

    if config.read_chunk_size == 0 {
        tracing::warn!("read_chunk_size must be positive, using {}", defaults.read_chunk_size);
        config.read_chunk_size = defaults.read_chunk_size;
    }
    if config.parse_chunk_amount == 0 {
        tracing::warn!(
            "parse_chunk_amount must be positive, using {}",
            defaults.parse_chunk_amount
        );
        config.parse_chunk_amount = defaults.parse_chunk_amount;
    }
    if config.checkpoint_interval == 0 {
        tracing::warn!(
            "checkpoint_interval must be positive, using {}",
            defaults.checkpoint_interval
        );
        config.checkpoint_interval = defaults.checkpoint_interval;
    }
    if config.fold_checkpoint_interval == 0 {
        tracing::warn!(
            "fold_checkpoint_interval must be positive, using {}",
            defaults.fold_checkpoint_interval
        );
        config.fold_checkpoint_interval = defaults.fold_checkpoint_interval;
    }
    config.workers = config.workers.max(1);
    config.max_step_attempts = config.max_step_attempts.max(1);
    config
}
