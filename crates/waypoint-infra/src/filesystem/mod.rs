//! Filesystem adapters for Waypoint.
//!
//! Provides the data directory layout and the `PayloadStore` implementation
//! that keeps paused chains and running values as JSON files.

pub mod payload;

use std::path::{Path, PathBuf};

pub use payload::LocalPayloadStore;

/// Directory holding per-operation payloads: `{data_dir}/operations/`.
pub fn operations_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("operations")
}

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `WAYPOINT_DATA_DIR` environment variable
/// 2. `~/.waypoint` on platforms with a home directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("WAYPOINT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".waypoint");
    }

    // Last resort: current directory
    PathBuf::from(".waypoint")
}
