//! Infrastructure layer for Waypoint.
//!
//! Contains implementations of the ports defined in `waypoint-core`: the
//! SQLite durable operation record, the filesystem payload store, plus the
//! TOML config loader and data-directory resolution.

pub mod config;
pub mod filesystem;
pub mod sqlite;
