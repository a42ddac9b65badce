//! Application state wiring the engine to its durable adapters.
//!
//! The engine is generic over the repository and payload store; AppState
//! pins it to SQLite and the local filesystem.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use waypoint_core::Engine;
use waypoint_core::operation::OperationService;
use waypoint_infra::config::load_engine_config;
use waypoint_infra::filesystem::{LocalPayloadStore, resolve_data_dir};
use waypoint_infra::sqlite::operation::SqliteOperationRepository;
use waypoint_infra::sqlite::pool::{DatabasePool, database_url};
use waypoint_types::config::EngineConfig;

/// Engine pinned to the concrete infra implementations.
pub type ConcreteEngine = Engine<SqliteOperationRepository, LocalPayloadStore>;

pub type ConcreteOperationService = OperationService<SqliteOperationRepository, LocalPayloadStore>;

/// Shared application state: a running engine plus where it keeps its data.
pub struct AppState {
    pub engine: ConcreteEngine,
    pub config: EngineConfig,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Open the database, load config and start the worker pool.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let db_pool = DatabasePool::new(&database_url(&data_dir))
            .await
            .context("failed to open operation database")?;
        let config = load_engine_config(&data_dir).await;

        let engine = Engine::builder(
            Arc::new(SqliteOperationRepository::new(db_pool.clone())),
            Arc::new(LocalPayloadStore::new(&data_dir)),
        )
        .config(config.clone())
        .start();

        Ok(Self {
            engine,
            config,
            data_dir,
            db_pool,
        })
    }

    pub fn service(&self) -> &ConcreteOperationService {
        self.engine.service()
    }

    /// Stop the worker pool and close the database.
    pub async fn shutdown(self) {
        self.engine.shutdown().await;
        self.db_pool.writer.close().await;
        self.db_pool.reader.close().await;
    }
}
