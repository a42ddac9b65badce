//! `wpt init`: prepare the data directory.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use waypoint_infra::filesystem::{operations_dir, resolve_data_dir};
use waypoint_infra::sqlite::pool::{DatabasePool, database_url};
use waypoint_types::config::EngineConfig;

/// Create the data directory, run migrations and write `config.toml` if absent.
pub async fn init(json: bool) -> Result<()> {
    let data_dir = resolve_data_dir();
    tokio::fs::create_dir_all(operations_dir(&data_dir))
        .await
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    let url = database_url(&data_dir);
    let pool = DatabasePool::new(&url)
        .await
        .context("failed to initialise operation database")?;
    pool.writer.close().await;
    pool.reader.close().await;

    let config_path = data_dir.join("config.toml");
    let wrote_config = write_default_config(&config_path).await?;

    if json {
        let out = serde_json::json!({
            "data_dir": data_dir.display().to_string(),
            "database": url,
            "config": config_path.display().to_string(),
            "config_created": wrote_config,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        println!(
            "  {} Initialised {}",
            style("*").green().bold(),
            style(data_dir.display()).cyan()
        );
        println!("  Database: {url}");
        if wrote_config {
            println!("  Config:   {} (defaults)", config_path.display());
        } else {
            println!("  Config:   {} (kept)", config_path.display());
        }
        println!();
    }

    Ok(())
}

/// Write the default engine config to `path` unless a file is already there.
///
/// Returns whether the file was written.
async fn write_default_config(path: &Path) -> Result<bool> {
    let exists = tokio::fs::try_exists(path)
        .await
        .with_context(|| format!("failed to check {}", path.display()))?;
    if exists {
        return Ok(false);
    }

    let content =
        toml::to_string_pretty(&EngineConfig::default()).context("failed to render default config")?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}
