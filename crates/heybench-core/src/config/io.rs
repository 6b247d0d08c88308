use std::path::Path;

use crate::config::model::BenchConfig;
use crate::error::HeybenchError;

/// Read a JSON [`BenchConfig`] from disk.
pub async fn read_config(path: impl AsRef<Path>) -> Result<BenchConfig, HeybenchError> {
    let content = tokio::fs::read_to_string(path.as_ref()).await?;
    let config: BenchConfig = serde_json::from_str(&content)?;
    Ok(config)
}

/// Write a [`BenchConfig`] to disk as pretty-printed JSON.
pub async fn write_config(config: &BenchConfig, path: impl AsRef<Path>) -> Result<(), HeybenchError> {
    let content = serde_json::to_string_pretty(config)?;
    tokio::fs::write(path.as_ref(), content).await?;
    Ok(())
}
