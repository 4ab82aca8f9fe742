use anyhow::{Context, Result};

use crate::config::Config;
use crate::store::open_store;

/// Create the chunk table (and the pgvector extension on Postgres).
/// Idempotent.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let store = open_store(&config.store, config.embedding.dims).await?;
    let outcome = store.init_schema().await;
    store.close().await;
    outcome.with_context(|| format!("Failed to initialize store at {}", config.store.url))?;
    tracing::info!(table = %config.store.table, "schema ready");
    Ok(())
}
