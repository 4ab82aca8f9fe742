//! Database connections.
//!
//! Each logical operation opens its own single-connection pool and closes it
//! on exit; there is no shared pool between operations.

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::{PipelineError, PipelineResult};

pub async fn connect_sqlite(url: &str) -> PipelineResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| PipelineError::InvalidConfiguration(format!("bad sqlite url: {}", e)))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    // Ensure parent directory exists
    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PipelineError::ServiceUnavailable(format!(
                    "cannot create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| PipelineError::ServiceUnavailable(format!("sqlite connect failed: {}", e)))
}

pub async fn connect_postgres(url: &str) -> PipelineResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(1)
        .connect(url)
        .await
        .map_err(|e| PipelineError::ServiceUnavailable(format!("postgres connect failed: {}", e)))
}
