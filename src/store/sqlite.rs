//! SQLite-backed [`ChunkStore`] implementation.
//!
//! Embeddings are stored as little-endian `f32` BLOBs. SQLite has no vector
//! distance operator, so nearest-neighbor search loads every row and ranks
//! them in Rust.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::{
    check_query, check_table_name, check_write_dims, rank_by_distance, ChunkStore, DistanceMetric,
};
use crate::db;
use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Chunk, ScoredChunk};

pub struct SqliteStore {
    pool: SqlitePool,
    table: String,
    dims: usize,
    metric: DistanceMetric,
}

impl SqliteStore {
    pub async fn connect(
        url: &str,
        table: &str,
        dims: usize,
        metric: DistanceMetric,
    ) -> PipelineResult<Self> {
        check_table_name(table)?;
        let pool = db::connect_sqlite(url).await?;
        Ok(Self {
            pool,
            table: table.to_string(),
            dims,
            metric,
        })
    }
}

/// Decode one row, rejecting embeddings stored under a different `dims`.
fn decode_row(row: &SqliteRow, dims: usize) -> PipelineResult<Chunk> {
    let decode = |e: sqlx::Error| PipelineError::query_failure(e.to_string());
    let blob: Vec<u8> = row.try_get("embedding").map_err(decode)?;
    let page_number: i64 = row.try_get("page_number").map_err(decode)?;
    let chunk_id: String = row.try_get("chunk_id").map_err(decode)?;

    if blob.len() != dims * 4 {
        return Err(PipelineError::query_failure(format!(
            "stored embedding for chunk {} is {} bytes, store expects {} dimensions",
            chunk_id,
            blob.len(),
            dims
        )));
    }
    let page_number = u32::try_from(page_number).map_err(|_| {
        PipelineError::query_failure(format!(
            "chunk {} has out-of-range page number {}",
            chunk_id, page_number
        ))
    })?;

    Ok(Chunk {
        filename: row.try_get("filename").map_err(decode)?,
        page_number,
        chunk_id,
        text: row.try_get("text").map_err(decode)?,
        embedding: blob_to_vec(&blob),
    })
}

#[async_trait]
impl ChunkStore for SqliteStore {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn init_schema(&self) -> PipelineResult<()> {
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                filename TEXT NOT NULL,
                page_number INTEGER NOT NULL,
                chunk_id TEXT NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL
            )
            "#,
            self.table
        );
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| PipelineError::write_failure(format!("create table: {}", e)))?;
        Ok(())
    }

    async fn write(&self, chunk: &Chunk) -> PipelineResult<()> {
        check_write_dims(chunk, self.dims)?;
        let sql = format!(
            "INSERT INTO {} (filename, page_number, chunk_id, text, embedding) VALUES (?, ?, ?, ?, ?)",
            self.table
        );
        sqlx::query(&sql)
            .bind(&chunk.filename)
            .bind(i64::from(chunk.page_number))
            .bind(&chunk.chunk_id)
            .bind(&chunk.text)
            .bind(vec_to_blob(&chunk.embedding))
            .execute(&self.pool)
            .await
            .map_err(|e| PipelineError::write_failure(e.to_string()))?;
        Ok(())
    }

    async fn nearest_neighbors(
        &self,
        query: &[f32],
        top_k: usize,
    ) -> PipelineResult<Vec<ScoredChunk>> {
        check_query(query, top_k, self.dims)?;
        let sql = format!(
            "SELECT filename, page_number, chunk_id, text, embedding FROM {}",
            self.table
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PipelineError::query_failure(e.to_string()))?;

        let chunks = rows
            .iter()
            .map(|row| decode_row(row, self.dims))
            .collect::<PipelineResult<Vec<Chunk>>>()?;

        Ok(rank_by_distance(query, chunks, self.metric, top_k))
    }

    async fn count(&self) -> PipelineResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let n: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PipelineError::query_failure(e.to_string()))?;
        Ok(n as u64)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
