//! PostgreSQL + pgvector [`ChunkStore`] implementation.
//!
//! The query vector is always bound as a native `vector` parameter and the
//! distance is computed by the database (`<->` for L2, `<=>` for cosine).

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use super::{check_query, check_table_name, check_write_dims, ChunkStore, DistanceMetric};
use crate::db;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Chunk, ScoredChunk};

pub struct PgVectorStore {
    pool: PgPool,
    table: String,
    dims: usize,
    metric: DistanceMetric,
}

impl PgVectorStore {
    pub async fn connect(
        url: &str,
        table: &str,
        dims: usize,
        metric: DistanceMetric,
    ) -> PipelineResult<Self> {
        check_table_name(table)?;
        let pool = db::connect_postgres(url).await?;
        Ok(Self {
            pool,
            table: table.to_string(),
            dims,
            metric,
        })
    }
}

fn create_table_sql(table: &str, dims: usize) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            filename TEXT NOT NULL,
            page_number INTEGER NOT NULL,
            chunk_id TEXT NOT NULL,
            text TEXT NOT NULL,
            embedding VECTOR({}) NOT NULL
        )",
        table, dims
    )
}

fn insert_sql(table: &str) -> String {
    format!(
        "INSERT INTO {} (filename, page_number, chunk_id, text, embedding) VALUES ($1, $2, $3, $4, $5)",
        table
    )
}

fn neighbors_sql(table: &str, metric: DistanceMetric) -> String {
    format!(
        "SELECT filename, page_number, chunk_id, text, embedding, \
         (embedding {} $1)::float8 AS distance \
         FROM {} ORDER BY distance LIMIT $2",
        metric.pg_operator(),
        table
    )
}

/// `page_number` is an `INTEGER` column.
fn page_to_sql(page_number: u32) -> PipelineResult<i32> {
    i32::try_from(page_number).map_err(|_| {
        PipelineError::write_failure(format!(
            "page number {} does not fit an INTEGER column",
            page_number
        ))
    })
}

fn page_from_sql(chunk_id: &str, page_number: i32) -> PipelineResult<u32> {
    u32::try_from(page_number).map_err(|_| {
        PipelineError::query_failure(format!(
            "chunk {} has out-of-range page number {}",
            chunk_id, page_number
        ))
    })
}

fn decode_row(row: &PgRow, dims: usize) -> PipelineResult<ScoredChunk> {
    let decode = |e: sqlx::Error| PipelineError::query_failure(e.to_string());
    let chunk_id: String = row.try_get("chunk_id").map_err(decode)?;
    let page_number: i32 = row.try_get("page_number").map_err(decode)?;
    let embedding: Vector = row.try_get("embedding").map_err(decode)?;
    let embedding = embedding.to_vec();

    if embedding.len() != dims {
        return Err(PipelineError::query_failure(format!(
            "stored embedding for chunk {} has {} dimensions, store expects {}",
            chunk_id,
            embedding.len(),
            dims
        )));
    }
    let page_number = page_from_sql(&chunk_id, page_number)?;

    Ok(ScoredChunk {
        chunk: Chunk {
            filename: row.try_get("filename").map_err(decode)?,
            page_number,
            chunk_id,
            text: row.try_get("text").map_err(decode)?,
            embedding,
        },
        distance: row.try_get("distance").map_err(decode)?,
    })
}

#[async_trait]
impl ChunkStore for PgVectorStore {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn init_schema(&self) -> PipelineResult<()> {
        if self.dims == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "embedding dimension must be positive".into(),
            ));
        }
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(|e| PipelineError::write_failure(format!("create extension: {}", e)))?;
        sqlx::query(&create_table_sql(&self.table, self.dims))
            .execute(&self.pool)
            .await
            .map_err(|e| PipelineError::write_failure(format!("create table: {}", e)))?;
        Ok(())
    }

    async fn write(&self, chunk: &Chunk) -> PipelineResult<()> {
        check_write_dims(chunk, self.dims)?;
        let page_number = page_to_sql(chunk.page_number)?;
        sqlx::query(&insert_sql(&self.table))
            .bind(&chunk.filename)
            .bind(page_number)
            .bind(&chunk.chunk_id)
            .bind(&chunk.text)
            .bind(Vector::from(chunk.embedding.clone()))
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
        let rows = sqlx::query(&neighbors_sql(&self.table, self.metric))
            .bind(Vector::from(query.to_vec()))
            .bind(top_k as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PipelineError::query_failure(e.to_string()))?;

        rows.iter()
            .map(|row| decode_row(row, self.dims))
            .collect()
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
