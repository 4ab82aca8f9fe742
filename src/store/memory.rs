//! In-memory [`ChunkStore`] implementation for tests and throwaway sessions.
//!
//! Rows live in a `Vec` behind `std::sync::RwLock`. Nearest-neighbor search
//! is brute force over every stored vector.

use std::sync::RwLock;

use async_trait::async_trait;

use super::{check_query, check_write_dims, rank_by_distance, ChunkStore, DistanceMetric};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Chunk, ScoredChunk};

pub struct InMemoryStore {
    dims: usize,
    metric: DistanceMetric,
    rows: RwLock<Vec<Chunk>>,
}

impl InMemoryStore {
    pub fn new(dims: usize, metric: DistanceMetric) -> Self {
        Self {
            dims,
            metric,
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of all rows in insertion order.
    pub fn rows(&self) -> PipelineResult<Vec<Chunk>> {
        self.rows
            .read()
            .map(|r| r.clone())
            .map_err(|_| PipelineError::query_failure("store lock poisoned"))
    }
}

#[async_trait]
impl ChunkStore for InMemoryStore {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn init_schema(&self) -> PipelineResult<()> {
        Ok(())
    }

    async fn write(&self, chunk: &Chunk) -> PipelineResult<()> {
        check_write_dims(chunk, self.dims)?;
        let mut rows = self
            .rows
            .write()
            .map_err(|_| PipelineError::write_failure("store lock poisoned"))?;
        rows.push(chunk.clone());
        Ok(())
    }

    async fn nearest_neighbors(
        &self,
        query: &[f32],
        top_k: usize,
    ) -> PipelineResult<Vec<ScoredChunk>> {
        check_query(query, top_k, self.dims)?;
        let rows = self
            .rows
            .read()
            .map_err(|_| PipelineError::query_failure("store lock poisoned"))?;
        Ok(rank_by_distance(
            query,
            rows.iter().cloned(),
            self.metric,
            top_k,
        ))
    }

    async fn count(&self) -> PipelineResult<u64> {
        let rows = self
            .rows
            .read()
            .map_err(|_| PipelineError::query_failure("store lock poisoned"))?;
        Ok(rows.len() as u64)
    }

    async fn close(&self) {}
}
