//! Chunk storage abstraction.
//!
//! The [`ChunkStore`] trait defines the two operations the pipeline needs
//! (append a chunk, find nearest neighbors) plus schema setup and
//! connection release. Backends:
//!
//! | URL scheme | Backend |
//! |------------|---------|
//! | `postgres://`, `postgresql://` | [`PgVectorStore`] (pgvector, native `vector` binding) |
//! | `sqlite:` | [`SqliteStore`] (BLOB vectors, distance computed in Rust) |
//! | `memory:` | [`InMemoryStore`] |
//!
//! Writes are not idempotent: writing the same chunk twice stores two rows.
//! Batches are not transactional; a failure mid-batch leaves the rows
//! written so far in place.

pub mod memory;
pub mod postgres;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use postgres::PgVectorStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::str::FromStr;

use crate::config::StoreConfig;
use crate::embedding::{cosine_distance, euclidean_distance};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Chunk, ScoredChunk};

/// How vector distance is measured. Lower is always more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    /// Euclidean distance (pgvector `<->`).
    #[default]
    L2,
    /// Cosine distance, `1 - cos` (pgvector `<=>`).
    Cosine,
}

impl DistanceMetric {
    pub fn distance(self, a: &[f32], b: &[f32]) -> f64 {
        match self {
            DistanceMetric::L2 => euclidean_distance(a, b),
            DistanceMetric::Cosine => cosine_distance(a, b),
        }
    }

    /// The pgvector operator for this metric.
    pub fn pg_operator(self) -> &'static str {
        match self {
            DistanceMetric::L2 => "<->",
            DistanceMetric::Cosine => "<=>",
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "l2" => Ok(DistanceMetric::L2),
            "cosine" => Ok(DistanceMetric::Cosine),
            other => Err(PipelineError::InvalidConfiguration(format!(
                "unknown distance metric: {}",
                other
            ))),
        }
    }
}

/// Abstract chunk storage backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`init_schema`](ChunkStore::init_schema) | Create the chunk table if missing |
/// | [`write`](ChunkStore::write) | Append one chunk row |
/// | [`write_batch`](ChunkStore::write_batch) | Append chunks in order, no rollback |
/// | [`nearest_neighbors`](ChunkStore::nearest_neighbors) | Top-K by ascending distance |
/// | [`count`](ChunkStore::count) | Number of stored rows |
/// | [`close`](ChunkStore::close) | Release the connection |
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Vector dimensionality every stored embedding must have.
    fn dims(&self) -> usize;

    /// Create the table (and any extension it needs) if missing.
    async fn init_schema(&self) -> PipelineResult<()>;

    /// Append one chunk row.
    async fn write(&self, chunk: &Chunk) -> PipelineResult<()>;

    /// Append chunks in order. Returns the number written.
    ///
    /// On failure the error is a [`PipelineError::StoreWriteFailure`] whose
    /// `written` field counts the rows persisted before the failing one.
    async fn write_batch(&self, chunks: &[Chunk]) -> PipelineResult<usize> {
        for (written, chunk) in chunks.iter().enumerate() {
            if let Err(e) = self.write(chunk).await {
                let message = match e {
                    PipelineError::StoreWriteFailure { message, .. } => message,
                    other => other.to_string(),
                };
                return Err(PipelineError::StoreWriteFailure { written, message });
            }
        }
        Ok(chunks.len())
    }

    /// Return up to `top_k` chunks ordered by non-decreasing distance to
    /// `query`. An empty store yields an empty vector.
    async fn nearest_neighbors(&self, query: &[f32], top_k: usize)
        -> PipelineResult<Vec<ScoredChunk>>;

    /// Number of stored rows.
    async fn count(&self) -> PipelineResult<u64>;

    /// Release the underlying connection.
    async fn close(&self);
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn check_table_name(table: &str) -> PipelineResult<()> {
    let valid = !table.is_empty()
        && !table.starts_with(|c: char| c.is_ascii_digit())
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(PipelineError::InvalidConfiguration(format!(
            "table name must be a plain identifier, got '{}'",
            table
        )));
    }
    Ok(())
}

/// Reject vectors whose length differs from the store's dimensionality.
pub(crate) fn check_write_dims(chunk: &Chunk, dims: usize) -> PipelineResult<()> {
    if chunk.embedding.len() != dims {
        return Err(PipelineError::write_failure(format!(
            "chunk {} of {} has a {}-dimensional embedding, store expects {}",
            chunk.chunk_id,
            chunk.filename,
            chunk.embedding.len(),
            dims
        )));
    }
    Ok(())
}

pub(crate) fn check_query(query: &[f32], top_k: usize, dims: usize) -> PipelineResult<()> {
    if top_k == 0 {
        return Err(PipelineError::query_failure("top_k must be > 0"));
    }
    if query.len() != dims {
        return Err(PipelineError::query_failure(format!(
            "query embedding has {} dimensions, store expects {}",
            query.len(),
            dims
        )));
    }
    Ok(())
}

/// Brute-force ranking used by the backends that cannot compute distance
/// in the database.
pub(crate) fn rank_by_distance(
    query: &[f32],
    rows: impl IntoIterator<Item = Chunk>,
    metric: DistanceMetric,
    top_k: usize,
) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = rows
        .into_iter()
        .map(|chunk| ScoredChunk {
            distance: metric.distance(query, &chunk.embedding),
            chunk,
        })
        .collect();

    scored.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(top_k);
    scored
}

/// Open the backend selected by `config.url`'s scheme.
pub async fn open_store(config: &StoreConfig, dims: usize) -> PipelineResult<Box<dyn ChunkStore>> {
    let metric: DistanceMetric = config.metric.parse()?;
    let url = config.url.as_str();

    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        let store = PgVectorStore::connect(url, &config.table, dims, metric).await?;
        Ok(Box::new(store))
    } else if url.starts_with("sqlite:") {
        let store = SqliteStore::connect(url, &config.table, dims, metric).await?;
        Ok(Box::new(store))
    } else if url.starts_with("memory:") {
        Ok(Box::new(InMemoryStore::new(dims, metric)))
    } else {
        Err(PipelineError::InvalidConfiguration(format!(
            "unsupported store url '{}': expected postgres://, sqlite:, or memory:",
            url
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            filename: "f.pdf".into(),
            page_number: 1,
            chunk_id: id.into(),
            text: id.into(),
            embedding,
        }
    }

    #[test]
    fn metric_parse() {
        assert_eq!("l2".parse::<DistanceMetric>().unwrap(), DistanceMetric::L2);
        assert_eq!(
            "cosine".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::Cosine
        );
        assert!("dot".parse::<DistanceMetric>().is_err());
    }

    #[test]
    fn rank_orders_ascending_and_truncates() {
        let rows = vec![
            chunk("far", vec![10.0, 0.0]),
            chunk("near", vec![1.0, 0.0]),
            chunk("mid", vec![4.0, 0.0]),
        ];
        let ranked = rank_by_distance(&[0.0, 0.0], rows, DistanceMetric::L2, 2);
        let ids: Vec<&str> = ranked.iter().map(|s| s.chunk.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
        assert!((ranked[0].distance - 1.0).abs() < 1e-9);
    }

    #[test]
    fn query_checks() {
        assert!(check_query(&[0.0, 1.0], 0, 2).is_err());
        assert!(check_query(&[0.0], 3, 2).is_err());
        check_query(&[0.0, 1.0], 3, 2).unwrap();
    }

    #[tokio::test]
    async fn open_store_rejects_unknown_scheme() {
        let config = StoreConfig {
            url: "mysql://localhost/db".into(),
            ..StoreConfig::default()
        };
        assert!(matches!(
            open_store(&config, 3).await,
            Err(PipelineError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn open_store_memory() {
        let config = StoreConfig {
            url: "memory:".into(),
            ..StoreConfig::default()
        };
        let store = open_store(&config, 3).await.unwrap();
        assert_eq!(store.dims(), 3);
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
