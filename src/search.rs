//! Nearest-neighbor retrieval over the chunk store.
//!
//! [`retrieve`] is the read path shared by `search`, `ask`, and any
//! caller that needs the top-K chunks for a query.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::embedding::{create_provider, embed_query, EmbeddingProvider};
use crate::error::PipelineResult;
use crate::models::ScoredChunk;
use crate::store::{open_store, ChunkStore};

/// Embed `query` and return up to `top_k` nearest chunks, nearest first.
pub async fn retrieve(
    query: &str,
    top_k: usize,
    embedder: &dyn EmbeddingProvider,
    store: &dyn ChunkStore,
) -> PipelineResult<Vec<ScoredChunk>> {
    let vector = embed_query(embedder, query).await?;
    let results = store.nearest_neighbors(&vector, top_k).await?;
    tracing::debug!(top_k, found = results.len(), "retrieved chunks");
    Ok(results)
}

/// `pdfqa search`: print the nearest chunks with their distances.
pub async fn run_search(config: &Config, query: &str, top_k: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let embedder = create_provider(&config.embedding)?;
    let store = open_store(&config.store, embedder.dims()).await?;
    let outcome = retrieve(query, top_k, embedder.as_ref(), store.as_ref()).await;
    store.close().await;
    let results = outcome.context("Search failed")?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        let chunk = &result.chunk;
        println!(
            "{}. [{:.4}] {} / page {}",
            i + 1,
            result.distance,
            chunk.filename,
            chunk.page_number
        );
        println!("    chunk: {}", chunk.chunk_id);
        println!("    excerpt: \"{}\"", excerpt(&chunk.text, 240));
        println!();
    }

    Ok(())
}

/// Single-line excerpt of at most `max_chars` characters.
fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;
    use crate::store::{DistanceMetric, InMemoryStore};
    use async_trait::async_trait;

    /// Maps text to `[len, 0]`.
    struct LengthEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LengthEmbedder {
        fn model_name(&self) -> &str {
            "length"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed_texts(&self, texts: &[String]) -> PipelineResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 0.0]).collect())
        }
    }

    #[tokio::test]
    async fn retrieve_returns_nearest_first() {
        let store = InMemoryStore::new(2, DistanceMetric::L2);
        for (id, len) in [("1_1", 100.0), ("1_2", 4.0), ("1_3", 10.0)] {
            store
                .write(&Chunk {
                    filename: "a.pdf".into(),
                    page_number: 1,
                    chunk_id: id.into(),
                    text: id.into(),
                    embedding: vec![len, 0.0],
                })
                .await
                .unwrap();
        }

        let results = retrieve("abcde", 2, &LengthEmbedder, &store).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["1_2", "1_3"]);
    }

    #[tokio::test]
    async fn retrieve_on_empty_store_is_empty() {
        let store = InMemoryStore::new(2, DistanceMetric::L2);
        let results = retrieve("anything", 5, &LengthEmbedder, &store).await.unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn excerpt_flattens_and_truncates() {
        assert_eq!(excerpt("a\n b\tc", 10), "a b c");
        assert_eq!(excerpt("abcdefghij", 4), "abcd...");
    }
}
