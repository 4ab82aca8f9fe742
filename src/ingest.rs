//! Ingestion pipeline orchestration.
//!
//! Coordinates the write path: extraction → chunking → embedding → storage.
//! One document is one logical batch; rows are written in chunk order and a
//! failure part-way leaves earlier rows in place.

use anyhow::{Context, Result};
use std::path::Path;

use crate::chunk::chunk_pages;
use crate::completion::CompletionClient;
use crate::config::{ChunkingConfig, Config};
use crate::embedding::{check_embeddings, create_provider, EmbeddingProvider};
use crate::error::PipelineResult;
use crate::extract::{extract_pages, file_name};
use crate::models::{Chunk, Page, TextChunk};
use crate::store::{open_store, ChunkStore};
use crate::summary;

/// Number of sample chunks shown after an ingest.
const SAMPLE_CHUNKS: usize = 5;

/// Number of chunks printed by the extraction preview.
const PREVIEW_CHUNKS: usize = 2;

/// Outcome of ingesting one document.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub filename: String,
    pub pages: usize,
    /// Chunks in write order, without embeddings.
    pub chunks: Vec<TextChunk>,
    pub written: usize,
    /// Whitespace-separated words across all chunk texts.
    pub word_count: usize,
}

impl IngestReport {
    /// Plain text of every chunk joined by spaces.
    pub fn full_text(&self) -> String {
        self.chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Chunk, embed, and store already-extracted pages.
///
/// A document with no words produces zero chunks and makes no embedding or
/// store calls.
pub async fn ingest_pages(
    filename: &str,
    pages: &[Page],
    chunking: &ChunkingConfig,
    embedder: &dyn EmbeddingProvider,
    store: &dyn ChunkStore,
) -> PipelineResult<IngestReport> {
    let text_chunks = chunk_pages(pages, chunking.chunk_size, chunking.overlap)?;
    let word_count = text_chunks
        .iter()
        .map(|c| c.text.split_whitespace().count())
        .sum();

    if text_chunks.is_empty() {
        tracing::info!(filename, pages = pages.len(), "document has no text, nothing to store");
        return Ok(IngestReport {
            filename: filename.to_string(),
            pages: pages.len(),
            chunks: Vec::new(),
            written: 0,
            word_count,
        });
    }

    let texts: Vec<String> = text_chunks.iter().map(|c| c.text.clone()).collect();
    tracing::info!(
        filename,
        chunks = texts.len(),
        model = embedder.model_name(),
        "embedding chunks"
    );
    let vectors = embedder.embed_texts(&texts).await?;
    check_embeddings(&vectors, texts.len(), store.dims())?;

    let chunks: Vec<Chunk> = text_chunks
        .iter()
        .cloned()
        .zip(vectors)
        .map(|(chunk, vector)| chunk.with_embedding(vector))
        .collect();

    let written = store.write_batch(&chunks).await?;
    tracing::info!(filename, written, "chunks stored");

    Ok(IngestReport {
        filename: filename.to_string(),
        pages: pages.len(),
        chunks: text_chunks,
        written,
        word_count,
    })
}

/// Extract `path` and run [`ingest_pages`] on the result.
pub async fn ingest_document(
    path: &Path,
    chunking: &ChunkingConfig,
    embedder: &dyn EmbeddingProvider,
    store: &dyn ChunkStore,
) -> PipelineResult<IngestReport> {
    let pages = extract_pages(path)?;
    ingest_pages(&file_name(path), &pages, chunking, embedder, store).await
}

/// `pdfqa ingest`: ingest one PDF and print a report.
pub async fn run_ingest(
    config: &Config,
    path: &Path,
    chunking: &ChunkingConfig,
    with_summary: bool,
) -> Result<()> {
    let embedder = create_provider(&config.embedding)?;
    let store = open_store(&config.store, embedder.dims()).await?;
    let outcome = async {
        store.init_schema().await?;
        ingest_document(path, chunking, embedder.as_ref(), store.as_ref()).await
    }
    .await;
    store.close().await;

    let report = outcome.with_context(|| format!("Failed to ingest {}", path.display()))?;

    println!("ingest {}", report.filename);
    println!("  pages: {}", report.pages);
    println!("  chunks written: {}", report.written);
    println!("  estimated word count: {}", report.word_count);

    if !report.chunks.is_empty() {
        println!();
        println!("sample chunks:");
        for chunk in report.chunks.iter().take(SAMPLE_CHUNKS) {
            println!("  [page {} | chunk {}]", chunk.page_number, chunk.chunk_id);
            println!("  {}", chunk.text);
            println!();
        }
    }

    if with_summary {
        let client = CompletionClient::new(&config.completion)?;
        let doc = summary::summarize(&client, &report.full_text())
            .await
            .context("Failed to summarize document")?;
        println!("summary:");
        println!("{}", doc.summary.trim());
        println!();
        println!("top terms:");
        for (term, freq) in &doc.top_terms {
            println!("  {}: {} times", term, freq);
        }
    }

    println!("ok");
    Ok(())
}

/// `pdfqa extract`: chunk a PDF without embedding or storing it and print
/// the first chunks as JSON.
pub fn run_extract(path: &Path, chunking: &ChunkingConfig) -> Result<()> {
    let pages = extract_pages(path)?;
    let chunks = chunk_pages(&pages, chunking.chunk_size, chunking.overlap)?;
    tracing::debug!(pages = pages.len(), chunks = chunks.len(), "extracted");

    let preview: Vec<&TextChunk> = chunks.iter().take(PREVIEW_CHUNKS).collect();
    println!("{}", serde_json::to_string_pretty(&preview)?);
    Ok(())
}
