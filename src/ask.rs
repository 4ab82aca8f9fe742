//! Retrieval-augmented question answering.
//!
//! Query → embed → nearest chunks → prompt → completion. The sources list
//! shown alongside an answer is deduplicated by chunk text; the prompt
//! itself always receives every retrieved chunk.

use anyhow::{Context, Result};
use std::collections::HashSet;

use crate::completion::{CompletionClient, CompletionOptions, CompletionService};
use crate::config::Config;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::error::PipelineResult;
use crate::models::{Chunk, ScoredChunk};
use crate::prompt::{build_prompt, Persona};
use crate::search::retrieve;
use crate::store::{open_store, ChunkStore};

/// Where a displayed answer came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub filename: String,
    pub page_number: u32,
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<Source>,
}

/// Keep the first occurrence of each distinct chunk text, in order.
pub fn dedup_sources(results: &[ScoredChunk]) -> Vec<Source> {
    let mut seen: HashSet<&str> = HashSet::new();
    results
        .iter()
        .filter(|r| seen.insert(r.chunk.text.as_str()))
        .map(|r| Source {
            filename: r.chunk.filename.clone(),
            page_number: r.chunk.page_number,
        })
        .collect()
}

/// Answer `query` from the store. Returns `None` without calling the
/// completion service when nothing was retrieved.
pub async fn answer_question(
    query: &str,
    top_k: usize,
    persona: Persona,
    embedder: &dyn EmbeddingProvider,
    store: &dyn ChunkStore,
    completion: &dyn CompletionService,
) -> PipelineResult<Option<Answer>> {
    let results = retrieve(query, top_k, embedder, store).await?;
    if results.is_empty() {
        return Ok(None);
    }

    let chunks: Vec<Chunk> = results.iter().map(|r| r.chunk.clone()).collect();
    let prompt = build_prompt(query, &chunks, persona);
    let text = completion
        .complete(&prompt, &CompletionOptions::default())
        .await?;

    Ok(Some(Answer {
        text,
        sources: dedup_sources(&results),
    }))
}

/// `pdfqa ask`: print an answer and its sources.
pub async fn run_ask(
    config: &Config,
    query: &str,
    persona: Persona,
    top_k: Option<usize>,
) -> Result<()> {
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let embedder = create_provider(&config.embedding)?;
    let completion = CompletionClient::new(&config.completion)?;
    let store = open_store(&config.store, embedder.dims()).await?;
    let outcome = answer_question(
        query,
        top_k,
        persona,
        embedder.as_ref(),
        store.as_ref(),
        &completion,
    )
    .await;
    store.close().await;

    match outcome.context("Failed to answer question")? {
        None => println!("No relevant chunks found."),
        Some(answer) => {
            println!("{}", answer.text.trim());
            println!();
            println!("sources:");
            for source in &answer.sources {
                println!("  - Page {} | File: {}", source.page_number, source.filename);
            }
        }
    }
    Ok(())
}
