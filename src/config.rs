//! Configuration loading.
//!
//! Every setting has a default, so the TOML file is optional. Load order:
//! defaults, then the file (if given), then the recognized environment
//! variables, then validation.
//!
//! | Env var | Overrides |
//! |---------|-----------|
//! | `MODEL` | `completion.model` |
//! | `OLLAMA_URL` | `completion.endpoint` and `completion.chat_endpoint` |
//! | `DB_URL` | `store.url` |
//!
//! `OLLAMA_URL` may be a server base (`http://host:11434`) or either API
//! endpoint (`…/api/generate`, `…/api/chat`); both endpoints are derived
//! from its base.
//!
//! The resulting [`Config`] is passed explicitly into every component
//! constructor; nothing reads the environment after load.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::chunk::validate_chunking;
use crate::store::check_table_name;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Completion-style endpoint (`/api/generate`).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Chat-style endpoint (`/api/chat`), used by the terminal chat loop.
    #[serde(default = "default_chat_endpoint")]
    pub chat_endpoint: String,
    /// Request timeout. Unset means the client waits for end-of-stream.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            chat_endpoint: default_chat_endpoint(),
            timeout_secs: None,
        }
    }
}

fn default_model() -> String {
    "llama3".to_string()
}
fn default_endpoint() -> String {
    "http://localhost:11434/api/generate".to_string()
}
fn default_chat_endpoint() -> String {
    "http://localhost:11434/api/chat".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    /// Base URL of the Ollama server for `provider = "ollama"`.
    #[serde(default = "default_ollama_base")]
    pub url: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            dims: default_dims(),
            url: default_ollama_base(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_embedding_model() -> String {
    "all-minilm-l6-v2".to_string()
}
fn default_dims() -> usize {
    384
}
fn default_ollama_base() -> String {
    "http://localhost:11434".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// `postgres://…`, `postgresql://…`, `sqlite:…`, or `memory:`.
    #[serde(default = "default_store_url")]
    pub url: String,
    #[serde(default = "default_table")]
    pub table: String,
    /// `l2` (Euclidean) or `cosine`.
    #[serde(default = "default_metric")]
    pub metric: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            table: default_table(),
            metric: default_metric(),
        }
    }
}

fn default_store_url() -> String {
    "postgresql://localhost:5432/pdfdb".to_string()
}
fn default_table() -> String {
    "pdf_chunks".to_string()
}
fn default_metric() -> String {
    "l2".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Window size in words.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Words shared between consecutive windows. Must be < `chunk_size`.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}
fn default_overlap() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

/// Load configuration from an optional TOML file plus the process
/// environment, then validate it.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            parse_config(&content)?
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

/// Parse a TOML document into a [`Config`] without validating it.
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

/// Apply `MODEL`, `OLLAMA_URL`, and `DB_URL` from `lookup`.
///
/// Empty values are ignored so that `DB_URL=` falls back to the file or default.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(model) = get("MODEL") {
        config.completion.model = model;
    }
    if let Some(url) = get("OLLAMA_URL") {
        let base = ollama_base(&url);
        config.completion.endpoint = format!("{}/api/generate", base);
        config.completion.chat_endpoint = format!("{}/api/chat", base);
    }
    if let Some(url) = get("DB_URL") {
        config.store.url = url;
    }
}

/// Strip a trailing `/api/generate` or `/api/chat` (and slashes) from an
/// Ollama URL.
fn ollama_base(url: &str) -> &str {
    let url = url.trim().trim_end_matches('/');
    url.strip_suffix("/api/generate")
        .or_else(|| url.strip_suffix("/api/chat"))
        .unwrap_or(url)
        .trim_end_matches('/')
}

/// Check cross-field invariants.
pub fn validate(config: &Config) -> Result<()> {
    validate_chunking(config.chunking.chunk_size, config.chunking.overlap)
        .context("invalid [chunking] section")?;

    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    if config.completion.model.trim().is_empty() {
        anyhow::bail!("completion.model must not be empty");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "ollama" | "local" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, ollama, or local.",
            other
        ),
    }

    if config.embedding.is_enabled() && config.embedding.dims == 0 {
        anyhow::bail!(
            "embedding.dims must be > 0 when provider is '{}'",
            config.embedding.provider
        );
    }

    match config.store.metric.as_str() {
        "l2" | "cosine" => {}
        other => anyhow::bail!("Unknown store.metric: '{}'. Must be l2 or cosine.", other),
    }

    check_table_name(&config.store.table).context("invalid [store] section")?;

    Ok(())
}
