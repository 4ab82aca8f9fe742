//! In-process sentence embeddings via fastembed.
//!
//! The model is downloaded from Hugging Face on first use and cached; after
//! that, embedding runs offline. The ONNX session is created lazily on the
//! first call and reused for the lifetime of the provider.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{check_embeddings, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::error::{PipelineError, PipelineResult};

/// Embedding provider for local inference.
pub struct LocalProvider {
    model_name: String,
    model: fastembed::EmbeddingModel,
    dims: usize,
    batch_size: usize,
    session: Arc<Mutex<Option<fastembed::TextEmbedding>>>,
}

impl LocalProvider {
    pub fn new(config: &EmbeddingConfig) -> PipelineResult<Self> {
        let model = config_to_fastembed_model(&config.model)?;
        Ok(Self {
            model_name: config.model.clone(),
            model,
            dims: config.dims,
            batch_size: config.batch_size.max(1),
            session: Arc::new(Mutex::new(None)),
        })
    }
}

fn config_to_fastembed_model(name: &str) -> PipelineResult<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        other => Err(PipelineError::InvalidConfiguration(format!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, \
             nomic-embed-text-v1.5, multilingual-e5-small",
            other
        ))),
    }
}

#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_texts(&self, texts: &[String]) -> PipelineResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let session = Arc::clone(&self.session);
        let model = self.model.clone();
        let batch_size = self.batch_size;
        let inputs = texts.to_vec();

        let embeddings = tokio::task::spawn_blocking(move || {
            let mut guard = session
                .lock()
                .map_err(|_| PipelineError::ServiceUnavailable("embedding session poisoned".into()))?;

            if guard.is_none() {
                let created = fastembed::TextEmbedding::try_new(
                    fastembed::InitOptions::new(model).with_show_download_progress(false),
                )
                .map_err(|e| {
                    PipelineError::ServiceUnavailable(format!(
                        "Failed to initialize local embedding model: {}",
                        e
                    ))
                })?;
                *guard = Some(created);
            }

            match guard.as_mut() {
                Some(embedder) => embedder.embed(inputs, Some(batch_size)).map_err(|e| {
                    PipelineError::ServiceUnavailable(format!("Local embedding failed: {}", e))
                }),
                None => Err(PipelineError::ServiceUnavailable(
                    "embedding session unavailable".into(),
                )),
            }
        })
        .await
        .map_err(|e| PipelineError::ServiceUnavailable(e.to_string()))??;

        check_embeddings(&embeddings, texts.len(), self.dims)?;
        Ok(embeddings)
    }
}
