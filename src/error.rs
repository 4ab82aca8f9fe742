//! Typed errors for the extraction, chunking, embedding, storage, and
//! completion pipeline.
//!
//! Library functions return [`PipelineError`] so that callers can decide how
//! to render a failure. Command runners and the binary wrap these in
//! `anyhow` with additional context.

use std::path::PathBuf;

use thiserror::Error;

/// Every failure the pipeline can surface.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The document path does not resolve to a readable regular file.
    #[error("document not found: {}", path.display())]
    DocumentNotFound { path: PathBuf },

    /// The PDF parser could not open or decode the document.
    #[error("failed to parse {}: {message}", path.display())]
    DocumentParseError { path: PathBuf, message: String },

    /// A configuration value violates an invariant (e.g. `overlap >= chunk_size`).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The embedding or completion service could not be reached, or answered
    /// with a non-success status.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// A response body could not be decoded.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A store write failed. `written` counts the rows of the current batch
    /// that were persisted before the failure; they are not rolled back.
    #[error("store write failed after {written} row(s): {message}")]
    StoreWriteFailure { written: usize, message: String },

    /// A store read failed.
    #[error("store query failed: {0}")]
    StoreQueryFailure(String),
}

impl PipelineError {
    pub(crate) fn write_failure(message: impl Into<String>) -> Self {
        PipelineError::StoreWriteFailure {
            written: 0,
            message: message.into(),
        }
    }

    pub(crate) fn query_failure(message: impl Into<String>) -> Self {
        PipelineError::StoreQueryFailure(message.into())
    }
}

/// Convenience alias used across the library.
pub type PipelineResult<T> = Result<T, PipelineError>;
