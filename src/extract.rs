//! Per-page PDF text extraction.
//!
//! Reads a PDF from disk and returns one [`Page`] per document page, tagged
//! with the file name and a 1-based page number. Page text is trimmed of
//! leading and trailing whitespace; nothing else is normalized.

use std::path::Path;

use crate::error::{PipelineError, PipelineResult};
use crate::models::Page;

/// Extract the text of every page of the PDF at `path`, in document order.
///
/// A document with zero pages yields an empty vector.
///
/// # Errors
///
/// - [`PipelineError::DocumentNotFound`] if `path` is not a readable regular file.
/// - [`PipelineError::DocumentParseError`] if `pdf-extract` cannot open it.
pub fn extract_pages(path: &Path) -> PipelineResult<Vec<Page>> {
    if !path.is_file() {
        return Err(PipelineError::DocumentNotFound {
            path: path.to_path_buf(),
        });
    }

    let bytes = std::fs::read(path).map_err(|_| PipelineError::DocumentNotFound {
        path: path.to_path_buf(),
    })?;

    let texts = pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| {
        PipelineError::DocumentParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    let pages = pages_from_texts(&file_name(path), texts);
    tracing::debug!(path = %path.display(), pages = pages.len(), "extracted pages");
    Ok(pages)
}

/// Tag raw per-page strings with `filename` and 1-based page numbers.
pub fn pages_from_texts(filename: &str, texts: Vec<String>) -> Vec<Page> {
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Page {
            filename: filename.to_string(),
            page_number: (i + 1) as u32,
            text: text.trim().to_string(),
        })
        .collect()
}

/// Final path component, used as the filename tag on every page.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
