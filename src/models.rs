//! Core data models used throughout the pipeline.
//!
//! These types represent the pages, chunks, and query results that flow
//! through the ingestion and retrieval paths.

use serde::Serialize;

/// Plain text of one document page, as produced by the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub filename: String,
    /// 1-based page number in document order.
    pub page_number: u32,
    pub text: String,
}

/// A chunk of page text before it has been embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    pub filename: String,
    pub page_number: u32,
    /// `"{page_number}_{local_index}"`, unique within a page only.
    pub chunk_id: String,
    pub text: String,
}

impl TextChunk {
    /// Attach an embedding vector, producing a storable [`Chunk`].
    pub fn with_embedding(self, embedding: Vec<f32>) -> Chunk {
        Chunk {
            filename: self.filename,
            page_number: self.page_number,
            chunk_id: self.chunk_id,
            text: self.text,
            embedding,
        }
    }
}

/// A persisted chunk row.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub filename: String,
    pub page_number: u32,
    pub chunk_id: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// One element of a nearest-neighbor query result.
///
/// Lower `distance` means more similar.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub distance: f64,
}

/// Build the per-page chunk identifier from a 0-based window index.
pub fn chunk_id(page_number: u32, window_index: usize) -> String {
    format!("{}_{}", page_number, window_index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ids_are_one_based_per_page() {
        assert_eq!(chunk_id(3, 0), "3_1");
        assert_eq!(chunk_id(12, 4), "12_5");
    }

    #[test]
    fn with_embedding_keeps_metadata() {
        let tc = TextChunk {
            filename: "a.pdf".into(),
            page_number: 2,
            chunk_id: "2_1".into(),
            text: "hello world".into(),
        };
        let c = tc.with_embedding(vec![0.5, 0.25]);
        assert_eq!(c.filename, "a.pdf");
        assert_eq!(c.chunk_id, "2_1");
        assert_eq!(c.embedding, vec![0.5, 0.25]);
    }
}
