//! Sliding-window word chunker.
//!
//! Splits page text into windows of `chunk_size` whitespace-delimited words,
//! advancing by `chunk_size - overlap` words per window. Windows are re-joined
//! with single spaces, so original layout is not preserved.
//!
//! The configuration is validated before any windowing happens: a step of
//! zero or less would never reach the end of the word list.

use crate::error::{PipelineError, PipelineResult};
use crate::models::{chunk_id, Page, TextChunk};

/// Reject chunking parameters whose forward step would be non-positive.
pub fn validate_chunking(chunk_size: usize, overlap: usize) -> PipelineResult<()> {
    if chunk_size == 0 {
        return Err(PipelineError::InvalidConfiguration(
            "chunk_size must be > 0".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(PipelineError::InvalidConfiguration(format!(
            "overlap ({}) must be smaller than chunk_size ({})",
            overlap, chunk_size
        )));
    }
    Ok(())
}

/// Split text into overlapping word windows.
///
/// Empty or all-whitespace input yields no windows. The last window may be
/// shorter than `chunk_size`.
pub fn chunk_words(text: &str, chunk_size: usize, overlap: usize) -> PipelineResult<Vec<String>> {
    validate_chunking(chunk_size, overlap)?;

    let words: Vec<&str> = text.split_whitespace().collect();
    let step = chunk_size - overlap;
    let mut windows = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = (start + chunk_size).min(words.len());
        windows.push(words[start..end].join(" "));
        start += step;
    }

    Ok(windows)
}

/// Chunk every page and tag each window with its filename, page, and
/// per-page chunk id.
pub fn chunk_pages(
    pages: &[Page],
    chunk_size: usize,
    overlap: usize,
) -> PipelineResult<Vec<TextChunk>> {
    validate_chunking(chunk_size, overlap)?;

    let mut out = Vec::new();
    for page in pages {
        for (i, text) in chunk_words(&page.text, chunk_size, overlap)?
            .into_iter()
            .enumerate()
        {
            out.push(TextChunk {
                filename: page.filename.clone(),
                page_number: page.page_number,
                chunk_id: chunk_id(page.page_number, i),
                text,
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_no_overlap() {
        let chunks = chunk_words("a b c d e", 2, 0).unwrap();
        assert_eq!(chunks, vec!["a b", "c d", "e"]);
    }

    #[test]
    fn test_overlap_of_one() {
        let chunks = chunk_words("a b c d", 2, 1).unwrap();
        assert_eq!(chunks, vec!["a b", "b c", "c d", "d"]);
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_words("", 500, 100).unwrap().is_empty());
        assert!(chunk_words("  \n\t ", 500, 100).unwrap().is_empty());
    }

    #[test]
    fn test_short_text_single_window() {
        let chunks = chunk_words("just three words", 500, 100).unwrap();
        assert_eq!(chunks, vec!["just three words"]);
    }

    #[test]
    fn test_whitespace_collapsed() {
        let chunks = chunk_words("alpha\n\n  beta\tgamma", 10, 0).unwrap();
        assert_eq!(chunks, vec!["alpha beta gamma"]);
    }

    #[test]
    fn test_overlap_equal_to_size_rejected() {
        let err = chunk_words("a b c", 3, 3).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_overlap_larger_than_size_rejected() {
        let err = chunk_words("a b c", 2, 5).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = chunk_words("a b c", 0, 0).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_largest_safe_overlap_terminates() {
        let chunks = chunk_words(&words(10), 4, 3).unwrap();
        assert_eq!(chunks.len(), 10);
        assert_eq!(chunks.last().unwrap(), "w9");
    }

    #[test]
    fn test_window_count_without_overlap() {
        for n in 1..40usize {
            for size in 1..8usize {
                let chunks = chunk_words(&words(n), size, 0).unwrap();
                let expected = if n <= size { 1 } else { n.div_ceil(size) };
                assert_eq!(chunks.len(), expected, "n={} size={}", n, size);
            }
        }
    }

    #[test]
    fn test_window_count_with_overlap() {
        // Every start index below the word count opens a window, including
        // trailing windows that only repeat overlapped words.
        for n in 1..40usize {
            for size in 1..8usize {
                for overlap in 0..size {
                    let chunks = chunk_words(&words(n), size, overlap).unwrap();
                    let expected = n.div_ceil(size - overlap);
                    assert_eq!(
                        chunks.len(),
                        expected,
                        "n={} size={} overlap={}",
                        n,
                        size,
                        overlap
                    );
                }
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let text = words(123);
        let c1 = chunk_words(&text, 20, 5).unwrap();
        let c2 = chunk_words(&text, 20, 5).unwrap();
        assert_eq!(c1, c2);
    }

    #[test]
    fn test_rejoin_is_stable_for_single_spaced_text() {
        let text = words(30);
        let first = chunk_words(&text, 50, 0).unwrap();
        let second = chunk_words(&first[0], 50, 0).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0], text);
    }

    #[test]
    fn test_chunk_pages_ids_restart_per_page() {
        let pages = vec![
            Page {
                filename: "doc.pdf".into(),
                page_number: 1,
                text: "a b c".into(),
            },
            Page {
                filename: "doc.pdf".into(),
                page_number: 2,
                text: "d e f g".into(),
            },
        ];
        let chunks = chunk_pages(&pages, 2, 0).unwrap();
        let ids: Vec<&str> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["1_1", "1_2", "2_1", "2_2"]);
        assert_eq!(chunks[3].text, "f g");
        assert!(chunks.iter().all(|c| c.filename == "doc.pdf"));
    }

    #[test]
    fn test_chunk_pages_skips_blank_pages() {
        let pages = vec![Page {
            filename: "blank.pdf".into(),
            page_number: 1,
            text: String::new(),
        }];
        assert!(chunk_pages(&pages, 10, 2).unwrap().is_empty());
    }

    #[test]
    fn test_chunk_pages_validates_even_without_pages() {
        assert!(chunk_pages(&[], 2, 2).is_err());
    }
}
