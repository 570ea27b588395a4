//! Fixed-size text chunking for large documents

use crate::error::ExtractorError;
use crate::types::Chunk;

/// Splits text into consecutive chunks of at most `max_chunk_size` characters
///
/// Boundaries fall strictly at the size limit, counted in Unicode scalar
/// values, so every chunk but the last is exactly full and the chunks
/// concatenate back to the input.
pub struct TextChunker {
    max_chunk_size: usize,
}

impl TextChunker {
    /// Create a new text chunker
    pub fn new(max_chunk_size: usize) -> Self {
        Self { max_chunk_size }
    }

    /// Chunk the given text
    pub fn chunk(&self, text: &str) -> Result<Vec<Chunk>, ExtractorError> {
        if self.max_chunk_size == 0 {
            return Err(ExtractorError::Config(
                "max_chunk_size must be greater than 0".to_string(),
            ));
        }

        let mut pieces = Vec::new();
        let mut start = 0;
        let mut count = 0;

        for (offset, _) in text.char_indices() {
            if count == self.max_chunk_size {
                pieces.push(&text[start..offset]);
                start = offset;
                count = 0;
            }
            count += 1;
        }
        // Trailing piece; also covers the empty document
        pieces.push(&text[start..]);

        let total = pieces.len();
        Ok(pieces
            .into_iter()
            .enumerate()
            .map(|(index, piece)| Chunk {
                index,
                total,
                text: piece.to_string(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sizes(chunks: &[Chunk]) -> Vec<usize> {
        chunks.iter().map(|c| c.text.chars().count()).collect()
    }

    #[test]
    fn test_no_chunking_needed_for_small_text() {
        let chunks = TextChunker::new(100).chunk("Short text here.").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Short text here.");
        assert_eq!((chunks[0].index, chunks[0].total), (0, 1));
    }

    #[test]
    fn test_exact_fit_is_one_chunk() {
        let text = "a".repeat(50);
        let chunks = TextChunker::new(50).chunk(&text).unwrap();
        assert_eq!(sizes(&chunks), vec![50]);
    }

    #[test]
    fn test_large_document_splits_at_budget() {
        let text = "x".repeat(170_000);
        let chunks = TextChunker::new(80_000).chunk(&text).unwrap();

        assert_eq!(sizes(&chunks), vec![80_000, 80_000, 10_000]);
        assert!(chunks.iter().all(|c| c.total == 3));
        assert_eq!(
            chunks.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_empty_text() {
        let chunks = TextChunker::new(100).chunk("").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "");
    }

    #[test]
    fn test_multibyte_characters_not_split() {
        let text = "héllo wörld ✓✓✓";
        let chunks = TextChunker::new(4).chunk(text).unwrap();
        assert_eq!(chunks[0].text, "héll");
        assert_eq!(chunks.last().unwrap().text, "✓✓✓");
        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn test_zero_budget_is_config_error() {
        let result = TextChunker::new(0).chunk("text");
        assert!(matches!(result, Err(ExtractorError::Config(_))));
    }

    proptest! {
        #[test]
        fn prop_chunks_reassemble_and_respect_budget(text in "\\PC{0,400}", max in 1usize..64) {
            let chunks = TextChunker::new(max).chunk(&text).unwrap();

            let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
            prop_assert_eq!(joined, text.clone());

            let counts = sizes(&chunks);
            let (last, full) = counts.split_last().unwrap();
            prop_assert!(full.iter().all(|&n| n == max));
            prop_assert!(*last <= max);
            prop_assert_eq!(chunks.len(), std::cmp::max(1, (text.chars().count() + max - 1) / max));
        }
    }
}
