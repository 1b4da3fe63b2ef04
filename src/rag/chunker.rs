use text_splitter::{Characters, ChunkConfig, TextSplitter};

/// Splits extracted document text into overlapping character-bounded chunks
/// before embedding. Defaults come from `AppConfig`: 1000 chars with 100 of
/// overlap.
pub struct DocumentChunker {
    splitter: TextSplitter<Characters>,
}

impl DocumentChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        // Overlap must stay below capacity or the splitter cannot advance.
        let overlap = chunk_overlap.min(chunk_size.saturating_sub(1));
        let config = ChunkConfig::new(chunk_size)
            .with_overlap(overlap)
            .expect("overlap is clamped below chunk size");

        Self {
            splitter: TextSplitter::new(config),
        }
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        self.splitter
            .chunks(text)
            .map(|chunk| chunk.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunker = DocumentChunker::new(1000, 100);
        let chunks = chunker.chunk("Um parágrafo curto sobre fotossíntese.");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_long_text_respects_chunk_size() {
        let chunker = DocumentChunker::new(200, 20);
        let paragraph = "A Revolução Industrial transformou a produção de bens. ";
        let text = paragraph.repeat(30);

        let chunks = chunker.chunk(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 200);
        }
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunker = DocumentChunker::new(1000, 100);
        assert!(chunker.chunk("").is_empty());
    }

    #[test]
    fn test_degenerate_overlap_is_clamped() {
        // Overlap larger than the chunk size must not panic.
        let chunker = DocumentChunker::new(50, 100);
        let chunks = chunker.chunk(&"palavra ".repeat(40));
        assert!(!chunks.is_empty());
    }
}
