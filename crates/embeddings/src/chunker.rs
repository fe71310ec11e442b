use chat_core::config::ChunkingConfig;
use chat_core::{Chunk, Document, InvalidParameterError};
use tracing::debug;

/// Configuration for text chunking, in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 5000,
            overlap: 500,
        }
    }
}

impl From<&ChunkingConfig> for ChunkConfig {
    fn from(cfg: &ChunkingConfig) -> Self {
        Self {
            chunk_size: cfg.chunk_size,
            overlap: cfg.overlap,
        }
    }
}

impl ChunkConfig {
    pub fn validate(&self) -> Result<(), InvalidParameterError> {
        if self.chunk_size == 0 {
            return Err(InvalidParameterError(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(InvalidParameterError(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Splits documents into fixed-size, overlapping character windows.
#[derive(Debug, Clone)]
pub struct TextChunker {
    config: ChunkConfig,
}

impl TextChunker {
    pub fn new(config: ChunkConfig) -> Result<Self, InvalidParameterError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Chunks every document, keeping document order and in-document order.
    pub fn split(&self, documents: &[Document]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = documents
            .iter()
            .flat_map(|doc| self.chunk_document(doc))
            .collect();

        debug!(
            documents = documents.len(),
            chunks = chunks.len(),
            "Split documents into chunks"
        );
        chunks
    }

    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        let text = &document.text;
        if text.is_empty() {
            return vec![];
        }

        // Byte offset of every char boundary, including the end of the text.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(idx, _)| idx)
            .chain(std::iter::once(text.len()))
            .collect();
        let total_chars = boundaries.len() - 1;

        self.spans(total_chars)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (start, end))| Chunk {
                document_id: document.id,
                source: document.source.clone(),
                page: document.page,
                chunk_index,
                start,
                end,
                content: text[boundaries[start]..boundaries[end]].to_string(),
            })
            .collect()
    }

    /// Char ranges `[start, end)` covering `0..total_chars`.
    fn spans(&self, total_chars: usize) -> Vec<(usize, usize)> {
        if total_chars <= self.config.chunk_size {
            // Text fits in a single chunk
            return vec![(0, total_chars)];
        }

        let step = self.config.chunk_size - self.config.overlap;
        let mut spans = Vec::new();
        let mut start = 0;

        loop {
            let end = std::cmp::min(start + self.config.chunk_size, total_chars);
            spans.push((start, end));
            if end == total_chars {
                break;
            }
            start += step;
        }

        spans
    }
}
