use crate::index::{Index, IndexOptions};
use chat_core::{Document, EmbeddingServiceError};
use embeddings::{EmbeddingProvider, TextChunker};
use std::sync::Arc;
use tracing::info;

/// Turns one upload batch of documents into a ready-to-query [`Index`].
pub struct IndexBuilder {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    options: IndexOptions,
}

impl IndexBuilder {
    pub fn new(
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        options: IndexOptions,
    ) -> Self {
        Self {
            chunker,
            embedder,
            options,
        }
    }

    pub async fn ingest(&self, documents: &[Document]) -> Result<Index, EmbeddingServiceError> {
        let chunks = self.chunker.split(documents);
        info!(
            documents = documents.len(),
            chunks = chunks.len(),
            "Ingesting document batch"
        );
        Index::build(chunks, Arc::clone(&self.embedder), self.options).await
    }
}
