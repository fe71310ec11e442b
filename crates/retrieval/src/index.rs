use crate::models::{IndexedChunk, SearchResult};
use crate::similarity;
use chat_core::config::{RetrievalConfig, SimilarityMetric};
use chat_core::{Chunk, EmbeddingServiceError, InvalidParameterError};
use embeddings::EmbeddingProvider;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetrievalError {
    #[error(transparent)]
    InvalidParameter(#[from] InvalidParameterError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingServiceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    pub similarity: SimilarityMetric,
    /// Maximum number of chunk texts sent in one embedding request.
    pub batch_size: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            similarity: SimilarityMetric::Cosine,
            batch_size: 32,
        }
    }
}

impl IndexOptions {
    pub fn new(retrieval: &RetrievalConfig, batch_size: usize) -> Self {
        Self {
            similarity: retrieval.similarity,
            batch_size,
        }
    }
}

/// Read-only nearest-neighbour index over embedded chunks.
///
/// Holds the provider that embedded its chunks so queries are embedded by the
/// same model, and the metric it was built with so build and query agree.
pub struct Index {
    entries: Vec<IndexedChunk>,
    dimension: Option<usize>,
    similarity: SimilarityMetric,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("entries", &self.entries.len())
            .field("dimension", &self.dimension)
            .field("similarity", &self.similarity)
            .field("embedder", &self.embedder.name())
            .finish()
    }
}

impl Index {
    /// Embeds every chunk and builds the index. Any provider failure or
    /// malformed batch aborts the whole build.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: Arc<dyn EmbeddingProvider>,
        options: IndexOptions,
    ) -> Result<Self, EmbeddingServiceError> {
        let provider = embedder.name().to_string();
        let batch_size = options.batch_size.max(1);
        let mut entries = Vec::with_capacity(chunks.len());
        let mut dimension: Option<usize> = None;

        for batch in chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = embedder.embed(texts).await?;

            if vectors.len() != batch.len() {
                return Err(EmbeddingServiceError::new(
                    &provider,
                    format!(
                        "expected {} embeddings, received {}",
                        batch.len(),
                        vectors.len()
                    ),
                ));
            }

            for (chunk, vector) in batch.iter().zip(vectors) {
                let dim = *dimension.get_or_insert(vector.len());
                validate_vector(&provider, &vector, dim)?;
                entries.push(IndexedChunk::new(chunk.clone(), vector));
            }
            debug!(embedded = entries.len(), total = chunks.len(), "Embedded chunk batch");
        }

        info!(
            chunks = entries.len(),
            dimension = ?dimension,
            provider = %provider,
            "Index built"
        );

        Ok(Self {
            entries,
            dimension,
            similarity: options.similarity,
            embedder,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embedding dimension, unknown for an index built from zero chunks.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn similarity(&self) -> SimilarityMetric {
        self.similarity
    }

    /// Up to `k` chunks ranked by similarity to `text`, best first.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<Chunk>, RetrievalError> {
        Ok(self
            .search(text, k)
            .await?
            .into_iter()
            .map(|result| result.chunk)
            .collect())
    }

    pub async fn search(&self, text: &str, k: usize) -> Result<Vec<SearchResult>, RetrievalError> {
        if k == 0 {
            return Err(InvalidParameterError("k must be greater than zero".to_string()).into());
        }
        if self.entries.is_empty() {
            return Ok(vec![]);
        }

        let query_embedding = self.embedder.embed_query(text.to_string()).await?;
        Ok(self.search_by_vector(&query_embedding, k)?)
    }

    pub fn search_by_vector(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<SearchResult>, EmbeddingServiceError> {
        let Some(dimension) = self.dimension else {
            return Ok(vec![]);
        };
        validate_vector(self.embedder.name(), query_embedding, dimension)?;

        let mut scored: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|entry| {
                let score = similarity::score(self.similarity, &entry.embedding, query_embedding);
                SearchResult::new(entry.chunk.clone(), score)
            })
            .collect();

        // Stable sort: equal scores keep document order.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);

        debug!(
            returned = scored.len(),
            top_score = scored.first().map(|r| r.score),
            "Index search completed"
        );
        Ok(scored)
    }
}

fn validate_vector(
    provider: &str,
    vector: &[f32],
    dimension: usize,
) -> Result<(), EmbeddingServiceError> {
    if vector.is_empty() {
        return Err(EmbeddingServiceError::new(provider, "received an empty embedding"));
    }
    if vector.len() != dimension {
        return Err(EmbeddingServiceError::new(
            provider,
            format!(
                "embedding dimension mismatch: expected {}, got {}",
                dimension,
                vector.len()
            ),
        ));
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(EmbeddingServiceError::new(
            provider,
            "embedding contains non-finite values",
        ));
    }
    Ok(())
}
