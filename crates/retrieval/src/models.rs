use chat_core::Chunk;

/// A chunk together with the embedding it was indexed under.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

impl IndexedChunk {
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self { chunk, embedding }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub score: f32,
}

impl SearchResult {
    pub fn new(chunk: Chunk, score: f32) -> Self {
        Self { chunk, score }
    }
}
