use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw extracted text of one uploaded source (a file, or one page of it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub source: String,
    pub page: Option<u32>,
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            page: None,
            text: text.into(),
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}

/// A contiguous span of a document's text, the unit of retrieval.
///
/// `start` and `end` are char offsets into the parent document's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub document_id: Uuid,
    pub source: String,
    pub page: Option<u32>,
    pub chunk_index: usize,
    pub start: usize,
    pub end: usize,
    pub content: String,
}

impl Chunk {
    /// Label used when the chunk is quoted back to the generation service.
    pub fn citation(&self) -> String {
        match self.page {
            Some(page) => format!("{} (page {})", self.source, page),
            None => self.source.clone(),
        }
    }

    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}
