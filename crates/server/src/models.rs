use chat_core::{Chunk, Document, Turn};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInput {
    pub source: String,
    #[serde(default)]
    pub page: Option<u32>,
    pub text: String,
}

impl From<DocumentInput> for Document {
    fn from(input: DocumentInput) -> Self {
        let document = Document::new(input.source, input.text);
        match input.page {
            Some(page) => document.with_page(page),
            None => document,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    pub documents: Vec<DocumentInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub documents: usize,
    pub chunks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    /// Only read by `/ask`; falls back to the configured default session.
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub source: String,
    pub page: Option<u32>,
    pub chunk_index: usize,
    pub citation: String,
}

impl From<&Chunk> for SourceRef {
    fn from(chunk: &Chunk) -> Self {
        Self {
            source: chunk.source.clone(),
            page: chunk.page,
            chunk_index: chunk.chunk_index,
            citation: chunk.citation(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub session_id: String,
    pub answer: String,
    pub standalone_question: String,
    pub sources: Vec<SourceRef>,
    pub history_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnView {
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

impl From<Turn> for TurnView {
    fn from(turn: Turn) -> Self {
        Self {
            question: turn.utterance,
            answer: turn.answer,
            created_at: turn.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub turns: Vec<TurnView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_deserialize_ingest_request_with_optional_page() {
        let json = r#"{
            "documents": [
                {"source": "report.pdf", "page": 3, "text": "The sky is blue."},
                {"source": "notes.txt", "text": "Grass is green."}
            ]
        }"#;

        let request: IngestRequest = serde_json::from_str(json).unwrap();
        let documents: Vec<Document> = request.documents.into_iter().map(Document::from).collect();

        assert_eq!(documents[0].page, Some(3));
        assert_eq!(documents[0].source, "report.pdf");
        assert_eq!(documents[1].page, None);
        assert_eq!(documents[1].text, "Grass is green.");
    }

    #[test]
    fn should_deserialize_ask_request_without_session() {
        let request: AskRequest =
            serde_json::from_str(r#"{"question": "What color is the sky?"}"#).unwrap();

        assert_eq!(request.question, "What color is the sky?");
        assert_eq!(request.session_id, None);
    }

    #[test]
    fn should_serialize_turn_view() {
        let view = TurnView::from(Turn::new("What color is the sky?", "Blue."));
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["question"], "What color is the sky?");
        assert_eq!(json["answer"], "Blue.");
        assert!(json["created_at"].is_string());
    }
}
