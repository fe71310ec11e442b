use crate::errors::ApiError;
use crate::models::{
    AskRequest, AskResponse, HistoryResponse, IngestRequest, IngestResponse, SourceRef, TurnView,
};
use crate::state::AppState;
use axum::{
    extract::{Json as ExtractJson, Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chat_core::Document;
use log::{info, warn};
use serde_json::{json, Value};
use std::sync::Arc;

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "index_ready": state.current_index().is_some(),
    }))
}

async fn ingest_documents(
    State(state): State<Arc<AppState>>,
    ExtractJson(request): ExtractJson<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    let documents: Vec<Document> = request.documents.into_iter().map(Document::from).collect();
    let count = documents.len();

    let index = state.ingest(documents).await.inspect_err(|e| {
        warn!("Document ingestion failed: {}", e);
    })?;

    Ok(Json(IngestResponse {
        documents: count,
        chunks: index.len(),
    }))
}

async fn ask_in_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    ExtractJson(request): ExtractJson<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    answer(&state, session_id, &request.question).await
}

async fn ask_default(
    State(state): State<Arc<AppState>>,
    ExtractJson(request): ExtractJson<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let session_id = request
        .session_id
        .unwrap_or_else(|| state.default_session_id().to_string());
    answer(&state, session_id, &request.question).await
}

async fn answer(
    state: &AppState,
    session_id: String,
    question: &str,
) -> Result<Json<AskResponse>, ApiError> {
    info!("Question received for session {}", session_id);

    let outcome = state.ask(&session_id, question).await.inspect_err(|e| {
        warn!("Turn failed for session {}: {}", session_id, e);
    })?;

    Ok(Json(AskResponse {
        session_id,
        answer: outcome.answer,
        standalone_question: outcome.standalone_question,
        sources: outcome.sources.iter().map(SourceRef::from).collect(),
        history_len: outcome.history_len,
    }))
}

async fn session_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<HistoryResponse> {
    let turns = state
        .history(&session_id)
        .into_iter()
        .map(TurnView::from)
        .collect();
    Json(HistoryResponse { session_id, turns })
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/documents", post(ingest_documents))
        .route("/ask", post(ask_default))
        .route("/sessions/:session_id/ask", post(ask_in_session))
        .route("/sessions/:session_id/history", get(session_history))
        .with_state(state)
}
