use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chat_core::EmbeddingServiceError;
use conversation::TurnError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No documents have been ingested yet")]
    NoIndex,

    #[error("Invalid request: {0}")]
    ValidationError(String),

    #[error("Ingestion failed: {0}")]
    IngestionError(EmbeddingServiceError),

    #[error(transparent)]
    Turn(#[from] TurnError),
}

impl ApiError {
    /// Returns the appropriate HTTP status code for this error
    pub fn http_status_code(&self) -> u16 {
        match self {
            ApiError::NoIndex => 409,         // Conflict: ingest before asking
            ApiError::ValidationError(_) => 400,
            ApiError::IngestionError(_) => 502, // Embedding provider failed
            ApiError::Turn(err) => err.http_status_code(),
        }
    }

    /// Returns true if the error is potentially recoverable with a retry
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::NoIndex => false,
            ApiError::ValidationError(_) => false,
            ApiError::IngestionError(_) => true,
            ApiError::Turn(err) => err.is_retryable(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let stage = match self {
            ApiError::Turn(err) => err.stage().map(|stage| stage.to_string()),
            _ => None,
        };
        json!({
            "error": self.to_string(),
            "stage": stage,
            "retryable": self.is_retryable(),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::GenerationServiceError;

    #[test]
    fn should_return_correct_http_status_codes() {
        assert_eq!(ApiError::NoIndex.http_status_code(), 409);
        assert_eq!(
            ApiError::ValidationError("test".to_string()).http_status_code(),
            400
        );
        assert_eq!(
            ApiError::IngestionError(EmbeddingServiceError::new("cohere", "down")).http_status_code(),
            502
        );
        assert_eq!(
            ApiError::Turn(TurnError::Generate(GenerationServiceError::new("groq", "busy")))
                .http_status_code(),
            503
        );
    }

    #[test]
    fn should_return_correct_retryable_flags() {
        assert!(!ApiError::NoIndex.is_retryable());
        assert!(!ApiError::ValidationError("test".to_string()).is_retryable());
        assert!(ApiError::IngestionError(EmbeddingServiceError::new("cohere", "down")).is_retryable());
        assert!(
            ApiError::Turn(TurnError::Contextualize(GenerationServiceError::new("groq", "busy")))
                .is_retryable()
        );
    }

    #[test]
    fn should_format_error_body_with_stage() {
        let error = ApiError::Turn(TurnError::Generate(GenerationServiceError::new(
            "groq",
            "503 Service Unavailable",
        )));
        let body = error.to_json();

        assert_eq!(body["stage"], "generate");
        assert_eq!(body["retryable"], true);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("Generation service error (groq): 503 Service Unavailable"));

        let body = ApiError::NoIndex.to_json();
        assert!(body["stage"].is_null());
        assert_eq!(body["retryable"], false);
    }
}
