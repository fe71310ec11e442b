use crate::errors::ApiError;
use anyhow::Context;
use chat_core::config::Config;
use chat_core::{Document, SessionStore};
use conversation::{Orchestrator, TurnOutcome};
use embeddings::{create_embedding_provider, ChunkConfig, TextChunker};
use llm::create_generation_service;
use log::info;
use retrieval::{Index, IndexBuilder, IndexOptions};
use std::sync::{Arc, PoisonError, RwLock};

/// Everything the HTTP handlers share: the session store, the current
/// index and the pipeline components built from configuration.
pub struct AppState {
    orchestrator: Orchestrator,
    index_builder: IndexBuilder,
    index: RwLock<Option<Arc<Index>>>,
    default_session_id: String,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("sessions", &self.orchestrator.sessions().len())
            .field("index", &self.current_index())
            .field("default_session_id", &self.default_session_id)
            .finish()
    }
}

impl AppState {
    /// Checks local parameters before any provider is created.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let chunker = TextChunker::new(ChunkConfig::from(&config.chunking))
            .context("Invalid chunking configuration")?;
        config
            .retrieval
            .validate()
            .context("Invalid retrieval configuration")?;

        let embedder = create_embedding_provider(&config.embedding)
            .context("Failed to create embedding provider")?;
        let llm = create_generation_service(&config.llm)
            .context("Failed to create generation service")?;
        info!(
            "Using embedding provider '{}' and generation service '{}'",
            embedder.name(),
            llm.name()
        );

        let index_builder = IndexBuilder::new(
            chunker,
            embedder,
            IndexOptions::new(&config.retrieval, config.embedding.batch_size),
        );
        let orchestrator = Orchestrator::new(
            Arc::new(SessionStore::new()),
            llm,
            &config.conversation,
            &config.retrieval,
        )
        .context("Invalid retrieval configuration")?;

        Ok(Self::new(
            orchestrator,
            index_builder,
            config.server.default_session_id.clone(),
        ))
    }

    pub fn new(
        orchestrator: Orchestrator,
        index_builder: IndexBuilder,
        default_session_id: String,
    ) -> Self {
        Self {
            orchestrator,
            index_builder,
            index: RwLock::new(None),
            default_session_id,
        }
    }

    pub fn default_session_id(&self) -> &str {
        &self.default_session_id
    }

    pub fn current_index(&self) -> Option<Arc<Index>> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Builds an index from `documents` and publishes it, replacing the
    /// previous one. A failed build leaves the previous index in place.
    pub async fn ingest(&self, documents: Vec<Document>) -> Result<Arc<Index>, ApiError> {
        if documents.is_empty() {
            return Err(ApiError::ValidationError(
                "at least one document is required".to_string(),
            ));
        }

        let index = Arc::new(
            self.index_builder
                .ingest(&documents)
                .await
                .map_err(ApiError::IngestionError)?,
        );

        *self.index.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&index));
        info!(
            "Published index with {} chunks from {} documents",
            index.len(),
            documents.len()
        );
        Ok(index)
    }

    pub async fn ask(&self, session_id: &str, question: &str) -> Result<TurnOutcome, ApiError> {
        let index = self.current_index().ok_or(ApiError::NoIndex)?;
        Ok(self
            .orchestrator
            .run_turn(session_id, question, &index)
            .await?)
    }

    pub fn history(&self, session_id: &str) -> Vec<chat_core::Turn> {
        self.orchestrator.history(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::config::{ChunkingConfig, RetrievalConfig};

    fn offline_config() -> Config {
        let mut config = Config::default();
        config.embedding.provider = "fallback".to_string();
        config
    }

    #[test]
    fn should_reject_zero_top_k_before_creating_services() {
        let config = Config {
            retrieval: RetrievalConfig {
                top_k: 0,
                ..RetrievalConfig::default()
            },
            ..offline_config()
        };

        let err = AppState::from_config(&config).unwrap_err();

        assert_eq!(err.to_string(), "Invalid retrieval configuration");
        assert!(format!("{:#}", err).contains("top_k must be greater than zero"));
    }

    #[test]
    fn should_reject_overlap_not_smaller_than_chunk_size() {
        let config = Config {
            chunking: ChunkingConfig {
                chunk_size: 100,
                overlap: 100,
            },
            ..offline_config()
        };

        let err = AppState::from_config(&config).unwrap_err();

        assert_eq!(err.to_string(), "Invalid chunking configuration");
    }
}
