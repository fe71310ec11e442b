pub mod chunker;
pub mod cohere;
pub mod fallback;
pub mod huggingface;

pub use chunker::{ChunkConfig, TextChunker};
pub use cohere::{CohereClient, CohereConfig};
pub use fallback::FallbackEmbeddingProvider;
pub use huggingface::{HuggingFaceClient, HuggingFaceConfig};

use anyhow::Context;
use chat_core::config::EmbeddingConfig;
use chat_core::EmbeddingServiceError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type EmbedResult<T> = std::result::Result<T, EmbeddingServiceError>;

pub type EmbedFuture<'a> = Pin<Box<dyn Future<Output = EmbedResult<Vec<Vec<f32>>>> + Send + 'a>>;

pub type QueryEmbedFuture<'a> = Pin<Box<dyn Future<Output = EmbedResult<Vec<f32>>> + Send + 'a>>;

pub trait EmbeddingProvider: Send + Sync {
    /// Short provider name used in errors and logs.
    fn name(&self) -> &str;

    /// Embeds document texts, one vector per input, in input order.
    fn embed(&self, texts: Vec<String>) -> EmbedFuture<'_>;

    /// Embeds a search query. Providers with asymmetric models override this.
    fn embed_query(&self, text: String) -> QueryEmbedFuture<'_> {
        Box::pin(async move {
            self.embed(vec![text])
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| EmbeddingServiceError::new(self.name(), "no embedding returned"))
        })
    }

    fn dimension(&self) -> usize;
}

impl EmbeddingProvider for CohereClient {
    fn name(&self) -> &str {
        "cohere"
    }
    fn embed(&self, texts: Vec<String>) -> EmbedFuture<'_> {
        Box::pin(async move {
            self.embed(texts)
                .await
                .map_err(|e| EmbeddingServiceError::from_anyhow("cohere", e))
        })
    }
    fn embed_query(&self, text: String) -> QueryEmbedFuture<'_> {
        Box::pin(async move {
            self.embed_query(&text)
                .await
                .map_err(|e| EmbeddingServiceError::from_anyhow("cohere", e))
        })
    }
    fn dimension(&self) -> usize {
        self.embedding_dimension()
    }
}

impl EmbeddingProvider for HuggingFaceClient {
    fn name(&self) -> &str {
        "huggingface"
    }
    fn embed(&self, texts: Vec<String>) -> EmbedFuture<'_> {
        Box::pin(async move {
            self.embed(texts)
                .await
                .map_err(|e| EmbeddingServiceError::from_anyhow("huggingface", e))
        })
    }
    fn dimension(&self) -> usize {
        self.embedding_dimension()
    }
}

impl EmbeddingProvider for FallbackEmbeddingProvider {
    fn name(&self) -> &str {
        "fallback"
    }
    fn embed(&self, texts: Vec<String>) -> EmbedFuture<'_> {
        Box::pin(async move { Ok(self.embed_texts(&texts)) })
    }
    fn dimension(&self) -> usize {
        self.embedding_dimension()
    }
}

pub fn create_embedding_provider(cfg: &EmbeddingConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    match cfg.provider.as_str() {
        "cohere" => {
            let mut cohere_cfg = CohereConfig {
                api_key: std::env::var("COHERE_API_KEY").unwrap_or_default(),
                timeout_secs: cfg.timeout_secs,
                ..CohereConfig::default()
            };
            if let Some(model) = &cfg.model {
                cohere_cfg.model = model.clone();
            }
            if let Some(dim) = cfg.dimensions {
                cohere_cfg.dimensions = dim;
            }
            let client = CohereClient::new(cohere_cfg).context("Failed to create Cohere client")?;
            Ok(Arc::new(client))
        }
        "huggingface" => {
            let mut hf_cfg = HuggingFaceConfig {
                api_token: std::env::var("HF_TOKEN").unwrap_or_default(),
                timeout_secs: cfg.timeout_secs,
                ..HuggingFaceConfig::default()
            };
            if let Some(model) = &cfg.model {
                hf_cfg.model = model.clone();
            }
            if let Some(dim) = cfg.dimensions {
                hf_cfg.dimensions = dim;
            }
            let client =
                HuggingFaceClient::new(hf_cfg).context("Failed to create Hugging Face client")?;
            Ok(Arc::new(client))
        }
        "fallback" => Ok(Arc::new(FallbackEmbeddingProvider::new(
            cfg.dimensions.unwrap_or(fallback::DEFAULT_DIMENSION),
        ))),
        other => anyhow::bail!(
            "Unknown embedding provider '{}', expected 'huggingface', 'cohere' or 'fallback'",
            other
        ),
    }
}
