pub mod groq;
pub mod models;

pub use groq::GroqClient;
pub use models::{ChatMessage, ModelConfig};

use anyhow::Context;
use async_trait::async_trait;
use chat_core::config::LlmConfig;
use chat_core::{GenerationServiceError, Message};
use std::sync::Arc;

/// Opaque text-completion service: a prompt goes in, one completion comes out.
#[async_trait]
pub trait GenerationService: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, messages: &[Message]) -> Result<String, GenerationServiceError>;
}

#[async_trait]
impl GenerationService for GroqClient {
    fn name(&self) -> &str {
        "groq"
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, GenerationServiceError> {
        self.chat(messages)
            .await
            .map_err(|e| GenerationServiceError::from_anyhow("groq", e))
    }
}

pub fn create_generation_service(cfg: &LlmConfig) -> anyhow::Result<Arc<dyn GenerationService>> {
    match cfg.provider.as_str() {
        "groq" => {
            let api_key = std::env::var("GROQ_API_KEY").context("GROQ_API_KEY is not set")?;
            let mut model_cfg = ModelConfig {
                model: cfg.model.clone(),
                api_key,
                max_tokens: cfg.max_tokens,
                temperature: cfg.temperature,
                timeout_secs: cfg.timeout_secs,
                ..ModelConfig::default()
            };
            if let Some(base_url) = &cfg.base_url {
                model_cfg.base_url = base_url.clone();
            }
            Ok(Arc::new(GroqClient::new(model_cfg)?))
        }
        other => anyhow::bail!("Unknown LLM provider '{}', expected 'groq'", other),
    }
}
