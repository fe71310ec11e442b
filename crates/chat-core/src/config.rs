use crate::InvalidParameterError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `huggingface`, `cohere` or `fallback`.
    pub provider: String,
    pub model: Option<String>,
    pub dimensions: Option<usize>,
    pub batch_size: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "huggingface".to_string(),
            model: None,
            dimensions: None,
            batch_size: 32,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    pub fn with_env_overrides(&self) -> Self {
        let provider = env::var("EMBEDDING_PROVIDER").unwrap_or_else(|_| self.provider.clone());
        Self {
            provider,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            model: "Gemma2-9b-It".to_string(),
            base_url: None,
            temperature: 0.0,
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    pub fn with_env_overrides(&self) -> Self {
        let model = env::var("LLM_MODEL").unwrap_or_else(|_| self.model.clone());
        Self {
            model,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks; must be below `chunk_size`.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 5000,
            overlap: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    DotProduct,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub similarity: SimilarityMetric,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            similarity: SimilarityMetric::Cosine,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), InvalidParameterError> {
        if self.top_k == 0 {
            return Err(InvalidParameterError(
                "top_k must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// What a turn does when the standalone-question rewrite fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextualizeFailurePolicy {
    #[default]
    HardFail,
    RawUtterance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    pub on_contextualize_failure: ContextualizeFailurePolicy,
    /// Trailing turns included in prompts. `None` sends the whole history.
    pub max_history_turns: Option<usize>,
    /// Deadline applied to every embedding or generation call made by a turn.
    pub service_timeout_secs: u64,
    pub contextualize_prompt: Option<String>,
    pub answer_prompt: Option<String>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            on_contextualize_failure: ContextualizeFailurePolicy::HardFail,
            max_history_turns: None,
            service_timeout_secs: 90,
            contextualize_prompt: None,
            answer_prompt: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub default_session_id: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            default_session_id: "default_session".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn with_env_overrides(&self) -> Self {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| self.bind_addr.clone());
        Self {
            bind_addr,
            ..self.clone()
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn load_from_env() -> anyhow::Result<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| Self::default_config_path());
        Self::load(Path::new(&config_path))
    }

    pub fn default_config_path() -> String {
        "./config.toml".to_string()
    }

    pub fn with_env_overrides(&self) -> Self {
        Self {
            embedding: self.embedding.with_env_overrides(),
            llm: self.llm.with_env_overrides(),
            server: self.server.with_env_overrides(),
            ..self.clone()
        }
    }
}
