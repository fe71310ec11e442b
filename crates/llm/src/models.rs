use chat_core::{Message, Role};
use serde::{Deserialize, Serialize};

/// Message in the OpenAI-compatible wire format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: String) -> Self {
        Self {
            role: "system".to_string(),
            content,
        }
    }

    pub fn user(content: String) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }

    pub fn assistant(content: String) -> Self {
        Self {
            role: "assistant".to_string(),
            content,
        }
    }
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        match message.role {
            Role::System => Self::system(message.content.clone()),
            Role::User => Self::user(message.content.clone()),
            Role::Assistant => Self::assistant(message.content.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "Gemma2-9b-It".to_string(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key: String::new(),
            max_tokens: 1024,
            temperature: 0.0,
            timeout_secs: 60,
            max_retries: 0,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
}

impl ChatCompletionRequest {
    pub fn new(messages: Vec<ChatMessage>, config: &ModelConfig) -> Self {
        Self {
            model: config.model.clone(),
            messages,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            stream: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}
