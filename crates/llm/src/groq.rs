use crate::models::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ModelConfig};
use anyhow::{Context, Result};
use chat_core::Message;
use log::{debug, info, warn};
use reqwest::Client;
use std::time::Duration;

/// Client for Groq's OpenAI-compatible chat completions endpoint.
pub struct GroqClient {
    client: Client,
    config: ModelConfig,
}

impl GroqClient {
    pub fn new(config: ModelConfig) -> Result<Self> {
        info!("Initializing GroqClient for model {}", config.model);
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub async fn chat(&self, messages: &[Message]) -> Result<String> {
        let wire_messages: Vec<ChatMessage> = messages.iter().map(ChatMessage::from).collect();
        let mut attempt = 0;

        loop {
            match self.try_chat(wire_messages.clone()).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.config.max_retries => {
                    warn!("Groq request failed (attempt {}): {:#}", attempt + 1, e);
                    let delay = Duration::from_millis(1000 * (2_u64.pow(attempt)));
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatCompletionRequest::new(messages, &self.config);

        debug!(
            "Sending {} messages to Groq model {}",
            request.messages.len(),
            self.config.model
        );
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Groq API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Groq API returned error {}: {}", status, error_text);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse Groq API response")?;

        if let Some(usage) = &completion.usage {
            debug!(
                "Groq usage: {} prompt tokens, {} completion tokens",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("Groq API response contained no message content"))
    }
}
