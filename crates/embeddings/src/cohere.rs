use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct CohereConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub dimensions: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for CohereConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "embed-english-v3.0".to_string(),
            base_url: "https://api.cohere.ai".to_string(),
            dimensions: 1024,
            timeout_secs: 30,
            max_retries: 1,
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    model: &'a str,
    input_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Cohere's v3 models embed documents and queries asymmetrically.
const INPUT_TYPE_DOCUMENT: &str = "search_document";
const INPUT_TYPE_QUERY: &str = "search_query";

pub struct CohereClient {
    config: CohereConfig,
    client: Client,
}

impl CohereClient {
    pub fn new(config: CohereConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    pub fn embedding_dimension(&self) -> usize {
        self.config.dimensions
    }

    pub async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.embed_with_retries(&texts, INPUT_TYPE_DOCUMENT).await
    }

    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        self.embed_with_retries(&texts, INPUT_TYPE_QUERY)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Cohere API returned no embedding for the query"))
    }

    async fn embed_with_retries(&self, texts: &[String], input_type: &str) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 0;

        loop {
            match self.try_embed(texts, input_type).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) if attempt < self.config.max_retries => {
                    warn!(attempt, error = %e, "Cohere embed request failed, retrying");
                    let delay = Duration::from_millis(1000 * (2_u64.pow(attempt)));
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_embed(&self, texts: &[String], input_type: &str) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            texts,
            model: &self.config.model,
            input_type,
        };

        debug!(count = texts.len(), input_type, "Sending embed request to Cohere");
        let response = self
            .client
            .post(format!("{}/v1/embed", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Cohere API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Cohere API returned error {}: {}",
                status,
                error_text
            ));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .context("Failed to parse Cohere API response")?;

        Ok(embed_response.embeddings)
    }
}
