//! Hugging Face inference API client for sentence-transformers models.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub api_token: String,
    pub model: String,
    pub base_url: String,
    pub dimensions: usize,
    pub timeout_secs: u64,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            base_url: "https://router.huggingface.co/hf-inference".to_string(),
            dimensions: 384,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [String],
    options: RequestOptions,
}

#[derive(Debug, Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureExtractionResponse {
    Embeddings(Vec<Vec<f32>>),
    Error { error: String },
}

pub struct HuggingFaceClient {
    config: HuggingFaceConfig,
    client: Client,
}

impl HuggingFaceClient {
    pub fn new(config: HuggingFaceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    pub fn embedding_dimension(&self) -> usize {
        self.config.dimensions
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}/pipeline/feature-extraction",
            self.config.base_url, self.config.model
        )
    }

    pub async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let request = FeatureExtractionRequest {
            inputs: &texts,
            options: RequestOptions {
                wait_for_model: true,
            },
        };

        debug!(count = texts.len(), model = %self.config.model, "Sending feature-extraction request");
        let mut builder = self.client.post(self.endpoint()).json(&request);
        if !self.config.api_token.is_empty() {
            builder = builder.bearer_auth(&self.config.api_token);
        }
        let response = builder
            .send()
            .await
            .context("Failed to send request to Hugging Face inference API")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read Hugging Face response body")?;

        if !status.is_success() {
            anyhow::bail!("Hugging Face API returned error {}: {}", status, body);
        }

        match serde_json::from_str(&body).context("Failed to parse Hugging Face response")? {
            FeatureExtractionResponse::Embeddings(embeddings) => Ok(embeddings),
            FeatureExtractionResponse::Error { error } => {
                anyhow::bail!("Hugging Face API reported an error: {}", error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn spawn_mock(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: String) -> HuggingFaceClient {
        HuggingFaceClient::new(HuggingFaceConfig {
            api_token: "hf_test".to_string(), // pragma: allowlist secret
            model: "test/mini".to_string(),
            base_url,
            ..HuggingFaceConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn should_default_to_minilm() {
        let client = HuggingFaceClient::new(HuggingFaceConfig::default()).unwrap();
        assert_eq!(client.embedding_dimension(), 384);
        assert!(client
            .endpoint()
            .ends_with("/models/sentence-transformers/all-MiniLM-L6-v2/pipeline/feature-extraction"));
    }

    #[tokio::test]
    async fn should_embed_texts_with_bearer_token() {
        let router = Router::new().route(
            "/models/:org/:name/pipeline/feature-extraction",
            post(
                |Path((org, name)): Path<(String, String)>,
                 headers: HeaderMap,
                 Json(body): Json<Value>| async move {
                    assert_eq!(format!("{org}/{name}"), "test/mini");
                    assert_eq!(headers["authorization"], "Bearer hf_test");
                    assert_eq!(body["options"]["wait_for_model"], true);
                    let count = body["inputs"].as_array().unwrap().len();
                    Json(json!(vec![vec![0.25_f32; 3]; count]))
                },
            ),
        );
        let client = client_for(spawn_mock(router).await);

        let result = client
            .embed(vec!["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        assert_eq!(result, vec![vec![0.25; 3], vec![0.25; 3]]);
    }

    #[tokio::test]
    async fn should_report_model_error_payload() {
        let router = Router::new().route(
            "/models/:org/:name/pipeline/feature-extraction",
            post(|| async { Json(json!({ "error": "Model test/mini is currently loading" })) }),
        );
        let client = client_for(spawn_mock(router).await);

        let err = client.embed(vec!["a".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("currently loading"));
    }

    #[tokio::test]
    async fn should_report_http_error_status() {
        let router = Router::new().route(
            "/models/:org/:name/pipeline/feature-extraction",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "rate limit reached") }),
        );
        let client = client_for(spawn_mock(router).await);

        let err = client.embed(vec!["a".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn should_skip_request_for_empty_input() {
        let client = client_for("http://127.0.0.1:9".to_string());
        assert!(client.embed(vec![]).await.unwrap().is_empty());
    }
}
