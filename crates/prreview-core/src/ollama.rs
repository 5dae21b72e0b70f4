//! Ollama text generation client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ReviewError, Result};

/// Something that turns a prompt into model output.
#[async_trait]
pub trait ReviewModel: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logs.
    fn name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// Client for `POST /api/generate` on an Ollama server.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(http: reqwest::Client, base_url: &str, model: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl ReviewModel for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .http
            .post(self.generate_url())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReviewError::Api {
                service: "Ollama",
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateResponse = response.json().await?;
        let text = body.response.ok_or_else(|| {
            ReviewError::UnexpectedResponse("Ollama reply has no `response` field".to_string())
        })?;
        debug!(model = %self.model, bytes = text.len(), "Model reply received");
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
