use async_trait::async_trait;
use bookdigest_common::{BookDigestError, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::llm_trait::ChatClient;
use crate::types::{
    ChatRequest, EmbedRequest, EmbedResponse, OllamaChatRequest, OllamaChatResponse,
    OllamaOptions,
};

/// Ollama API client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    chat_model: String,
    client: Client,
    embed_retries: u32,
}

impl OllamaClient {
    /// Create new Ollama client
    pub fn new(base_url: impl Into<String>, chat_model: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(300)) // 5 minutes for LLM calls
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        info!("Ollama client initialized: {}", base_url);
        Ok(Self {
            base_url,
            chat_model: chat_model.into(),
            client,
            embed_retries: 3,
        })
    }

    /// Override the embedding retry budget
    pub fn with_embed_retries(mut self, embed_retries: u32) -> Self {
        self.embed_retries = embed_retries.max(1);
        self
    }

    /// Embed a batch of texts (with retry logic)
    ///
    /// Returns one vector per input, in input order.
    pub async fn embed_batch(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.base_url);
        let request = EmbedRequest { model, input: texts };

        debug!("Generating embeddings - Model: {}, Inputs: {}", model, texts.len());

        let mut last_error = None;

        for attempt in 1..=self.embed_retries {
            match self.try_embed(&url, &request).await {
                Ok(embeddings) => {
                    debug!(
                        "Received embeddings - Count: {}, Dimension: {}",
                        embeddings.len(),
                        embeddings.first().map(Vec::len).unwrap_or(0)
                    );
                    return Ok(embeddings);
                }
                Err(e) => {
                    if attempt < self.embed_retries {
                        let delay = Duration::from_secs(2u64.pow(attempt - 1));
                        warn!(
                            "Embedding request failed (attempt {}/{}): {}. Retrying in {:?}...",
                            attempt, self.embed_retries, e, delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(BookDigestError::RetryExhausted {
            attempts: self.embed_retries,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt made".to_string()),
        })
    }

    /// Single attempt to embed a batch
    async fn try_embed(&self, url: &str, request: &EmbedRequest<'_>) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| BookDigestError::request(format!("Failed to send embedding request: {}", e)))?
            .error_for_status()
            .map_err(|e| BookDigestError::request(format!("Ollama embedding API error: {}", e)))?;

        let result: EmbedResponse = response.json().await.map_err(|e| {
            BookDigestError::request(format!("Failed to parse embedding response: {}", e))
        })?;

        if result.embeddings.len() != request.input.len() {
            return Err(BookDigestError::request(format!(
                "Expected {} embeddings from Ollama, got {}",
                request.input.len(),
                result.embeddings.len()
            )));
        }

        if result.embeddings.iter().any(Vec::is_empty) {
            return Err(BookDigestError::request("Empty embedding from Ollama"));
        }

        Ok(result.embeddings)
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn chat(&self, request: &ChatRequest) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let body = OllamaChatRequest {
            model: &self.chat_model,
            messages: &request.messages,
            stream: false,
            options: OllamaOptions {
                temperature: Some(request.temperature),
                num_predict: Some(request.max_tokens as i32),
            },
        };

        debug!(
            "Sending chat request to Ollama - Model: {}, Messages: {}",
            self.chat_model,
            request.messages.len()
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BookDigestError::request(format!("Failed to send request: {}", e)))?
            .error_for_status()
            .map_err(|e| BookDigestError::request(format!("Ollama API error: {}", e)))?;

        let result: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| BookDigestError::request(format!("Failed to parse response: {}", e)))?;

        if result.message.content.trim().is_empty() {
            return Err(BookDigestError::request("Empty response from Ollama"));
        }

        Ok(result.message.content)
    }

    async fn test_connection(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BookDigestError::request(format!("Failed to connect to Ollama: {}", e)))?;
        Ok(response.status().is_success())
    }

    fn model(&self) -> &str {
        &self.chat_model
    }
}
