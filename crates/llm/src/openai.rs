use async_trait::async_trait;
use bookdigest_common::{BookDigestError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::llm_trait::ChatClient;
use crate::types::{ChatMessage, ChatRequest};

/// OpenAI-compatible chat completions client
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: String,
    model: String,
    client: Client,
}

impl OpenAiClient {
    /// Create new client; `base_url` is the API root, e.g. `https://api.openai.com/v1`
    pub fn new(
        base_url: impl Into<String>,
        api_key: &str,
        model: impl Into<String>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| BookDigestError::config("invalid OpenAI API key"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .default_headers(headers)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!("OpenAI client initialized: {}", base_url);

        Ok(Self {
            base_url,
            model: model.into(),
            client,
        })
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn chat(&self, request: &ChatRequest) -> Result<String> {
        let body = CompletionRequest {
            model: &self.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: &request.messages,
        };

        debug!(
            "Sending chat completion - Model: {}, Messages: {}",
            self.model,
            request.messages.len()
        );

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| BookDigestError::request(format!("failed to call chat completions: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(BookDigestError::request(format!(
                "OpenAI returned {}: {}",
                status, text
            )));
        }

        let parsed: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| BookDigestError::request(format!("failed to parse OpenAI response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BookDigestError::request("OpenAI response contained no message content"))
    }

    async fn test_connection(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .send()
            .await
            .map_err(|e| BookDigestError::request(format!("Failed to connect to OpenAI: {}", e)))?;
        Ok(response.status().is_success())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
