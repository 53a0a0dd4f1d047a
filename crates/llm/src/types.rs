use serde::{Deserialize, Serialize};

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// Single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Backend-neutral chat completion request
///
/// Each client maps this onto its own wire format and fills in the model name.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Conversation, oldest first
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens in the response
    pub max_tokens: u32,
}

/// Ollama chat request
#[derive(Debug, Clone, Serialize)]
pub struct OllamaChatRequest<'a> {
    /// Model name (e.g., "llama3.2", "gemma2")
    pub model: &'a str,

    /// Conversation
    pub messages: &'a [ChatMessage],

    /// Disable streaming
    pub stream: bool,

    /// Generation options
    pub options: OllamaOptions,
}

/// Ollama generation options
#[derive(Debug, Clone, Serialize, Default)]
pub struct OllamaOptions {
    /// Temperature (0.0 - 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
}

/// Ollama chat response
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaChatResponse {
    /// Assistant reply
    pub message: ChatMessage,

    /// Whether generation is complete
    #[serde(default)]
    pub done: bool,
}

/// Ollama batch embedding request (`/api/embed`)
#[derive(Debug, Clone, Serialize)]
pub struct EmbedRequest<'a> {
    /// Embedding model name
    pub model: &'a str,

    /// Texts to embed
    pub input: &'a [String],
}

/// Ollama batch embedding response
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedResponse {
    /// One vector per input, in input order
    pub embeddings: Vec<Vec<f32>>,
}
