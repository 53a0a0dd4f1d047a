use crate::types::ChatRequest;
use async_trait::async_trait;
use bookdigest_common::Result;

/// Common trait for hosted chat-completion clients
///
/// Implementations make exactly one attempt per call; retry policy belongs to
/// the caller.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a chat request and return the assistant's reply text
    async fn chat(&self, request: &ChatRequest) -> Result<String>;

    /// Test connection/availability
    async fn test_connection(&self) -> Result<bool>;

    /// Model name used for requests
    fn model(&self) -> &str;
}
