use async_trait::async_trait;
use bookdigest_common::Result;
use bookdigest_llm::OllamaClient;
use tracing::debug;

/// Sentence embedding backend
///
/// Every call must place its vectors in the same space so keyphrases,
/// sentences and whole documents can be compared directly.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `texts`, returning one vector per input in input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Model identifier for logging
    fn model(&self) -> &str;
}

/// Embedder backed by Ollama `/api/embed`
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!("Embedding {} text(s) with {}", texts.len(), self.model);
        self.client.embed_batch(&self.model, texts).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}
