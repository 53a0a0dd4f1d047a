use async_trait::async_trait;
use bookdigest_common::{BookDigestError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::embedder::Embedder;

/// Embeds text as presence counts over a fixed vocabulary
pub(crate) struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
    pub(crate) calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub(crate) fn new(vocabulary: &[&'static str]) -> Self {
        Self {
            vocabulary: vocabulary.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn vector(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        self.vocabulary
            .iter()
            .map(|term| words.iter().filter(|w| *w == term).count() as f32)
            .collect()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn model(&self) -> &str {
        "keyword"
    }
}

/// Always fails
pub(crate) struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(BookDigestError::request("embedding backend unavailable"))
    }

    fn model(&self) -> &str {
        "failing"
    }
}
