//! Summarization strategies behind one interface

use async_trait::async_trait;
use bookdigest_common::{BookDigestError, Result, SummaryConfig};
use bookdigest_llm::{ConstrainedGenerator, PromptSummarizer, Seq2SeqModel};
use bookdigest_vector::{Embedder, KeyphraseExtractor, SentenceRelevanceFilter};
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns one admitted document into summary text
///
/// Implementations may return the failure sentinel instead of an error; the
/// orchestrator treats both as a failed row.
#[async_trait]
pub trait Summarize: Send + Sync {
    async fn summarize(&self, text: &str, config: &SummaryConfig) -> Result<String>;

    /// Short strategy name for logging
    fn name(&self) -> &'static str;
}

/// Run the generator off the async runtime
async fn generate_blocking<M>(
    generator: &ConstrainedGenerator<M>,
    text: String,
    config: &SummaryConfig,
) -> Result<String>
where
    M: Seq2SeqModel + 'static,
{
    let generator = generator.clone();
    let (max_len, min_len) = (config.max_length, config.min_length);

    tokio::task::spawn_blocking(move || generator.generate(&text, max_len, min_len))
        .await
        .map_err(|e| BookDigestError::generation(format!("generation task failed: {}", e)))
}

/// Abstractive generation over the full document
pub struct DirectSummarizer<M: Seq2SeqModel> {
    generator: ConstrainedGenerator<M>,
}

impl<M: Seq2SeqModel> DirectSummarizer<M> {
    pub fn new(generator: ConstrainedGenerator<M>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl<M: Seq2SeqModel + 'static> Summarize for DirectSummarizer<M> {
    async fn summarize(&self, text: &str, config: &SummaryConfig) -> Result<String> {
        generate_blocking(&self.generator, text.to_string(), config).await
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}

/// Keyphrase-guided sentence selection followed by abstractive generation
pub struct HybridSummarizer<M: Seq2SeqModel> {
    extractor: KeyphraseExtractor,
    filter: SentenceRelevanceFilter,
    generator: ConstrainedGenerator<M>,
}

impl<M: Seq2SeqModel> HybridSummarizer<M> {
    pub fn new(embedder: Arc<dyn Embedder>, generator: ConstrainedGenerator<M>) -> Self {
        Self {
            extractor: KeyphraseExtractor::new(embedder.clone()),
            filter: SentenceRelevanceFilter::new(embedder),
            generator,
        }
    }

    /// Text handed to the generator: selected sentences or the full document
    pub async fn focus(&self, text: &str, config: &SummaryConfig) -> String {
        let keyphrases = match self.extractor.extract(text, config.keyphrase_count).await {
            Ok(keyphrases) => keyphrases,
            Err(e) => {
                warn!("Keyphrase extraction failed, using full text: {}", e);
                return text.to_string();
            }
        };

        let outcome = self
            .filter
            .clone()
            .with_threshold(config.relevance_threshold)
            .select(text, &keyphrases)
            .await;

        debug!("Relevance filter applied: {}", outcome.is_filtered());
        outcome.into_text(text)
    }
}

#[async_trait]
impl<M: Seq2SeqModel + 'static> Summarize for HybridSummarizer<M> {
    async fn summarize(&self, text: &str, config: &SummaryConfig) -> Result<String> {
        let focused = self.focus(text, config).await;
        generate_blocking(&self.generator, focused, config).await
    }

    fn name(&self) -> &'static str {
        "hybrid"
    }
}

/// Hosted chat model instructed to respect the word bounds
pub struct PromptStrategy {
    summarizer: PromptSummarizer,
}

impl PromptStrategy {
    pub fn new(summarizer: PromptSummarizer) -> Self {
        Self { summarizer }
    }
}

#[async_trait]
impl Summarize for PromptStrategy {
    async fn summarize(&self, text: &str, config: &SummaryConfig) -> Result<String> {
        Ok(self
            .summarizer
            .summarize(text, config.min_length, config.max_length, config.max_retries)
            .await)
    }

    fn name(&self) -> &'static str {
        "prompt"
    }
}
