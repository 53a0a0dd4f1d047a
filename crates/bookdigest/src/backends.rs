//! Build the configured summarization strategy and its model handles

use anyhow::{anyhow, Result};
use bookdigest_batch::{PromptStrategy, Summarize};
use bookdigest_common::{AppConfig, ChatBackend, Strategy};
use bookdigest_llm::{ChatClient, OllamaClient, OpenAiClient, PromptSummarizer};
use bookdigest_vector::{Embedder, OllamaEmbedder};
use std::sync::Arc;
use tracing::info;

/// Chat client for the prompt strategy
pub fn chat_client(config: &AppConfig) -> Result<Arc<dyn ChatClient>> {
    let client: Arc<dyn ChatClient> = match config.chat_backend {
        ChatBackend::OpenAi => {
            let key = config
                .openai_api_key
                .as_deref()
                .ok_or_else(|| anyhow!("OpenAI API key is not set (OPENAI_API_KEY)"))?;
            Arc::new(OpenAiClient::new(
                config.openai_base_url.clone(),
                key,
                config.openai_model.clone(),
            )?)
        }
        ChatBackend::Ollama => Arc::new(OllamaClient::new(
            config.ollama_base_url.clone(),
            config.ollama_chat_model.clone(),
        )?),
    };
    Ok(client)
}

/// Sentence embedder for the hybrid strategy
pub fn embedder(config: &AppConfig) -> Result<Arc<dyn Embedder>> {
    let client = OllamaClient::new(config.ollama_base_url.clone(), config.ollama_chat_model.clone())?;
    Ok(Arc::new(OllamaEmbedder::new(client, config.embedding_model.clone())))
}

/// Strategy selected by `config.summary.strategy`
pub fn build_summarizer(config: &AppConfig) -> Result<Arc<dyn Summarize>> {
    info!("Building {} summarizer", config.summary.strategy);

    match config.summary.strategy {
        Strategy::Prompt => {
            let summarizer = PromptSummarizer::new(chat_client(config)?);
            Ok(Arc::new(PromptStrategy::new(summarizer)))
        }
        Strategy::Direct | Strategy::Hybrid => local_summarizer(config),
    }
}

#[cfg(feature = "candle")]
fn local_summarizer(config: &AppConfig) -> Result<Arc<dyn Summarize>> {
    use bookdigest_batch::{DirectSummarizer, HybridSummarizer};
    use bookdigest_llm::{ConstrainedGenerator, T5Generator};

    let model_dir = config
        .generator_model_dir
        .as_deref()
        .ok_or_else(|| anyhow!("generator_model_dir must be set for the {} strategy", config.summary.strategy))?;

    let (model, tokenizer) = T5Generator::load_with_tokenizer(model_dir)?;
    let generator = ConstrainedGenerator::new(Arc::new(model), Arc::new(tokenizer));

    let summarizer: Arc<dyn Summarize> = match config.summary.strategy {
        Strategy::Direct => Arc::new(DirectSummarizer::new(generator)),
        _ => Arc::new(HybridSummarizer::new(embedder(config)?, generator)),
    };
    Ok(summarizer)
}

#[cfg(not(feature = "candle"))]
fn local_summarizer(config: &AppConfig) -> Result<Arc<dyn Summarize>> {
    Err(anyhow!(
        "the {} strategy needs the local generator; rebuild with `--features candle`",
        config.summary.strategy
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_strategy_with_ollama_needs_no_key() {
        let mut config = AppConfig::default();
        config.summary.strategy = Strategy::Prompt;
        config.chat_backend = ChatBackend::Ollama;

        let summarizer = build_summarizer(&config).unwrap();
        assert_eq!(summarizer.name(), "prompt");
    }

    #[test]
    fn test_openai_backend_requires_key() {
        let mut config = AppConfig::default();
        config.summary.strategy = Strategy::Prompt;
        config.chat_backend = ChatBackend::OpenAi;
        config.openai_api_key = None;

        assert!(chat_client(&config).is_err());

        config.openai_api_key = Some("sk-test".to_string());
        assert_eq!(chat_client(&config).unwrap().model(), config.openai_model);
    }

    #[cfg(not(feature = "candle"))]
    #[test]
    fn test_local_strategies_need_candle_feature() {
        let mut config = AppConfig::default();
        config.summary.strategy = Strategy::Hybrid;

        let err = build_summarizer(&config).err().unwrap();
        assert!(err.to_string().contains("--features candle"));
    }
}
