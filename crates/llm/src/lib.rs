//! BookDigest LLM Integration
//!
//! Hosted chat clients, prompt-based summarization and the local
//! beam-search generator

#[cfg(feature = "candle")]
mod candle_t5;
mod client;
mod generator;
mod llm_trait;
mod openai;
mod prompt_summarizer;
mod prompts;
mod seq2seq;
mod types;

#[cfg(feature = "candle")]
pub use candle_t5::{HfTokenizer, T5Generator, T5_SUMMARIZE_PREFIX};
pub use client::OllamaClient;
pub use generator::{BeamSearchConfig, ConstrainedGenerator};
pub use llm_trait::ChatClient;
pub use openai::OpenAiClient;
pub use prompt_summarizer::{
    PromptSummarizer, DEFAULT_RETRY_DELAY, PROMPT_MAX_TOKENS, PROMPT_TEMPERATURE,
};
pub use prompts::{word_limited_prompt, SYSTEM_PROMPT};
pub use seq2seq::{Seq2SeqModel, TextTokenizer};
pub use types::{ChatMessage, ChatRequest, ChatRole};
