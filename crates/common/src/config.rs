use crate::error::BookDigestError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Summarization strategy applied to every admitted row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Abstractive generation over the raw document
    Direct,
    /// Keyphrase extraction and relevance filtering before generation
    Hybrid,
    /// Instruction prompt sent to a hosted chat model
    Prompt,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Direct => "direct",
            Self::Hybrid => "hybrid",
            Self::Prompt => "prompt",
        };
        f.write_str(name)
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "hybrid" => Ok(Self::Hybrid),
            "prompt" => Ok(Self::Prompt),
            other => Err(format!(
                "unknown strategy '{}', expected one of: direct, hybrid, prompt",
                other
            )),
        }
    }
}

/// Hosted chat backend used by the prompt strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatBackend {
    OpenAi,
    Ollama,
}

/// Per-batch summarization options
///
/// `min_length`/`max_length` are model tokens for the generator strategies and
/// words (as an instruction only) for the prompt strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Lower bound on summary length
    pub min_length: usize,

    /// Upper bound on summary length
    pub max_length: usize,

    /// Total attempts for a hosted LLM request
    pub max_retries: u32,

    /// Minimum whitespace-token count for a document to be summarized
    pub admission_threshold: usize,

    /// Minimum similarity for a sentence to survive relevance filtering
    pub relevance_threshold: f32,

    /// Key phrases extracted per document
    pub keyphrase_count: usize,

    /// Strategy applied to admitted rows
    pub strategy: Strategy,

    /// Rows processed concurrently (1 = strictly sequential)
    pub concurrency: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            min_length: 100,
            max_length: 200,
            max_retries: 3,
            admission_threshold: 10,
            relevance_threshold: 0.3,
            keyphrase_count: 5,
            strategy: Strategy::Hybrid,
            concurrency: 1,
        }
    }
}

impl SummaryConfig {
    /// Validate summary options
    pub fn validate(&self) -> Result<(), BookDigestError> {
        if self.max_length == 0 {
            return Err(BookDigestError::config("max_length must be greater than 0"));
        }

        if self.min_length > self.max_length {
            return Err(BookDigestError::config(format!(
                "min_length ({}) cannot exceed max_length ({})",
                self.min_length, self.max_length
            )));
        }

        if self.concurrency == 0 {
            return Err(BookDigestError::config("concurrency must be at least 1"));
        }

        if self.keyphrase_count == 0 {
            return Err(BookDigestError::config("keyphrase_count must be at least 1"));
        }

        if !(-1.0..=1.0).contains(&self.relevance_threshold) {
            return Err(BookDigestError::config(
                "relevance_threshold must lie within [-1.0, 1.0]",
            ));
        }

        Ok(())
    }
}

/// BookDigest application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Ollama API base URL
    pub ollama_base_url: String,

    /// Embedding model name (served by Ollama)
    pub embedding_model: String,

    /// Chat model name used when `chat_backend` is Ollama
    pub ollama_chat_model: String,

    /// Hosted chat backend for the prompt strategy
    pub chat_backend: ChatBackend,

    /// OpenAI-compatible API base URL
    pub openai_base_url: String,

    /// OpenAI API key (falls back to OPENAI_API_KEY)
    pub openai_api_key: Option<String>,

    /// OpenAI chat model name
    pub openai_model: String,

    /// Directory holding the local generator (config.json, tokenizer.json, model.safetensors)
    pub generator_model_dir: Option<PathBuf>,

    /// Log directory
    pub log_dir: PathBuf,

    /// Log level
    pub log_level: String,

    /// Summarization options
    pub summary: SummaryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ollama_base_url: "http://localhost:11434".to_string(),
            embedding_model: "all-minilm".to_string(),
            ollama_chat_model: "llama3.2:latest".to_string(),
            chat_backend: ChatBackend::OpenAi,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_api_key: None,
            openai_model: "gpt-3.5-turbo".to_string(),
            generator_model_dir: None,
            log_dir: PathBuf::from("./log"),
            log_level: "info".to_string(),
            summary: SummaryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration
    ///
    /// Layers, lowest priority first: built-in defaults, the optional TOML file,
    /// `BOOKDIGEST_*` environment variables (nested keys use `__`, e.g.
    /// `BOOKDIGEST_SUMMARY__MAX_LENGTH`). A `.env` file is loaded beforehand.
    pub fn load(path: Option<&Path>) -> Result<Self, BookDigestError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix("BOOKDIGEST")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = settings.try_deserialize()?;

        if config.openai_api_key.is_none() {
            config.openai_api_key = std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty());
        }

        Ok(config)
    }

    /// Get log file path
    pub fn get_log_path(&self, filename: &str) -> PathBuf {
        self.log_dir.join(filename)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), BookDigestError> {
        for (name, url) in [
            ("Ollama", &self.ollama_base_url),
            ("OpenAI", &self.openai_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(BookDigestError::config(format!(
                    "{} base URL must start with http:// or https://",
                    name
                )));
            }
        }

        if crate::logger::parse_log_level(&self.log_level).is_none() {
            return Err(BookDigestError::config(format!(
                "Unknown log level '{}', expected trace, debug, info, warn or error",
                self.log_level
            )));
        }

        if self.embedding_model.is_empty() {
            return Err(BookDigestError::config("Embedding model name cannot be empty"));
        }

        if self.summary.strategy == Strategy::Prompt
            && self.chat_backend == ChatBackend::OpenAi
            && self.openai_api_key.is_none()
        {
            return Err(BookDigestError::config(
                "OpenAI API key is required for the prompt strategy (set OPENAI_API_KEY)",
            ));
        }

        self.summary.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.summary.admission_threshold, 10);
        assert_eq!(config.summary.keyphrase_count, 5);
        assert_eq!(config.summary.max_retries, 3);
        assert!((config.summary.relevance_threshold - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.summary.strategy, Strategy::Hybrid);
    }

    #[test]
    fn test_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let mut invalid_config = AppConfig::default();
        invalid_config.ollama_base_url = "localhost:11434".to_string();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = AppConfig::default();
        invalid_config.log_level = "verbose".to_string();
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_validate_length_bounds() {
        let mut config = SummaryConfig::default();
        config.min_length = 300;
        assert!(config.validate().is_err());

        config.min_length = 0;
        config.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_prompt_strategy_requires_key() {
        let mut config = AppConfig::default();
        config.summary.strategy = Strategy::Prompt;
        config.openai_api_key = None;
        assert!(config.validate().is_err());

        config.chat_backend = ChatBackend::Ollama;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("HYBRID".parse::<Strategy>().unwrap(), Strategy::Hybrid);
        assert_eq!(Strategy::Prompt.to_string(), "prompt");
        assert!("extractive".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from_str(
                "log_level = \"debug\"\n[summary]\nmax_length = 60\nmin_length = 20\n",
                ::config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: AppConfig = settings.try_deserialize().unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.summary.max_length, 60);
        assert_eq!(config.summary.admission_threshold, 10);
        assert_eq!(config.embedding_model, "all-minilm");
    }
}
