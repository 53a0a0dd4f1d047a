/// BookDigest error types
#[derive(Debug, thiserror::Error)]
pub enum BookDigestError {
    /// Keyphrase or embedding inference failed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Tokenizer or generation model failed
    #[error("Generation error: {0}")]
    Generation(String),

    /// Hosted LLM request failed (network, status, malformed body)
    #[error("Request error: {0}")]
    Request(String),

    /// All attempts of a retried request failed
    #[error("Retries exhausted after {attempts} attempt(s): {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BookDigestError {
    /// Create extraction error
    pub fn extraction<S: Into<String>>(msg: S) -> Self {
        Self::Extraction(msg.into())
    }

    /// Create generation error
    pub fn generation<S: Into<String>>(msg: S) -> Self {
        Self::Generation(msg.into())
    }

    /// Create request error
    pub fn request<S: Into<String>>(msg: S) -> Self {
        Self::Request(msg.into())
    }

    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<::config::ConfigError> for BookDigestError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
