pub mod config;
pub mod error;
pub mod logger;

// Re-export commonly used types
pub use crate::config::{AppConfig, ChatBackend, Strategy, SummaryConfig};
pub use crate::error::BookDigestError;
pub type Result<T> = std::result::Result<T, BookDigestError>;

/// Literal text recorded in place of a summary when generation could not complete
pub const FAILURE_SENTINEL: &str = "[SUMMARY FAILED]";
