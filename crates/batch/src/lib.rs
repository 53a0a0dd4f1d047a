//! BookDigest Batch Processing
//!
//! Admission checks, strategy dispatch and per-row failure isolation

mod orchestrator;
mod strategy;
mod types;

pub use orchestrator::BatchOrchestrator;
pub use strategy::{DirectSummarizer, HybridSummarizer, PromptStrategy, Summarize};
pub use types::{Admission, BatchRow, SummaryResult};
