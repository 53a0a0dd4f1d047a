use bookdigest_common::FAILURE_SENTINEL;
use serde::{Deserialize, Serialize};

/// Outcome for one input row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "summary", rename_all = "snake_case")]
pub enum SummaryResult {
    /// Non-empty summary text
    Summary(String),
    /// Missing, too short, or never started
    Skipped,
    /// Summarization did not produce a usable result
    Failed,
}

impl SummaryResult {
    /// Interpret raw summarizer output
    ///
    /// The failure sentinel and blank output both count as failures.
    pub fn from_output(output: String) -> Self {
        let trimmed = output.trim();
        if trimmed.is_empty() || trimmed == FAILURE_SENTINEL {
            Self::Failed
        } else {
            Self::Summary(output)
        }
    }

    /// Text written to the output column
    pub fn render(&self) -> &str {
        match self {
            Self::Summary(text) => text,
            Self::Skipped => "",
            Self::Failed => FAILURE_SENTINEL,
        }
    }

    pub fn is_summary(&self) -> bool {
        matches!(self, Self::Summary(_))
    }
}

/// Admission decision for a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Absent, empty or whitespace only
    Missing,
    /// Fewer whitespace-separated words than the threshold
    TooShort { words: usize },
    Admitted { words: usize },
}

impl Admission {
    /// Judge `document` against a minimum word count
    pub fn check(document: Option<&str>, threshold: usize) -> Self {
        let words = match document {
            Some(text) => text.split_whitespace().count(),
            None => return Self::Missing,
        };

        if words == 0 {
            Self::Missing
        } else if words < threshold {
            Self::TooShort { words }
        } else {
            Self::Admitted { words }
        }
    }
}

/// One input document paired with its result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRow {
    pub index: usize,
    pub document: Option<String>,
    pub result: SummaryResult,
}
