use serde::{Deserialize, Serialize};

/// Candidate phrase ranked by similarity to its source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyphrase {
    /// One or two lowercased tokens joined by a single space
    pub phrase: String,

    /// Cosine similarity to the whole-document embedding
    pub score: f32,
}

/// Sentence-like span of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    /// Position among the kept fragments
    pub index: usize,

    /// Trimmed fragment text
    pub text: String,
}

/// Sentence paired with its best keyphrase similarity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSentence {
    pub sentence: Sentence,
    pub score: f32,
}

/// Why the relevance filter left a document untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnfilteredReason {
    /// Fewer than three qualifying sentences
    TooFewSentences,
    /// No keyphrases to score against
    NoKeyphrases,
    /// Every selected sentence scored at or below the threshold
    BelowThreshold,
    /// The embedding backend failed
    EmbeddingFailed,
}

/// Result of sentence relevance filtering
#[derive(Debug, Clone, PartialEq)]
pub enum RelevanceOutcome {
    /// Selected sentences, highest score first, joined with `". "`
    Selected {
        text: String,
        sentences: Vec<ScoredSentence>,
    },
    /// Use the original document text
    Unfiltered(UnfilteredReason),
}

impl RelevanceOutcome {
    /// Resolve to the text handed to the generator
    pub fn into_text(self, original: &str) -> String {
        match self {
            Self::Selected { text, .. } => text,
            Self::Unfiltered(_) => original.to_string(),
        }
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, Self::Selected { .. })
    }
}
