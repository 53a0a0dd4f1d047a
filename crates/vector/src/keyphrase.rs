//! Embedding-ranked keyphrase extraction
//!
//! Candidates are the distinct unigrams and bigrams of a document after
//! lowercasing and stopword removal. Each candidate is embedded alongside the
//! whole document and ranked by cosine similarity to it.

use bookdigest_common::{BookDigestError, Result};
use std::sync::Arc;
use tracing::debug;

use crate::embedder::Embedder;
use crate::similarity::cosine_similarity;
use crate::stopwords::is_stopword;
use crate::types::Keyphrase;

/// Default number of keyphrases returned
pub const DEFAULT_KEYPHRASE_COUNT: usize = 5;

/// Word tokens: runs of two or more word characters, lowercased, stopwords removed
pub fn word_tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2 && !is_stopword(token))
        .map(str::to_string)
        .collect()
}

/// Distinct 1- and 2-token candidates in order of first appearance
pub fn candidate_phrases(text: &str) -> Vec<String> {
    let tokens = word_tokens(text);
    let mut candidates: Vec<String> = Vec::new();

    let mut push = |phrase: String| {
        if !candidates.contains(&phrase) {
            candidates.push(phrase);
        }
    };

    for (i, token) in tokens.iter().enumerate() {
        push(token.clone());
        if let Some(next) = tokens.get(i + 1) {
            push(format!("{} {}", token, next));
        }
    }

    candidates
}

/// Extracts the phrases that best represent a document
#[derive(Clone)]
pub struct KeyphraseExtractor {
    embedder: Arc<dyn Embedder>,
}

impl KeyphraseExtractor {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Top `count` keyphrases of `text`, most representative first
    ///
    /// Equal scores keep first-occurrence order. Text without usable tokens
    /// yields an empty list. Embedding failures surface as
    /// [`BookDigestError::Extraction`].
    pub async fn extract(&self, text: &str, count: usize) -> Result<Vec<Keyphrase>> {
        let candidates = candidate_phrases(text);
        if candidates.is_empty() || count == 0 {
            return Ok(Vec::new());
        }

        let mut inputs = Vec::with_capacity(candidates.len() + 1);
        inputs.push(text.to_string());
        inputs.extend(candidates.iter().cloned());

        let embeddings = self
            .embedder
            .embed(&inputs)
            .await
            .map_err(|e| BookDigestError::extraction(format!("keyphrase embedding failed: {}", e)))?;

        if embeddings.len() != inputs.len() {
            return Err(BookDigestError::extraction(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                embeddings.len()
            )));
        }

        let (document, phrases) = embeddings.split_at(1);
        let mut ranked: Vec<Keyphrase> = candidates
            .into_iter()
            .zip(phrases)
            .map(|(phrase, embedding)| Keyphrase {
                score: cosine_similarity(&document[0], embedding),
                phrase,
            })
            .collect();

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(count);

        debug!(
            "Extracted {} keyphrase(s) with {}: {:?}",
            ranked.len(),
            self.embedder.model(),
            ranked.iter().map(|k| k.phrase.as_str()).collect::<Vec<_>>()
        );

        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingEmbedder, KeywordEmbedder};

    #[test]
    fn test_word_tokens_drop_stopwords_and_short_tokens() {
        let tokens = word_tokens("The Rust book, a guide: it's 2 parts & snake_case names.");
        assert_eq!(tokens, vec!["rust", "book", "guide", "parts", "snake_case", "names"]);
    }

    #[test]
    fn test_candidates_are_distinct_in_first_occurrence_order() {
        let candidates = candidate_phrases("Memory safety and memory safety");
        assert_eq!(candidates, vec!["memory", "memory safety", "safety", "safety memory"]);
    }

    #[test]
    fn test_bigrams_span_removed_stopwords() {
        let candidates = candidate_phrases("borrow the checker");
        assert_eq!(candidates, vec!["borrow", "borrow checker", "checker"]);
    }

    #[tokio::test]
    async fn test_extract_ranks_by_document_similarity() {
        let embedder = Arc::new(KeywordEmbedder::new(&["ownership", "borrowing", "cargo"]));
        let extractor = KeyphraseExtractor::new(embedder.clone());

        let text = "Ownership rules. Ownership and borrowing. Cargo builds.";
        let phrases = extractor.extract(text, 3).await.unwrap();

        let names: Vec<&str> = phrases.iter().map(|k| k.phrase.as_str()).collect();
        // "ownership", "ownership rules" and "rules ownership" score equally
        assert_eq!(names, vec!["ownership borrowing", "ownership", "ownership rules"]);
        assert!(phrases[0].score > phrases[1].score);
        assert_eq!(phrases[1].score, phrases[2].score);
        assert_eq!(embedder.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_extract_empty_text_makes_no_request() {
        let embedder = Arc::new(KeywordEmbedder::new(&["anything"]));
        let extractor = KeyphraseExtractor::new(embedder.clone());

        assert!(extractor.extract("   ", 5).await.unwrap().is_empty());
        assert!(extractor.extract("... !!! ,,,", 5).await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_extract_failure_is_extraction_error() {
        let extractor = KeyphraseExtractor::new(Arc::new(FailingEmbedder));
        let err = extractor.extract("Some meaningful words here", 5).await.unwrap_err();
        assert!(matches!(err, BookDigestError::Extraction(_)));
    }
}
