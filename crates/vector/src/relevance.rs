//! Keyphrase-guided sentence selection

use std::sync::Arc;
use tracing::{debug, warn};

use crate::embedder::Embedder;
use crate::similarity::{row_max, similarity_matrix};
use crate::types::{Keyphrase, RelevanceOutcome, ScoredSentence, Sentence, UnfilteredReason};

/// Sentence boundary
pub const SENTENCE_DELIMITER: &str = ". ";

/// Fragments must be longer than this many characters (before trimming)
pub const MIN_FRAGMENT_CHARS: usize = 10;

/// Documents with fewer kept sentences are passed through
pub const MIN_SENTENCES: usize = 3;

/// Number of top-ranked sentences considered for the output
pub const SELECTED_SENTENCES: usize = 3;

/// Default score a selected sentence must exceed
pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 0.3;

/// Split on `". "`, dropping fragments of 10 characters or fewer
pub fn split_sentences(text: &str) -> Vec<Sentence> {
    text.split(SENTENCE_DELIMITER)
        .filter(|fragment| fragment.chars().count() > MIN_FRAGMENT_CHARS)
        .enumerate()
        .map(|(index, fragment)| Sentence {
            index,
            text: fragment.trim().to_string(),
        })
        .collect()
}

/// Keeps the sentences most similar to a document's keyphrases
#[derive(Clone)]
pub struct SentenceRelevanceFilter {
    embedder: Arc<dyn Embedder>,
    threshold: f32,
}

impl SentenceRelevanceFilter {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            threshold: DEFAULT_RELEVANCE_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Select up to three relevant sentences of `text`
    ///
    /// Each sentence is scored by its best cosine similarity to any keyphrase.
    /// The three best are kept in descending score order, not document order,
    /// and those at or below the threshold are dropped. Never fails: every
    /// problem resolves to [`RelevanceOutcome::Unfiltered`].
    pub async fn select(&self, text: &str, keyphrases: &[Keyphrase]) -> RelevanceOutcome {
        let sentences = split_sentences(text);
        if sentences.len() < MIN_SENTENCES {
            debug!("Only {} sentence(s), skipping relevance filter", sentences.len());
            return RelevanceOutcome::Unfiltered(UnfilteredReason::TooFewSentences);
        }

        if keyphrases.is_empty() {
            debug!("No keyphrases, skipping relevance filter");
            return RelevanceOutcome::Unfiltered(UnfilteredReason::NoKeyphrases);
        }

        let scores = match self.score(&sentences, keyphrases).await {
            Some(scores) => scores,
            None => return RelevanceOutcome::Unfiltered(UnfilteredReason::EmbeddingFailed),
        };

        let mut ranked: Vec<ScoredSentence> = sentences
            .into_iter()
            .zip(scores)
            .map(|(sentence, score)| ScoredSentence { sentence, score })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(SELECTED_SENTENCES);
        ranked.retain(|s| s.score > self.threshold);

        if ranked.is_empty() {
            debug!("No sentence scored above {}", self.threshold);
            return RelevanceOutcome::Unfiltered(UnfilteredReason::BelowThreshold);
        }

        let text = ranked
            .iter()
            .map(|s| s.sentence.text.as_str())
            .collect::<Vec<_>>()
            .join(SENTENCE_DELIMITER);

        debug!(
            "Selected {} sentence(s) - Scores: {:?}",
            ranked.len(),
            ranked.iter().map(|s| s.score).collect::<Vec<_>>()
        );

        RelevanceOutcome::Selected {
            text,
            sentences: ranked,
        }
    }

    /// Row-max similarity of each sentence against all keyphrases
    async fn score(&self, sentences: &[Sentence], keyphrases: &[Keyphrase]) -> Option<Vec<f32>> {
        let sentence_texts: Vec<String> = sentences.iter().map(|s| s.text.clone()).collect();
        let phrase_texts: Vec<String> = keyphrases.iter().map(|k| k.phrase.clone()).collect();

        let embedded = async {
            let sentence_vectors = self.embedder.embed(&sentence_texts).await?;
            let phrase_vectors = self.embedder.embed(&phrase_texts).await?;
            Ok::<_, bookdigest_common::BookDigestError>((sentence_vectors, phrase_vectors))
        };

        let (sentence_vectors, phrase_vectors) = match embedded.await {
            Ok(vectors) => vectors,
            Err(e) => {
                warn!("Sentence embedding failed, using full text: {}", e);
                return None;
            }
        };

        if sentence_vectors.len() != sentences.len() {
            warn!(
                "Expected {} sentence embeddings, got {}",
                sentences.len(),
                sentence_vectors.len()
            );
            return None;
        }

        match similarity_matrix(&sentence_vectors, &phrase_vectors) {
            Some(matrix) => Some(row_max(&matrix)),
            None => {
                warn!("Sentence and keyphrase embeddings have mismatched shapes");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingEmbedder, KeywordEmbedder};

    fn phrases(words: &[&str]) -> Vec<Keyphrase> {
        words
            .iter()
            .map(|w| Keyphrase {
                phrase: w.to_string(),
                score: 1.0,
            })
            .collect()
    }

    fn filter(vocabulary: &[&'static str]) -> SentenceRelevanceFilter {
        SentenceRelevanceFilter::new(Arc::new(KeywordEmbedder::new(vocabulary)))
    }

    #[test]
    fn test_split_measures_length_before_trim() {
        let sentences = split_sentences("First sentence is long.  abcdefghij. Tiny bit. Third sentence is long");
        let texts: Vec<&str> = sentences.iter().map(|s| s.text.as_str()).collect();

        assert_eq!(texts, vec!["First sentence is long", "abcdefghij", "Third sentence is long"]);
        assert_eq!(sentences[2].index, 2);
    }

    #[test]
    fn test_split_keeps_trailing_period_on_last_fragment() {
        let sentences = split_sentences("One long sentence here. Another long one.");
        assert_eq!(sentences[1].text, "Another long one.");
    }

    #[tokio::test]
    async fn test_only_sentences_above_threshold_survive() {
        let text = "The library opened early today. It rained over the hills again. \
                    Birds sang loudly in the trees";
        let outcome = filter(&["library", "weather", "garden"])
            .select(text, &phrases(&["library"]))
            .await;

        match &outcome {
            RelevanceOutcome::Selected { sentences, .. } => assert_eq!(sentences.len(), 1),
            other => panic!("expected selection, got {:?}", other),
        }
        assert_eq!(outcome.into_text(text), "The library opened early today");
    }

    #[tokio::test]
    async fn test_selection_is_in_score_order() {
        let text = "A garden and a library and some weather. Nothing relevant is here at all. \
                    The library and the garden share a wall. The library opens at nine";
        let outcome = filter(&["library", "weather", "garden"])
            .select(text, &phrases(&["library"]))
            .await;

        assert_eq!(
            outcome.into_text(text),
            "The library opens at nine. The library and the garden share a wall. \
             A garden and a library and some weather"
        );
    }

    #[tokio::test]
    async fn test_custom_threshold() {
        let text = "A garden and a library and some weather. Nothing relevant is here at all. \
                    The library and the garden share a wall. The library opens at nine";
        let outcome = filter(&["library", "weather", "garden"])
            .with_threshold(0.8)
            .select(text, &phrases(&["library"]))
            .await;

        assert_eq!(outcome.into_text(text), "The library opens at nine");
    }

    #[tokio::test]
    async fn test_best_keyphrase_counts() {
        let text = "The library opened early today. It rained over the hills again. \
                    The garden was full of roses";
        let outcome = filter(&["library", "garden"])
            .select(text, &phrases(&["library", "garden"]))
            .await;

        assert_eq!(
            outcome.into_text(text),
            "The library opened early today. The garden was full of roses"
        );
    }

    #[tokio::test]
    async fn test_nothing_above_threshold_is_unfiltered() {
        let text = "The library opened early today. It rained over the hills again. \
                    Birds sang loudly in the trees";
        let outcome = filter(&["library"]).select(text, &phrases(&["museum"])).await;

        assert_eq!(outcome, RelevanceOutcome::Unfiltered(UnfilteredReason::BelowThreshold));
        assert_eq!(outcome.into_text(text), text);
    }

    #[tokio::test]
    async fn test_too_few_sentences_is_unfiltered() {
        let text = "Only one real sentence lives here. Short. Tiny";
        let outcome = filter(&["sentence"]).select(text, &phrases(&["sentence"])).await;
        assert_eq!(outcome, RelevanceOutcome::Unfiltered(UnfilteredReason::TooFewSentences));

        let punctuation = "!!!!!!!!!!!!!!!!. ????????????. ..";
        let outcome = filter(&["x"]).select(punctuation, &phrases(&["x"])).await;
        assert_eq!(outcome, RelevanceOutcome::Unfiltered(UnfilteredReason::TooFewSentences));
    }

    #[tokio::test]
    async fn test_missing_keyphrases_is_unfiltered() {
        let text = "The library opened early today. It rained over the hills again. \
                    Birds sang loudly in the trees";
        let outcome = filter(&["library"]).select(text, &[]).await;
        assert_eq!(outcome, RelevanceOutcome::Unfiltered(UnfilteredReason::NoKeyphrases));
    }

    #[tokio::test]
    async fn test_embedding_failure_is_unfiltered() {
        let text = "The library opened early today. It rained over the hills again. \
                    Birds sang loudly in the trees";
        let outcome = SentenceRelevanceFilter::new(Arc::new(FailingEmbedder))
            .select(text, &phrases(&["library"]))
            .await;
        assert_eq!(outcome, RelevanceOutcome::Unfiltered(UnfilteredReason::EmbeddingFailed));
    }
}
