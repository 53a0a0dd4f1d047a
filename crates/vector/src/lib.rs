//! BookDigest Embedding Layer
//!
//! Keyphrase extraction and keyphrase-guided sentence selection over a
//! shared sentence-embedding space

mod embedder;
mod keyphrase;
mod relevance;
mod similarity;
mod stopwords;
mod types;

#[cfg(test)]
mod test_support;

pub use embedder::{Embedder, OllamaEmbedder};
pub use keyphrase::{candidate_phrases, word_tokens, KeyphraseExtractor, DEFAULT_KEYPHRASE_COUNT};
pub use relevance::{
    split_sentences, SentenceRelevanceFilter, DEFAULT_RELEVANCE_THRESHOLD, MIN_FRAGMENT_CHARS,
    MIN_SENTENCES, SELECTED_SENTENCES,
};
pub use similarity::{cosine_similarity, row_max, similarity_matrix};
pub use stopwords::{is_stopword, ENGLISH_STOPWORDS};
pub use types::{Keyphrase, RelevanceOutcome, ScoredSentence, Sentence, UnfilteredReason};
