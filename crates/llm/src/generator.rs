//! Length-constrained abstractive generation via beam search
//!
//! Length bounds are counted in model tokens (subword units). Callers that
//! collect bounds from users as "words" pass them through unchanged, so a
//! 100-word minimum is really a 100-token minimum here.

use bookdigest_common::{BookDigestError, Result, FAILURE_SENTINEL};
use std::cmp::Ordering;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::seq2seq::{Seq2SeqModel, TextTokenizer};

/// Beam search parameters
#[derive(Debug, Clone)]
pub struct BeamSearchConfig {
    /// Hypotheses kept per step
    pub beam_width: usize,

    /// Exponent applied to hypothesis length when ranking finished beams
    pub length_penalty: f32,

    /// N-gram size that may not repeat in the output (0 disables)
    pub no_repeat_ngram_size: usize,

    /// Input token budget; longer inputs are truncated
    pub max_input_tokens: usize,

    /// Stop once `beam_width` hypotheses have finished
    pub early_stopping: bool,
}

impl Default for BeamSearchConfig {
    fn default() -> Self {
        Self {
            beam_width: 4,
            length_penalty: 2.0,
            no_repeat_ngram_size: 3,
            max_input_tokens: 1024,
            early_stopping: true,
        }
    }
}

/// Abstractive generator with hard length bounds
///
/// Output is deterministic: no sampling, and equal scores are ordered by beam
/// index and token id.
pub struct ConstrainedGenerator<M: Seq2SeqModel> {
    model: Arc<M>,
    tokenizer: Arc<dyn TextTokenizer>,
    config: BeamSearchConfig,
}

impl<M: Seq2SeqModel> Clone for ConstrainedGenerator<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            tokenizer: Arc::clone(&self.tokenizer),
            config: self.config.clone(),
        }
    }
}

impl<M: Seq2SeqModel> ConstrainedGenerator<M> {
    /// Create new generator with default beam settings
    pub fn new(model: Arc<M>, tokenizer: Arc<dyn TextTokenizer>) -> Self {
        Self::with_config(model, tokenizer, BeamSearchConfig::default())
    }

    /// Create new generator with explicit beam settings
    pub fn with_config(
        model: Arc<M>,
        tokenizer: Arc<dyn TextTokenizer>,
        config: BeamSearchConfig,
    ) -> Self {
        Self {
            model,
            tokenizer,
            config,
        }
    }

    pub fn config(&self) -> &BeamSearchConfig {
        &self.config
    }

    /// Generate a summary of `text` between `min_len` and `max_len` tokens
    ///
    /// Any tokenizer or model failure, including a panic, yields the failure
    /// sentinel instead of an error.
    pub fn generate(&self, text: &str, max_len: usize, min_len: usize) -> String {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.try_generate(text, max_len, min_len)
        }));

        match outcome {
            Ok(Ok(summary)) => summary,
            Ok(Err(e)) => {
                warn!("Generation failed: {}", e);
                FAILURE_SENTINEL.to_string()
            }
            Err(_) => {
                warn!("Generation panicked");
                FAILURE_SENTINEL.to_string()
            }
        }
    }

    /// Generate a summary, surfacing failures as errors
    pub fn try_generate(&self, text: &str, max_len: usize, min_len: usize) -> Result<String> {
        if max_len == 0 {
            return Err(BookDigestError::invalid_input("max_len must be greater than 0"));
        }
        let min_len = min_len.min(max_len);

        let input_ids = self.prepare_input(text)?;
        debug!(
            "Beam search - Input tokens: {}, Bounds: {}..={}",
            input_ids.len(),
            min_len,
            max_len
        );

        let encoded = self.model.encode(&input_ids)?;
        let best = self.beam_search(&encoded, max_len, min_len)?;

        let summary = self.tokenizer.decode(&best)?;
        Ok(summary.trim().to_string())
    }

    /// Tokenize and truncate to the input budget, keeping a trailing EOS
    fn prepare_input(&self, text: &str) -> Result<Vec<u32>> {
        let mut ids = self.tokenizer.encode(text)?;
        if ids.is_empty() {
            return Err(BookDigestError::generation("input produced no tokens"));
        }

        let budget = self.config.max_input_tokens.max(1);
        if ids.len() > budget {
            let eos = self.model.eos_token_id();
            let ends_with_eos = ids.last() == Some(&eos);
            ids.truncate(budget);
            if ends_with_eos {
                ids[budget - 1] = eos;
            }
        }

        Ok(ids)
    }

    fn beam_search(&self, encoded: &M::Encoded, max_len: usize, min_len: usize) -> Result<Vec<u32>> {
        let beam_width = self.config.beam_width.max(1);
        let start = self.model.decoder_start_token_id();
        let eos = self.model.eos_token_id();

        let mut beams = vec![Hypothesis {
            tokens: Vec::new(),
            logprob: 0.0,
        }];
        let mut finished = FinishedHypotheses::new(beam_width, self.config.length_penalty);

        for _ in 0..max_len {
            let mut candidates = Vec::with_capacity(beams.len() * beam_width * 2);

            for (beam, hyp) in beams.iter().enumerate() {
                let mut decoder_ids = Vec::with_capacity(hyp.tokens.len() + 1);
                decoder_ids.push(start);
                decoder_ids.extend_from_slice(&hyp.tokens);

                let mut logprobs = self.model.next_token_logprobs(encoded, &decoder_ids)?;
                if logprobs.is_empty() {
                    return Err(BookDigestError::generation("model returned an empty distribution"));
                }

                if hyp.tokens.len() < min_len {
                    if let Some(lp) = logprobs.get_mut(eos as usize) {
                        *lp = f32::NEG_INFINITY;
                    }
                }

                for token in banned_ngram_tokens(&decoder_ids, self.config.no_repeat_ngram_size) {
                    if let Some(lp) = logprobs.get_mut(token as usize) {
                        *lp = f32::NEG_INFINITY;
                    }
                }

                for (token, lp) in top_k(&logprobs, beam_width * 2) {
                    candidates.push(Candidate {
                        logprob: hyp.logprob + lp,
                        beam,
                        token,
                    });
                }
            }

            candidates.sort_by(Candidate::rank);

            let mut next_beams = Vec::with_capacity(beam_width);
            for (rank, candidate) in candidates.iter().enumerate() {
                if next_beams.len() == beam_width {
                    break;
                }

                let parent = &beams[candidate.beam];
                if candidate.token == eos {
                    // only hypotheses that would have made the beam may finish
                    if rank < beam_width {
                        finished.add(parent.tokens.clone(), candidate.logprob, parent.tokens.len() + 1);
                    }
                    continue;
                }

                let mut tokens = parent.tokens.clone();
                tokens.push(candidate.token);
                next_beams.push(Hypothesis {
                    tokens,
                    logprob: candidate.logprob,
                });
            }

            beams = next_beams;

            if beams.is_empty() || (self.config.early_stopping && finished.is_full()) {
                break;
            }
        }

        if !(self.config.early_stopping && finished.is_full()) {
            for hyp in beams {
                let len = hyp.tokens.len();
                finished.add(hyp.tokens, hyp.logprob, len);
            }
        }

        finished
            .best()
            .ok_or_else(|| BookDigestError::generation("beam search produced no hypothesis"))
    }
}

#[derive(Debug, Clone)]
struct Hypothesis {
    tokens: Vec<u32>,
    logprob: f32,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    logprob: f32,
    beam: usize,
    token: u32,
}

impl Candidate {
    fn rank(a: &Self, b: &Self) -> Ordering {
        b.logprob
            .total_cmp(&a.logprob)
            .then(a.beam.cmp(&b.beam))
            .then(a.token.cmp(&b.token))
    }
}

/// Best finished hypotheses, ranked by length-normalized log-probability
struct FinishedHypotheses {
    capacity: usize,
    length_penalty: f32,
    entries: Vec<(f32, Vec<u32>)>,
}

impl FinishedHypotheses {
    fn new(capacity: usize, length_penalty: f32) -> Self {
        Self {
            capacity,
            length_penalty,
            entries: Vec::with_capacity(capacity + 1),
        }
    }

    fn add(&mut self, tokens: Vec<u32>, logprob: f32, len: usize) {
        let score = logprob / (len.max(1) as f32).powf(self.length_penalty);
        if !score.is_finite() {
            return;
        }

        if self.entries.len() < self.capacity {
            self.entries.push((score, tokens));
            return;
        }

        let worst = self
            .entries
            .iter()
            .enumerate()
            .min_by(|a, b| a.1 .0.total_cmp(&b.1 .0))
            .map(|(idx, _)| idx);

        if let Some(worst) = worst {
            if score > self.entries[worst].0 {
                self.entries[worst] = (score, tokens);
            }
        }
    }

    fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Highest score; the earliest entry wins ties
    fn best(self) -> Option<Vec<u32>> {
        let mut best: Option<(f32, Vec<u32>)> = None;
        for (score, tokens) in self.entries {
            match &best {
                Some((top, _)) if score <= *top => {}
                _ => best = Some((score, tokens)),
            }
        }
        best.map(|(_, tokens)| tokens)
    }
}

/// Tokens that would complete an n-gram already present in `sequence`
fn banned_ngram_tokens(sequence: &[u32], n: usize) -> Vec<u32> {
    if n == 0 || sequence.len() + 1 < n {
        return Vec::new();
    }

    let prefix = &sequence[sequence.len() + 1 - n..];
    sequence
        .windows(n)
        .filter(|window| &window[..n - 1] == prefix)
        .map(|window| window[n - 1])
        .collect()
}

/// The `k` most likely finite entries, best first, lower token id on ties
fn top_k(logprobs: &[f32], k: usize) -> Vec<(u32, f32)> {
    let order = |a: &(u32, f32), b: &(u32, f32)| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0));

    let mut scored: Vec<(u32, f32)> = logprobs
        .iter()
        .enumerate()
        .filter(|(_, lp)| lp.is_finite())
        .map(|(id, lp)| (id as u32, *lp))
        .collect();

    if scored.len() > k {
        scored.select_nth_unstable_by(k, order);
        scored.truncate(k);
    }
    scored.sort_by(order);
    scored
}
