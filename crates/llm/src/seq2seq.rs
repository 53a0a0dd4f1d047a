use bookdigest_common::Result;

/// Subword tokenizer paired with a sequence-to-sequence model
pub trait TextTokenizer: Send + Sync {
    /// Encode text to token ids (including any special tokens the model expects)
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Decode token ids, skipping special tokens
    fn decode(&self, ids: &[u32]) -> Result<String>;
}

/// Encoder-decoder model queried one decoding step at a time
///
/// Implementations must be read-only after construction so one handle can be
/// shared across batch items.
pub trait Seq2SeqModel: Send + Sync {
    /// Encoder output reused for every decoding step of one input
    type Encoded: Send;

    /// Run the encoder over the input ids
    fn encode(&self, input_ids: &[u32]) -> Result<Self::Encoded>;

    /// Log-probabilities over the vocabulary for the token following `decoder_ids`
    ///
    /// `decoder_ids` always starts with [`Seq2SeqModel::decoder_start_token_id`].
    fn next_token_logprobs(&self, encoded: &Self::Encoded, decoder_ids: &[u32])
        -> Result<Vec<f32>>;

    /// First token fed to the decoder
    fn decoder_start_token_id(&self) -> u32;

    /// End-of-sequence token
    fn eos_token_id(&self) -> u32;
}
