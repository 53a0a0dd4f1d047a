//! Local T5 generator backed by candle
//!
//! Expects a model directory containing `config.json`, `tokenizer.json` and
//! `model.safetensors` (e.g. a `t5-small` or `flan-t5-base` export).

use bookdigest_common::{BookDigestError, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::VarBuilder;
use candle_transformers::models::t5;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

use crate::seq2seq::{Seq2SeqModel, TextTokenizer};

/// Instruction prefix T5 checkpoints were trained with for summarization
pub const T5_SUMMARIZE_PREFIX: &str = "summarize: ";

fn candle_err(e: candle_core::Error) -> BookDigestError {
    BookDigestError::generation(format!("candle: {}", e))
}

/// HuggingFace tokenizer loaded from `tokenizer.json`
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
    prefix: Option<String>,
}

impl HfTokenizer {
    /// Load tokenizer from file
    pub fn from_file(path: &Path) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| {
            BookDigestError::config(format!(
                "Failed to load tokenizer {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(Self { inner, prefix: None })
    }

    /// Prepend `prefix` to every encoded text
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

impl TextTokenizer for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let input = match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, text),
            None => text.to_string(),
        };

        let encoding = self
            .inner
            .encode(input, true)
            .map_err(|e| BookDigestError::generation(format!("tokenization failed: {}", e)))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, true)
            .map_err(|e| BookDigestError::generation(format!("detokenization failed: {}", e)))
    }
}

/// T5 conditional-generation model
///
/// The KV cache is disabled so each step sees the full decoder prefix; this
/// keeps beams independent of each other.
pub struct T5Generator {
    model: Mutex<t5::T5ForConditionalGeneration>,
    device: Device,
    decoder_start_token_id: u32,
    eos_token_id: u32,
}

impl T5Generator {
    /// Load model weights and config from `model_dir`
    pub fn load(model_dir: &Path) -> Result<Self> {
        let config_path = model_dir.join("config.json");
        let weights_path = model_dir.join("model.safetensors");

        let mut config: t5::Config = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        config.use_cache = false;

        let device = Device::Cpu;
        // SAFETY: the weights file is not modified while mapped
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .map_err(candle_err)?
        };
        let model = t5::T5ForConditionalGeneration::load(vb, &config).map_err(candle_err)?;

        info!("T5 generator loaded from {}", model_dir.display());

        Ok(Self {
            model: Mutex::new(model),
            device,
            decoder_start_token_id: config.pad_token_id as u32,
            eos_token_id: config.eos_token_id as u32,
        })
    }

    /// Load model and matching tokenizer (with the summarize prefix) from `model_dir`
    pub fn load_with_tokenizer(model_dir: &Path) -> Result<(Self, HfTokenizer)> {
        let model = Self::load(model_dir)?;
        let tokenizer =
            HfTokenizer::from_file(&model_dir.join("tokenizer.json"))?.with_prefix(T5_SUMMARIZE_PREFIX);
        Ok((model, tokenizer))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, t5::T5ForConditionalGeneration>> {
        self.model
            .lock()
            .map_err(|_| BookDigestError::generation("T5 model lock poisoned"))
    }
}

impl Seq2SeqModel for T5Generator {
    type Encoded = Tensor;

    fn encode(&self, input_ids: &[u32]) -> Result<Tensor> {
        let ids = Tensor::new(input_ids, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(candle_err)?;

        let mut model = self.lock()?;
        model.clear_kv_cache();
        model.encode(&ids).map_err(candle_err)
    }

    fn next_token_logprobs(&self, encoded: &Tensor, decoder_ids: &[u32]) -> Result<Vec<f32>> {
        let ids = Tensor::new(decoder_ids, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(candle_err)?;

        let logits = self.lock()?.decode(&ids, encoded).map_err(candle_err)?;

        candle_nn::ops::log_softmax(&logits, D::Minus1)
            .and_then(|lp| lp.squeeze(0))
            .and_then(|lp| lp.to_dtype(DType::F32))
            .and_then(|lp| lp.to_vec1::<f32>())
            .map_err(candle_err)
    }

    fn decoder_start_token_id(&self) -> u32 {
        self.decoder_start_token_id
    }

    fn eos_token_id(&self) -> u32 {
        self.eos_token_id
    }
}
