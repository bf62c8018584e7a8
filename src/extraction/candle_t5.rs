//! Flan-T5 text generator using candle quantized models.
//!
//! Downloads model artifacts from HuggingFace on first use, then runs greedy
//! T5 decoding. Requires the `candle` feature.

use crate::error::{MinutesError, Result};
use crate::extraction::generator::{GenerationParams, TextGenerator};
use crate::models::generator_catalog::GeneratorModelInfo;

#[cfg(feature = "candle")]
use crate::defaults;
#[cfg(feature = "candle")]
use candle_core::{Device, Tensor};
#[cfg(feature = "candle")]
use candle_transformers::models::quantized_t5::{Config as T5Config, T5ForConditionalGeneration};
#[cfg(feature = "candle")]
use candle_transformers::quantized_var_builder::VarBuilder;
#[cfg(feature = "candle")]
use hf_hub::api::sync::Api;
#[cfg(feature = "candle")]
use std::sync::Mutex;
#[cfg(feature = "candle")]
use tokenizers::Tokenizer;

/// T5 pad token, also the decoder start token.
#[cfg(feature = "candle")]
const PAD_TOKEN_ID: u32 = 0;

/// T5 end-of-sequence token.
#[cfg(any(feature = "candle", test))]
const EOS_TOKEN_ID: u32 = 1;

/// Cap a tokenized prompt at `max` ids, keeping the closing `</s>`.
///
/// Prompts lead with their instruction, so the tail of the transcript is
/// what gets dropped.
#[cfg(any(feature = "candle", test))]
fn truncate_prompt(ids: &[u32], max: usize) -> Vec<u32> {
    if ids.len() <= max {
        return ids.to_vec();
    }
    let mut kept = ids[..max.saturating_sub(1)].to_vec();
    if max > 0 {
        kept.push(EOS_TOKEN_ID);
    }
    kept
}

#[cfg(feature = "candle")]
fn load_error(message: String) -> MinutesError {
    MinutesError::ModelLoad { message }
}

#[cfg(feature = "candle")]
fn generation_error(message: String) -> MinutesError {
    MinutesError::Generation { message }
}

/// Flan-T5 generator running quantized inference via candle.
///
/// The model keeps a KV cache, so calls are serialised through a Mutex.
#[cfg(feature = "candle")]
pub struct CandleT5Generator {
    model: Mutex<T5ForConditionalGeneration>,
    tokenizer: Tokenizer,
    device: Device,
    model_name: String,
}

#[cfg(feature = "candle")]
impl std::fmt::Debug for CandleT5Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleT5Generator")
            .field("model_name", &self.model_name)
            .finish_non_exhaustive()
    }
}

/// Stub used when the `candle` feature is disabled.
#[cfg(not(feature = "candle"))]
#[derive(Debug)]
pub struct CandleT5Generator {
    model_name: String,
}

#[cfg(feature = "candle")]
impl CandleT5Generator {
    /// Load a quantized Flan-T5 model from the HuggingFace cache.
    pub fn load(info: &GeneratorModelInfo) -> Result<Self> {
        let device = Device::Cpu;
        let api = Api::new().map_err(|e| load_error(format!("HF Hub API init: {e}")))?;
        let repo = api.model(info.hf_repo.to_string());

        let weights_path = repo
            .get(info.weights_filename)
            .map_err(|e| load_error(format!("Download model {}: {e}", info.weights_filename)))?;
        let config_path = repo
            .get(info.config_filename)
            .map_err(|e| load_error(format!("Download config {}: {e}", info.config_filename)))?;
        let tokenizer_path = repo
            .get(crate::models::generator_catalog::TOKENIZER_FILENAME)
            .map_err(|e| load_error(format!("Download tokenizer: {e}")))?;

        let config: T5Config = serde_json::from_slice(&std::fs::read(&config_path)?)
            .map_err(|e| load_error(format!("Parse T5 config: {e}")))?;

        let vb = VarBuilder::from_gguf(&weights_path, &device)
            .map_err(|e| load_error(format!("Load GGUF model {}: {e}", weights_path.display())))?;
        let model = T5ForConditionalGeneration::load(vb, &config)
            .map_err(|e| load_error(format!("Init T5 model: {e}")))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| load_error(format!("Load tokenizer {}: {e}", tokenizer_path.display())))?;

        tracing::info!(model = info.name, size_mb = info.size_mb, "Loaded Flan-T5 generator");

        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            device,
            model_name: info.name.to_string(),
        })
    }

    fn decode_greedy(
        &self,
        model: &mut T5ForConditionalGeneration,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String> {
        let err = |e: candle_core::Error| generation_error(e.to_string());

        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| generation_error(format!("Tokenize: {e}")))?;
        let ids = truncate_prompt(encoding.get_ids(), defaults::GENERATOR_MAX_INPUT_TOKENS);
        if ids.len() < encoding.len() {
            tracing::debug!(
                prompt_tokens = encoding.len(),
                kept = ids.len(),
                "Prompt truncated for the encoder"
            );
        }
        let input = Tensor::new(ids.as_slice(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(err)?;
        let encoder_output = model.encode(&input).map_err(err)?;

        // Incremental decoding: the KV cache holds earlier positions, so each
        // step feeds only the newest token.
        let mut generated: Vec<u32> = Vec::new();
        let mut next_input = PAD_TOKEN_ID;

        for step in 0..params.max_new_tokens {
            params.cancel.check()?;
            let decoder_input = Tensor::new(&[next_input], &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(err)?;
            let logits = model.decode(&decoder_input, &encoder_output).map_err(err)?;

            let seq_len = logits.dim(1).map_err(err)?;
            let mut scores: Vec<f32> = logits
                .get_on_dim(1, seq_len.saturating_sub(1))
                .and_then(|l| l.flatten_all())
                .and_then(|l| l.to_vec1::<f32>())
                .map_err(err)?;

            if step < params.min_new_tokens
                && let Some(eos) = scores.get_mut(EOS_TOKEN_ID as usize)
            {
                *eos = f32::NEG_INFINITY;
            }

            let next_token = argmax(&scores);
            if next_token == EOS_TOKEN_ID {
                break;
            }
            generated.push(next_token);
            next_input = next_token;
        }

        self.tokenizer
            .decode(&generated, true)
            .map_err(|e| generation_error(format!("Detokenize: {e}")))
    }
}

#[cfg(feature = "candle")]
fn argmax(scores: &[f32]) -> u32 {
    scores
        .iter()
        .enumerate()
        .fold((0usize, f32::NEG_INFINITY), |best, (i, &s)| {
            if s > best.1 { (i, s) } else { best }
        })
        .0 as u32
}

#[cfg(not(feature = "candle"))]
impl CandleT5Generator {
    /// Always fails: this build has no candle.
    pub fn load(info: &GeneratorModelInfo) -> Result<Self> {
        Err(MinutesError::ModelLoad {
            message: format!("cannot load {}: built without the `candle` feature", info.name),
        })
    }
}

#[cfg(feature = "candle")]
impl TextGenerator for CandleT5Generator {
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let mut model = self
            .model
            .lock()
            .map_err(|e| generation_error(format!("Failed to acquire model lock: {e}")))?;
        model.clear_kv_cache();
        let output = self.decode_greedy(&mut model, prompt, params);
        model.clear_kv_cache();
        output
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(not(feature = "candle"))]
impl TextGenerator for CandleT5Generator {
    fn generate(&self, _prompt: &str, _params: &GenerationParams) -> Result<String> {
        Err(MinutesError::Generation {
            message: "Candle feature not enabled. Rebuild with --features candle".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
