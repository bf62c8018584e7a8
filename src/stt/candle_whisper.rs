//! Standard transcription engine: the reference Whisper model run with candle.
//!
//! Slower than whisper.cpp but pure Rust; it is the fallback when no ggml
//! model can be loaded. Requires the `candle` feature.

use crate::error::{MinutesError, Result};
use crate::stt::transcriber::{DecodeOptions, RawTranscription, Transcriber};
use std::path::Path;

#[cfg(feature = "candle")]
use crate::pipeline::cancel::CancelFlag;

#[cfg(feature = "candle")]
use candle_core::{Device, Tensor};
#[cfg(feature = "candle")]
use candle_nn::VarBuilder;
#[cfg(feature = "candle")]
use candle_transformers::models::whisper::{self as m, Config};
#[cfg(feature = "candle")]
use hf_hub::api::sync::Api;
#[cfg(feature = "candle")]
use hf_hub::{Repo, RepoType};
#[cfg(feature = "candle")]
use std::sync::Mutex;
#[cfg(feature = "candle")]
use tokenizers::Tokenizer;

/// Mel filter banks shipped separately from the model weights.
#[cfg(feature = "candle")]
const MEL_FILTERS_REPO: &str = "FL33TW00D-HF/whisper-base";

/// Upper bound on decoded tokens per 30 s window.
#[cfg(feature = "candle")]
const MAX_TOKENS_PER_WINDOW: usize = 224;

/// Whisper's language codes, in token order.
#[cfg(any(feature = "candle", test))]
const WHISPER_LANGUAGES: &[&str] = &[
    "en", "zh", "de", "es", "ru", "ko", "fr", "ja", "pt", "tr", "pl", "ca", "nl", "ar", "sv", "it",
    "id", "hi", "fi", "vi", "he", "uk", "el", "ms", "cs", "ro", "da", "hu", "ta", "no", "th", "ur",
    "hr", "bg", "lt", "la", "mi", "ml", "cy", "sk", "te", "fa", "lv", "bn", "sr", "az", "sl", "kn",
    "et", "mk", "br", "eu", "is", "hy", "ne", "mn", "bs", "kk", "sq", "sw", "gl", "mr", "pa", "si",
    "km", "sn", "yo", "so", "af", "oc", "ka", "be", "tg", "sd", "gu", "am", "yi", "lo", "uz", "fo",
    "ht", "ps", "tk", "nn", "mt", "sa", "lb", "my", "bo", "tl", "mg", "as", "tt", "haw", "ln", "ha",
    "ba", "jw", "su",
];

/// Special tokens that frame every decoder prompt.
#[cfg(any(feature = "candle", test))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PromptTokens {
    sot: u32,
    transcribe: u32,
    no_timestamps: u32,
}

#[cfg(any(feature = "candle", test))]
impl PromptTokens {
    /// `<|startoftranscript|> [<|lang|>] <|transcribe|> <|notimestamps|>`
    fn build(&self, language: Option<u32>) -> Vec<u32> {
        let mut tokens = vec![self.sot];
        tokens.extend(language);
        tokens.push(self.transcribe);
        tokens.push(self.no_timestamps);
        tokens
    }
}

/// Language tokens present in the vocabulary, paired with their codes.
///
/// Empty for English-only checkpoints.
#[cfg(any(feature = "candle", test))]
fn language_tokens(lookup: impl Fn(&str) -> Option<u32>) -> Vec<(&'static str, u32)> {
    WHISPER_LANGUAGES
        .iter()
        .filter_map(|code| lookup(&format!("<|{code}|>")).map(|id| (*code, id)))
        .collect()
}

/// Best-scoring language; `logits` is indexed by token id.
#[cfg(any(feature = "candle", test))]
fn pick_language(candidates: &[(&'static str, u32)], logits: &[f32]) -> Option<(&'static str, u32)> {
    candidates
        .iter()
        .filter_map(|&(code, id)| logits.get(id as usize).map(|&score| (code, id, score)))
        .fold(None, |best: Option<(&'static str, u32, f32)>, candidate| match best {
            Some(b) if b.2 >= candidate.2 => Some(b),
            _ => Some(candidate),
        })
        .map(|(code, id, _)| (code, id))
}

#[cfg(feature = "candle")]
fn load_error(message: String) -> MinutesError {
    MinutesError::ModelLoad { message }
}

#[cfg(feature = "candle")]
fn inference_error(message: String) -> MinutesError {
    MinutesError::TranscriptionFailed { message }
}

#[cfg(feature = "candle")]
pub struct CandleWhisperTranscriber {
    model: Mutex<m::model::Whisper>,
    tokenizer: Tokenizer,
    prompt: PromptTokens,
    languages: Vec<(&'static str, u32)>,
    config: Config,
    device: Device,
    mel_filters: Vec<f32>,
    model_name: String,
}

#[cfg(feature = "candle")]
impl std::fmt::Debug for CandleWhisperTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleWhisperTranscriber")
            .field("model_name", &self.model_name)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

/// Stub used when the `candle` feature is disabled.
#[cfg(not(feature = "candle"))]
#[derive(Debug)]
pub struct CandleWhisperTranscriber {
    model_name: String,
}

#[cfg(feature = "candle")]
impl CandleWhisperTranscriber {
    /// Fetch (or reuse from the HF cache) and load a Whisper checkpoint.
    pub fn new(hf_repo: &str) -> Result<Self> {
        let device = Device::Cpu;

        tracing::info!(device = ?device, model = hf_repo, "Initializing candle Whisper engine");

        let api = Api::new().map_err(|e| load_error(e.to_string()))?;
        let repo = api.repo(Repo::new(hf_repo.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .map_err(|e| load_error(format!("config.json: {e}")))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| load_error(format!("tokenizer.json: {e}")))?;
        let weights_path = repo
            .get("model.safetensors")
            .map_err(|e| load_error(format!("model.safetensors: {e}")))?;
        let mel_path = api
            .repo(Repo::new(MEL_FILTERS_REPO.to_string(), RepoType::Model))
            .get("melfilters.bytes")
            .map_err(|e| load_error(format!("melfilters.bytes: {e}")))?;

        let config: Config = serde_json::from_str(&std::fs::read_to_string(&config_path)?)
            .map_err(|e| load_error(format!("parse config: {e}")))?;
        let tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(|e| load_error(format!("tokenizer: {e}")))?;
        let mel_filters = read_mel_filters(&std::fs::read(&mel_path)?, &config)?;

        // SAFETY: safetensors files are memory-mapped read-only
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], m::DTYPE, &device)
                .map_err(|e| load_error(format!("weights: {e}")))?
        };
        let model = m::model::Whisper::load(&vb, config.clone())
            .map_err(|e| load_error(format!("model: {e}")))?;

        let special = |token: &str| {
            tokenizer
                .token_to_id(token)
                .ok_or_else(|| load_error(format!("token not found: {token}")))
        };
        let prompt = PromptTokens {
            sot: special(m::SOT_TOKEN)?,
            transcribe: special(m::TRANSCRIBE_TOKEN)?,
            no_timestamps: special(m::NO_TIMESTAMPS_TOKEN)?,
        };
        let languages = language_tokens(|t| tokenizer.token_to_id(t));

        tracing::info!(
            model = hf_repo,
            multilingual = !languages.is_empty(),
            "Candle Whisper engine loaded"
        );

        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            prompt,
            languages,
            config,
            device,
            mel_filters,
            model_name: hf_repo.to_string(),
        })
    }

    fn token_id(&self, token: &str) -> Result<u32> {
        self.tokenizer
            .token_to_id(token)
            .ok_or_else(|| inference_error(format!("token not found: {token}")))
    }

    /// Language token and code for this run.
    ///
    /// A fixed language is used as given. Otherwise multilingual checkpoints
    /// detect it from the first window, as Whisper was trained to; English-only
    /// checkpoints have no language tokens and always transcribe English.
    fn resolve_language(
        &self,
        model: &mut m::model::Whisper,
        first_window: Option<&Tensor>,
        options: &DecodeOptions,
    ) -> Result<(Option<u32>, Option<String>)> {
        if let Some(code) = options.language.as_deref() {
            let token = self.tokenizer.token_to_id(&format!("<|{code}|>"));
            return Ok((token, Some(code.to_string())));
        }
        if self.languages.is_empty() {
            return Ok((None, Some("en".to_string())));
        }
        let Some(mel) = first_window else {
            return Ok((None, None));
        };
        let (code, id) = self.detect_language(model, mel)?;
        tracing::debug!(language = code, "Detected language");
        Ok((Some(id), Some(code.to_string())))
    }

    /// One decoder step on `<|startoftranscript|>`, then argmax over the
    /// language tokens.
    fn detect_language(
        &self,
        model: &mut m::model::Whisper,
        mel: &Tensor,
    ) -> Result<(&'static str, u32)> {
        let err = |e: candle_core::Error| inference_error(e.to_string());

        let audio_features = model.encoder.forward(mel, true).map_err(err)?;
        let input = Tensor::new(&[[self.prompt.sot]], &self.device).map_err(err)?;
        let logits = model
            .decoder
            .forward(&input, &audio_features, true)
            .and_then(|h| h.squeeze(0))
            .and_then(|h| model.decoder.final_linear(&h))
            .and_then(|l| l.get(0))
            .and_then(|l| l.to_vec1::<f32>());
        model.reset_kv_cache();
        let logits = logits.map_err(err)?;

        pick_language(&self.languages, &logits)
            .ok_or_else(|| inference_error("language detection found no candidate".to_string()))
    }

    /// Greedy decode of one window; the KV cache is reset afterwards so
    /// windows never condition on each other.
    fn decode_window(
        &self,
        model: &mut m::model::Whisper,
        mel: &Tensor,
        prompt: &[u32],
        cancel: &CancelFlag,
    ) -> Result<String> {
        let eot = self.token_id(m::EOT_TOKEN)?;
        let err = |e: candle_core::Error| inference_error(e.to_string());

        let audio_features = model.encoder.forward(mel, true).map_err(err)?;
        let mut tokens = prompt.to_vec();

        for step in 0..MAX_TOKENS_PER_WINDOW {
            if cancel.is_cancelled() {
                model.reset_kv_cache();
                return Err(MinutesError::Cancelled);
            }
            let input = Tensor::new(tokens.as_slice(), &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(err)?;
            let hidden = model
                .decoder
                .forward(&input, &audio_features, step == 0)
                .map_err(err)?;
            let logits = hidden
                .squeeze(0)
                .and_then(|h| model.decoder.final_linear(&h))
                .map_err(err)?;
            let last = logits.dim(0).map_err(err)?.saturating_sub(1);
            let next = logits
                .get(last)
                .and_then(|l| l.argmax(0))
                .and_then(|t| t.to_scalar::<u32>())
                .map_err(err)?;

            if next == eot {
                break;
            }
            tokens.push(next);
        }

        model.reset_kv_cache();

        self.tokenizer
            .decode(&tokens[prompt.len()..], true)
            .map(|t| t.trim().to_string())
            .map_err(|e| inference_error(format!("detokenize: {e}")))
    }
}

#[cfg(not(feature = "candle"))]
impl CandleWhisperTranscriber {
    /// Always fails: this build has no candle.
    pub fn new(hf_repo: &str) -> Result<Self> {
        Err(MinutesError::ModelLoad {
            message: format!("cannot load {hf_repo}: built without the `candle` feature"),
        })
    }
}

#[cfg(feature = "candle")]
impl Transcriber for CandleWhisperTranscriber {
    fn transcribe(&self, audio_path: &Path, options: &DecodeOptions) -> Result<RawTranscription> {
        let pcm = crate::audio::decode::decode_file(audio_path)?;
        options.cancel.check()?;

        let n_mel = self.config.num_mel_bins;
        let mut mels = Vec::new();
        for chunk in pcm.chunks(m::N_SAMPLES) {
            let mut samples = chunk.to_vec();
            samples.resize(m::N_SAMPLES, 0.0);

            let mel = m::audio::pcm_to_mel(&self.config, &samples, &self.mel_filters);
            let frames = mel.len() / n_mel;
            let tensor = Tensor::from_vec(mel, (1, n_mel, frames), &self.device)
                .map_err(|e| inference_error(format!("mel tensor: {e}")))?;
            mels.push(tensor);
        }

        let mut model = self
            .model
            .lock()
            .map_err(|e| inference_error(format!("Failed to acquire model lock: {e}")))?;

        let (language_token, language) = self.resolve_language(&mut model, mels.first(), options)?;
        let prompt = self.prompt.build(language_token);

        let mut parts = Vec::with_capacity(mels.len());
        for (window, mel) in mels.iter().enumerate() {
            options.cancel.check()?;
            tracing::debug!(window, "Decoding audio window");
            let text = self.decode_window(&mut model, mel, &prompt, &options.cancel)?;
            if !text.is_empty() {
                parts.push(text);
            }
        }

        Ok(RawTranscription::Text {
            text: parts.join(" "),
            language,
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(not(feature = "candle"))]
impl Transcriber for CandleWhisperTranscriber {
    fn transcribe(&self, _audio_path: &Path, _options: &DecodeOptions) -> Result<RawTranscription> {
        Err(MinutesError::TranscriptionFailed {
            message: "Candle feature not enabled. Rebuild with --features candle".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(feature = "candle")]
fn read_mel_filters(bytes: &[u8], config: &Config) -> Result<Vec<f32>> {
    let expected_len = config.num_mel_bins * (m::N_FFT / 2 + 1);
    if bytes.len() < expected_len * 4 {
        return Err(load_error(format!(
            "mel filters file too small: {} bytes, expected at least {}",
            bytes.len(),
            expected_len * 4
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .take(expected_len)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
