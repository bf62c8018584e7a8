//! Fast transcription engine backed by whisper.cpp.
//!
//! # Feature Gate
//!
//! The real engine requires the `whisper` feature (and cmake to build it).
//! Without it, `WhisperTranscriber::new` always fails so the loader moves on
//! to the next engine.

use crate::error::{MinutesError, Result};
use crate::stt::transcriber::{DecodeOptions, RawTranscription, Transcriber};
use std::path::{Path, PathBuf};

#[cfg(feature = "whisper")]
use crate::stt::transcriber::Segment;
#[cfg(feature = "whisper")]
use std::sync::{Mutex, Once};
#[cfg(feature = "whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Whisper.cpp transcriber.
///
/// The WhisperContext is wrapped in a Mutex; one inference runs at a time.
#[cfg(feature = "whisper")]
pub struct WhisperTranscriber {
    context: Mutex<WhisperContext>,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl std::fmt::Debug for WhisperTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperTranscriber")
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

/// Stub used when the `whisper` feature is disabled.
#[cfg(not(feature = "whisper"))]
#[derive(Debug)]
pub struct WhisperTranscriber {
    model_name: String,
}

/// Resolve the ggml file for a catalog model inside `model_dir`.
pub fn model_path(model_dir: &Path, ggml_filename: &str) -> PathBuf {
    model_dir.join(ggml_filename)
}

fn model_name_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.trim_start_matches("ggml-"))
        .unwrap_or("unknown")
        .to_string()
}

fn ensure_model_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(MinutesError::ModelNotFound {
            path: path.to_string_lossy().to_string(),
        });
    }
    Ok(())
}

#[cfg(feature = "whisper")]
impl WhisperTranscriber {
    /// Load a ggml model file.
    ///
    /// # Errors
    /// `ModelNotFound` if the file is missing, `ModelLoad` if whisper.cpp rejects it.
    pub fn new(path: &Path) -> Result<Self> {
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        ensure_model_exists(path)?;
        let model_name = model_name_from_path(path);

        let path_str = path.to_str().ok_or_else(|| MinutesError::ModelLoad {
            message: "Invalid UTF-8 in model path".to_string(),
        })?;
        let context = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| MinutesError::ModelLoad {
                message: format!("Failed to load Whisper model: {}", e),
            })?;

        tracing::info!(model = %model_name, path = %path.display(), "Loaded whisper.cpp model");

        Ok(Self {
            context: Mutex::new(context),
            model_name,
        })
    }

    fn inference_error(message: String) -> MinutesError {
        MinutesError::TranscriptionFailed { message }
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperTranscriber {
    /// Always fails: this build has no whisper.cpp.
    pub fn new(path: &Path) -> Result<Self> {
        ensure_model_exists(path)?;
        Err(MinutesError::ModelLoad {
            message: format!(
                "cannot load {}: built without the `whisper` feature",
                model_name_from_path(path)
            ),
        })
    }
}

#[cfg(feature = "whisper")]
impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, audio_path: &Path, options: &DecodeOptions) -> Result<RawTranscription> {
        let audio = crate::audio::decode::decode_file(audio_path)?;

        let context = self
            .context
            .lock()
            .map_err(|e| Self::inference_error(format!("Failed to acquire context lock: {}", e)))?;

        let mut state = context
            .create_state()
            .map_err(|e| Self::inference_error(format!("Failed to create Whisper state: {}", e)))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(options.language.as_deref());
        if let Some(threads) = options.threads {
            params.set_n_threads(threads as i32);
        }

        // Deterministic and memory-thrifty: no fallback sampling, no carried context
        params.set_temperature(0.0);
        params.set_temperature_inc(0.0);
        params.set_no_context(true);

        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        // whisper.cpp polls this between encoder/decoder steps
        let cancel = options.cancel.clone();
        params.set_abort_callback_safe(move || cancel.is_cancelled());

        options.cancel.check()?;
        let outcome = state.full(params, &audio);
        options.cancel.check()?;
        outcome.map_err(|e| Self::inference_error(format!("Whisper inference failed: {}", e)))?;

        let language = if options.language.is_some() {
            options.language.clone()
        } else {
            whisper_rs::get_lang_str(state.full_lang_id_from_state()).map(str::to_string)
        };

        // Timestamps are in centiseconds
        let segments = state
            .as_iter()
            .map(|segment| Segment {
                start_ms: segment.start_timestamp().max(0) as u64 * 10,
                end_ms: segment.end_timestamp().max(0) as u64 * 10,
                text: segment.to_string(),
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            segments = segments.len(),
            language = language.as_deref().unwrap_or("unknown"),
            "whisper.cpp inference finished"
        );

        Ok(RawTranscription::Segments { segments, language })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(not(feature = "whisper"))]
impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, _audio_path: &Path, _options: &DecodeOptions) -> Result<RawTranscription> {
        Err(MinutesError::TranscriptionFailed {
            message: "Whisper feature not enabled. Rebuild with --features whisper".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
