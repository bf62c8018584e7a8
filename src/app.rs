//! Command handlers behind the CLI.
//!
//! Loads configuration, builds the backend registry once, and runs the
//! blocking pipeline off the async runtime.

use crate::audio::{AudioCeiling, AudioInput};
use crate::backend::{BackendFactory, load_registry};
use crate::config::Config;
use crate::error::{MinutesError, Result};
use crate::export::{ExportReceipt, MeetingNotes};
use crate::pipeline::{CancelFlag, Pipeline, PipelineResult, Transcript};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// CLI flags that override file and environment settings.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub language: Option<String>,
    pub max_audio_mb: Option<f64>,
    pub summarize: bool,
    pub strict: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.stt.model = model.clone();
        }
        if let Some(language) = &self.language {
            config.stt.language = language.clone();
        }
        if let Some(mb) = self.max_audio_mb {
            config.stt.max_audio_mb = mb;
        }
        if self.summarize {
            config.extraction.summarization_enabled = true;
        }
        if self.strict {
            config.stt.require_backend = true;
        }
    }
}

/// The file an explicit `--config` names, or the default location.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::default_path(),
    }
}

/// Layer file, environment and CLI settings, then validate.
///
/// An explicitly named file must exist; the default one may be absent.
pub fn load_config(explicit: Option<&Path>, overrides: &Overrides) -> Result<Config> {
    let config = match explicit {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path()?)?,
    };
    let mut config = config.with_env_overrides();
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// Load backends once and assemble the pipeline around them.
pub fn build_pipeline(config: &Config, factory: &dyn BackendFactory) -> Result<Pipeline> {
    let registry = load_registry(config, factory)?;
    Ok(Pipeline::new(Arc::new(registry), config))
}

/// Run blocking work on the blocking pool, optionally bounded in time.
///
/// The work receives a [`CancelFlag`] that is set when the limit passes.
/// Engines poll it between decode steps, so the blocking task returns soon
/// after the timeout and the runtime can shut down.
pub async fn run_blocking<T, F>(timeout: Option<Duration>, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(CancelFlag) -> Result<T> + Send + 'static,
{
    let cancel = CancelFlag::new();
    let handle = tokio::task::spawn_blocking({
        let cancel = cancel.clone();
        move || work(cancel)
    });
    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, handle).await {
            Ok(joined) => joined,
            Err(_) => {
                cancel.cancel();
                tracing::warn!(limit = %humantime::format_duration(limit), "Run timed out, cancelling");
                return Err(MinutesError::Other(format!(
                    "Timed out after {}",
                    humantime::format_duration(limit)
                )));
            }
        },
        None => handle.await,
    };
    joined.map_err(|e| MinutesError::Other(format!("Pipeline task failed: {e}")))?
}

/// Read an audio file, rejecting oversize files before loading them.
pub fn read_audio(path: &Path, ceiling: AudioCeiling) -> Result<AudioInput> {
    let size = std::fs::metadata(path)?.len();
    ceiling.check_size(size)?;
    AudioInput::from_file(path)
}

/// Full pipeline on an audio file.
pub async fn process_file(
    pipeline: Arc<Pipeline>,
    config: &Config,
    path: &Path,
    timeout: Option<Duration>,
) -> Result<PipelineResult> {
    let input = read_audio(path, AudioCeiling::from_mb(config.stt.max_audio_mb))?;
    run_blocking(timeout, move |cancel| pipeline.run_with(&input, &cancel)).await
}

/// Transcription only.
pub async fn transcribe_file(
    pipeline: Arc<Pipeline>,
    config: &Config,
    path: &Path,
    timeout: Option<Duration>,
) -> Result<Transcript> {
    let input = read_audio(path, AudioCeiling::from_mb(config.stt.max_audio_mb))?;
    run_blocking(timeout, move |cancel| pipeline.transcribe_with(&input, &cancel)).await
}

/// Summary and action items for transcript text.
pub async fn analyze_text(
    pipeline: Arc<Pipeline>,
    text: String,
    timeout: Option<Duration>,
) -> Result<PipelineResult> {
    run_blocking(timeout, move |cancel| {
        pipeline.analyze_with(Transcript::new(text, None), &cancel)
    })
    .await
}

/// Contents of `file`, or all of stdin when absent.
pub fn read_text(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

/// `transcript` as written by `process --json` or as a plain string.
#[derive(Deserialize)]
#[serde(untagged)]
enum TranscriptField {
    Text(String),
    Object { text: String },
}

#[derive(Deserialize)]
struct NotesDocument {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    transcript: Option<TranscriptField>,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    action_items: Vec<String>,
}

/// Parse notes JSON: either `MeetingNotes` or a `process --json` result.
pub fn parse_notes(json: &str, title: Option<String>) -> Result<MeetingNotes> {
    let document: NotesDocument = serde_json::from_str(json)
        .map_err(|e| MinutesError::Other(format!("Invalid notes JSON: {e}")))?;
    let transcript = match document.transcript {
        Some(TranscriptField::Text(text)) | Some(TranscriptField::Object { text }) => text,
        None => String::new(),
    };
    Ok(MeetingNotes {
        title: title.or(document.title),
        transcript,
        summary: document.summary,
        action_items: document.action_items,
    })
}

#[cfg(feature = "notion")]
fn notion_exporter(config: &Config) -> Result<crate::export::notion::NotionExporter> {
    crate::export::notion::NotionExporter::from_config(&config.notion)
}

/// Create a page for `notes` in the configured notes service.
#[cfg(feature = "notion")]
pub async fn export_notes(config: &Config, notes: &MeetingNotes) -> Result<ExportReceipt> {
    use crate::export::NotesExporter;
    notion_exporter(config)?.export(notes).await
}

#[cfg(not(feature = "notion"))]
pub async fn export_notes(_config: &Config, notes: &MeetingNotes) -> Result<ExportReceipt> {
    notes.validate()?;
    Err(not_built())
}

/// Check the notes service credentials; returns the database title.
#[cfg(feature = "notion")]
pub async fn check_notion(config: &Config) -> Result<String> {
    use crate::export::NotesExporter;
    notion_exporter(config)?.verify().await
}

#[cfg(not(feature = "notion"))]
pub async fn check_notion(_config: &Config) -> Result<String> {
    Err(not_built())
}

#[cfg(not(feature = "notion"))]
fn not_built() -> MinutesError {
    MinutesError::ExportNotConfigured {
        message: "built without the 'notion' feature".to_string(),
    }
}
