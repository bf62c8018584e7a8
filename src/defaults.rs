//! Default configuration constants for minutes.
//!
//! Shared by the config types, the stages and the CLI so the same value is
//! never spelled twice.

/// Bytes in one megabyte, as used for the audio size ceiling.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Default audio upload ceiling in megabytes.
///
/// 5 MB keeps a whole request (upload, temp file, decoded PCM, model state)
/// inside the memory of a small free-tier host.
pub const MAX_AUDIO_MB: f64 = 5.0;

/// Default Whisper model name.
///
/// "tiny" (multilingual, ~75 MB) is the only size that reliably fits next to
/// a text-generation model on a 512 MB host.
pub const DEFAULT_MODEL: &str = "tiny";

/// Largest Whisper model class the loader will accept.
///
/// Requests above this are clamped down to the same class as the ceiling.
pub const DEFAULT_MAX_MODEL: &str = "base";

/// Default language code for transcription.
///
/// "auto" lets Whisper detect the spoken language automatically.
pub const DEFAULT_LANGUAGE: &str = "auto";

/// Language value that triggers automatic language detection.
pub const AUTO_LANGUAGE: &str = "auto";

/// Directory searched for ggml model files when none is configured.
pub const DEFAULT_MODEL_DIR: &str = "models";

/// Extension used when an upload has no usable filename extension.
pub const DEFAULT_AUDIO_EXTENSION: &str = "wav";

/// Sample rate expected by every Whisper engine.
pub const SAMPLE_RATE: u32 = 16000;

/// Default text-generation model for summaries and action items.
pub const DEFAULT_GENERATOR_MODEL: &str = "flan-t5-small";

/// Generation bounds for the summary prompt (new tokens).
pub const SUMMARY_MIN_TOKENS: usize = 10;
pub const SUMMARY_MAX_TOKENS: usize = 80;

/// Upper bound on generated tokens for the action-item prompt.
pub const ACTION_ITEMS_MAX_TOKENS: usize = 128;

/// Prompt tokens fed to the T5 encoder; the rest of the transcript is cut.
/// Encoder attention memory grows with the square of this.
pub const GENERATOR_MAX_INPUT_TOKENS: usize = 512;

/// Sentence units taken by the extractive summary.
pub const SUMMARY_SENTENCES: usize = 4;

/// Extractive summaries shorter than this are extended.
pub const SUMMARY_MIN_CHARS: usize = 200;

/// Sentence units taken when the short summary is extended.
pub const SUMMARY_EXTENDED_SENTENCES: usize = 6;

/// Returned when the summarization model produces nothing usable.
pub const EMPTY_SUMMARY_PLACEHOLDER: &str = "No summary could be generated for this transcript.";

/// Title used for exported notes when the caller gives none.
pub const DEFAULT_MEETING_TITLE: &str = "Untitled Meeting";

/// Notion REST endpoint and the API version the block layout targets.
pub const NOTION_API_URL: &str = "https://api.notion.com";
pub const NOTION_API_VERSION: &str = "2022-06-28";

/// Notion rejects rich-text runs longer than this many characters.
pub const NOTION_TEXT_LIMIT: usize = 2000;

/// Notion caps both a `children` array and a `rich_text` array at this length.
pub const NOTION_MAX_CHILDREN: usize = 100;
pub const NOTION_MAX_RICH_TEXT_RUNS: usize = 100;

/// Report the GPU backend compiled into this build.
///
/// Only affects the fast engine; candle models always run on the CPU.
pub fn gpu_backend() -> &'static str {
    if cfg!(feature = "cuda") {
        "CUDA"
    } else if cfg!(feature = "vulkan") {
        "Vulkan"
    } else {
        "CPU"
    }
}
