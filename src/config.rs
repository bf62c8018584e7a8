use crate::defaults;
use crate::error::{MinutesError, Result};
use crate::extraction::rules::ExtractionRules;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub stt: SttConfig,
    pub extraction: ExtractionConfig,
    pub rules: ExtractionRules,
    pub notion: NotionConfig,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    /// Whisper model name from the catalog (e.g. "tiny", "base.en")
    pub model: String,
    /// Largest model allowed; bigger requests are clamped to this size class
    pub max_model: String,
    /// Language code, or "auto" to detect
    pub language: String,
    /// Inference thread cap (None = engine default)
    pub threads: Option<usize>,
    /// Directory holding ggml files for the fast engine
    pub model_dir: PathBuf,
    /// Upload ceiling in megabytes
    pub max_audio_mb: f64,
    /// Refuse to start when no transcription engine loads
    pub require_backend: bool,
}

/// Summarization and action-item configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Load a model for summaries. Off by default: it rarely fits next to
    /// Whisper on a small host, and the extractive summary is free.
    pub summarization_enabled: bool,
    pub action_items_enabled: bool,
    pub summarization_model: String,
    pub action_items_model: String,
}

/// Notion export credentials
#[derive(Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct NotionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,
}

impl std::fmt::Debug for NotionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("database_id", &self.database_id)
            .finish()
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_MODEL.to_string(),
            max_model: defaults::DEFAULT_MAX_MODEL.to_string(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
            model_dir: PathBuf::from(defaults::DEFAULT_MODEL_DIR),
            max_audio_mb: defaults::MAX_AUDIO_MB,
            require_backend: false,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            summarization_enabled: false,
            action_items_enabled: true,
            summarization_model: defaults::DEFAULT_GENERATOR_MODEL.to_string(),
            action_items_model: defaults::DEFAULT_GENERATOR_MODEL.to_string(),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MinutesError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                MinutesError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults only when the file is missing
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(MinutesError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - MINUTES_MODEL → stt.model
    /// - MINUTES_LANGUAGE → stt.language
    /// - MINUTES_MAX_AUDIO_MB → stt.max_audio_mb
    /// - MINUTES_ENABLE_SUMMARIZATION → extraction.summarization_enabled
    /// - NOTION_TOKEN → notion.token
    /// - NOTION_DATABASE_ID → notion.database_id
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(model) = non_empty_env("MINUTES_MODEL") {
            self.stt.model = model;
        }

        if let Some(language) = non_empty_env("MINUTES_LANGUAGE") {
            self.stt.language = language;
        }

        if let Some(raw) = non_empty_env("MINUTES_MAX_AUDIO_MB") {
            match raw.trim().parse::<f64>() {
                Ok(mb) => self.stt.max_audio_mb = mb,
                Err(_) => tracing::warn!(value = %raw, "Ignoring unparsable MINUTES_MAX_AUDIO_MB"),
            }
        }

        if let Some(raw) = non_empty_env("MINUTES_ENABLE_SUMMARIZATION") {
            match parse_flag(&raw) {
                Some(enabled) => self.extraction.summarization_enabled = enabled,
                None => tracing::warn!(
                    value = %raw,
                    "Ignoring unparsable MINUTES_ENABLE_SUMMARIZATION"
                ),
            }
        }

        if let Some(token) = non_empty_env("NOTION_TOKEN") {
            self.notion.token = Some(token);
        }

        if let Some(database_id) = non_empty_env("NOTION_DATABASE_ID") {
            self.notion.database_id = Some(database_id);
        }

        self
    }

    /// Reject values no run could succeed with.
    ///
    /// Unknown model names are not errors here: the loader degrades on them.
    pub fn validate(&self) -> Result<()> {
        if !self.stt.max_audio_mb.is_finite() || self.stt.max_audio_mb <= 0.0 {
            return Err(MinutesError::ConfigInvalidValue {
                key: "stt.max_audio_mb".to_string(),
                message: format!("must be a positive number, got {}", self.stt.max_audio_mb),
            });
        }
        if self.stt.threads == Some(0) {
            return Err(MinutesError::ConfigInvalidValue {
                key: "stt.threads".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        self.rules.validate()
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/minutes/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("minutes").join("config.toml"))
            .ok_or_else(|| MinutesError::Other("Could not determine config directory".to_string()))
    }

    /// TOML rendering for display, with the Notion token masked.
    pub fn to_display_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.notion.token.is_some() {
            shown.notion.token = Some("<redacted>".to_string());
        }
        toml::to_string_pretty(&shown)
            .map_err(|e| MinutesError::Other(format!("Failed to render config: {e}")))
    }
}
