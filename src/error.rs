//! Error types for minutes.

use crate::defaults::BYTES_PER_MB;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinutesError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio input errors
    #[error(
        "File too large ({size:.1} MB). Maximum size is {limit:.1} MB",
        size = as_mb(.size_bytes),
        limit = as_mb(.limit_bytes)
    )]
    PayloadTooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error("No audio data provided")]
    EmptyAudio,

    #[error("Audio decoding failed: {message}")]
    AudioDecode { message: String },

    // Transcription errors
    #[error("Transcription backend unavailable: no speech model is loaded")]
    BackendUnavailable,

    #[error("Transcription failed: {message}")]
    TranscriptionFailed { message: String },

    #[error("Transcription returned empty result")]
    EmptyTranscription,

    #[error("Model not found at {path}")]
    ModelNotFound { path: String },

    #[error("Model loading failed: {message}")]
    ModelLoad { message: String },

    // Summarization / action-item errors
    #[error("No transcript provided")]
    EmptyInput,

    #[error("Text generation failed: {message}")]
    Generation { message: String },

    // Notes export errors
    #[error("Notes export not configured: {message}")]
    ExportNotConfigured { message: String },

    #[error("Notes export failed: {message}")]
    Export { message: String },

    #[error("Run cancelled")]
    Cancelled,

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

fn as_mb(bytes: &u64) -> f64 {
    *bytes as f64 / BYTES_PER_MB as f64
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, MinutesError>;
