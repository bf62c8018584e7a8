//! Which backends are loaded for each stage.
//!
//! Built once by the loader, then shared read-only behind an `Arc`.

use crate::extraction::generator::TextGenerator;
use crate::stt::transcriber::Transcriber;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Transcription engine in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// whisper.cpp via whisper-rs
    Fast,
    /// Reference Whisper via candle
    Standard,
    None,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EngineKind::Fast => "fast",
            EngineKind::Standard => "standard",
            EngineKind::None => "none",
        })
    }
}

#[derive(Clone)]
pub struct BackendRegistry {
    engine: EngineKind,
    transcriber: Option<Arc<dyn Transcriber>>,
    summarizer: Option<Arc<dyn TextGenerator>>,
    action_extractor: Option<Arc<dyn TextGenerator>>,
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("engine", &self.engine)
            .field("transcriber", &self.transcriber.as_ref().map(|t| t.model_name()))
            .field("summarizer", &self.summarizer.as_ref().map(|g| g.model_name()))
            .field(
                "action_extractor",
                &self.action_extractor.as_ref().map(|g| g.model_name()),
            )
            .finish()
    }
}

/// Snapshot of loaded backends for health reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub transcription_loaded: bool,
    pub transcription_engine: EngineKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription_model: Option<String>,
    pub summarizer_loaded: bool,
    pub action_extractor_loaded: bool,
}

impl BackendRegistry {
    /// Nothing loaded; every stage runs on its fallback.
    pub fn empty() -> Self {
        Self {
            engine: EngineKind::None,
            transcriber: None,
            summarizer: None,
            action_extractor: None,
        }
    }

    pub fn with_transcriber(mut self, engine: EngineKind, transcriber: Arc<dyn Transcriber>) -> Self {
        if engine == EngineKind::None {
            self.engine = EngineKind::None;
            self.transcriber = None;
        } else {
            self.engine = engine;
            self.transcriber = Some(transcriber);
        }
        self
    }

    pub fn with_summarizer(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.summarizer = Some(generator);
        self
    }

    pub fn with_action_extractor(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.action_extractor = Some(generator);
        self
    }

    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    pub fn transcriber(&self) -> Option<&Arc<dyn Transcriber>> {
        self.transcriber.as_ref()
    }

    pub fn summarizer(&self) -> Option<&Arc<dyn TextGenerator>> {
        self.summarizer.as_ref()
    }

    pub fn action_extractor(&self) -> Option<&Arc<dyn TextGenerator>> {
        self.action_extractor.as_ref()
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            transcription_loaded: self.transcriber.is_some(),
            transcription_engine: self.engine,
            transcription_model: self.transcriber.as_ref().map(|t| t.model_name().to_string()),
            summarizer_loaded: self.summarizer.is_some(),
            action_extractor_loaded: self.action_extractor.is_some(),
        }
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::empty()
    }
}
