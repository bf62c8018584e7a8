//! Values that flow between the pipeline stages.

use crate::backend::registry::EngineKind;
use serde::Serialize;

/// Recognised speech as one block of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcript {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
}

impl Transcript {
    pub fn new(text: impl Into<String>, language: Option<String>) -> Self {
        Self {
            text: text.into(),
            language,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Language tag reported by the engine, when it detected one.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Condensed form of a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Summary(String);

impl Summary {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single task extracted from a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ActionItem(String);

impl ActionItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActionItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a stage produced its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageMethod {
    /// A loaded model produced the value.
    Model,
    /// Deterministic rules produced the value.
    Rules,
    /// A fixed value was substituted.
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Succeeded,
    Degraded,
    Failed,
}

/// A stage value together with how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput<T> {
    pub value: T,
    pub method: StageMethod,
    /// Why the preferred method was not used, if it wasn't.
    pub note: Option<String>,
}

impl<T> StageOutput<T> {
    pub fn model(value: T) -> Self {
        Self {
            value,
            method: StageMethod::Model,
            note: None,
        }
    }

    pub fn rules(value: T, note: impl Into<String>) -> Self {
        Self {
            value,
            method: StageMethod::Rules,
            note: Some(note.into()),
        }
    }

    pub fn placeholder(value: T, note: impl Into<String>) -> Self {
        Self {
            value,
            method: StageMethod::Placeholder,
            note: Some(note.into()),
        }
    }

    /// Anything other than a model result counts as degraded.
    pub fn status(&self) -> StageStatus {
        match self.method {
            StageMethod::Model => StageStatus::Succeeded,
            StageMethod::Rules | StageMethod::Placeholder => StageStatus::Degraded,
        }
    }

    /// Split into the value and its report, stamping the elapsed time.
    pub fn into_parts(self, elapsed_ms: u64) -> (T, StageReport) {
        let report = StageReport {
            status: self.status(),
            method: Some(self.method),
            note: self.note,
            elapsed_ms,
        };
        (self.value, report)
    }
}

/// Outcome of one stage as shown to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<StageMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub elapsed_ms: u64,
}

impl StageReport {
    pub fn succeeded(method: StageMethod, elapsed_ms: u64) -> Self {
        Self {
            status: StageStatus::Succeeded,
            method: Some(method),
            note: None,
            elapsed_ms,
        }
    }

    /// The stage produced no value of its own.
    pub fn failed(note: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            status: StageStatus::Failed,
            method: None,
            note: Some(note.into()),
            elapsed_ms,
        }
    }
}

/// Per-stage reports. Transcription is absent when only text was analysed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReports {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription: Option<StageReport>,
    pub summarization: StageReport,
    pub action_items: StageReport,
}

/// Everything a pipeline run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    pub transcript: Transcript,
    pub summary: Summary,
    pub action_items: Vec<ActionItem>,
    /// Transcription engine that produced the transcript.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineKind>,
    pub stages: StageReports,
}

impl PipelineResult {
    /// Sum of the per-stage wall times.
    pub fn total_ms(&self) -> u64 {
        self.stages.transcription.as_ref().map_or(0, |r| r.elapsed_ms)
            + self.stages.summarization.elapsed_ms
            + self.stages.action_items.elapsed_ms
    }

    /// Whether any stage fell short of its preferred method.
    pub fn is_degraded(&self) -> bool {
        let stages = [
            self.stages.transcription.as_ref(),
            Some(&self.stages.summarization),
            Some(&self.stages.action_items),
        ];
        stages
            .into_iter()
            .flatten()
            .any(|r| r.status != StageStatus::Succeeded)
    }
}
