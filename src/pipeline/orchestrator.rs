//! Sequential pipeline: transcription, then summary, then action items.

use crate::audio::{AudioCeiling, AudioInput};
use crate::backend::registry::BackendRegistry;
use crate::config::Config;
use crate::defaults;
use crate::error::{MinutesError, Result};
use crate::extraction::{ActionItemStage, ExtractionRules, SummarizationStage};
use crate::pipeline::cancel::CancelFlag;
use crate::pipeline::types::{
    ActionItem, PipelineResult, StageMethod, StageOutput, StageReport, StageReports, Summary,
    Transcript,
};
use crate::stt::{DecodeOptions, TranscriptionStage};
use std::sync::Arc;
use std::time::Instant;

/// The assembled stages, sharing one backend registry.
#[derive(Debug, Clone)]
pub struct Pipeline {
    registry: Arc<BackendRegistry>,
    rules: Arc<ExtractionRules>,
    transcription: TranscriptionStage,
    summarization: SummarizationStage,
    action_items: ActionItemStage,
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

impl Pipeline {
    pub fn new(registry: Arc<BackendRegistry>, config: &Config) -> Self {
        let rules = Arc::new(config.rules.clone());
        let transcription = TranscriptionStage::new(
            registry.clone(),
            AudioCeiling::from_mb(config.stt.max_audio_mb),
            DecodeOptions::from_language(&config.stt.language, config.stt.threads),
        );
        Self {
            summarization: SummarizationStage::new(registry.clone(), rules.clone()),
            action_items: ActionItemStage::new(registry.clone(), rules.clone()),
            transcription,
            registry,
            rules,
        }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Transcription only.
    pub fn transcribe(&self, input: &AudioInput) -> Result<Transcript> {
        self.transcribe_with(input, &CancelFlag::new())
    }

    pub fn transcribe_with(&self, input: &AudioInput, cancel: &CancelFlag) -> Result<Transcript> {
        self.transcription.transcribe_with(input, cancel)
    }

    /// Run every stage on uploaded audio.
    ///
    /// Only a transcription failure is returned as an error; the later
    /// stages always yield a value.
    pub fn run(&self, input: &AudioInput) -> Result<PipelineResult> {
        self.run_with(input, &CancelFlag::new())
    }

    /// Like [`run`](Self::run), but returns `Cancelled` as soon as the
    /// current stage notices `cancel`.
    pub fn run_with(&self, input: &AudioInput, cancel: &CancelFlag) -> Result<PipelineResult> {
        tracing::info!(
            filename = input.filename(),
            bytes = input.len(),
            "Processing audio"
        );

        let start = Instant::now();
        let transcript = self
            .transcription
            .transcribe_with(input, cancel)
            .inspect_err(|e| {
                tracing::error!(error = %e, "Transcription failed");
            })?;
        let transcription_ms = elapsed_ms(start);
        tracing::info!(elapsed_ms = transcription_ms, "Transcription stage done");

        cancel.check()?;
        let mut result = self.downstream(transcript, cancel);
        cancel.check()?;
        result.engine = Some(self.registry.engine());
        result.stages.transcription = Some(StageReport::succeeded(
            StageMethod::Model,
            transcription_ms,
        ));
        Ok(result)
    }

    /// Summary and action items for an existing transcript.
    pub fn analyze(&self, transcript: Transcript) -> Result<PipelineResult> {
        self.analyze_with(transcript, &CancelFlag::new())
    }

    pub fn analyze_with(&self, transcript: Transcript, cancel: &CancelFlag) -> Result<PipelineResult> {
        if transcript.is_blank() {
            return Err(MinutesError::EmptyInput);
        }
        let result = self.downstream(transcript, cancel);
        cancel.check()?;
        Ok(result)
    }

    fn downstream(&self, transcript: Transcript, cancel: &CancelFlag) -> PipelineResult {
        let start = Instant::now();
        let (summary, summarization) = absorb(
            self.summarization.summarize_with(&transcript, cancel),
            start,
            || Summary::new(defaults::EMPTY_SUMMARY_PLACEHOLDER),
        );
        tracing::info!(
            elapsed_ms = summarization.elapsed_ms,
            status = ?summarization.status,
            "Summarization stage done"
        );

        let start = Instant::now();
        let (action_items, action_report) = absorb(
            self.action_items.extract_action_items_with(&transcript, cancel),
            start,
            || {
                self.rules
                    .default_items()
                    .into_iter()
                    .map(ActionItem::new)
                    .collect()
            },
        );
        tracing::info!(
            elapsed_ms = action_report.elapsed_ms,
            status = ?action_report.status,
            items = action_items.len(),
            "Action-item stage done"
        );

        PipelineResult {
            transcript,
            summary,
            action_items,
            engine: None,
            stages: StageReports {
                transcription: None,
                summarization,
                action_items: action_report,
            },
        }
    }
}

/// Turn a stage error into a `failed` report with a substitute value.
fn absorb<T>(
    outcome: Result<StageOutput<T>>,
    start: Instant,
    substitute: impl FnOnce() -> T,
) -> (T, StageReport) {
    let elapsed = elapsed_ms(start);
    match outcome {
        Ok(output) => output.into_parts(elapsed),
        Err(e) => {
            tracing::warn!(error = %e, "Stage failed, substituting placeholder");
            (substitute(), StageReport::failed(e.to_string(), elapsed))
        }
    }
}
