//! Summarization stage.

use crate::backend::registry::BackendRegistry;
use crate::defaults;
use crate::error::{MinutesError, Result};
use crate::extraction::generator::GenerationParams;
use crate::extraction::prompt::summary_prompt;
use crate::extraction::rules::ExtractionRules;
use crate::pipeline::cancel::CancelFlag;
use crate::pipeline::types::{StageOutput, Summary, Transcript};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SummarizationStage {
    registry: Arc<BackendRegistry>,
    rules: Arc<ExtractionRules>,
    params: GenerationParams,
}

impl SummarizationStage {
    pub fn new(registry: Arc<BackendRegistry>, rules: Arc<ExtractionRules>) -> Self {
        Self {
            registry,
            rules,
            params: GenerationParams::new(
                defaults::SUMMARY_MIN_TOKENS,
                defaults::SUMMARY_MAX_TOKENS,
            ),
        }
    }

    /// Summarise a transcript.
    ///
    /// Only a blank transcript is an error. A model failure falls back to the
    /// extractive summary and is reported in the note.
    pub fn summarize(&self, transcript: &Transcript) -> Result<StageOutput<Summary>> {
        self.summarize_with(transcript, &CancelFlag::new())
    }

    /// Like [`summarize`](Self::summarize), giving up once `cancel` is set.
    pub fn summarize_with(
        &self,
        transcript: &Transcript,
        cancel: &CancelFlag,
    ) -> Result<StageOutput<Summary>> {
        if transcript.is_blank() {
            return Err(MinutesError::EmptyInput);
        }
        let text = transcript.text();

        let Some(generator) = self.registry.summarizer() else {
            tracing::debug!("No summarization model loaded, using extractive summary");
            return Ok(StageOutput::rules(
                Summary::new(self.rules.extractive_summary(text)),
                "summarization model not loaded",
            ));
        };

        let params = self.params.clone().with_cancel(cancel.clone());
        match generator.generate(&summary_prompt(text), &params) {
            Ok(generated) if generated.trim().is_empty() => {
                tracing::warn!(model = generator.model_name(), "Summarization model returned nothing");
                Ok(StageOutput::placeholder(
                    Summary::new(defaults::EMPTY_SUMMARY_PLACEHOLDER),
                    "model returned an empty summary",
                ))
            }
            Ok(generated) => Ok(StageOutput::model(Summary::new(generated.trim()))),
            Err(MinutesError::Cancelled) => Err(MinutesError::Cancelled),
            Err(e) => {
                tracing::warn!(
                    model = generator.model_name(),
                    error = %e,
                    "Summarization model failed, using extractive summary"
                );
                Ok(StageOutput::rules(
                    Summary::new(self.rules.extractive_summary(text)),
                    format!("summarization model failed: {e}"),
                ))
            }
        }
    }
}
