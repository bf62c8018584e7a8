//! Action-item extraction stage.

use crate::backend::registry::BackendRegistry;
use crate::defaults;
use crate::error::{MinutesError, Result};
use crate::extraction::generator::GenerationParams;
use crate::extraction::prompt::{action_items_prompt, parse_generated_items};
use crate::extraction::rules::ExtractionRules;
use crate::pipeline::cancel::CancelFlag;
use crate::pipeline::types::{ActionItem, StageOutput, Transcript};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ActionItemStage {
    registry: Arc<BackendRegistry>,
    rules: Arc<ExtractionRules>,
    params: GenerationParams,
}

impl ActionItemStage {
    pub fn new(registry: Arc<BackendRegistry>, rules: Arc<ExtractionRules>) -> Self {
        Self {
            registry,
            rules,
            params: GenerationParams::new(0, defaults::ACTION_ITEMS_MAX_TOKENS),
        }
    }

    /// Extract tasks from a transcript. The returned list is never empty.
    ///
    /// Order of preference: the model, then keyword rules, then the configured
    /// default items.
    pub fn extract_action_items(
        &self,
        transcript: &Transcript,
    ) -> Result<StageOutput<Vec<ActionItem>>> {
        self.extract_action_items_with(transcript, &CancelFlag::new())
    }

    /// Like [`extract_action_items`](Self::extract_action_items), giving up
    /// once `cancel` is set.
    pub fn extract_action_items_with(
        &self,
        transcript: &Transcript,
        cancel: &CancelFlag,
    ) -> Result<StageOutput<Vec<ActionItem>>> {
        if transcript.is_blank() {
            return Err(MinutesError::EmptyInput);
        }
        let text = transcript.text();

        let params = self.params.clone().with_cancel(cancel.clone());
        let note = match self.registry.action_extractor() {
            None => "action-item model not loaded".to_string(),
            Some(generator) => match generator.generate(&action_items_prompt(text), &params) {
                Ok(generated) => {
                    let items = parse_generated_items(&generated);
                    if !items.is_empty() {
                        return Ok(StageOutput::model(to_items(items)));
                    }
                    tracing::debug!(model = generator.model_name(), "Model found no action items");
                    "model returned no action items".to_string()
                }
                Err(MinutesError::Cancelled) => return Err(MinutesError::Cancelled),
                Err(e) => {
                    tracing::debug!(
                        model = generator.model_name(),
                        error = %e,
                        "Action-item model failed, using keyword rules"
                    );
                    format!("action-item model failed: {e}")
                }
            },
        };

        let items = self.rules.extract_action_items(text);
        if !items.is_empty() {
            return Ok(StageOutput::rules(to_items(items), note));
        }

        tracing::debug!("No clause matched the action keywords, using default items");
        Ok(StageOutput::placeholder(
            to_items(self.rules.default_items()),
            format!("{note}; no clause matched the action keywords"),
        ))
    }
}

fn to_items(items: Vec<String>) -> Vec<ActionItem> {
    items.into_iter().map(ActionItem::new).collect()
}
