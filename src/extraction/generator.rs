//! Text-generation backend used by the summarization and action-item stages.

use crate::error::{MinutesError, Result};
use crate::pipeline::cancel::CancelFlag;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Bounds on the number of generated tokens.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub min_new_tokens: usize,
    pub max_new_tokens: usize,
    /// Checked before every generated token.
    pub cancel: CancelFlag,
}

impl GenerationParams {
    pub fn new(min_new_tokens: usize, max_new_tokens: usize) -> Self {
        Self {
            min_new_tokens,
            max_new_tokens,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }
}

/// A prompt-in, text-out model.
///
/// Decoding is greedy; implementations must be deterministic for a given
/// prompt and parameters.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;

    /// Name of the loaded model, for logging and health output
    fn model_name(&self) -> &str;
}

impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        (**self).generate(prompt, params)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Mock generator for testing
#[derive(Debug)]
pub struct MockGenerator {
    model_name: String,
    response: String,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: "mock generation".to_string(),
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextGenerator for MockGenerator {
    fn generate(&self, _prompt: &str, params: &GenerationParams) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        params.cancel.check()?;
        match &self.failure {
            Some(message) => Err(MinutesError::Generation {
                message: message.clone(),
            }),
            None => Ok(self.response.clone()),
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_response_and_counts_calls() {
        let generator = MockGenerator::new("flan").with_response("- a\n- b");
        let params = GenerationParams::new(0, 10);
        assert_eq!(generator.generate("p", &params).unwrap(), "- a\n- b");
        assert_eq!(generator.generate("p", &params).unwrap(), "- a\n- b");
        assert_eq!(generator.call_count(), 2);
    }

    #[test]
    fn mock_failure_is_generation_error() {
        let generator = MockGenerator::new("flan").with_failure("oom");
        let err = generator.generate("p", &GenerationParams::new(0, 1)).unwrap_err();
        assert!(matches!(err, MinutesError::Generation { ref message } if message == "oom"));
        assert_eq!(generator.call_count(), 1);
    }

    #[test]
    fn mock_honours_cancelled_params() {
        let generator = MockGenerator::new("flan");
        let cancel = CancelFlag::new();
        cancel.cancel();
        let params = GenerationParams::new(0, 10).with_cancel(cancel);
        assert!(matches!(
            generator.generate("p", &params),
            Err(MinutesError::Cancelled)
        ));
    }

    #[test]
    fn generator_trait_object_is_shareable() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<Arc<dyn TextGenerator>>();

        let generator: Arc<dyn TextGenerator> = Arc::new(MockGenerator::new("shared"));
        assert_eq!(generator.model_name(), "shared");
    }
}
