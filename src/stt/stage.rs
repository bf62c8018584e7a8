//! Transcription stage: guarded, scoped invocation of the active engine.

use crate::audio::{AudioCeiling, AudioInput};
use crate::backend::registry::BackendRegistry;
use crate::error::{MinutesError, Result};
use crate::pipeline::cancel::CancelFlag;
use crate::pipeline::types::Transcript;
use crate::stt::transcriber::DecodeOptions;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct TranscriptionStage {
    registry: Arc<BackendRegistry>,
    ceiling: AudioCeiling,
    options: DecodeOptions,
}

impl TranscriptionStage {
    pub fn new(registry: Arc<BackendRegistry>, ceiling: AudioCeiling, options: DecodeOptions) -> Self {
        Self {
            registry,
            ceiling,
            options,
        }
    }

    /// Turn uploaded audio into a transcript.
    ///
    /// Checks run before any engine is touched: size ceiling, then empty
    /// input, then engine availability. The temporary copy of the audio is
    /// removed on every exit path.
    pub fn transcribe(&self, input: &AudioInput) -> Result<Transcript> {
        self.transcribe_with(input, &CancelFlag::new())
    }

    /// Like [`transcribe`](Self::transcribe); the engine stops at its next
    /// decode step once `cancel` is set.
    pub fn transcribe_with(&self, input: &AudioInput, cancel: &CancelFlag) -> Result<Transcript> {
        self.ceiling.check(input)?;
        if input.is_empty() {
            return Err(MinutesError::EmptyAudio);
        }

        let engine = self
            .registry
            .transcriber()
            .ok_or(MinutesError::BackendUnavailable)?;

        let scoped = input.materialize()?;
        let options = self.options.clone().with_cancel(cancel.clone());
        let outcome = engine.transcribe(scoped.path(), &options);
        if let Err(e) = scoped.close() {
            tracing::warn!(error = %e, "Failed to remove temporary audio file");
        }

        let raw = outcome.map_err(|e| match e {
            MinutesError::TranscriptionFailed { .. } | MinutesError::Cancelled => e,
            other => MinutesError::TranscriptionFailed {
                message: other.to_string(),
            },
        })?;

        let transcript = raw.normalize().ok_or(MinutesError::EmptyTranscription)?;

        tracing::info!(
            engine = %self.registry.engine(),
            model = engine.model_name(),
            chars = transcript.text().len(),
            language = transcript.language().unwrap_or("unknown"),
            "Transcription completed"
        );

        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::registry::EngineKind;
    use crate::stt::transcriber::MockTranscriber;

    fn stage_with(mock: Arc<MockTranscriber>, ceiling: AudioCeiling) -> TranscriptionStage {
        let registry = BackendRegistry::empty().with_transcriber(EngineKind::Fast, mock);
        TranscriptionStage::new(Arc::new(registry), ceiling, DecodeOptions::default())
    }

    #[test]
    fn test_oversize_never_reaches_engine() {
        let mock = Arc::new(MockTranscriber::new("tiny"));
        let stage = stage_with(mock.clone(), AudioCeiling::from_bytes(4));

        let err = stage
            .transcribe(&AudioInput::new(vec![0; 5], "a.wav"))
            .unwrap_err();
        assert!(matches!(err, MinutesError::PayloadTooLarge { .. }));
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn test_empty_audio_rejected() {
        let mock = Arc::new(MockTranscriber::new("tiny"));
        let stage = stage_with(mock.clone(), AudioCeiling::default());

        let err = stage.transcribe(&AudioInput::new(vec![], "a.wav")).unwrap_err();
        assert!(matches!(err, MinutesError::EmptyAudio));
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn test_no_engine_is_backend_unavailable() {
        let stage = TranscriptionStage::new(
            Arc::new(BackendRegistry::empty()),
            AudioCeiling::default(),
            DecodeOptions::default(),
        );
        let err = stage
            .transcribe(&AudioInput::new(vec![1, 2, 3], "a.wav"))
            .unwrap_err();
        assert!(matches!(err, MinutesError::BackendUnavailable));
    }

    #[test]
    fn test_success_removes_temp_file_and_keeps_extension() {
        let mock = Arc::new(MockTranscriber::new("tiny").with_segments(&[" Hello ", "there."], "en"));
        let stage = stage_with(mock.clone(), AudioCeiling::default());

        let transcript = stage
            .transcribe(&AudioInput::new(vec![1, 2, 3], "call.mp3"))
            .unwrap();
        assert_eq!(transcript.text(), "Hello there.");
        assert_eq!(transcript.language(), Some("en"));

        let seen = mock.seen_paths();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].extension().and_then(|e| e.to_str()), Some("mp3"));
        assert!(!seen[0].exists());
    }

    #[test]
    fn test_failure_keeps_cause_and_removes_temp_file() {
        let mock = Arc::new(MockTranscriber::new("tiny").with_failure("out of memory"));
        let stage = stage_with(mock.clone(), AudioCeiling::default());

        let err = stage
            .transcribe(&AudioInput::new(vec![1, 2, 3], "a.wav"))
            .unwrap_err();
        match err {
            MinutesError::TranscriptionFailed { message } => assert!(message.contains("out of memory")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!mock.seen_paths()[0].exists());
    }

    #[test]
    fn test_blank_output_is_empty_transcription() {
        let mock = Arc::new(MockTranscriber::new("tiny").with_empty());
        let stage = stage_with(mock, AudioCeiling::default());

        let err = stage
            .transcribe(&AudioInput::new(vec![1, 2, 3], "a.wav"))
            .unwrap_err();
        assert!(matches!(err, MinutesError::EmptyTranscription));
    }

    #[test]
    fn test_cancel_stops_stalled_engine_and_removes_temp_file() {
        let mock = Arc::new(MockTranscriber::new("tiny").with_stall());
        let stage = stage_with(mock.clone(), AudioCeiling::default());
        let cancel = CancelFlag::new();
        cancel.cancel();

        let err = stage
            .transcribe_with(&AudioInput::new(vec![1, 2, 3], "a.wav"), &cancel)
            .unwrap_err();
        assert!(matches!(err, MinutesError::Cancelled));
        assert!(!mock.seen_paths()[0].exists());
    }
}
