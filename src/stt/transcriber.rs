use crate::error::{MinutesError, Result};
use crate::pipeline::cancel::CancelFlag;
use crate::pipeline::types::Transcript;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Decoding knobs passed to every engine.
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Fixed language code; `None` lets the engine detect it.
    pub language: Option<String>,
    /// Thread cap for inference; `None` uses the engine default.
    pub threads: Option<usize>,
    /// Checked between decode steps.
    pub cancel: CancelFlag,
}

impl DecodeOptions {
    /// Build options from a configured language where "auto" means detect.
    pub fn from_language(language: &str, threads: Option<usize>) -> Self {
        let language = if language == crate::defaults::AUTO_LANGUAGE || language.is_empty() {
            None
        } else {
            Some(language.to_string())
        };
        Self {
            language,
            threads,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }
}

/// One timed piece of a segmented transcription.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

/// What an engine hands back before normalisation.
///
/// The fast engine yields timed segments; the standard engine yields a
/// single block of text.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTranscription {
    Text {
        text: String,
        language: Option<String>,
    },
    Segments {
        segments: Vec<Segment>,
        language: Option<String>,
    },
}

impl RawTranscription {
    /// Collapse either shape into one transcript.
    ///
    /// Returns `None` when nothing but whitespace was recognised.
    pub fn normalize(self) -> Option<Transcript> {
        let (joined, language) = match self {
            RawTranscription::Text { text, language } => (text, language),
            RawTranscription::Segments { segments, language } => {
                let joined = segments
                    .iter()
                    .map(|s| s.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                (joined, language)
            }
        };

        let text = joined.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            return None;
        }
        let language = language.filter(|l| !l.trim().is_empty());
        Some(Transcript::new(text, language))
    }
}

/// Trait for speech-to-text engines.
///
/// Engines read a materialised audio file so each one can decode it the way
/// it prefers.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, audio_path: &Path, options: &DecodeOptions) -> Result<RawTranscription>;

    /// Name of the loaded model
    fn model_name(&self) -> &str;
}

/// Implement Transcriber for Arc<T> so one engine can back several stages.
impl<T: Transcriber + ?Sized> Transcriber for Arc<T> {
    fn transcribe(&self, audio_path: &Path, options: &DecodeOptions) -> Result<RawTranscription> {
        (**self).transcribe(audio_path, options)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

#[derive(Debug, Clone)]
enum MockBehavior {
    Respond(RawTranscription),
    Fail(String),
    Stall,
    Panic,
}

/// Mock transcriber for testing
#[derive(Debug)]
pub struct MockTranscriber {
    model_name: String,
    behavior: MockBehavior,
    seen: Mutex<Vec<PathBuf>>,
}

impl MockTranscriber {
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            behavior: MockBehavior::Respond(RawTranscription::Text {
                text: "mock transcription".to_string(),
                language: None,
            }),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Respond with a single block of text
    pub fn with_text(mut self, text: &str) -> Self {
        self.behavior = MockBehavior::Respond(RawTranscription::Text {
            text: text.to_string(),
            language: None,
        });
        self
    }

    /// Respond with timed segments and a detected language
    pub fn with_segments(mut self, parts: &[&str], language: &str) -> Self {
        let segments = parts
            .iter()
            .enumerate()
            .map(|(i, text)| Segment {
                start_ms: i as u64 * 1000,
                end_ms: (i as u64 + 1) * 1000,
                text: text.to_string(),
            })
            .collect();
        self.behavior = MockBehavior::Respond(RawTranscription::Segments {
            segments,
            language: Some(language.to_string()),
        });
        self
    }

    /// Respond with whitespace only
    pub fn with_empty(self) -> Self {
        self.with_text("   ")
    }

    /// Fail every call with the given message
    pub fn with_failure(mut self, message: &str) -> Self {
        self.behavior = MockBehavior::Fail(message.to_string());
        self
    }

    /// Block until the run is cancelled, like a stuck engine that still
    /// polls its cancel flag
    pub fn with_stall(mut self) -> Self {
        self.behavior = MockBehavior::Stall;
        self
    }

    /// Panic inside `transcribe`
    pub fn with_panic(mut self) -> Self {
        self.behavior = MockBehavior::Panic;
        self
    }

    /// Paths passed to `transcribe`, in call order.
    pub fn seen_paths(&self) -> Vec<PathBuf> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or_default()
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(&self, audio_path: &Path, options: &DecodeOptions) -> Result<RawTranscription> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(audio_path.to_path_buf());
        }
        match &self.behavior {
            MockBehavior::Respond(raw) => Ok(raw.clone()),
            MockBehavior::Fail(message) => Err(MinutesError::Other(message.clone())),
            MockBehavior::Stall => {
                while !options.cancel.is_cancelled() {
                    std::thread::sleep(std::time::Duration::from_millis(5));
                }
                Err(MinutesError::Cancelled)
            }
            MockBehavior::Panic => panic!("mock transcriber panicked"),
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
    fn test_decode_options_auto_means_detect() {
        let options = DecodeOptions::from_language("auto", None);
        assert_eq!(options.language, None);

        let options = DecodeOptions::from_language("de", Some(2));
        assert_eq!(options.language.as_deref(), Some("de"));
        assert_eq!(options.threads, Some(2));
    }

    #[test]
    fn test_stalled_mock_returns_once_cancelled() {
        let cancel = CancelFlag::new();
        let options = DecodeOptions::default().with_cancel(cancel.clone());
        let mock = Arc::new(MockTranscriber::new("tiny").with_stall());

        let worker = {
            let mock = mock.clone();
            std::thread::spawn(move || mock.transcribe(Path::new("a.wav"), &options))
        };
        std::thread::sleep(std::time::Duration::from_millis(20));
        cancel.cancel();

        let result = worker.join().unwrap();
        assert!(matches!(result, Err(MinutesError::Cancelled)));
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn test_normalize_text_collapses_whitespace() {
        let raw = RawTranscription::Text {
            text: "  hello \n  world\t again ".to_string(),
            language: None,
        };
        let transcript = raw.normalize().unwrap();
        assert_eq!(transcript.text(), "hello world again");
        assert_eq!(transcript.language(), None);
    }

    #[test]
    fn test_normalize_segments_joins_with_single_space() {
        let raw = RawTranscription::Segments {
            segments: vec![
                Segment {
                    start_ms: 0,
                    end_ms: 900,
                    text: " We will ship".to_string(),
                },
                Segment {
                    start_ms: 900,
                    end_ms: 2000,
                    text: "on Monday. ".to_string(),
                },
            ],
            language: Some("en".to_string()),
        };
        let transcript = raw.normalize().unwrap();
        assert_eq!(transcript.text(), "We will ship on Monday.");
        assert_eq!(transcript.language(), Some("en"));
    }

    #[test]
    fn test_normalize_blank_is_none() {
        let raw = RawTranscription::Segments {
            segments: vec![Segment {
                start_ms: 0,
                end_ms: 10,
                text: "   ".to_string(),
            }],
            language: Some("en".to_string()),
        };
        assert!(raw.normalize().is_none());

        let raw = RawTranscription::Segments {
            segments: vec![],
            language: None,
        };
        assert!(raw.normalize().is_none());
    }

    #[test]
    fn test_normalize_drops_blank_language() {
        let raw = RawTranscription::Text {
            text: "hi".to_string(),
            language: Some(String::new()),
        };
        assert_eq!(raw.normalize().unwrap().language(), None);
    }

    #[test]
    fn test_mock_transcriber_records_paths() {
        let transcriber = MockTranscriber::new("mock").with_text("hello");
        let result = transcriber
            .transcribe(Path::new("/tmp/a.wav"), &DecodeOptions::default())
            .unwrap();
        assert_eq!(
            result,
            RawTranscription::Text {
                text: "hello".to_string(),
                language: None
            }
        );
        assert_eq!(transcriber.seen_paths(), vec![PathBuf::from("/tmp/a.wav")]);
        assert_eq!(transcriber.call_count(), 1);
    }

    #[test]
    fn test_mock_transcriber_failure() {
        let transcriber = MockTranscriber::new("mock").with_failure("decoder exploded");
        let err = transcriber
            .transcribe(Path::new("x.wav"), &DecodeOptions::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "decoder exploded");
    }

    #[test]
    fn test_transcriber_trait_is_object_safe() {
        let transcriber: Arc<dyn Transcriber> =
            Arc::new(MockTranscriber::new("boxed").with_segments(&["a", "b"], "en"));
        assert_eq!(transcriber.model_name(), "boxed");
        let raw = transcriber
            .transcribe(Path::new("x.wav"), &DecodeOptions::default())
            .unwrap();
        assert_eq!(raw.normalize().unwrap().text(), "a b");
    }
}
