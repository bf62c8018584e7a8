//! Speech-to-text: the engine trait, the two engines and the stage that drives them.

pub mod candle_whisper;
pub mod stage;
pub mod transcriber;
pub mod whisper;

pub use stage::TranscriptionStage;
pub use transcriber::{DecodeOptions, RawTranscription, Segment, Transcriber};
