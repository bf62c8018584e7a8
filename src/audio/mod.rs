//! Uploaded audio: size ceiling, scoped temp files and decoding to PCM.

pub mod decode;
pub mod input;

pub use input::{AudioCeiling, AudioInput, ScopedAudioFile};
