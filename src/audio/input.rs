//! Audio payloads as received from a caller.

use crate::defaults::{self, BYTES_PER_MB};
use crate::error::{MinutesError, Result};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Longest extension kept from a declared filename.
const MAX_EXTENSION_LEN: usize = 8;

/// Raw audio bytes plus the filename the caller declared for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInput {
    bytes: Vec<u8>,
    filename: String,
}

impl AudioInput {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
        }
    }

    /// Read a file from disk, keeping its name as the declared filename.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self { bytes, filename })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lowercase extension of the declared filename.
    ///
    /// Only ASCII alphanumerics survive; anything unusable falls back to `wav`.
    pub fn extension(&self) -> String {
        Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                e.chars()
                    .filter(char::is_ascii_alphanumeric)
                    .collect::<String>()
                    .to_ascii_lowercase()
            })
            .filter(|e| !e.is_empty() && e.len() <= MAX_EXTENSION_LEN)
            .unwrap_or_else(|| defaults::DEFAULT_AUDIO_EXTENSION.to_string())
    }

    /// Write the bytes to a temporary file that keeps the original extension.
    ///
    /// The file lives exactly as long as the returned guard.
    pub fn materialize(&self) -> Result<ScopedAudioFile> {
        use std::io::Write;

        let suffix = format!(".{}", self.extension());
        let mut file = tempfile::Builder::new()
            .prefix("minutes-")
            .suffix(&suffix)
            .tempfile()?;
        file.write_all(&self.bytes)?;
        file.flush()?;

        tracing::debug!(
            path = %file.path().display(),
            bytes = self.bytes.len(),
            "Materialized audio to temporary file"
        );

        Ok(ScopedAudioFile { file })
    }
}

/// Temporary copy of an upload, deleted when dropped.
#[derive(Debug)]
pub struct ScopedAudioFile {
    file: NamedTempFile,
}

impl ScopedAudioFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn path_buf(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }

    /// Delete now and report failures instead of ignoring them on drop.
    pub fn close(self) -> Result<()> {
        self.file.close()?;
        Ok(())
    }
}

/// Maximum accepted upload size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioCeiling {
    max_bytes: u64,
}

impl AudioCeiling {
    pub fn from_bytes(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn from_mb(max_mb: f64) -> Self {
        let max_bytes = (max_mb.max(0.0) * BYTES_PER_MB as f64) as u64;
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn check(&self, input: &AudioInput) -> Result<()> {
        self.check_size(input.len())
    }

    pub fn check_size(&self, size_bytes: u64) -> Result<()> {
        if size_bytes > self.max_bytes {
            return Err(MinutesError::PayloadTooLarge {
                size_bytes,
                limit_bytes: self.max_bytes,
            });
        }
        Ok(())
    }
}

impl Default for AudioCeiling {
    fn default() -> Self {
        Self::from_mb(defaults::MAX_AUDIO_MB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_is_kept_and_lowercased() {
        assert_eq!(AudioInput::new(vec![1], "call.MP3").extension(), "mp3");
        assert_eq!(AudioInput::new(vec![1], "a.b.m4a").extension(), "m4a");
    }

    #[test]
    fn test_extension_falls_back_to_wav() {
        assert_eq!(AudioInput::new(vec![1], "recording").extension(), "wav");
        assert_eq!(AudioInput::new(vec![1], "").extension(), "wav");
        assert_eq!(AudioInput::new(vec![1], "x.verylongextension").extension(), "wav");
        assert_eq!(AudioInput::new(vec![1], "x.%%").extension(), "wav");
    }

    #[test]
    fn test_extension_strips_path_tricks() {
        assert_eq!(AudioInput::new(vec![1], "x.o/gg").extension(), "wav");
        assert_eq!(AudioInput::new(vec![1], "x.we-bm").extension(), "webm");
    }

    #[test]
    fn test_materialize_writes_bytes_with_extension() {
        let input = AudioInput::new(b"RIFF....".to_vec(), "meeting.ogg");
        let scoped = input.materialize().unwrap();
        let path = scoped.path_buf();

        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("ogg"));
        assert_eq!(std::fs::read(&path).unwrap(), b"RIFF....");

        drop(scoped);
        assert!(!path.exists(), "temp file should be removed on drop");
    }

    #[test]
    fn test_close_removes_file() {
        let scoped = AudioInput::new(vec![0; 16], "a.wav").materialize().unwrap();
        let path = scoped.path_buf();
        scoped.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_ceiling_accepts_exact_limit() {
        let ceiling = AudioCeiling::from_bytes(10);
        assert!(ceiling.check(&AudioInput::new(vec![0; 10], "a.wav")).is_ok());
    }

    #[test]
    fn test_ceiling_rejects_oversize() {
        let ceiling = AudioCeiling::from_mb(1.0);
        let err = ceiling.check_size(BYTES_PER_MB + 1).unwrap_err();
        assert!(matches!(
            err,
            MinutesError::PayloadTooLarge {
                limit_bytes,
                ..
            } if limit_bytes == BYTES_PER_MB
        ));
    }

    #[test]
    fn test_default_ceiling_is_five_mb() {
        assert_eq!(AudioCeiling::default().max_bytes(), 5 * BYTES_PER_MB);
    }

    #[test]
    fn test_from_file_keeps_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("standup.flac");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let input = AudioInput::from_file(&path).unwrap();
        assert_eq!(input.filename(), "standup.flac");
        assert_eq!(input.len(), 3);
        assert_eq!(input.extension(), "flac");
    }
}
