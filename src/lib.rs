//! minutes - meeting transcription with summaries and action items
//!
//! Each stage degrades instead of failing: a missing or failing model falls
//! back to deterministic rules, so small hosts still get usable notes.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod backend;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod export;
pub mod extraction;
pub mod logging;
pub mod models;
#[cfg(feature = "cli")]
pub mod output;
pub mod pipeline;
pub mod stt;

// Composition root for the binary
#[cfg(feature = "cli")]
pub mod app;

// Core traits
pub use export::NotesExporter;
pub use extraction::TextGenerator;
pub use stt::transcriber::Transcriber;

// Pipeline
pub use backend::{BackendRegistry, EngineKind, HealthStatus, load_registry};
pub use pipeline::{Pipeline, PipelineResult};

// Error handling
pub use error::{MinutesError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.0.1+abc1234"` when git hash is available, `"0.0.1"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_contains_plus_when_git_hash_present() {
        let ver = version_string();
        // In a git repo build, GIT_HASH is set → expect "0.0.1+<hash>"
        // In CI without git, expect plain "0.0.1"
        if option_env!("GIT_HASH").is_some_and(|h| !h.is_empty()) {
            assert!(
                ver.contains('+'),
                "With GIT_HASH set, version should contain '+', got: {}",
                ver
            );
            let hash_part = ver.split('+').nth(1).unwrap_or("");
            assert_eq!(
                hash_part.len(),
                7,
                "Git hash should be 7 chars, got: {}",
                hash_part
            );
        } else {
            assert_eq!(ver, env!("CARGO_PKG_VERSION"));
        }
    }
}
