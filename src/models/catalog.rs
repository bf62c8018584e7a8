//! Whisper model metadata catalog.
//!
//! Each entry names the ggml file used by the fast engine and the Hugging Face
//! repository used by the standard engine, so one configured model name
//! selects the same model size on either engine.

use crate::error::{MinutesError, Result};
use serde::Serialize;

/// Whisper size class, ordered from smallest to largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

/// Metadata for a Whisper model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    /// Model identifier (e.g., "tiny.en", "base", "large")
    pub name: &'static str,
    pub size: ModelSize,
    /// Model size in megabytes
    pub size_mb: u32,
    /// ggml file name looked up in the model directory by the fast engine
    pub ggml_filename: &'static str,
    /// Hugging Face repository loaded by the standard engine
    pub hf_repo: &'static str,
    /// Whether this model supports English only
    pub english_only: bool,
}

/// Catalog of available Whisper models.
///
/// The `.en` suffix indicates English-only models, which are faster and smaller.
pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        name: "tiny.en",
        size: ModelSize::Tiny,
        size_mb: 75,
        ggml_filename: "ggml-tiny.en.bin",
        hf_repo: "openai/whisper-tiny.en",
        english_only: true,
    },
    ModelInfo {
        name: "tiny",
        size: ModelSize::Tiny,
        size_mb: 75,
        ggml_filename: "ggml-tiny.bin",
        hf_repo: "openai/whisper-tiny",
        english_only: false,
    },
    ModelInfo {
        name: "base.en",
        size: ModelSize::Base,
        size_mb: 142,
        ggml_filename: "ggml-base.en.bin",
        hf_repo: "openai/whisper-base.en",
        english_only: true,
    },
    ModelInfo {
        name: "base",
        size: ModelSize::Base,
        size_mb: 142,
        ggml_filename: "ggml-base.bin",
        hf_repo: "openai/whisper-base",
        english_only: false,
    },
    ModelInfo {
        name: "small.en",
        size: ModelSize::Small,
        size_mb: 466,
        ggml_filename: "ggml-small.en.bin",
        hf_repo: "openai/whisper-small.en",
        english_only: true,
    },
    ModelInfo {
        name: "small",
        size: ModelSize::Small,
        size_mb: 466,
        ggml_filename: "ggml-small.bin",
        hf_repo: "openai/whisper-small",
        english_only: false,
    },
    ModelInfo {
        name: "medium.en",
        size: ModelSize::Medium,
        size_mb: 1533,
        ggml_filename: "ggml-medium.en.bin",
        hf_repo: "openai/whisper-medium.en",
        english_only: true,
    },
    ModelInfo {
        name: "medium",
        size: ModelSize::Medium,
        size_mb: 1533,
        ggml_filename: "ggml-medium.bin",
        hf_repo: "openai/whisper-medium",
        english_only: false,
    },
    ModelInfo {
        name: "large",
        size: ModelSize::Large,
        size_mb: 3094,
        ggml_filename: "ggml-large.bin",
        hf_repo: "openai/whisper-large",
        english_only: false,
    },
];

/// Find a model by name.
pub fn get_model(name: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.name == name)
}

/// Get all available models.
pub fn list_models() -> &'static [ModelInfo] {
    MODELS
}

/// A catalog entry chosen for loading, after the size ceiling was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModel {
    pub info: &'static ModelInfo,
    /// Name the configuration asked for, when it differs from `info.name`.
    pub clamped_from: Option<&'static str>,
}

/// Resolve `name` and clamp it to the size class of `ceiling`.
///
/// A model above the ceiling is swapped for the ceiling's size class with the
/// same English-only flag. `large` has no English-only variant, so a clamp
/// never needs one.
pub fn resolve_within_ceiling(name: &str, ceiling: &str) -> Result<ResolvedModel> {
    let info = get_model(name).ok_or_else(|| MinutesError::ConfigInvalidValue {
        key: "stt.model".to_string(),
        message: format!("unknown Whisper model '{name}'"),
    })?;
    let limit = get_model(ceiling).ok_or_else(|| MinutesError::ConfigInvalidValue {
        key: "stt.max_model".to_string(),
        message: format!("unknown Whisper model '{ceiling}'"),
    })?;

    if info.size <= limit.size {
        return Ok(ResolvedModel {
            info,
            clamped_from: None,
        });
    }

    let clamped = MODELS
        .iter()
        .find(|m| m.size == limit.size && m.english_only == info.english_only)
        .unwrap_or(limit);

    Ok(ResolvedModel {
        info: clamped,
        clamped_from: Some(info.name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_model_exists() {
        let model = get_model("tiny.en").unwrap();
        assert_eq!(model.name, "tiny.en");
        assert_eq!(model.size, ModelSize::Tiny);
        assert!(model.english_only);
    }

    #[test]
    fn test_get_model_not_found() {
        assert!(get_model("nonexistent").is_none());
    }

    #[test]
    fn test_list_models_not_empty() {
        assert_eq!(list_models().len(), 9);
    }

    #[test]
    fn test_size_classes_are_ordered() {
        assert!(ModelSize::Tiny < ModelSize::Base);
        assert!(ModelSize::Base < ModelSize::Small);
        assert!(ModelSize::Medium < ModelSize::Large);
    }

    #[test]
    fn test_english_models_have_en_suffix() {
        for model in list_models() {
            assert_eq!(
                model.english_only,
                model.name.ends_with(".en"),
                "English-only flag mismatch for {}",
                model.name
            );
        }
    }

    #[test]
    fn test_ggml_filename_matches_name() {
        for model in list_models() {
            assert_eq!(model.ggml_filename, format!("ggml-{}.bin", model.name));
            assert!(model.hf_repo.starts_with("openai/whisper-"));
        }
    }

    #[test]
    fn test_resolve_within_ceiling_keeps_small_request() {
        let resolved = resolve_within_ceiling("tiny", "base").unwrap();
        assert_eq!(resolved.info.name, "tiny");
        assert_eq!(resolved.clamped_from, None);
    }

    #[test]
    fn test_resolve_within_ceiling_clamps_large_request() {
        let resolved = resolve_within_ceiling("medium", "base").unwrap();
        assert_eq!(resolved.info.name, "base");
        assert_eq!(resolved.clamped_from, Some("medium"));
    }

    #[test]
    fn test_resolve_within_ceiling_keeps_english_flag() {
        let resolved = resolve_within_ceiling("small.en", "tiny").unwrap();
        assert_eq!(resolved.info.name, "tiny.en");
    }

    #[test]
    fn test_resolve_within_ceiling_rejects_unknown_model() {
        let err = resolve_within_ceiling("huge", "base").unwrap_err();
        assert!(matches!(err, MinutesError::ConfigInvalidValue { ref key, .. } if key == "stt.model"));
    }

    #[test]
    fn test_resolve_within_ceiling_rejects_unknown_ceiling() {
        let err = resolve_within_ceiling("tiny", "gigantic").unwrap_err();
        assert!(
            matches!(err, MinutesError::ConfigInvalidValue { ref key, .. } if key == "stt.max_model")
        );
    }
}
