//! Catalog of quantized Flan-T5 models used for summaries and action items.

/// Metadata for a text-generation model.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorModelInfo {
    /// Short name used in config and CLI (e.g. "flan-t5-small").
    pub name: &'static str,
    /// Approximate download size in MB.
    pub size_mb: u32,
    /// HuggingFace repository containing the weights.
    pub hf_repo: &'static str,
    /// GGUF weights filename within the repository.
    pub weights_filename: &'static str,
    /// JSON config filename within the repository.
    pub config_filename: &'static str,
}

/// All Flan-T5 variants share one tokenizer.
pub const TOKENIZER_FILENAME: &str = "tokenizer.json";

/// HuggingFace repository for quantized T5 models.
pub const GENERATOR_MODEL_REPO: &str = "lmz/candle-quantized-t5";

/// Available generators, smallest first.
pub const GENERATOR_MODELS: &[GeneratorModelInfo] = &[
    GeneratorModelInfo {
        name: "flan-t5-small",
        size_mb: 64,
        hf_repo: GENERATOR_MODEL_REPO,
        weights_filename: "model.gguf",
        config_filename: "config.json",
    },
    GeneratorModelInfo {
        name: "flan-t5-base",
        size_mb: 263,
        hf_repo: GENERATOR_MODEL_REPO,
        weights_filename: "model-flan-t5-base.gguf",
        config_filename: "config-flan-t5-base.json",
    },
    GeneratorModelInfo {
        name: "flan-t5-large",
        size_mb: 852,
        hf_repo: GENERATOR_MODEL_REPO,
        weights_filename: "model-flan-t5-large.gguf",
        config_filename: "config-flan-t5-large.json",
    },
];

pub fn get_generator_model(name: &str) -> Option<&'static GeneratorModelInfo> {
    GENERATOR_MODELS.iter().find(|m| m.name == name)
}

pub fn list_generator_models() -> &'static [GeneratorModelInfo] {
    GENERATOR_MODELS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_generator_is_cataloged() {
        let model = get_generator_model(crate::defaults::DEFAULT_GENERATOR_MODEL)
            .expect("default generator should exist");
        assert_eq!(model.weights_filename, "model.gguf");
        assert_eq!(model.config_filename, "config.json");
    }

    #[test]
    fn test_unknown_generator() {
        assert!(get_generator_model("gpt-17").is_none());
    }

    #[test]
    fn test_generators_ordered_by_size() {
        for window in list_generator_models().windows(2) {
            assert!(window[0].size_mb < window[1].size_mb);
        }
    }

    #[test]
    fn test_generators_share_repo() {
        for model in GENERATOR_MODELS {
            assert_eq!(model.hf_repo, GENERATOR_MODEL_REPO, "{}", model.name);
        }
    }
}
