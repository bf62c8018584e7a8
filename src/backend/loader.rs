//! One-shot backend loading with graceful degradation.
//!
//! Engines are tried in preference order and the first that loads wins.
//! Failures are logged and recorded as "not loaded"; only strict mode turns
//! a missing transcription engine into an error.

use crate::backend::registry::{BackendRegistry, EngineKind};
use crate::config::Config;
use crate::error::{MinutesError, Result};
use crate::extraction::candle_t5::CandleT5Generator;
use crate::extraction::generator::TextGenerator;
use crate::models::catalog::{self, ModelInfo};
use crate::models::generator_catalog;
use crate::stt::candle_whisper::CandleWhisperTranscriber;
use crate::stt::transcriber::Transcriber;
use crate::stt::whisper::{self, WhisperTranscriber};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Source of concrete backends.
///
/// The native factory loads real models; tests substitute scripted ones.
pub trait BackendFactory {
    /// whisper.cpp with a ggml file from `model_dir`
    fn load_fast(&self, model: &ModelInfo, model_dir: &Path) -> Result<Arc<dyn Transcriber>>;

    /// candle Whisper from the Hugging Face hub
    fn load_standard(&self, model: &ModelInfo) -> Result<Arc<dyn Transcriber>>;

    /// Text generator by catalog name
    fn load_generator(&self, name: &str) -> Result<Arc<dyn TextGenerator>>;
}

/// Loads whichever native backends this build was compiled with.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackendFactory;

impl BackendFactory for NativeBackendFactory {
    fn load_fast(&self, model: &ModelInfo, model_dir: &Path) -> Result<Arc<dyn Transcriber>> {
        let path = whisper::model_path(model_dir, model.ggml_filename);
        Ok(Arc::new(WhisperTranscriber::new(&path)?))
    }

    fn load_standard(&self, model: &ModelInfo) -> Result<Arc<dyn Transcriber>> {
        Ok(Arc::new(CandleWhisperTranscriber::new(model.hf_repo)?))
    }

    fn load_generator(&self, name: &str) -> Result<Arc<dyn TextGenerator>> {
        let info = generator_catalog::get_generator_model(name).ok_or_else(|| {
            MinutesError::ModelNotFound {
                path: format!("generator catalog entry '{name}'"),
            }
        })?;
        Ok(Arc::new(CandleT5Generator::load(info)?))
    }
}

/// Build the registry for a configuration.
///
/// # Errors
/// `BackendUnavailable` only when `stt.require_backend` is set and no
/// transcription engine loaded.
pub fn load_registry(config: &Config, factory: &dyn BackendFactory) -> Result<BackendRegistry> {
    let mut registry = BackendRegistry::empty();

    match load_transcriber(config, factory) {
        Some((kind, engine)) => {
            registry = registry.with_transcriber(kind, engine);
        }
        None if config.stt.require_backend => {
            tracing::error!("No transcription engine loaded and stt.require_backend is set");
            return Err(MinutesError::BackendUnavailable);
        }
        None => {
            tracing::warn!("No transcription engine loaded; transcription requests will fail");
        }
    }

    let mut generators = GeneratorCache::new(factory);

    if config.extraction.summarization_enabled
        && let Some(generator) = generators.get(&config.extraction.summarization_model)
    {
        registry = registry.with_summarizer(generator);
    }

    if config.extraction.action_items_enabled
        && let Some(generator) = generators.get(&config.extraction.action_items_model)
    {
        registry = registry.with_action_extractor(generator);
    }

    let health = registry.health();
    tracing::info!(
        engine = %health.transcription_engine,
        model = health.transcription_model.as_deref().unwrap_or("none"),
        summarizer = health.summarizer_loaded,
        action_extractor = health.action_extractor_loaded,
        "Backends loaded"
    );

    Ok(registry)
}

fn load_transcriber(
    config: &Config,
    factory: &dyn BackendFactory,
) -> Option<(EngineKind, Arc<dyn Transcriber>)> {
    let resolved = match catalog::resolve_within_ceiling(&config.stt.model, &config.stt.max_model) {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::warn!(error = %e, "Cannot resolve transcription model");
            return None;
        }
    };

    if let Some(requested) = resolved.clamped_from {
        tracing::warn!(
            requested,
            using = resolved.info.name,
            ceiling = %config.stt.max_model,
            "Requested model exceeds the size ceiling, clamping"
        );
    }
    let model = resolved.info;

    match factory.load_fast(model, &config.stt.model_dir) {
        Ok(engine) => return Some((EngineKind::Fast, engine)),
        Err(e) => tracing::warn!(model = model.name, error = %e, "Fast engine unavailable"),
    }

    match factory.load_standard(model) {
        Ok(engine) => return Some((EngineKind::Standard, engine)),
        Err(e) => tracing::warn!(model = model.name, error = %e, "Standard engine unavailable"),
    }

    None
}

/// Attempts each generator name once, including failed attempts.
struct GeneratorCache<'a> {
    factory: &'a dyn BackendFactory,
    loaded: HashMap<String, Option<Arc<dyn TextGenerator>>>,
}

impl<'a> GeneratorCache<'a> {
    fn new(factory: &'a dyn BackendFactory) -> Self {
        Self {
            factory,
            loaded: HashMap::new(),
        }
    }

    fn get(&mut self, name: &str) -> Option<Arc<dyn TextGenerator>> {
        let factory = self.factory;
        self.loaded
            .entry(name.to_string())
            .or_insert_with(|| match factory.load_generator(name) {
                Ok(generator) => Some(generator),
                Err(e) => {
                    tracing::warn!(model = name, error = %e, "Text generator unavailable");
                    None
                }
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::generator::MockGenerator;
    use crate::stt::transcriber::MockTranscriber;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedFactory {
        fast_ok: bool,
        standard_ok: bool,
        generator_ok: bool,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedFactory {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl BackendFactory for ScriptedFactory {
        fn load_fast(&self, model: &ModelInfo, _dir: &Path) -> Result<Arc<dyn Transcriber>> {
            self.record(format!("fast:{}", model.name));
            if self.fast_ok {
                Ok(Arc::new(MockTranscriber::new(model.name)))
            } else {
                Err(MinutesError::ModelLoad {
                    message: "no ggml".into(),
                })
            }
        }

        fn load_standard(&self, model: &ModelInfo) -> Result<Arc<dyn Transcriber>> {
            self.record(format!("standard:{}", model.name));
            if self.standard_ok {
                Ok(Arc::new(MockTranscriber::new(model.name)))
            } else {
                Err(MinutesError::ModelLoad {
                    message: "no candle".into(),
                })
            }
        }

        fn load_generator(&self, name: &str) -> Result<Arc<dyn TextGenerator>> {
            self.record(format!("generator:{name}"));
            if self.generator_ok {
                Ok(Arc::new(MockGenerator::new(name)))
            } else {
                Err(MinutesError::ModelLoad {
                    message: "no t5".into(),
                })
            }
        }
    }

    #[test]
    fn fast_engine_preferred() {
        let factory = ScriptedFactory {
            fast_ok: true,
            standard_ok: true,
            ..Default::default()
        };
        let registry = load_registry(&Config::default(), &factory).unwrap();
        assert_eq!(registry.engine(), EngineKind::Fast);
        assert!(!factory.calls().iter().any(|c| c.starts_with("standard")));
    }

    #[test]
    fn standard_used_when_fast_fails() {
        let factory = ScriptedFactory {
            standard_ok: true,
            ..Default::default()
        };
        let registry = load_registry(&Config::default(), &factory).unwrap();
        assert_eq!(registry.engine(), EngineKind::Standard);
    }

    #[test]
    fn nothing_loads_degrades_to_none() {
        let factory = ScriptedFactory::default();
        let registry = load_registry(&Config::default(), &factory).unwrap();
        assert_eq!(registry.engine(), EngineKind::None);
        assert!(!registry.health().transcription_loaded);
    }

    #[test]
    fn strict_mode_fails_without_engine() {
        let mut config = Config::default();
        config.stt.require_backend = true;
        let err = load_registry(&config, &ScriptedFactory::default()).unwrap_err();
        assert!(matches!(err, MinutesError::BackendUnavailable));
    }

    #[test]
    fn unknown_model_degrades_without_touching_factory() {
        let mut config = Config::default();
        config.stt.model = "enormous".to_string();
        config.extraction.action_items_enabled = false;
        let factory = ScriptedFactory {
            fast_ok: true,
            ..Default::default()
        };
        let registry = load_registry(&config, &factory).unwrap();
        assert_eq!(registry.engine(), EngineKind::None);
        assert!(factory.calls().is_empty());
    }

    #[test]
    fn oversize_model_is_clamped_before_loading() {
        let mut config = Config::default();
        config.stt.model = "medium".to_string();
        let factory = ScriptedFactory {
            fast_ok: true,
            ..Default::default()
        };
        let registry = load_registry(&config, &factory).unwrap();
        assert_eq!(factory.calls()[0], "fast:base");
        assert_eq!(registry.health().transcription_model.as_deref(), Some("base"));
    }

    #[test]
    fn shared_generator_loaded_once() {
        let mut config = Config::default();
        config.extraction.summarization_enabled = true;
        let factory = ScriptedFactory {
            generator_ok: true,
            ..Default::default()
        };
        let registry = load_registry(&config, &factory).unwrap();
        let generator_calls = factory
            .calls()
            .iter()
            .filter(|c| c.starts_with("generator"))
            .count();
        assert_eq!(generator_calls, 1);
        assert!(registry.health().summarizer_loaded);
        assert!(registry.health().action_extractor_loaded);
    }

    #[test]
    fn failed_generator_not_retried_for_second_stage() {
        let mut config = Config::default();
        config.extraction.summarization_enabled = true;
        let factory = ScriptedFactory::default();
        let registry = load_registry(&config, &factory).unwrap();
        let generator_calls = factory
            .calls()
            .iter()
            .filter(|c| c.starts_with("generator"))
            .count();
        assert_eq!(generator_calls, 1);
        assert!(!registry.health().summarizer_loaded);
        assert!(!registry.health().action_extractor_loaded);
    }

    #[test]
    fn disabled_stages_load_nothing() {
        let mut config = Config::default();
        config.extraction.action_items_enabled = false;
        let factory = ScriptedFactory {
            generator_ok: true,
            ..Default::default()
        };
        load_registry(&config, &factory).unwrap();
        assert!(!factory.calls().iter().any(|c| c.starts_with("generator")));
    }

    #[test]
    fn native_factory_rejects_unknown_generator() {
        let err = NativeBackendFactory.load_generator("gpt-17").err().unwrap();
        assert!(matches!(err, MinutesError::ModelNotFound { .. }));
    }
}
