// Line-level translation
//
// The renderer translates one subtitle line at a time through `LineTranslator`,
// which owns the engine handle for the current model configuration:
// - languages: supported language codes and their prompt names
// - ollama: Ollama-backed engine and its loader

pub mod languages;
pub mod ollama;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::config::TranslateConfig;
use crate::engine::{EngineSlot, ModelSpec};
use crate::error::Result;

/// Source and target language codes for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguagePair {
    pub source: Option<String>,
    pub target: Option<String>,
}

impl LanguagePair {
    pub fn new(source: Option<&str>, target: Option<&str>) -> Self {
        Self {
            source: source.map(str::to_string),
            target: target.map(str::to_string),
        }
    }

    /// Target language when it is set and differs from the source.
    pub fn translation_target(&self) -> Option<&str> {
        match (&self.source, &self.target) {
            (_, None) => None,
            (Some(source), Some(target)) if source == target => None,
            (_, Some(target)) => Some(target.as_str()),
        }
    }

    pub fn needs_translation(&self) -> bool {
        self.translation_target().is_some()
    }

    /// Codes the translator would reject, only counted when translation applies.
    pub fn unsupported_codes(&self) -> Vec<&str> {
        if !self.needs_translation() {
            return Vec::new();
        }

        [self.source.as_deref(), self.target.as_deref()]
            .into_iter()
            .flatten()
            .filter(|code| !languages::is_supported(code))
            .collect()
    }
}

/// A loaded translation engine.
#[async_trait]
pub trait TranslationEngine: Send + Sync {
    /// Translate `text` into `target`, returning the best candidate.
    async fn translate(&self, text: &str, source: Option<&str>, target: &str) -> Result<String>;
}

/// Creates translation engines for a model configuration.
#[async_trait]
pub trait TranslationEngineLoader: Send + Sync {
    async fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn TranslationEngine>>;
}

/// Per-line translation contract used by the subtitle renderer.
pub struct LineTranslator {
    loader: Box<dyn TranslationEngineLoader>,
    engine: EngineSlot<dyn TranslationEngine>,
    model_cache_env: String,
}

impl LineTranslator {
    pub fn new<S: Into<String>>(loader: Box<dyn TranslationEngineLoader>, model_cache_env: S) -> Self {
        Self {
            loader,
            engine: EngineSlot::new(),
            model_cache_env: model_cache_env.into(),
        }
    }

    /// Translator backed by Ollama as configured.
    pub fn from_config(config: TranslateConfig) -> Self {
        let model_cache_env = config.model_cache_env.clone();
        Self::new(Box::new(ollama::OllamaLoader::new(config)), model_cache_env)
    }

    /// Translate one trimmed line. Errors are recoverable; the caller decides what to do.
    pub async fn translate(&self, text: &str, pair: &LanguagePair, spec: &ModelSpec) -> Result<String> {
        spec.ensure_cache_root(&self.model_cache_env)?;

        let Some(target) = pair.target.as_deref() else {
            return Ok(text.to_string());
        };

        let engine = self.engine.get_or_load(spec, || self.loader.load(spec)).await?;

        debug!("Translating line to {}: {}", target, text);
        let translated = engine.translate(text, pair.source.as_deref(), target).await?;
        Ok(translated.trim().to_string())
    }

    /// Spec of the engine currently held, if one has been loaded.
    pub async fn loaded_spec(&self) -> Option<ModelSpec> {
        self.engine.loaded_spec().await
    }
}
