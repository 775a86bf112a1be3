//! Lazily created engine handles keyed by model configuration.
//!
//! Both the transcriber and the translator keep at most one live engine per
//! configuration. Asking for a different configuration drops the old handle
//! and loads a new one. Creation and replacement happen under an async mutex,
//! so a slot can be shared between concurrent pipeline runs.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{Result, SubburnError};

pub const TRANSCRIPTION_TIERS: &[&str] = &["tiny", "base", "small", "medium", "large"];
pub const TRANSLATION_TIERS: &[&str] = &["base", "large"];
pub const DEFAULT_TIER: &str = "base";

/// Model tier plus an optional custom model directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelSpec {
    pub tier: String,
    pub model_dir: Option<PathBuf>,
}

impl ModelSpec {
    /// Build a spec for the transcription engine, falling back to `base` for unknown tiers.
    pub fn transcription<S: AsRef<str>>(tier: S, model_dir: Option<PathBuf>) -> Self {
        Self::with_tiers(tier.as_ref(), model_dir, TRANSCRIPTION_TIERS, "captioning")
    }

    /// Build a spec for the translation engine, falling back to `base` for unknown tiers.
    pub fn translation<S: AsRef<str>>(tier: S, model_dir: Option<PathBuf>) -> Self {
        Self::with_tiers(tier.as_ref(), model_dir, TRANSLATION_TIERS, "language")
    }

    fn with_tiers(tier: &str, model_dir: Option<PathBuf>, available: &[&str], kind: &str) -> Self {
        let tier = if available.contains(&tier) {
            tier.to_string()
        } else {
            warn!(
                "Invalid {} model type '{}'. Using {} model. Available models: {:?}",
                kind, tier, DEFAULT_TIER, available
            );
            DEFAULT_TIER.to_string()
        };

        Self { tier, model_dir }
    }

    /// A custom model directory only works when the model cache root is configured.
    pub fn ensure_cache_root(&self, env_name: &str) -> Result<()> {
        match &self.model_dir {
            Some(dir) if std::env::var_os(env_name).is_none() => {
                Err(SubburnError::Configuration(format!(
                    "{} environment variable not set; it is required when using model directory {}. \
                     Set it or run without a model directory.",
                    env_name,
                    dir.display()
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Holds the current engine handle for one kind of engine.
pub struct EngineSlot<T: ?Sized> {
    current: Mutex<Option<(ModelSpec, Arc<T>)>>,
}

impl<T: ?Sized> Default for EngineSlot<T> {
    fn default() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }
}

impl<T: ?Sized> EngineSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handle for `spec`, loading it (and replacing any other) if needed.
    pub async fn get_or_load<F, Fut>(&self, spec: &ModelSpec, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<T>>>,
    {
        let mut current = self.current.lock().await;

        if let Some((loaded_spec, handle)) = current.as_ref() {
            if loaded_spec == spec {
                return Ok(Arc::clone(handle));
            }
            info!("Model configuration changed from '{}' to '{}', replacing engine", loaded_spec.tier, spec.tier);
        }

        // Drop the previous handle before loading the next one.
        *current = None;
        let handle = load().await?;
        *current = Some((spec.clone(), Arc::clone(&handle)));
        Ok(handle)
    }

    /// Spec of the currently loaded engine, if any.
    pub async fn loaded_spec(&self) -> Option<ModelSpec> {
        self.current.lock().await.as_ref().map(|(spec, _)| spec.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_unknown_tier_falls_back_to_base() {
        assert_eq!(ModelSpec::transcription("huge", None).tier, "base");
        assert_eq!(ModelSpec::transcription("small", None).tier, "small");
        assert_eq!(ModelSpec::translation("medium", None).tier, "base");
        assert_eq!(ModelSpec::translation("large", None).tier, "large");
    }

    #[test]
    fn test_model_dir_requires_cache_root() {
        let spec = ModelSpec::translation("base", Some(PathBuf::from("/models")));
        let err = spec.ensure_cache_root("SUBBURN_TEST_CACHE_ROOT_THAT_IS_NEVER_SET").unwrap_err();
        assert!(matches!(err, SubburnError::Configuration(_)));

        // PATH is always present in a test environment.
        assert!(spec.ensure_cache_root("PATH").is_ok());

        let without_dir = ModelSpec::translation("base", None);
        assert!(without_dir.ensure_cache_root("SUBBURN_TEST_CACHE_ROOT_THAT_IS_NEVER_SET").is_ok());
    }

    #[tokio::test]
    async fn test_slot_reuses_handle_for_same_spec() {
        let slot: EngineSlot<String> = EngineSlot::new();
        let loads = AtomicUsize::new(0);
        let spec = ModelSpec::translation("base", None);

        for _ in 0..3 {
            let handle = slot
                .get_or_load(&spec, || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(Arc::new("engine".to_string()))
                })
                .await
                .unwrap();
            assert_eq!(handle.as_str(), "engine");
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slot_replaces_handle_when_spec_changes() {
        let slot: EngineSlot<String> = EngineSlot::new();
        let base = ModelSpec::translation("base", None);
        let large = ModelSpec::translation("large", None);

        slot.get_or_load(&base, || async { Ok(Arc::new("base".to_string())) }).await.unwrap();
        let handle = slot
            .get_or_load(&large, || async { Ok(Arc::new("large".to_string())) })
            .await
            .unwrap();

        assert_eq!(handle.as_str(), "large");
        assert_eq!(slot.loaded_spec().await, Some(large));
    }

    #[tokio::test]
    async fn test_failed_load_leaves_slot_empty() {
        let slot: EngineSlot<String> = EngineSlot::new();
        let spec = ModelSpec::translation("base", None);

        let result = slot
            .get_or_load(&spec, || async { Err(SubburnError::ModelLoad("no model".to_string())) })
            .await;

        assert!(matches!(result, Err(SubburnError::ModelLoad(_))));
        assert_eq!(slot.loaded_spec().await, None);
    }
}
