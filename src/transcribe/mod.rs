// Speech-to-text
//
// `Transcriber` owns the engine handle for the current model configuration and
// hands audio files to it:
// - whisper_cpp: whisper.cpp (`whisper-cli`) engine and its loader

pub mod whisper_cpp;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::TranscriberConfig;
use crate::engine::{EngineSlot, ModelSpec};
use crate::error::{Result, SubburnError};
use crate::transcript::Transcript;

/// A loaded transcription engine.
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// Transcribe a mono 16 kHz PCM WAV file.
    async fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<Transcript>;
}

/// Creates transcription engines for a model configuration.
#[async_trait]
pub trait TranscriptionEngineLoader: Send + Sync {
    async fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn TranscriptionEngine>>;
}

pub struct Transcriber {
    loader: Box<dyn TranscriptionEngineLoader>,
    engine: EngineSlot<dyn TranscriptionEngine>,
    model_cache_env: String,
}

impl Transcriber {
    pub fn new<S: Into<String>>(loader: Box<dyn TranscriptionEngineLoader>, model_cache_env: S) -> Self {
        Self {
            loader,
            engine: EngineSlot::new(),
            model_cache_env: model_cache_env.into(),
        }
    }

    /// Transcriber backed by whisper.cpp as configured.
    pub fn from_config(config: TranscriberConfig) -> Result<Self> {
        let model_cache_env = config.model_cache_env.clone();
        let loader = whisper_cpp::WhisperCppLoader::new(config)?;
        Ok(Self::new(Box::new(loader), model_cache_env))
    }

    pub async fn transcribe(&self, audio_path: &Path, language: Option<&str>, spec: &ModelSpec) -> Result<Transcript> {
        spec.ensure_cache_root(&self.model_cache_env)?;

        if !audio_path.is_file() {
            return Err(SubburnError::Transcription(format!(
                "Audio file not found: {}",
                audio_path.display()
            )));
        }

        let engine = self.engine.get_or_load(spec, || self.loader.load(spec)).await?;

        info!("Captioning audio {} (language: {})", audio_path.display(), language.unwrap_or("auto"));
        let transcript = engine.transcribe(audio_path, language).await?;
        info!(
            "Finished captioning: {} segments covering {:.1}s (detected language: {})",
            transcript.len(),
            transcript.duration(),
            transcript.language.as_deref().unwrap_or("unknown")
        );

        Ok(transcript)
    }

    pub async fn loaded_spec(&self) -> Option<ModelSpec> {
        self.engine.loaded_spec().await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Engine returning a canned transcript, or an error when `transcript` is `None`.
    pub struct FakeTranscriptionEngine {
        pub transcript: Option<Transcript>,
    }

    #[async_trait]
    impl TranscriptionEngine for FakeTranscriptionEngine {
        async fn transcribe(&self, _audio_path: &Path, _language: Option<&str>) -> Result<Transcript> {
            self.transcript
                .clone()
                .ok_or_else(|| SubburnError::Transcription("engine failed".to_string()))
        }
    }

    pub struct FakeTranscriptionLoader {
        pub transcript: Option<Transcript>,
        pub loads: Arc<AtomicUsize>,
    }

    impl FakeTranscriptionLoader {
        pub fn new(transcript: Option<Transcript>) -> Self {
            Self {
                transcript,
                loads: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl TranscriptionEngineLoader for FakeTranscriptionLoader {
        async fn load(&self, _spec: &ModelSpec) -> Result<Arc<dyn TranscriptionEngine>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(FakeTranscriptionEngine {
                transcript: self.transcript.clone(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeTranscriptionLoader;
    use super::*;
    use crate::transcript::TranscriptSegment;
    use assert_fs::prelude::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_missing_audio_fails_without_loading_engine() {
        let loader = FakeTranscriptionLoader::new(Some(Transcript::default()));
        let loads = Arc::clone(&loader.loads);
        let transcriber = Transcriber::new(Box::new(loader), "HF_HOME");

        let err = transcriber
            .transcribe(Path::new("/nonexistent/audio.wav"), Some("en"), &ModelSpec::transcription("base", None))
            .await
            .unwrap_err();

        assert!(matches!(err, SubburnError::Transcription(_)));
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_engine_reused_across_calls() {
        let dir = assert_fs::TempDir::new().unwrap();
        let audio = dir.child("audio.wav");
        audio.write_binary(b"RIFF").unwrap();

        let transcript = Transcript::new(vec![TranscriptSegment::new(0.0, 1.0, " hi")]);
        let loader = FakeTranscriptionLoader::new(Some(transcript.clone()));
        let loads = Arc::clone(&loader.loads);
        let transcriber = Transcriber::new(Box::new(loader), "HF_HOME");
        let spec = ModelSpec::transcription("tiny", None);

        for _ in 0..2 {
            let result = transcriber.transcribe(audio.path(), Some("en"), &spec).await.unwrap();
            assert_eq!(result, transcript);
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(transcriber.loaded_spec().await, Some(spec));
    }
}
