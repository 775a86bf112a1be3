use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::TranscriberConfig;
use crate::engine::ModelSpec;
use crate::error::{Result, SubburnError};
use crate::models::ModelStore;
use crate::transcript::{Transcript, TranscriptSegment};
use super::{TranscriptionEngine, TranscriptionEngineLoader};

// Structs for parsing whisper.cpp JSON output (`-oj`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOutput {
    pub result: Option<WhisperCppResult>,
    pub transcription: Vec<WhisperCppSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppResult {
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppSegment {
    pub offsets: WhisperCppOffsets,
    pub text: String,
}

/// Segment bounds in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOffsets {
    pub from: i64,
    pub to: i64,
}

impl From<WhisperCppOutput> for Transcript {
    fn from(output: WhisperCppOutput) -> Self {
        let segments = output
            .transcription
            .into_iter()
            .map(|seg| TranscriptSegment {
                start_seconds: seg.offsets.from.max(0) as f64 / 1000.0,
                end_seconds: seg.offsets.to.max(0) as f64 / 1000.0,
                text: seg.text,
            })
            .collect();

        match output.result {
            Some(result) => Transcript::new(segments).with_language(result.language),
            None => Transcript::new(segments),
        }
    }
}

/// Resolves model files and creates whisper.cpp engines.
pub struct WhisperCppLoader {
    config: TranscriberConfig,
    store: ModelStore,
}

impl WhisperCppLoader {
    pub fn new(config: TranscriberConfig) -> Result<Self> {
        let store = ModelStore::new(&config.models_dir)?;
        Ok(Self { config, store })
    }

    async fn resolve_model(&self, spec: &ModelSpec) -> Result<PathBuf> {
        match &spec.model_dir {
            Some(dir) => {
                let info = ModelStore::model_info(&spec.tier).ok_or_else(|| {
                    SubburnError::ModelLoad(format!("Unknown whisper model tier '{}'", spec.tier))
                })?;
                let path = dir.join(&info.filename);
                if path.is_file() {
                    Ok(path)
                } else {
                    ModelStore::new(dir.clone())?.download_model(&info).await
                }
            }
            None => self.store.ensure_model(&spec.tier).await,
        }
    }
}

#[async_trait]
impl TranscriptionEngineLoader for WhisperCppLoader {
    async fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn TranscriptionEngine>> {
        let model_path = self.resolve_model(spec).await?;
        let threads = effective_threads(self.config.threads);

        info!("Loading whisper model {} with {} threads", model_path.display(), threads);

        Ok(Arc::new(WhisperCppEngine {
            binary_path: self.config.binary_path.clone(),
            model_path,
            threads,
        }))
    }
}

/// Half of the available cores unless configured, and never zero.
fn effective_threads(configured: usize) -> usize {
    if configured > 0 {
        return configured;
    }

    std::thread::available_parallelism()
        .map(|n| n.get() / 2)
        .unwrap_or(1)
        .max(1)
}

/// Runs `whisper-cli` on an audio file and reads back its JSON output.
pub struct WhisperCppEngine {
    binary_path: String,
    model_path: PathBuf,
    threads: usize,
}

impl WhisperCppEngine {
    fn build_command(&self, audio_path: &Path, output_base: &Path, language: Option<&str>) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("-oj")
           .arg("-of").arg(output_base)
           .arg("-m").arg(&self.model_path)
           .arg("-t").arg(self.threads.to_string())
           .arg("-f").arg(audio_path);

        if let Some(lang) = language {
            cmd.arg("-l").arg(lang);
        }

        cmd
    }

    fn parse_output(json_content: &str) -> Result<Transcript> {
        let output: WhisperCppOutput = serde_json::from_str(json_content)
            .map_err(|e| SubburnError::Transcription(format!("Failed to parse transcription JSON: {}", e)))?;
        Ok(Transcript::from(output))
    }
}

#[async_trait]
impl TranscriptionEngine for WhisperCppEngine {
    async fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<Transcript> {
        let temp_dir = tempfile::tempdir()
            .map_err(|e| SubburnError::Transcription(format!("Failed to create temp dir: {}", e)))?;

        let output_base = temp_dir.path().join("transcript");
        let output_path = temp_dir.path().join("transcript.json");

        let mut cmd = self.build_command(audio_path, &output_base, language);
        debug!("Executing whisper command: {:?}", cmd);

        let output = cmd.output().await
            .map_err(|e| SubburnError::Transcription(format!("Failed to execute whisper: {}", e)))?;

        debug!("Whisper exit status: {}", output.status);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SubburnError::Transcription(format!("Whisper failed: {}", stderr)));
        }

        let json_content = fs::read_to_string(&output_path).await
            .map_err(|e| SubburnError::Transcription(format!("Failed to read transcription: {}", e)))?;

        Self::parse_output(&json_content)
    }
}
