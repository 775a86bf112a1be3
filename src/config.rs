use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{Result, SubburnError};

fn default_model_cache_env() -> String {
    "HF_HOME".to_string()
}

fn default_force_style() -> String {
    "OutlineColour=&H40000000,BorderStyle=3".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub transcriber: TranscriberConfig,
    pub translate: TranslateConfig,
    pub media: MediaConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Path to transcriber binary (e.g., whisper-cli)
    pub binary_path: String,
    /// Model tier used for captioning (tiny, base, small, medium, large)
    pub model: String,
    /// Directory holding downloaded ggml models
    pub models_dir: String,
    /// Worker threads handed to the transcriber; 0 picks half the available cores
    pub threads: usize,
    /// Environment variable that must be set when a custom model directory is used
    #[serde(default = "default_model_cache_env")]
    pub model_cache_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Ollama endpoint URL
    pub endpoint: String,
    /// Model tier used for translation (base, large)
    pub model: String,
    /// Ollama model backing the `base` tier
    pub base_model: String,
    /// Ollama model backing the `large` tier
    pub large_model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Environment variable that must be set when a custom model directory is used
    #[serde(default = "default_model_cache_env")]
    pub model_cache_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// ASS style override passed to the subtitles filter when burning in
    #[serde(default = "default_force_style")]
    pub force_style: String,
    /// Additional encoding options for subtitle burn-in
    /// Common options: ["-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p"]
    pub subtitle_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// What to do once a stage has failed
    pub failure_policy: FailurePolicy,
    /// Log each line (and its translation) at info level during the final render
    pub show_progress: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Keep going with whatever partial state exists (empty transcript, stale subtitles)
    Continue,
    /// Stop at the first failed stage and skip the rest
    AbortEarly,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            binary_path: "whisper-cli".to_string(),
            model: "base".to_string(),
            models_dir: ".subburn/models".to_string(),
            threads: 0,
            model_cache_env: default_model_cache_env(),
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "base".to_string(),
            base_model: "llama3.2:3b".to_string(),
            large_model: "llama3.1:8b".to_string(),
            timeout_secs: 300,
            model_cache_env: default_model_cache_env(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            force_style: default_force_style(),
            subtitle_options: vec![
                // "-preset".to_string(), "medium".to_string(),
                // "-crf".to_string(), "23".to_string(),
            ],
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Continue,
            show_progress: true,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubburnError::Configuration(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SubburnError::Configuration(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubburnError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubburnError::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}
