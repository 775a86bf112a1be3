use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use reqwest::Client;
use tracing::{info, warn};
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{Result, SubburnError};

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    /// Tier name as accepted on the command line
    pub name: String,
    pub filename: String,
    pub url: String,
    pub size_mb: f64,
}

impl ModelInfo {
    fn ggml(name: &str, file_stem: &str, size_mb: f64) -> Self {
        let filename = format!("ggml-{}.bin", file_stem);
        Self {
            name: name.to_string(),
            url: format!("{}/{}", MODEL_BASE_URL, filename),
            filename,
            size_mb,
        }
    }
}

/// Local store of whisper.cpp ggml models, downloading missing ones on demand.
pub struct ModelStore {
    client: Client,
    models_dir: PathBuf,
}

impl ModelStore {
    pub fn new<P: Into<PathBuf>>(models_dir: P) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("subburn/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SubburnError::ModelLoad(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            models_dir: models_dir.into(),
        })
    }

    pub fn available_models() -> Vec<ModelInfo> {
        vec![
            ModelInfo::ggml("tiny", "tiny", 75.0),
            ModelInfo::ggml("base", "base", 142.0),
            ModelInfo::ggml("small", "small", 466.0),
            ModelInfo::ggml("medium", "medium", 1500.0),
            ModelInfo::ggml("large", "large-v3", 2900.0),
        ]
    }

    pub fn model_info(tier: &str) -> Option<ModelInfo> {
        Self::available_models().into_iter().find(|m| m.name == tier)
    }

    pub fn local_path(&self, model: &ModelInfo) -> PathBuf {
        self.models_dir.join(&model.filename)
    }

    /// Path of the model for `tier`, downloading it first if it is not present.
    pub async fn ensure_model(&self, tier: &str) -> Result<PathBuf> {
        let model = Self::model_info(tier)
            .ok_or_else(|| SubburnError::ModelLoad(format!("Unknown whisper model tier '{}'", tier)))?;

        let local_path = self.local_path(&model);
        if local_path.exists() {
            return Ok(local_path);
        }

        info!("Whisper model '{}' not found in {}", tier, self.models_dir.display());
        self.download_model(&model).await
    }

    pub async fn download_model(&self, model: &ModelInfo) -> Result<PathBuf> {
        let local_path = self.local_path(model);

        if local_path.exists() {
            info!("Model {} already exists at {}", model.name, local_path.display());
            return Ok(local_path);
        }

        fs::create_dir_all(&self.models_dir).await?;

        info!("Downloading {} model ({:.1} MB)...", model.name, model.size_mb);

        let mut response = self.client.get(&model.url).send().await
            .map_err(|e| SubburnError::ModelLoad(format!("Failed to download model {}: {}", model.name, e)))?;

        if !response.status().is_success() {
            return Err(SubburnError::ModelLoad(format!(
                "Failed to download model {}: HTTP {}",
                model.name, response.status()
            )));
        }

        let total = response
            .content_length()
            .unwrap_or((model.size_mb * 1_000_000.0) as u64);
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let temp_path = local_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;

        let mut downloaded = 0u64;
        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    drop(file);
                    if let Err(cleanup) = fs::remove_file(&temp_path).await {
                        warn!("Failed to remove partial download {}: {}", temp_path.display(), cleanup);
                    }
                    return Err(SubburnError::ModelLoad(format!("Download of {} interrupted: {}", model.name, e)));
                }
            };
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            pb.set_position(downloaded);
        }

        file.flush().await?;
        drop(file);

        fs::rename(&temp_path, &local_path).await?;

        pb.finish_with_message(format!("Downloaded {}", model.name));
        info!("Successfully downloaded {} to {}", model.name, local_path.display());

        Ok(local_path)
    }
}
