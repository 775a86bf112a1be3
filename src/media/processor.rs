use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use crate::config::MediaConfig;
use crate::error::{Result, SubburnError};
use super::{MediaCommandBuilder, MediaProcessorTrait};

/// FFmpeg-backed media processor
pub struct MediaProcessorImpl {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        if !video_path.is_file() {
            return Err(SubburnError::Media(format!("Video file not found: {}", video_path.display())));
        }

        info!("Converting video {} to audio {}", video_path.display(), audio_path.display());

        self.command_builder
            .extract_audio(video_path, audio_path)
            .execute()
            .await?;

        info!("Video converted to audio");
        Ok(())
    }

    async fn burn_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        info!("Creating video with subtitles from {} into {} -> {}",
              subtitle_path.display(), video_path.display(), output_path.display());

        self.command_builder
            .burn_subtitles(
                video_path,
                subtitle_path,
                output_path,
                &self.config.force_style,
                &self.config.subtitle_options,
            )
            .execute()
            .await?;

        info!("Video with subtitles created");
        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        let stdout = self.command_builder
            .version_check()
            .execute()
            .await
            .map_err(|e| SubburnError::Media(format!("Media processor not available: {}", e)))?;

        info!("Media processor is available: {}", stdout.lines().next().unwrap_or("unknown version"));
        Ok(())
    }
}
