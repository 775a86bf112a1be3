//! Video → audio → transcript → subtitles (checkpoint, then final) → subtitled video.
//!
//! Every stage returns its own `Result`, which is recorded in a
//! [`PipelineReport`]. Under [`FailurePolicy::Continue`] later stages still run
//! against whatever partial state exists; under [`FailurePolicy::AbortEarly`]
//! the first failure ends the run and the remaining stages are marked skipped.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{Config, FailurePolicy, PipelineConfig};
use crate::engine::ModelSpec;
use crate::error::{Result, SubburnError};
use crate::media::{MediaProcessorFactory, MediaProcessorTrait};
use crate::subtitle::{self, render_checkpoint, SubtitleDocument};
use crate::transcribe::Transcriber;
use crate::transcript::Transcript;
use crate::translate::{LanguagePair, LineTranslator};

const DEFAULT_SUBTITLE_PATH: &str = "output.srt";
const OUTPUT_VIDEO_SUFFIX: &str = "_subtitled";
const CHECKPOINT_PREFIX: &str = "checkpoint_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ExtractingAudio,
    Transcribing,
    CheckpointRendering,
    FinalRendering,
    Muxing,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::ExtractingAudio,
        Stage::Transcribing,
        Stage::CheckpointRendering,
        Stage::FinalRendering,
        Stage::Muxing,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ExtractingAudio => "audio extraction",
            Stage::Transcribing => "transcription",
            Stage::CheckpointRendering => "checkpoint subtitles",
            Stage::FinalRendering => "final subtitles",
            Stage::Muxing => "subtitle burn-in",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum StageOutcome {
    Completed,
    Failed(SubburnError),
    Skipped,
}

#[derive(Debug)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: StageOutcome,
}

/// What happened during one pipeline run.
#[derive(Debug)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub stages: Vec<StageReport>,
    pub checkpoint_path: PathBuf,
    pub subtitle_path: PathBuf,
    pub output_video_path: PathBuf,
    /// Number of segments the run worked with (zero when transcription failed)
    pub segment_count: usize,
    /// Entries in the subtitle file handed to burn-in, if it could be read back
    pub burned_entries: Option<usize>,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.stages.len() == Stage::ALL.len()
            && self.stages.iter().all(|s| matches!(s.outcome, StageOutcome::Completed))
    }

    pub fn failed_stages(&self) -> Vec<Stage> {
        self.stages
            .iter()
            .filter(|s| matches!(s.outcome, StageOutcome::Failed(_)))
            .map(|s| s.stage)
            .collect()
    }

    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages.iter().find(|s| s.stage == stage).map(|s| &s.outcome)
    }

    fn skip_remaining(&mut self) {
        for stage in Stage::ALL {
            if self.outcome(stage).is_none() {
                self.stages.push(StageReport { stage, outcome: StageOutcome::Skipped });
            }
        }
    }
}

/// Input video, output locations, languages and models for one run.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub video_path: PathBuf,
    pub output_video_path: PathBuf,
    pub subtitle_path: PathBuf,
    pub languages: LanguagePair,
    pub caption_model: ModelSpec,
    pub language_model: ModelSpec,
}

impl PipelineRequest {
    /// Request with default outputs: `<stem>_subtitled.<ext>` and `output.srt`.
    pub fn new<P: Into<PathBuf>>(video_path: P, languages: LanguagePair) -> Self {
        let video_path = video_path.into();
        Self {
            output_video_path: default_output_video_path(&video_path),
            subtitle_path: PathBuf::from(DEFAULT_SUBTITLE_PATH),
            video_path,
            languages,
            caption_model: ModelSpec::transcription("base", None),
            language_model: ModelSpec::translation("base", None),
        }
    }

    pub fn with_output_video<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output_video_path = path.into();
        self
    }

    pub fn with_subtitle_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.subtitle_path = normalize_subtitle_path(path.into());
        self
    }

    pub fn with_models(mut self, caption_model: ModelSpec, language_model: ModelSpec) -> Self {
        self.caption_model = caption_model;
        self.language_model = language_model;
        self
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        checkpoint_path(&self.subtitle_path)
    }
}

/// Insert `_subtitled` before the extension of the input video.
pub fn default_output_video_path(video_path: &Path) -> PathBuf {
    let stem = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let file_name = match video_path.extension() {
        Some(ext) => format!("{}{}.{}", stem, OUTPUT_VIDEO_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, OUTPUT_VIDEO_SUFFIX),
    };

    video_path.with_file_name(file_name)
}

/// Append `.srt` unless the path already has that extension.
pub fn normalize_subtitle_path(path: PathBuf) -> PathBuf {
    let has_srt = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("srt"))
        .unwrap_or(false);

    if has_srt {
        path
    } else {
        let mut name = path.into_os_string();
        name.push(".srt");
        PathBuf::from(name)
    }
}

/// `checkpoint_<name>` next to the final subtitle file.
pub fn checkpoint_path(subtitle_path: &Path) -> PathBuf {
    let name = subtitle_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| DEFAULT_SUBTITLE_PATH.to_string());

    subtitle_path.with_file_name(format!("{}{}", CHECKPOINT_PREFIX, name))
}

/// Runs videos through the subtitle pipeline. Holds the engine handles, so
/// reusing one `Pipeline` across runs reuses loaded models.
pub struct Pipeline {
    config: PipelineConfig,
    media: Box<dyn MediaProcessorTrait>,
    transcriber: Transcriber,
    translator: LineTranslator,
}

impl Pipeline {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_components(
            config.pipeline.clone(),
            MediaProcessorFactory::create_processor(config.media.clone()),
            Transcriber::from_config(config.transcriber.clone())?,
            LineTranslator::from_config(config.translate.clone()),
        ))
    }

    pub fn with_components(
        config: PipelineConfig,
        media: Box<dyn MediaProcessorTrait>,
        transcriber: Transcriber,
        translator: LineTranslator,
    ) -> Self {
        Self {
            config,
            media,
            transcriber,
            translator,
        }
    }

    /// Check that external tools can be reached.
    pub async fn check_dependencies(&self) -> Result<()> {
        self.media.check_availability().await
    }

    /// Process one video. Stage failures end up in the report; `Err` means the
    /// run could not start at all.
    pub async fn run(&self, request: &PipelineRequest) -> Result<PipelineReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", run_id = %run_id);
        self.run_stages(request, run_id).instrument(span).await
    }

    async fn run_stages(&self, request: &PipelineRequest, run_id: Uuid) -> Result<PipelineReport> {
        info!("Processing {}", request.video_path.display());

        // Scratch space for this run only; removed when dropped.
        let scratch = tempfile::Builder::new()
            .prefix(&format!("subburn-{}-", run_id))
            .tempdir()?;
        let audio_path = scratch.path().join("audio.wav");

        let mut report = PipelineReport {
            run_id,
            stages: Vec::with_capacity(Stage::ALL.len()),
            checkpoint_path: request.checkpoint_path(),
            subtitle_path: request.subtitle_path.clone(),
            output_video_path: request.output_video_path.clone(),
            segment_count: 0,
            burned_entries: None,
        };

        for code in request.languages.unsupported_codes() {
            warn!("Language '{}' is not supported by the translator", code);
        }

        let extracted = self.media.extract_audio(&request.video_path, &audio_path).await;
        if self.record(&mut report, Stage::ExtractingAudio, extracted).is_none() && self.aborts() {
            report.skip_remaining();
            return Ok(report);
        }

        let transcribed = self
            .transcriber
            .transcribe(&audio_path, request.languages.source.as_deref(), &request.caption_model)
            .await;
        let transcript = match self.record(&mut report, Stage::Transcribing, transcribed) {
            Some(transcript) => transcript,
            None if self.aborts() => {
                report.skip_remaining();
                return Ok(report);
            }
            None => Transcript::default(),
        };
        report.segment_count = transcript.len();

        let checkpoint = render_checkpoint(&transcript, false);
        let checkpoint_written = checkpoint.write_to(&report.checkpoint_path).await;
        if self.record(&mut report, Stage::CheckpointRendering, checkpoint_written).is_none() && self.aborts() {
            report.skip_remaining();
            return Ok(report);
        }

        let final_written = self.render_final(&transcript, request).await;
        if self.record(&mut report, Stage::FinalRendering, final_written).is_none() {
            warn!(
                "Final subtitles were not written to {}; untranslated subtitles are in {}",
                request.subtitle_path.display(),
                report.checkpoint_path.display()
            );
            if self.aborts() {
                report.skip_remaining();
                return Ok(report);
            }
        }

        report.burned_entries = match SubtitleDocument::read_from(&request.subtitle_path).await {
            Ok(document) => {
                info!("Burning {} subtitle entries from {}", document.len(), request.subtitle_path.display());
                Some(document.len())
            }
            Err(e) => {
                warn!("Subtitle file {} is missing or unreadable: {}", request.subtitle_path.display(), e);
                None
            }
        };

        let burned = self
            .media
            .burn_subtitles(&request.video_path, &request.subtitle_path, &request.output_video_path)
            .await;
        self.record(&mut report, Stage::Muxing, burned);

        if report.is_success() {
            info!("Subtitled video written to {}", request.output_video_path.display());
        } else {
            warn!("Run finished with failed stages: {:?}", report.failed_stages());
        }

        Ok(report)
    }

    async fn render_final(&self, transcript: &Transcript, request: &PipelineRequest) -> Result<()> {
        info!("Generating subtitle file");
        let document = subtitle::render(
            transcript,
            &request.languages,
            true,
            &self.translator,
            &request.language_model,
            self.config.show_progress,
        )
        .await?;

        document.write_to(&request.subtitle_path).await?;
        info!("Subtitle file generated: {}", request.subtitle_path.display());
        Ok(())
    }

    fn aborts(&self) -> bool {
        self.config.failure_policy == FailurePolicy::AbortEarly
    }

    fn record<T>(&self, report: &mut PipelineReport, stage: Stage, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => {
                info!("Finished {}", stage);
                report.stages.push(StageReport { stage, outcome: StageOutcome::Completed });
                Some(value)
            }
            Err(e) => {
                error!("Couldn't complete {}: {}", stage, e);
                report.stages.push(StageReport { stage, outcome: StageOutcome::Failed(e) });
                None
            }
        }
    }
}
