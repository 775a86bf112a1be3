use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;
use crate::engine::ModelSpec;
use crate::pipeline::PipelineRequest;
use crate::translate::LanguagePair;

pub const DEFAULT_SOURCE_LANG: &str = "en";

#[derive(Parser, Debug)]
#[command(author, version, about = "Caption a video, optionally translate the captions, and burn them in", long_about = None)]
pub struct Args {
    /// Input video file
    pub video_file: PathBuf,

    /// Output video file (default: input name with `_subtitled` before the extension)
    #[arg(short = 'o', long)]
    pub output_video: Option<PathBuf>,

    /// Output subtitle file; `.srt` is appended when missing
    #[arg(long = "output-subtitle", visible_alias = "srt", default_value = "output.srt")]
    pub output_subtitle: PathBuf,

    /// Language spoken in the video
    #[arg(long)]
    pub source_lang: Option<String>,

    /// Language to translate the subtitles into; no translation when omitted
    #[arg(long)]
    pub target_lang: Option<String>,

    /// Captioning model tier (tiny, base, small, medium, large)
    #[arg(long)]
    pub caption_model: Option<String>,

    /// Translation model tier (base, large)
    #[arg(long)]
    pub language_model: Option<String>,

    /// Custom directory for model files
    #[arg(long)]
    pub model_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Stop at the first failed stage instead of carrying on with partial results
    #[arg(long)]
    pub abort_on_failure: bool,
}

impl Args {
    /// Source language, and whether it fell back to the default.
    pub fn source_language(&self) -> (&str, bool) {
        match self.source_lang.as_deref() {
            Some(lang) => (lang, false),
            None => (DEFAULT_SOURCE_LANG, true),
        }
    }

    /// Build the pipeline request, taking model tiers from the config when not given.
    pub fn to_request(&self, config: &Config) -> PipelineRequest {
        let (source, _) = self.source_language();
        let languages = LanguagePair::new(Some(source), self.target_lang.as_deref());

        let caption_tier = self.caption_model.as_deref().unwrap_or(&config.transcriber.model);
        let language_tier = self.language_model.as_deref().unwrap_or(&config.translate.model);

        let mut request = PipelineRequest::new(&self.video_file, languages)
            .with_subtitle_path(&self.output_subtitle)
            .with_models(
                ModelSpec::transcription(caption_tier, self.model_dir.clone()),
                ModelSpec::translation(language_tier, self.model_dir.clone()),
            );

        if let Some(output_video) = &self.output_video {
            request = request.with_output_video(output_video);
        }

        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["subburn", "movie.mp4"]).unwrap();
        assert_eq!(args.source_language(), ("en", true));
        assert!(!args.abort_on_failure);

        let request = args.to_request(&Config::default());
        assert_eq!(request.video_path, PathBuf::from("movie.mp4"));
        assert_eq!(request.output_video_path, PathBuf::from("movie_subtitled.mp4"));
        assert_eq!(request.subtitle_path, PathBuf::from("output.srt"));
        assert_eq!(request.languages, LanguagePair::new(Some("en"), None));
        assert_eq!(request.caption_model.tier, "base");
        assert_eq!(request.language_model.tier, "base");
        assert!(request.caption_model.model_dir.is_none());
    }

    #[test]
    fn test_all_flags() {
        let args = Args::try_parse_from([
            "subburn",
            "talk.mkv",
            "-o",
            "out/talk_ro.mkv",
            "--srt",
            "out/talk",
            "--source-lang",
            "de",
            "--target-lang",
            "ro",
            "--caption-model",
            "small",
            "--language-model",
            "large",
            "--model-dir",
            "/models",
            "--abort-on-failure",
            "-v",
        ])
        .unwrap();

        assert!(args.verbose);
        assert!(args.abort_on_failure);
        assert_eq!(args.source_language(), ("de", false));

        let request = args.to_request(&Config::default());
        assert_eq!(request.output_video_path, PathBuf::from("out/talk_ro.mkv"));
        assert_eq!(request.subtitle_path, PathBuf::from("out/talk.srt"));
        assert_eq!(request.checkpoint_path(), PathBuf::from("out/checkpoint_talk.srt"));
        assert_eq!(request.languages, LanguagePair::new(Some("de"), Some("ro")));
        assert_eq!(request.caption_model, ModelSpec::transcription("small", Some(PathBuf::from("/models"))));
        assert_eq!(request.language_model.tier, "large");
    }

    #[test]
    fn test_model_tiers_fall_back_to_config() {
        let mut config = Config::default();
        config.transcriber.model = "medium".to_string();
        config.translate.model = "large".to_string();

        let args = Args::try_parse_from(["subburn", "movie.mp4", "--caption-model", "huge"]).unwrap();
        let request = args.to_request(&config);

        // unknown tiers fall back to base, omitted ones come from the config
        assert_eq!(request.caption_model.tier, "base");
        assert_eq!(request.language_model.tier, "large");
    }

    #[test]
    fn test_video_file_is_required() {
        assert!(Args::try_parse_from(["subburn"]).is_err());
    }
}
