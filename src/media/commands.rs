use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SubburnError};

/// Media tool invocation: binary, arguments, and a description used in errors.
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.arg("-ar").arg(rate.to_string())
    }

    pub fn audio_channels(self, channels: u32) -> Self {
        self.arg("-ac").arg(channels.to_string())
    }

    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Run the command, returning its stdout on success.
    pub async fn execute(&self) -> Result<String> {
        debug!("Executing media command: {} {:?}", self.binary_path, self.args);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| SubburnError::Media(format!("Failed to execute {}: {}", self.binary_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SubburnError::Media(format!(
                "{} failed: {}",
                self.description,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Escape a path given as a filter option value inside a `-vf` argument.
///
/// ffmpeg unescapes twice: first the filtergraph, then the filter's options.
/// The option level needs `\`, `:` and `'` escaped; the graph level then
/// needs `\`, `'`, `[`, `]`, `,` and `;` escaped on top of that.
fn escape_filter_path(path: &Path) -> String {
    let option_level = path
        .to_string_lossy()
        .replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'");

    let mut graph_level = String::with_capacity(option_level.len() * 2);
    for c in option_level.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph_level.push('\\');
        }
        graph_level.push(c);
    }
    graph_level
}

/// Builds the ffmpeg invocations the pipeline needs.
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Burn a subtitle file into the video frames, keeping the original audio.
    pub fn burn_subtitles<P: AsRef<Path>>(
        &self,
        video_path: P,
        subtitle_path: P,
        output_path: P,
        force_style: &str,
        additional_options: &[String],
    ) -> MediaCommand {
        let mut filter = format!("subtitles={}", escape_filter_path(subtitle_path.as_ref()));
        if !force_style.is_empty() {
            filter.push_str(&format!(":force_style='{}'", force_style));
        }

        MediaCommand::new(&self.binary_path, "Subtitle burn-in")
            .overwrite()
            .input(&video_path)
            .video_filter(filter)
            .video_codec("libx264")
            .copy_audio()
            .args(additional_options.iter().cloned())
            .output(output_path)
    }

    /// Extract mono 16 kHz 16-bit PCM audio for the transcriber.
    pub fn extract_audio<P: AsRef<Path>>(&self, video_path: P, audio_path: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio extraction")
            .input(video_path)
            .no_video()
            .audio_codec("pcm_s16le")
            .audio_sample_rate(16000)
            .audio_channels(1)
            .overwrite()
            .output(audio_path)
    }

    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_audio_arguments() {
        let cmd = MediaCommandBuilder::new("ffmpeg").extract_audio(Path::new("in.mp4"), Path::new("out.wav"));

        assert_eq!(cmd.binary_path, "ffmpeg");
        assert_eq!(
            cmd.args,
            vec!["-i", "in.mp4", "-vn", "-c:a", "pcm_s16le", "-ar", "16000", "-ac", "1", "-y", "out.wav"]
        );
    }

    #[test]
    fn test_burn_subtitles_arguments() {
        let options = vec!["-preset".to_string(), "fast".to_string()];
        let cmd = MediaCommandBuilder::new("ffmpeg").burn_subtitles(
            Path::new("in.mp4"),
            Path::new("output.srt"),
            Path::new("in_subtitled.mp4"),
            "OutlineColour=&H40000000,BorderStyle=3",
            &options,
        );

        assert_eq!(
            cmd.args,
            vec![
                "-y",
                "-i",
                "in.mp4",
                "-vf",
                "subtitles=output.srt:force_style='OutlineColour=&H40000000,BorderStyle=3'",
                "-c:v",
                "libx264",
                "-c:a",
                "copy",
                "-preset",
                "fast",
                "in_subtitled.mp4",
            ]
        );
    }

    #[test]
    fn test_burn_in_filter_for_windows_subtitle_path() {
        let cmd = MediaCommandBuilder::new("ffmpeg").burn_subtitles(
            Path::new("in.mp4"),
            Path::new(r"C:\subs\output.srt"),
            Path::new("out.mp4"),
            "",
            &[],
        );

        assert_eq!(cmd.args[4], r"subtitles=C\\:\\\\subs\\\\output.srt");
    }

    #[test]
    fn test_filter_path_is_escaped_for_graph_and_option_levels() {
        assert_eq!(escape_filter_path(Path::new(r"C:\subs\a,b.srt")), r"C\\:\\\\subs\\\\a\,b.srt");
        assert_eq!(escape_filter_path(Path::new("it's.srt")), r"it\\\'s.srt");
        assert_eq!(escape_filter_path(Path::new("out/[final].srt")), r"out/\[final\].srt");
        assert_eq!(escape_filter_path(Path::new("plain/output.srt")), "plain/output.srt");
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_media_error() {
        let err = MediaCommandBuilder::new("/nonexistent/ffmpeg").version_check().execute().await.unwrap_err();
        assert!(matches!(err, SubburnError::Media(_)));
    }
}
