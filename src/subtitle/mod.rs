// Subtitle documents and rendering
//
// - timecode: seconds <-> `H:MM:SS,mmm`
// - this module: entries, documents, and the transcript -> document renderer

pub mod timecode;

use std::fmt;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

pub use timecode::{format_timecode, parse_timecode};

use crate::engine::ModelSpec;
use crate::error::{Result, SubburnError};
use crate::transcript::{Transcript, TranscriptSegment};
use crate::translate::{LanguagePair, LineTranslator};

/// One numbered, timed block of a subtitle file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    /// Zero-based position in the document
    pub index: usize,
    pub start_timecode: String,
    pub end_timecode: String,
    pub text: String,
}

impl SubtitleEntry {
    fn from_segment(index: usize, segment: &TranscriptSegment, text: &str) -> Self {
        Self {
            index,
            start_timecode: format_timecode(segment.start_seconds),
            end_timecode: format_timecode(segment.end_seconds),
            text: entry_text(text),
        }
    }
}

/// Entry text with blank lines dropped, since a blank line ends an entry.
fn entry_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{} --> {}\n{}\n\n",
            self.index, self.start_timecode, self.end_timecode, self.text
        )
    }
}

/// Ordered subtitle entries. Displays as the subtitle file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleDocument {
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleDocument {
    pub fn new(entries: Vec<SubtitleEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse subtitle file contents. Accepts CRLF line endings and a missing final blank line.
    pub fn parse(content: &str) -> Result<Self> {
        let normalized = content.replace("\r\n", "\n");
        let mut entries = Vec::new();

        for block in normalized.split("\n\n") {
            let block = block.trim_matches('\n');
            if block.trim().is_empty() {
                continue;
            }

            let mut lines = block.lines();

            let index_line = lines.next().unwrap_or_default().trim();
            let index = index_line
                .parse::<usize>()
                .map_err(|_| SubburnError::Subtitle(format!("Invalid entry number: '{}'", index_line)))?;

            let timing = lines
                .next()
                .ok_or_else(|| SubburnError::Subtitle(format!("Entry {} has no timing line", index)))?;
            let (start, end) = timing
                .split_once("-->")
                .ok_or_else(|| SubburnError::Subtitle(format!("Invalid timing line: '{}'", timing)))?;
            let (start, end) = (start.trim(), end.trim());
            parse_timecode(start)?;
            parse_timecode(end)?;

            entries.push(SubtitleEntry {
                index,
                start_timecode: start.to_string(),
                end_timecode: end.to_string(),
                text: lines.collect::<Vec<_>>().join("\n"),
            });
        }

        Ok(Self { entries })
    }

    /// Write the document, replacing `path` only once the full contents are on disk.
    pub async fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = Path::new(&temp_name);

        fs::write(temp_path, self.to_string()).await?;
        fs::rename(temp_path, path).await?;

        debug!("Wrote {} subtitle entries to {}", self.len(), path.display());
        Ok(())
    }

    pub async fn read_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        Self::parse(&content)
    }
}

impl fmt::Display for SubtitleDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}

impl FromIterator<SubtitleEntry> for SubtitleDocument {
    fn from_iter<I: IntoIterator<Item = SubtitleEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// One-based progress line showing the segment text as the engine returned it.
fn progress_line(index: usize, total: usize, segment: &TranscriptSegment) -> String {
    format!("- Line {} of {}: {}", index + 1, total, segment.text)
}

/// Render the untranslated checkpoint document.
pub fn render_checkpoint(transcript: &Transcript, verbose: bool) -> SubtitleDocument {
    let total = transcript.len();
    if verbose {
        info!("Total lines: {}", total);
    }

    transcript
        .iter()
        .enumerate()
        .map(|(index, segment)| {
            if verbose {
                info!("{}", progress_line(index, total, segment));
            }
            SubtitleEntry::from_segment(index, segment, &segment.text)
        })
        .collect()
}

/// Render a transcript into a subtitle document, translating each line when asked to.
///
/// Lines are only translated when `translate` is set and `pair` has a target
/// that differs from its source. A line that fails to translate does not stop
/// the remaining lines from being attempted, but the render as a whole then
/// fails with [`SubburnError::TranslationIncomplete`] instead of returning a
/// document that mixes languages.
pub async fn render(
    transcript: &Transcript,
    pair: &LanguagePair,
    translate: bool,
    translator: &LineTranslator,
    model_spec: &ModelSpec,
    verbose: bool,
) -> Result<SubtitleDocument> {
    if !translate || !pair.needs_translation() {
        return Ok(render_checkpoint(transcript, verbose));
    }

    let total = transcript.len();
    if verbose {
        info!("Total lines: {}", total);
    }

    let mut entries = Vec::with_capacity(total);
    let mut failures: Vec<(usize, SubburnError)> = Vec::new();

    for (index, segment) in transcript.iter().enumerate() {
        let original = segment.text.trim();

        if verbose {
            info!("┌─ Line {} of {} ────────", index + 1, total);
            info!("│ Source: {}", original);
        }

        match translator.translate(original, pair, model_spec).await {
            Ok(translated) => {
                if verbose {
                    info!("│ Target: {}", translated);
                    info!("└─────────────────────────────────────");
                }
                entries.push(SubtitleEntry::from_segment(index, segment, &translated));
            }
            Err(e) => {
                warn!("│ Line {} failed: {}", index + 1, e);
                if verbose {
                    warn!("└─────────────────────────────────────");
                }
                failures.push((index, e));
            }
        }
    }

    if let Some((_, first_error)) = failures.first() {
        return Err(SubburnError::TranslationIncomplete {
            failed: failures.len(),
            total,
            first_error: first_error.to_string(),
        });
    }

    Ok(SubtitleDocument::new(entries))
}
