use serde::{Deserialize, Serialize};

/// One detected utterance, as returned by the transcription engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start_seconds: f64,
    pub end_seconds: f64,
    /// Raw text, surrounding whitespace included
    pub text: String,
}

impl TranscriptSegment {
    pub fn new<S: Into<String>>(start_seconds: f64, end_seconds: f64, text: S) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text: text.into(),
        }
    }
}

/// Ordered segments for one media item.
///
/// Segments are kept in the order the engine produced them; nothing here
/// re-sorts or validates them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub segments: Vec<TranscriptSegment>,
    /// Language reported by the engine, if any
    pub language: Option<String>,
}

impl Transcript {
    pub fn new(segments: Vec<TranscriptSegment>) -> Self {
        Self {
            segments,
            language: None,
        }
    }

    pub fn with_language<S: Into<String>>(mut self, language: S) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TranscriptSegment> {
        self.segments.iter()
    }

    /// End offset of the last segment, or zero for an empty transcript.
    pub fn duration(&self) -> f64 {
        self.segments.last().map(|seg| seg.end_seconds).unwrap_or(0.0)
    }
}

impl FromIterator<TranscriptSegment> for Transcript {
    fn from_iter<I: IntoIterator<Item = TranscriptSegment>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
