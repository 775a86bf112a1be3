use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubburnError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Unsupported language pair: {source_lang} -> {target_lang}")]
    UnsupportedLanguagePair {
        source_lang: String,
        target_lang: String,
    },

    #[error("Translation failed for {failed} of {total} lines (first failure: {first_error})")]
    TranslationIncomplete {
        failed: usize,
        total: usize,
        first_error: String,
    },

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("Subtitle format error: {0}")]
    Subtitle(String),
}

impl SubburnError {
    /// Whether this error came out of the translation engine or its adapter.
    pub fn is_translation_failure(&self) -> bool {
        matches!(
            self,
            Self::Translation(_)
                | Self::UnsupportedLanguagePair { .. }
                | Self::TranslationIncomplete { .. }
                | Self::Encoding(_)
                | Self::Decoding(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SubburnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_failures_are_classified() {
        assert!(SubburnError::Decoding("empty".to_string()).is_translation_failure());
        assert!(SubburnError::UnsupportedLanguagePair {
            source_lang: "en".to_string(),
            target_lang: "xx".to_string(),
        }
        .is_translation_failure());
        assert!(!SubburnError::Media("boom".to_string()).is_translation_failure());
    }

    #[test]
    fn test_io_errors_convert_with_question_mark() {
        fn read_missing() -> Result<String> {
            Ok(std::fs::read_to_string("/nonexistent/subburn/file")?)
        }

        assert!(matches!(read_missing(), Err(SubburnError::Io(_))));
    }

    #[test]
    fn test_incomplete_translation_message() {
        let err = SubburnError::TranslationIncomplete {
            failed: 2,
            total: 5,
            first_error: "timeout".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Translation failed for 2 of 5 lines (first failure: timeout)"
        );
    }
}
