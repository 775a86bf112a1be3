use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::TranslateConfig;
use crate::engine::ModelSpec;
use crate::error::{Result, SubburnError};
use super::{languages, TranslationEngine, TranslationEngineLoader};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResponse {
    pub response: String,
    pub done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    pub text: String,
}

/// Creates Ollama-backed engines for a model tier.
pub struct OllamaLoader {
    config: TranslateConfig,
}

impl OllamaLoader {
    pub fn new(config: TranslateConfig) -> Self {
        Self { config }
    }

    /// Ollama model name backing a tier.
    pub fn model_for_tier(&self, tier: &str) -> &str {
        match tier {
            "large" => &self.config.large_model,
            _ => &self.config.base_model,
        }
    }
}

#[async_trait]
impl TranslationEngineLoader for OllamaLoader {
    async fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn TranslationEngine>> {
        let model = self.model_for_tier(&spec.tier).to_string();

        if let Some(dir) = &spec.model_dir {
            info!("Ollama manages its own model store; model directory {} is not used", dir.display());
        }

        info!("Loading translation model '{}' ({} tier)", model, spec.tier);

        let engine = OllamaEngine::new(&self.config.endpoint, model, Duration::from_secs(self.config.timeout_secs))?;
        engine.check_availability().await?;

        Ok(Arc::new(engine))
    }
}

/// Translation engine talking to an Ollama server.
pub struct OllamaEngine {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaEngine {
    pub fn new<S: Into<String>>(endpoint: &str, model: S, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubburnError::ModelLoad(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// Check that Ollama is reachable and the model has been pulled.
    pub async fn check_availability(&self) -> Result<()> {
        let url = format!("{}/api/show", self.endpoint);

        let response = self.client
            .post(&url)
            .json(&json!({ "name": self.model }))
            .send()
            .await
            .map_err(|e| SubburnError::ModelLoad(format!("Failed to connect to Ollama: {}", e)))?;

        if response.status().is_success() {
            info!("Ollama model '{}' is available", self.model);
            Ok(())
        } else {
            Err(SubburnError::ModelLoad(format!(
                "Ollama model '{}' not found. Please pull the model first: ollama pull {}",
                self.model, self.model
            )))
        }
    }

    fn build_prompt(text: &str, source_name: Option<&str>, target_name: &str, target_code: &str) -> String {
        let source_clause = match source_name {
            Some(name) => format!("from {} ", name),
            None => String::new(),
        };

        format!(
            "You are a professional subtitle translator.\n\
             \n\
             Translate the subtitle line below {}to {} ONLY (language code: {}).\n\
             Return ONLY the translation in JSON format as {{\"text\":\"your {} translation here\"}}.\n\
             Do not include any explanations, alternatives, or text in other languages.\n\
             \n\
             Text to translate: \"{}\"\n",
            source_clause, target_name, target_code, target_name, text
        )
    }

    /// Pull the translated text out of the model's raw answer.
    fn parse_response(raw: &str) -> Result<String> {
        let raw = raw.trim();

        if raw.is_empty() {
            return Err(SubburnError::Decoding("Empty translation received".to_string()));
        }

        if let Ok(result) = serde_json::from_str::<TranslationResult>(raw) {
            let text = result.text.trim();
            if text.is_empty() {
                return Err(SubburnError::Decoding("Translation JSON has empty text".to_string()));
            }
            return Ok(text.to_string());
        }

        Ok(Self::clean_translation_response(raw))
    }

    /// Pick the first line that looks like a translation from a free-form answer.
    fn clean_translation_response(response: &str) -> String {
        let lines: Vec<&str> = response.lines().collect();

        for &line in &lines {
            let trimmed = line.trim();

            if trimmed.is_empty() {
                continue;
            }

            if trimmed.starts_with("Here are")
                || trimmed.starts_with("Option")
                || trimmed.starts_with("**Option")
                || trimmed.starts_with("Translation:")
                || trimmed.starts_with("- ")
                || trimmed.starts_with("* ")
            {
                continue;
            }

            if trimmed.starts_with("**") && trimmed.ends_with("**") {
                continue;
            }

            if trimmed.len() > 3 {
                return trimmed.to_string();
            }
        }

        lines
            .iter()
            .map(|line| line.trim())
            .find(|line| !line.is_empty())
            .unwrap_or(response)
            .to_string()
    }
}

#[async_trait]
impl TranslationEngine for OllamaEngine {
    async fn translate(&self, text: &str, source: Option<&str>, target: &str) -> Result<String> {
        let unsupported = || SubburnError::UnsupportedLanguagePair {
            source_lang: source.unwrap_or("auto").to_string(),
            target_lang: target.to_string(),
        };

        let target_name = languages::language_name(target).ok_or_else(unsupported)?;
        let source_name = match source {
            Some(code) => Some(languages::language_name(code).ok_or_else(unsupported)?),
            None => None,
        };

        let request = TranslationRequest {
            model: self.model.clone(),
            prompt: Self::build_prompt(text, source_name, target_name, target),
            stream: false,
            format: "json".to_string(),
        };

        let body = serde_json::to_vec(&request)
            .map_err(|e| SubburnError::Encoding(format!("Failed to encode translation request: {}", e)))?;

        let url = format!("{}/api/generate", self.endpoint);
        debug!("Sending translation request to: {}", url);

        let response = self.client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| SubburnError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SubburnError::Translation(format!(
                "Ollama API error {}: {}", status, error_text
            )));
        }

        let translation_response: TranslationResponse = response.json().await
            .map_err(|e| SubburnError::Decoding(format!("Failed to parse response: {}", e)))?;

        debug!("Raw Ollama response: {}", translation_response.response);

        Self::parse_response(&translation_response.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_selects_configured_model() {
        let loader = OllamaLoader::new(TranslateConfig::default());
        assert_eq!(loader.model_for_tier("base"), "llama3.2:3b");
        assert_eq!(loader.model_for_tier("large"), "llama3.1:8b");
    }

    #[test]
    fn test_prompt_names_both_languages() {
        let prompt = OllamaEngine::build_prompt("hello", Some("English"), "Romanian", "ro");
        assert!(prompt.contains("from English to Romanian"));
        assert!(prompt.contains("(language code: ro)"));
        assert!(prompt.contains("\"hello\""));

        let prompt = OllamaEngine::build_prompt("hello", None, "Romanian", "ro");
        assert!(prompt.contains("below to Romanian"));
    }

    #[test]
    fn test_parse_json_response() {
        assert_eq!(OllamaEngine::parse_response("{\"text\": \" salut \"}").unwrap(), "salut");
    }

    #[test]
    fn test_parse_free_form_response() {
        let raw = "Here are some options:\n\n**Option 1**\nBună ziua, lume\n- alt";
        assert_eq!(OllamaEngine::parse_response(raw).unwrap(), "Bună ziua, lume");
    }

    #[test]
    fn test_empty_response_is_a_decoding_error() {
        assert!(matches!(OllamaEngine::parse_response("  \n"), Err(SubburnError::Decoding(_))));
        assert!(matches!(OllamaEngine::parse_response("{\"text\":\"\"}"), Err(SubburnError::Decoding(_))));
    }

    #[tokio::test]
    async fn test_unsupported_language_fails_before_any_request() {
        // Nothing listens on this port; an unsupported pair must fail without connecting.
        let engine = OllamaEngine::new("http://127.0.0.1:9", "llama3.2:3b", Duration::from_secs(1)).unwrap();

        let err = engine.translate("hello", Some("en"), "xx").await.unwrap_err();
        assert!(matches!(err, SubburnError::UnsupportedLanguagePair { .. }));

        let err = engine.translate("hello", Some("zz"), "ro").await.unwrap_err();
        assert!(matches!(err, SubburnError::UnsupportedLanguagePair { .. }));
    }
}
